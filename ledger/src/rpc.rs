//! JSON-RPC access to an Ethereum-compatible node.

use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use votekiosk_types::TxHash;

use crate::{Address, LedgerClient, LedgerError, Receipt};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP JSON-RPC client for the ledger node.
///
/// Wraps `reqwest::Client` with the node URL and provides typed methods for
/// each `eth_*` call the transactor needs.
pub struct JsonRpcLedger {
    http: reqwest::Client,
    rpc_url: String,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    block_number: Option<String>,
}

impl JsonRpcLedger {
    pub fn new(rpc_url: impl Into<String>) -> Result<Self, LedgerError> {
        Self::with_timeout(rpc_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(rpc_url: impl Into<String>, timeout: Duration) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| LedgerError::Rpc(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            rpc_url: rpc_url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Send one JSON-RPC request and return its `result`.
    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });

        let response = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LedgerError::Timeout(format!("{method}: {e}"))
                } else {
                    LedgerError::Rpc(format!("{method}: request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            return Err(LedgerError::Rpc(format!(
                "{method}: node returned HTTP {}",
                response.status()
            )));
        }

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Rpc(format!("{method}: invalid JSON response: {e}")))?;

        if let Some(err) = parsed.error {
            return Err(LedgerError::Rpc(format!(
                "{method}: node error {}: {}",
                err.code, err.message
            )));
        }
        Ok(parsed.result.unwrap_or(Value::Null))
    }
}

fn parse_quantity(value: &Value, what: &str) -> Result<u128, LedgerError> {
    let text = value
        .as_str()
        .ok_or_else(|| LedgerError::Rpc(format!("{what}: expected hex string, got {value}")))?;
    let digits = text.strip_prefix("0x").unwrap_or(text);
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| LedgerError::Rpc(format!("{what}: bad quantity {text:?}: {e}")))
}

fn parse_data(value: &Value, what: &str) -> Result<Vec<u8>, LedgerError> {
    let text = value
        .as_str()
        .ok_or_else(|| LedgerError::Rpc(format!("{what}: expected hex data, got {value}")))?;
    hex::decode(text.strip_prefix("0x").unwrap_or(text))
        .map_err(|e| LedgerError::Rpc(format!("{what}: bad hex data: {e}")))
}

impl LedgerClient for JsonRpcLedger {
    async fn transaction_count(&self, account: &Address) -> Result<u64, LedgerError> {
        let result = self
            .rpc_call(
                "eth_getTransactionCount",
                json!([account.to_string(), "latest"]),
            )
            .await?;
        let count = parse_quantity(&result, "eth_getTransactionCount")?;
        u64::try_from(count).map_err(|_| LedgerError::Rpc(format!("nonce {count} out of range")))
    }

    async fn gas_price(&self) -> Result<u128, LedgerError> {
        let result = self.rpc_call("eth_gasPrice", json!([])).await?;
        parse_quantity(&result, "eth_gasPrice")
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash, LedgerError> {
        let result = self
            .rpc_call(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(raw))]),
            )
            .await?;
        let text = result
            .as_str()
            .ok_or_else(|| LedgerError::Rpc(format!("eth_sendRawTransaction: unexpected {result}")))?;
        text.parse()
            .map_err(|e| LedgerError::Rpc(format!("eth_sendRawTransaction: {e}")))
    }

    async fn transaction_receipt(&self, hash: &TxHash) -> Result<Option<Receipt>, LedgerError> {
        let result = self
            .rpc_call("eth_getTransactionReceipt", json!([hash.to_string()]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        let raw: RawReceipt = serde_json::from_value(result)
            .map_err(|e| LedgerError::Rpc(format!("eth_getTransactionReceipt: {e}")))?;

        let tx_hash = raw
            .transaction_hash
            .parse()
            .map_err(|e| LedgerError::Rpc(format!("eth_getTransactionReceipt: {e}")))?;
        let success = match raw.status.as_deref() {
            Some(status) => parse_quantity(&Value::String(status.into()), "receipt status")? == 1,
            None => true,
        };
        let block_number = raw
            .block_number
            .map(|b| parse_quantity(&Value::String(b), "receipt block"))
            .transpose()?
            .and_then(|b| u64::try_from(b).ok());

        Ok(Some(Receipt {
            tx_hash,
            success,
            block_number,
        }))
    }

    async fn call(&self, to: &Address, data: &[u8]) -> Result<Vec<u8>, LedgerError> {
        let result = self
            .rpc_call(
                "eth_call",
                json!([
                    { "to": to.to_string(), "data": format!("0x{}", hex::encode(data)) },
                    "latest"
                ]),
            )
            .await?;
        parse_data(&result, "eth_call")
    }
}
