//! Nullable ledger node: an in-memory chain that mines every accepted
//! transaction, with scriptable faults.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use votekiosk_crypto::keccak256;
use votekiosk_ledger::{Address, LedgerClient, LedgerError, Receipt};
use votekiosk_types::TxHash;

use crate::lock;

/// What the node does with the next broadcast transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
enum SendScript {
    /// Reject the broadcast with an RPC error.
    Reject(String),
    /// Mine it with a failed status.
    Revert,
    /// Accept it and report no receipt for this many polls.
    Delay(u32),
}

/// A transaction the null node accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinedTransaction {
    pub hash: TxHash,
    pub raw: Vec<u8>,
    pub success: bool,
    pub block_number: u64,
}

#[derive(Debug, Default)]
struct State {
    script: VecDeque<SendScript>,
    mined: Vec<MinedTransaction>,
    pending_polls: HashMap<TxHash, u32>,
    nonce_requests: u32,
    send_calls: u32,
    gas_price: Option<u128>,
    call_responses: HashMap<Vec<u8>, Vec<u8>>,
    selector_responses: HashMap<[u8; 4], Vec<u8>>,
    calls: Vec<Vec<u8>>,
}

/// An in-memory ledger node.
///
/// The account nonce is the number of transactions mined so far, reverted
/// ones included. Transaction hashes are the keccak-256 of the raw bytes.
/// Clones share state.
#[derive(Clone, Debug)]
pub struct NullLedger {
    state: Arc<Mutex<State>>,
}

impl NullLedger {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                gas_price: Some(30_000_000_000),
                ..Default::default()
            })),
        }
    }

    /// Reject the next `count` broadcasts.
    pub fn reject_sends(&self, count: usize, message: &str) {
        let mut state = lock(&self.state);
        for _ in 0..count {
            state.script.push_back(SendScript::Reject(message.to_string()));
        }
    }

    /// Mine the next broadcast as reverted.
    pub fn revert_next(&self) {
        lock(&self.state).script.push_back(SendScript::Revert);
    }

    /// Accept the next broadcast but withhold its receipt for `polls` polls.
    pub fn delay_receipt(&self, polls: u32) {
        lock(&self.state).script.push_back(SendScript::Delay(polls));
    }

    /// `None` makes `eth_gasPrice` fail.
    pub fn set_gas_price(&self, price: Option<u128>) {
        lock(&self.state).gas_price = price;
    }

    /// Answer `eth_call` with exactly this calldata.
    pub fn respond_to_call(&self, data: Vec<u8>, output: Vec<u8>) {
        lock(&self.state).call_responses.insert(data, output);
    }

    /// Answer any `eth_call` to this function selector.
    pub fn respond_to_selector(&self, selector: [u8; 4], output: Vec<u8>) {
        lock(&self.state).selector_responses.insert(selector, output);
    }

    pub fn mined(&self) -> Vec<MinedTransaction> {
        lock(&self.state).mined.clone()
    }

    pub fn nonce_requests(&self) -> u32 {
        lock(&self.state).nonce_requests
    }

    pub fn send_calls(&self) -> u32 {
        lock(&self.state).send_calls
    }

    /// Calldata of every `eth_call`, in order.
    pub fn calls(&self) -> Vec<Vec<u8>> {
        lock(&self.state).calls.clone()
    }
}

impl Default for NullLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerClient for NullLedger {
    async fn transaction_count(&self, _account: &Address) -> Result<u64, LedgerError> {
        let mut state = lock(&self.state);
        state.nonce_requests += 1;
        Ok(state.mined.len() as u64)
    }

    async fn gas_price(&self) -> Result<u128, LedgerError> {
        lock(&self.state)
            .gas_price
            .ok_or_else(|| LedgerError::Rpc("gas price unavailable".into()))
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash, LedgerError> {
        let mut state = lock(&self.state);
        state.send_calls += 1;
        let hash = TxHash::new(keccak256(raw));
        let mut success = true;
        match state.script.pop_front() {
            Some(SendScript::Reject(message)) => return Err(LedgerError::Rpc(message)),
            Some(SendScript::Revert) => success = false,
            Some(SendScript::Delay(polls)) => {
                state.pending_polls.insert(hash, polls);
            }
            None => {}
        }
        let block_number = state.mined.len() as u64 + 1;
        state.mined.push(MinedTransaction {
            hash,
            raw: raw.to_vec(),
            success,
            block_number,
        });
        Ok(hash)
    }

    async fn transaction_receipt(&self, hash: &TxHash) -> Result<Option<Receipt>, LedgerError> {
        let mut state = lock(&self.state);
        if let Some(remaining) = state.pending_polls.get_mut(hash) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(None);
            }
            state.pending_polls.remove(hash);
        }
        Ok(state
            .mined
            .iter()
            .find(|tx| tx.hash == *hash)
            .map(|tx| Receipt {
                tx_hash: tx.hash,
                success: tx.success,
                block_number: Some(tx.block_number),
            }))
    }

    async fn call(&self, _to: &Address, data: &[u8]) -> Result<Vec<u8>, LedgerError> {
        let mut state = lock(&self.state);
        state.calls.push(data.to_vec());
        if let Some(output) = state.call_responses.get(data) {
            return Ok(output.clone());
        }
        let selector: Option<[u8; 4]> = data.get(..4).and_then(|s| s.try_into().ok());
        selector
            .and_then(|s| state.selector_responses.get(&s).cloned())
            .ok_or_else(|| LedgerError::Rpc("execution reverted: no scripted response".into()))
    }
}
