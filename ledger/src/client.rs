use std::future::Future;

use votekiosk_types::TxHash;

use crate::{Address, LedgerError};

/// The parts of a transaction receipt the transactor acts on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    /// `false` when the transaction was mined but reverted.
    pub success: bool,
    pub block_number: Option<u64>,
}

/// Node access needed to submit and observe contract transactions.
pub trait LedgerClient: Send + Sync {
    /// Confirmed transaction count of `account`, used as the next nonce.
    fn transaction_count(
        &self,
        account: &Address,
    ) -> impl Future<Output = Result<u64, LedgerError>> + Send;

    fn gas_price(&self) -> impl Future<Output = Result<u128, LedgerError>> + Send;

    fn send_raw_transaction(
        &self,
        raw: &[u8],
    ) -> impl Future<Output = Result<TxHash, LedgerError>> + Send;

    /// `None` while the transaction is not yet mined (or unknown).
    fn transaction_receipt(
        &self,
        hash: &TxHash,
    ) -> impl Future<Output = Result<Option<Receipt>, LedgerError>> + Send;

    /// Read-only contract call against the latest block.
    fn call(
        &self,
        to: &Address,
        data: &[u8],
    ) -> impl Future<Output = Result<Vec<u8>, LedgerError>> + Send;
}
