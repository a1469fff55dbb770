//! Submitting staged votes to the election contract.
//!
//! The transactor runs separately from the kiosk, usually as an operator
//! batch job. It reads the commit and secret stores, encodes contract calls,
//! signs legacy EIP-155 transactions and pushes them through a JSON-RPC
//! node with bounded retries. Confirmed calls are journalled so reruns
//! never resubmit them.

pub mod abi;
pub mod address;
pub mod client;
pub mod error;
pub mod reconcile;
pub mod retry;
pub mod rlp;
pub mod rpc;
pub mod signer;
pub mod transaction;
pub mod transactor;

pub use address::Address;
pub use client::{LedgerClient, Receipt};
pub use error::{LedgerError, RevealError};
pub use reconcile::{audit_records, reconcile, RevealPlan};
pub use retry::{AttemptStatus, RetryPolicy, TransactionAttempt};
pub use rpc::JsonRpcLedger;
pub use signer::LedgerSigner;
pub use transaction::LegacyTransaction;
pub use transactor::{
    BatchReport, CandidateTally, LedgerTransactor, PhaseResult, SkipReason, SubmittedTransaction,
    TransactorConfig,
};
