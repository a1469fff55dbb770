use thiserror::Error;

#[derive(Debug, Error)]
pub enum KioskError {
    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] votekiosk_store::StoreError),

    #[error("content store error: {0}")]
    ContentStore(#[from] votekiosk_content_store::ContentStoreError),

    #[error("verification error: {0}")]
    Verification(#[from] votekiosk_verification::VerificationError),

    #[error(transparent)]
    Ballot(#[from] votekiosk_ballot::BallotError),

    #[error(transparent)]
    Ledger(#[from] votekiosk_ledger::LedgerError),

    /// Another session or vote is already in progress on this kiosk.
    #[error("kiosk is busy with another voter")]
    Busy,

    #[error("session worker failed: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
