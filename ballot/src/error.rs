use thiserror::Error;
use votekiosk_content_store::ContentStoreError;
use votekiosk_store::StoreError;
use votekiosk_types::{CandidateId, VoterId};

#[derive(Debug, Error)]
pub enum BallotError {
    #[error("unknown candidate {0}")]
    UnknownCandidate(CandidateId),

    #[error("voter {0} has already voted")]
    AlreadyVoted(VoterId),

    /// The evidence upload failed; nothing was persisted.
    #[error("content store unavailable: {0}")]
    ContentStoreUnavailable(#[from] ContentStoreError),

    #[error("local persistence failed: {0}")]
    LocalPersistenceError(#[from] StoreError),

    /// An earlier persistence failure halted commits and the stores are
    /// still failing their probe.
    #[error("vote storage halted: {0}")]
    StorageHalted(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

