//! Parse and validation errors for the shared value types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("invalid vote hash: {0}")]
    InvalidHash(String),

    #[error("invalid salt: {0}")]
    InvalidSalt(String),

    #[error("invalid content identifier: {0}")]
    InvalidCid(String),

    #[error("invalid voter id: {0}")]
    InvalidVoterId(String),

    #[error("invalid candidate id: {0}")]
    InvalidCandidate(String),
}
