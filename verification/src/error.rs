use thiserror::Error;

use crate::SessionState;

#[derive(Debug, Error)]
pub enum VerificationError {
    /// A hardware capability reported a fault (not a mismatch or timeout).
    #[error("device error: {0}")]
    Device(String),

    #[error("operation not valid in state {0:?}")]
    InvalidState(SessionState),

    /// Registration data could not be read.
    #[error("directory error: {0}")]
    Directory(String),
}

impl From<votekiosk_store::StoreError> for VerificationError {
    fn from(e: votekiosk_store::StoreError) -> Self {
        Self::Directory(e.to_string())
    }
}
