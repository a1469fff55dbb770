use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentStoreError {
    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("content store unreachable: {0}")]
    Unreachable(String),

    #[error("invalid response from content store: {0}")]
    InvalidResponse(String),
}
