use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),

    /// The backing file could not be read, written or replaced.
    #[error("storage I/O error: {0}")]
    Io(String),

    #[error("could not acquire store lock: {0}")]
    Lock(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// A single entry failed schema validation.
    #[error("malformed record {key:?}: {reason}")]
    Malformed { key: String, reason: String },

    /// The file as a whole is unusable (not a JSON object, truncated).
    #[error("store is corrupted: {0}")]
    Corruption(String),
}

impl StoreError {
    /// Whether this error means local durable storage can no longer be
    /// trusted for writes.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Lock(_))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
