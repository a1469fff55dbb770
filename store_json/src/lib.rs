//! JSON file storage backend for the voting kiosk.
//!
//! Implements the `votekiosk-store` traits over plain JSON files so the
//! kiosk, the operator tooling and the registration station can share one
//! data directory. Every rewrite goes to a temporary file in the same
//! directory and is renamed over the original; read-check-write sequences
//! hold an exclusive lock on a sidecar `.lock` file.

pub mod atomic;
pub mod directory;
pub mod journal;
pub mod lock;
pub mod records;
pub mod votes;

pub use directory::{JsonFaceTemplates, JsonVoterDirectory};
pub use journal::JsonJournalStore;
pub use lock::StoreLock;
pub use records::JsonRecordFile;
pub use votes::JsonVoteStore;

/// File name of the commit store inside the votes directory.
pub const COMMIT_FILE: &str = "commit.json";
/// File name of the secret store inside the votes directory.
pub const SECRET_FILE: &str = "secrets.json";
