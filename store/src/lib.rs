//! Abstract storage traits for the voting kiosk.
//!
//! Every backend (JSON files on the kiosk, in-memory for testing) implements
//! these traits. The vote engine and the ledger transactor depend only on
//! the traits.

pub mod directory;
pub mod error;
pub mod journal;
pub mod record;
pub mod validate;
pub mod vote;

pub use directory::{FaceTemplateStore, VoterDirectory};
pub use error::StoreError;
pub use journal::{JournalEntry, JournalEvent, JournalStore, LedgerJournal};
pub use record::{CommitRecord, SecretRecord, StoredRecord};
pub use validate::{parse_record_map, LoadReport, QuarantinedEntry, Strictness};
pub use vote::{CommitStore, SecretStore};
