use std::path::{Path, PathBuf};

use votekiosk_store::{JournalEntry, JournalEvent, JournalStore, LedgerJournal, StoreError};

use crate::atomic::{read_or_empty, write_atomic};
use crate::StoreLock;

/// The ledger journal as one JSON document.
#[derive(Debug, Clone)]
pub struct JsonJournalStore {
    path: PathBuf,
}

impl JsonJournalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<LedgerJournal, StoreError> {
        let text = read_or_empty(&self.path)?;
        if text.trim().is_empty() {
            return Ok(LedgerJournal::default());
        }
        serde_json::from_str(&text)
            .map_err(|e| StoreError::Corruption(format!("ledger journal {}: {e}", self.path.display())))
    }
}

impl JournalStore for JsonJournalStore {
    fn load_journal(&self) -> Result<LedgerJournal, StoreError> {
        let _guard = StoreLock::acquire(&self.path)?;
        self.read()
    }

    fn record(&self, event: JournalEvent, entry: JournalEntry) -> Result<(), StoreError> {
        let _guard = StoreLock::acquire(&self.path)?;
        let mut journal = self.read()?;
        journal.apply(event, entry);
        let bytes = serde_json::to_vec_pretty(&journal)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        write_atomic(&self.path, &bytes)
    }
}
