//! A voter-keyed JSON map persisted in one file.

use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use votekiosk_store::{parse_record_map, LoadReport, StoreError, StoredRecord, Strictness};
use votekiosk_types::VoterId;

use crate::atomic::{probe_writable, read_or_empty, write_atomic};
use crate::StoreLock;

/// One store file holding a map of voter id to `T`.
///
/// Mutations validate the current file under the configured strictness,
/// then edit the raw JSON map so quarantined entries survive a rewrite
/// untouched.
#[derive(Debug, Clone)]
pub struct JsonRecordFile<T> {
    path: PathBuf,
    strictness: Strictness,
    _record: PhantomData<fn() -> T>,
}

impl<T: StoredRecord> JsonRecordFile<T> {
    pub fn new(path: impl Into<PathBuf>, strictness: Strictness) -> Self {
        Self {
            path: path.into(),
            strictness,
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    /// Read and validate the whole file.
    ///
    /// Takes the lock so a reader never interleaves with a writer's
    /// read-modify-write.
    pub fn load(&self) -> Result<LoadReport<T>, StoreError> {
        let _guard = StoreLock::acquire(&self.path)?;
        let text = read_or_empty(&self.path)?;
        parse_record_map(&text, self.strictness)
    }

    pub fn get(&self, voter_id: &VoterId) -> Result<Option<T>, StoreError> {
        Ok(self.load()?.records.remove(voter_id))
    }

    /// Insert `record` unless its key is already present.
    ///
    /// A quarantined entry under the same key still counts as present.
    pub fn insert_new(&self, record: &T) -> Result<(), StoreError> {
        self.modify(|entries| {
            let key = record.voter_id().as_str();
            if entries.contains_key(key) {
                return Err(StoreError::Duplicate(format!("{} for voter {key}", T::KIND)));
            }
            entries.insert(key.to_string(), to_value(record)?);
            Ok(())
        })
    }

    pub fn upsert(&self, record: &T) -> Result<(), StoreError> {
        self.modify(|entries| {
            entries.insert(record.voter_id().as_str().to_string(), to_value(record)?);
            Ok(())
        })
    }

    /// Remove the entry for `voter_id`. Returns whether it existed.
    pub fn remove(&self, voter_id: &VoterId) -> Result<bool, StoreError> {
        let mut removed = false;
        self.modify(|entries| {
            removed = entries.remove(voter_id.as_str()).is_some();
            Ok(())
        })?;
        Ok(removed)
    }

    /// Check that the file is readable under the configured strictness and
    /// that its directory accepts new files.
    pub fn probe(&self) -> Result<(), StoreError> {
        self.load()?;
        probe_writable(&self.path)
    }

    fn modify<F>(&self, edit: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Map<String, Value>) -> Result<(), StoreError>,
    {
        let _guard = StoreLock::acquire(&self.path)?;
        let text = read_or_empty(&self.path)?;
        parse_record_map::<T>(&text, self.strictness)?;

        let mut entries = if text.trim().is_empty() {
            Map::new()
        } else {
            match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    return Err(StoreError::Corruption(format!(
                        "{} store {} is not a JSON object",
                        T::KIND,
                        self.path.display()
                    )))
                }
            }
        };

        edit(&mut entries)?;

        let bytes = serde_json::to_vec_pretty(&Value::Object(entries))
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        write_atomic(&self.path, &bytes)
    }
}

fn to_value<T: StoredRecord>(record: &T) -> Result<Value, StoreError> {
    serde_json::to_value(record).map_err(|e| StoreError::Serialization(e.to_string()))
}
