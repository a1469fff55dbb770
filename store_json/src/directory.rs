//! Readers for the files written by the registration station.
//!
//! Both files are re-read on every lookup; registration may enrol voters
//! while the kiosk is running.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use votekiosk_store::{FaceTemplateStore, StoreError, VoterDirectory};
use votekiosk_types::{CardId, FaceDescriptor, VoterRecord};

use crate::atomic::read_or_empty;

/// `voters.json`: a JSON array of voter records.
#[derive(Debug, Clone)]
pub struct JsonVoterDirectory {
    path: PathBuf,
}

impl JsonVoterDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<VoterRecord>, StoreError> {
        let text = read_or_empty(&self.path)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|e| {
            StoreError::Corruption(format!("voter directory {}: {e}", self.path.display()))
        })
    }
}

impl VoterDirectory for JsonVoterDirectory {
    fn find_by_card(&self, card: &CardId) -> Result<Option<VoterRecord>, StoreError> {
        Ok(self
            .read_all()?
            .into_iter()
            .find(|v| v.uid.as_str() == card.as_str()))
    }

    fn voter_count(&self) -> Result<usize, StoreError> {
        self.read_all().map(|v| v.len())
    }
}

#[derive(Deserialize)]
struct FaceEntry {
    #[serde(default)]
    encodings: Vec<FaceDescriptor>,
}

/// `face_encodings.json`: `{ "<key>": { "encodings": [[f64; 128], ...] } }`.
#[derive(Debug, Clone)]
pub struct JsonFaceTemplates {
    path: PathBuf,
}

impl JsonFaceTemplates {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FaceTemplateStore for JsonFaceTemplates {
    fn descriptors_for(&self, key: &str) -> Result<Option<Vec<FaceDescriptor>>, StoreError> {
        let text = read_or_empty(&self.path)?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        let mut db: BTreeMap<String, FaceEntry> = serde_json::from_str(&text).map_err(|e| {
            StoreError::Corruption(format!("face database {}: {e}", self.path.display()))
        })?;
        Ok(db
            .remove(key)
            .map(|entry| entry.encodings)
            .filter(|encodings| !encodings.is_empty()))
    }
}
