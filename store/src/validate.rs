//! Load-time schema validation of voter-keyed record maps.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use votekiosk_types::VoterId;

use crate::{StoreError, StoredRecord};

/// What to do with an entry that fails validation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Any malformed entry fails the whole load.
    #[default]
    Strict,
    /// Malformed entries are excluded and reported.
    Quarantine,
}

impl FromStr for Strictness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "quarantine" => Ok(Self::Quarantine),
            other => Err(format!("unknown strictness {other:?}")),
        }
    }
}

impl fmt::Display for Strictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Quarantine => f.write_str("quarantine"),
        }
    }
}

/// An entry excluded from a load under [`Strictness::Quarantine`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuarantinedEntry {
    pub key: String,
    pub reason: String,
}

/// The valid records of a store plus whatever was quarantined.
#[derive(Clone, Debug)]
pub struct LoadReport<T> {
    pub records: BTreeMap<VoterId, T>,
    pub quarantined: Vec<QuarantinedEntry>,
}

impl<T> Default for LoadReport<T> {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
            quarantined: Vec::new(),
        }
    }
}

impl<T> LoadReport<T> {
    pub fn is_clean(&self) -> bool {
        self.quarantined.is_empty()
    }
}

/// Parse the text of a voter-keyed JSON map into typed records.
///
/// Blank text is an empty store. A top-level value that is not an object is
/// corruption regardless of strictness. Each entry must deserialize and its
/// embedded voter id, if any, must equal the map key.
pub fn parse_record_map<T: StoredRecord>(
    text: &str,
    strictness: Strictness,
) -> Result<LoadReport<T>, StoreError> {
    let mut report = LoadReport::default();
    if text.trim().is_empty() {
        return Ok(report);
    }

    let root: Value = serde_json::from_str(text)
        .map_err(|e| StoreError::Corruption(format!("{} store: {e}", T::KIND)))?;
    let Value::Object(entries) = root else {
        return Err(StoreError::Corruption(format!(
            "{} store: top level is not a JSON object",
            T::KIND
        )));
    };

    for (key, value) in entries {
        match parse_entry::<T>(&key, value) {
            Ok((voter_id, record)) => {
                report.records.insert(voter_id, record);
            }
            Err(reason) => match strictness {
                Strictness::Strict => return Err(StoreError::Malformed { key, reason }),
                Strictness::Quarantine => {
                    tracing::warn!(kind = T::KIND, key = %key, %reason, "quarantined malformed record");
                    report.quarantined.push(QuarantinedEntry { key, reason });
                }
            },
        }
    }

    Ok(report)
}

fn parse_entry<T: StoredRecord>(key: &str, value: Value) -> Result<(VoterId, T), String> {
    let voter_id = VoterId::new(key).map_err(|e| e.to_string())?;
    let Value::Object(mut fields) = value else {
        return Err("entry is not a JSON object".into());
    };
    fields
        .entry("voter_id")
        .or_insert_with(|| Value::String(voter_id.as_str().to_string()));

    let record: T = serde_json::from_value(Value::Object(fields)).map_err(|e| e.to_string())?;
    if record.voter_id() != &voter_id {
        return Err(format!(
            "embedded voter id {} does not match key",
            record.voter_id()
        ));
    }
    Ok((voter_id, record))
}
