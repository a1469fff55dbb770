//! Content identifiers returned by the content-addressed store, and election ids.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypeError;

/// A content identifier (CID) naming an uploaded vote document.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cid(String);

impl Cid {
    pub fn new(raw: impl Into<String>) -> Result<Self, TypeError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TypeError::InvalidCid("empty CID".into()));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(TypeError::InvalidCid(format!("{trimmed:?} contains whitespace")));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Cid {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Cid> for String {
    fn from(cid: Cid) -> Self {
        cid.0
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the election a vote document belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElectionId(String);

impl ElectionId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ElectionId {
    fn default() -> Self {
        Self("ELECTION_2025".to_string())
    }
}

impl fmt::Display for ElectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cid_rejects_empty_and_whitespace() {
        assert!(Cid::new("").is_err());
        assert!(Cid::new("Qm 123").is_err());
        assert_eq!(Cid::new(" Qm123 ").unwrap().as_str(), "Qm123");
    }

    #[test]
    fn cid_deserialization_validates() {
        assert!(serde_json::from_str::<Cid>("\"\"").is_err());
        let cid: Cid = serde_json::from_str("\"Qm123\"").unwrap();
        assert_eq!(cid.to_string(), "Qm123");
    }
}
