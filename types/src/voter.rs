//! Voter identity: card identifiers, registered voter records and face descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypeError;

/// The UID read from a voter's RFID card.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The identity a vote is recorded under.
///
/// A voter is identified by the UID of the card issued at registration, so a
/// `VoterId` is the registered card UID. It keys both local vote stores and
/// the ledger's `commitVoteFor` call.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VoterId(String);

impl VoterId {
    pub fn new(raw: impl Into<String>) -> Result<Self, TypeError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TypeError::InvalidVoterId("empty voter id".into()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for VoterId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VoterId> for String {
    fn from(id: VoterId) -> Self {
        id.0
    }
}

impl fmt::Display for VoterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered voter, as written by the registration station.
///
/// Read-only to the kiosk. Field names follow the registration file format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoterRecord {
    /// Card UID; unique across the directory.
    pub uid: VoterId,
    pub name: String,
    /// Slot of the enrolled template in the fingerprint sensor's library.
    #[serde(rename = "fingerprint_id")]
    pub fingerprint_template_id: u32,
    /// Key of the voter's entry in the face template database. Registration
    /// keys templates by name, so this falls back to `name` when absent.
    #[serde(default, rename = "face_template")]
    pub face_template_ref: Option<String>,
    #[serde(default)]
    pub has_voted: bool,
    #[serde(default, rename = "registration_date")]
    pub registered_at: Option<String>,
}

impl VoterRecord {
    /// The key under which this voter's face template is stored.
    pub fn face_key(&self) -> &str {
        self.face_template_ref.as_deref().unwrap_or(&self.name)
    }
}

/// A face embedding produced by the external recognition capability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceDescriptor(Vec<f64>);

impl FaceDescriptor {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Euclidean distance to another descriptor, or `None` when the
    /// dimensions differ.
    pub fn distance(&self, other: &FaceDescriptor) -> Option<f64> {
        if self.0.len() != other.0.len() {
            return None;
        }
        let sum: f64 = self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        Some(sum.sqrt())
    }
}
