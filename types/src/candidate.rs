//! Candidates and the in-memory registry loaded at startup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::TypeError;

/// Numeric candidate identifier as shown on the ballot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(u32);

impl CandidateId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CandidateId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|e| TypeError::InvalidCandidate(format!("{s:?}: {e}")))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
}

/// Static set of candidates on the ballot.
#[derive(Clone, Debug, Default)]
pub struct CandidateRegistry {
    candidates: BTreeMap<CandidateId, String>,
}

impl CandidateRegistry {
    pub fn new(candidates: impl IntoIterator<Item = Candidate>) -> Self {
        Self {
            candidates: candidates
                .into_iter()
                .map(|c| (c.id, c.name))
                .collect(),
        }
    }

    pub fn contains(&self, id: CandidateId) -> bool {
        self.candidates.contains_key(&id)
    }

    pub fn name(&self, id: CandidateId) -> Option<&str> {
        self.candidates.get(&id).map(String::as_str)
    }

    /// Candidates in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = Candidate> + '_ {
        self.candidates.iter().map(|(id, name)| Candidate {
            id: *id,
            name: name.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
