//! Commit and secret records staged on the kiosk.
//!
//! Both stores are maps keyed by voter id. The key is not repeated inside
//! the persisted entry, so `voter_id` is skipped on serialization and
//! filled from the map key on load (see [`crate::parse_record_map`]).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use votekiosk_types::{CandidateId, Cid, Salt, Timestamp, VoteHash, VoterId};

/// The public half of a vote: the commitment hash and where its evidence
/// document lives. Created once, never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    #[serde(skip_serializing)]
    pub voter_id: VoterId,
    pub vote_hash: VoteHash,
    pub timestamp: Timestamp,
    pub candidate_id: CandidateId,
    #[serde(rename = "ipfs_cid", alias = "content_cid")]
    pub content_cid: Cid,
}

/// The private half of a vote: the salt needed to open the commitment.
///
/// Must not leave the kiosk before the reveal phase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRecord {
    #[serde(skip_serializing)]
    pub voter_id: VoterId,
    pub secret: Salt,
    pub candidate_id: CandidateId,
    pub timestamp: Timestamp,
    #[serde(rename = "ipfs_cid", alias = "content_cid")]
    pub content_cid: Cid,
}

/// A record persisted in a voter-keyed map.
pub trait StoredRecord: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Human name of the store, used in logs and errors.
    const KIND: &'static str;

    fn voter_id(&self) -> &VoterId;
}

impl StoredRecord for CommitRecord {
    const KIND: &'static str = "commit";

    fn voter_id(&self) -> &VoterId {
        &self.voter_id
    }
}

impl StoredRecord for SecretRecord {
    const KIND: &'static str = "secret";

    fn voter_id(&self) -> &VoterId {
        &self.voter_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_record_omits_voter_id_on_disk() {
        let record = CommitRecord {
            voter_id: VoterId::new("V1").unwrap(),
            vote_hash: VoteHash::new([1; 32]),
            timestamp: Timestamp::new(1_700_000_000),
            candidate_id: CandidateId::new(2),
            content_cid: Cid::new("Qm123").unwrap(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("voter_id").is_none());
        assert_eq!(json["ipfs_cid"], "Qm123");
        assert_eq!(json["candidate_id"], 2);
    }
}
