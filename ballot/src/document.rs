use serde::{Deserialize, Serialize};
use votekiosk_types::{CandidateId, ElectionId, Timestamp, VoteHash, VoterId};

/// The evidence document uploaded to the content store for every vote.
///
/// It is immutable once uploaded; its CID is referenced by both the commit
/// and the secret record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteDocument {
    pub voter_id: VoterId,
    pub vote_hash: VoteHash,
    pub salt: String,
    pub candidate_id: CandidateId,
    pub timestamp: Timestamp,
    pub election_id: ElectionId,
}

impl VoteDocument {
    pub fn file_name(&self) -> String {
        format!("vote_{}_{}.json", self.voter_id, self.timestamp.as_secs())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}
