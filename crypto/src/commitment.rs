//! The vote commitment used by the commit-reveal scheme.
//!
//! `vote_hash = SHA256(candidate_id || ":" || salt)` over the UTF-8 text of
//! the decimal candidate id and the hex salt. The voter id is not part of the
//! preimage; the commitment is bound to a voter by the key it is stored under.

use crate::hash::sha256;
use votekiosk_types::{CandidateId, Salt, VoteHash};

/// Compute the commitment for a candidate choice and salt.
pub fn hash_vote(candidate: CandidateId, salt: &Salt) -> VoteHash {
    let preimage = format!("{}:{}", candidate, salt.expose());
    VoteHash::new(sha256(preimage.as_bytes()))
}

/// Whether `candidate` and `salt` open the commitment `expected`.
pub fn verify_vote(expected: &VoteHash, candidate: CandidateId, salt: &Salt) -> bool {
    hash_vote(candidate, salt) == *expected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn salt() -> Salt {
        Salt::from_hex("abc123abc123abc123abc123abc123ab").unwrap()
    }

    #[test]
    fn matches_text_preimage() {
        let expected = sha256(b"2:abc123abc123abc123abc123abc123ab");
        assert_eq!(hash_vote(CandidateId::new(2), &salt()).as_bytes(), &expected);
    }

    #[test]
    fn altered_candidate_fails() {
        let hash = hash_vote(CandidateId::new(2), &salt());
        assert!(verify_vote(&hash, CandidateId::new(2), &salt()));
        assert!(!verify_vote(&hash, CandidateId::new(1), &salt()));
    }
}
