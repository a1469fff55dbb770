//! Pairing commits with secrets before anything is revealed.

use std::collections::{BTreeMap, BTreeSet};

use votekiosk_crypto::verify_vote;
use votekiosk_store::{CommitRecord, SecretRecord};
use votekiosk_types::{CandidateId, Salt, VoteHash, VoterId};

use crate::RevealError;

/// Everything `revealVote` needs for one voter, checked against the commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevealPlan {
    pub voter_id: VoterId,
    pub vote_hash: VoteHash,
    pub candidate_id: CandidateId,
    pub secret: Salt,
}

/// Check that a voter's commit and secret both exist and that the secret
/// recomputes the committed hash.
pub fn reconcile(
    voter_id: &VoterId,
    commit: Option<&CommitRecord>,
    secret: Option<&SecretRecord>,
) -> Result<RevealPlan, RevealError> {
    let (commit, secret) = match (commit, secret) {
        (Some(c), Some(s)) => (c, s),
        (None, _) => return Err(RevealError::MissingCommit(voter_id.clone())),
        (Some(_), None) => return Err(RevealError::MissingSecret(voter_id.clone())),
    };

    if !verify_vote(&commit.vote_hash, secret.candidate_id, &secret.secret) {
        return Err(RevealError::HashMismatch(voter_id.clone()));
    }
    if commit.candidate_id != secret.candidate_id {
        return Err(RevealError::Malformed {
            voter: voter_id.clone(),
            reason: format!(
                "commit names candidate {} but secret opens to {}",
                commit.candidate_id, secret.candidate_id
            ),
        });
    }
    if commit.content_cid != secret.content_cid {
        return Err(RevealError::Malformed {
            voter: voter_id.clone(),
            reason: "commit and secret reference different documents".into(),
        });
    }

    Ok(RevealPlan {
        voter_id: voter_id.clone(),
        vote_hash: commit.vote_hash,
        candidate_id: secret.candidate_id,
        secret: secret.secret.clone(),
    })
}

/// Every pairing problem across both stores, in voter order.
pub fn audit_records(
    commits: &BTreeMap<VoterId, CommitRecord>,
    secrets: &BTreeMap<VoterId, SecretRecord>,
) -> Vec<RevealError> {
    let voters: BTreeSet<&VoterId> = commits.keys().chain(secrets.keys()).collect();
    voters
        .into_iter()
        .filter_map(|voter| reconcile(voter, commits.get(voter), secrets.get(voter)).err())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use votekiosk_crypto::hash_vote;
    use votekiosk_types::{Cid, Timestamp};

    fn pair(candidate: u32) -> (VoterId, CommitRecord, SecretRecord) {
        let voter = VoterId::new("V1").unwrap();
        let salt = Salt::from_hex(&"5a".repeat(16)).unwrap();
        let candidate = CandidateId::new(candidate);
        let cid = Cid::new("Qm123").unwrap();
        let commit = CommitRecord {
            voter_id: voter.clone(),
            vote_hash: hash_vote(candidate, &salt),
            timestamp: Timestamp::new(1),
            candidate_id: candidate,
            content_cid: cid.clone(),
        };
        let secret = SecretRecord {
            voter_id: voter.clone(),
            secret: salt,
            candidate_id: candidate,
            timestamp: Timestamp::new(1),
            content_cid: cid,
        };
        (voter, commit, secret)
    }

    #[test]
    fn matching_pair_reconciles() {
        let (voter, commit, secret) = pair(2);
        let plan = reconcile(&voter, Some(&commit), Some(&secret)).unwrap();
        assert_eq!(plan.candidate_id, CandidateId::new(2));
        assert_eq!(plan.vote_hash, commit.vote_hash);
    }

    #[test]
    fn altered_candidate_is_hash_mismatch() {
        let (voter, commit, mut secret) = pair(2);
        secret.candidate_id = CandidateId::new(1);
        let err = reconcile(&voter, Some(&commit), Some(&secret)).unwrap_err();
        assert_eq!(err, RevealError::HashMismatch(voter));
        assert_eq!(err.code(), "E_HASH_MISMATCH");
    }

    #[test]
    fn missing_halves_are_distinct() {
        let (voter, commit, secret) = pair(2);
        assert_eq!(
            reconcile(&voter, None, Some(&secret)).unwrap_err().code(),
            "E_MISSING_COMMIT"
        );
        assert_eq!(
            reconcile(&voter, Some(&commit), None).unwrap_err().code(),
            "E_MISSING_SECRET"
        );
    }

    #[test]
    fn commit_candidate_disagreeing_with_hash_is_malformed() {
        let (voter, mut commit, secret) = pair(2);
        commit.candidate_id = CandidateId::new(1);
        assert_eq!(
            reconcile(&voter, Some(&commit), Some(&secret)).unwrap_err().code(),
            "E_MALFORMED"
        );
    }

    #[test]
    fn audit_lists_each_problem_once() {
        let (voter, commit, _) = pair(2);
        let (_, _, mut orphan) = pair(1);
        let orphan_voter = VoterId::new("V2").unwrap();
        orphan.voter_id = orphan_voter.clone();

        let commits = BTreeMap::from([(voter.clone(), commit)]);
        let secrets = BTreeMap::from([(orphan_voter.clone(), orphan)]);
        let problems = audit_records(&commits, &secrets);
        assert_eq!(
            problems,
            vec![
                RevealError::MissingSecret(voter),
                RevealError::MissingCommit(orphan_voter)
            ]
        );
    }
}
