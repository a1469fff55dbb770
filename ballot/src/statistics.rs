//! Local vote counts over the staged commit and secret records.

use serde::Serialize;
use std::collections::BTreeMap;

use votekiosk_crypto::verify_vote;
use votekiosk_store::{CommitRecord, SecretRecord};
use votekiosk_types::{CandidateId, VoterId};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VoteStatistics {
    /// Number of commit records.
    pub total_votes: u64,
    /// Secret records per candidate, for voters that also have a commit.
    pub candidate_votes: BTreeMap<CandidateId, u64>,
    /// Commits whose secret opens the stored hash.
    pub verified_votes: u64,
}

pub fn vote_statistics(
    commits: &BTreeMap<VoterId, CommitRecord>,
    secrets: &BTreeMap<VoterId, SecretRecord>,
) -> VoteStatistics {
    let mut stats = VoteStatistics {
        total_votes: commits.len() as u64,
        ..Default::default()
    };

    for secret in secrets
        .iter()
        .filter(|(voter, _)| commits.contains_key(*voter))
        .map(|(_, secret)| secret)
    {
        *stats.candidate_votes.entry(secret.candidate_id).or_default() += 1;
    }

    stats.verified_votes = commits
        .iter()
        .filter(|(voter, commit)| {
            secrets
                .get(*voter)
                .is_some_and(|s| verify_vote(&commit.vote_hash, s.candidate_id, &s.secret))
        })
        .count() as u64;

    stats
}
