//! The vote commitment engine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use votekiosk_content_store::{ContentStore, NodeIdentity};
use votekiosk_crypto::{generate_salt, hash_vote};
use votekiosk_store::{CommitRecord, CommitStore, SecretRecord, SecretStore, StoreError};
use votekiosk_types::{
    CandidateId, CandidateRegistry, Cid, Clock, ElectionId, Salt, Timestamp, VoteHash, VoterId,
};

use crate::{vote_statistics, BallotError, VoteDocument, VoteStatistics};

/// What a successful submission hands back for the voter's receipt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteReceipt {
    pub voter_id: VoterId,
    pub candidate_id: CandidateId,
    pub vote_hash: VoteHash,
    pub salt: Salt,
    pub cid: Cid,
    pub timestamp: Timestamp,
}

/// Commits votes for verified voters.
///
/// `S` holds both the commit and the secret map. Submissions for the same
/// voter are serialized by a per-voter lock held from the already-voted
/// check through the final write; the commit insert itself is also
/// exclusive at the file level, so a second process cannot slip in.
pub struct VoteCommitEngine<S, C> {
    stores: S,
    content: C,
    candidates: CandidateRegistry,
    election_id: ElectionId,
    clock: Arc<dyn Clock>,
    voter_locks: Mutex<HashMap<VoterId, Arc<Mutex<()>>>>,
    halted: AtomicBool,
}

impl<S, C> VoteCommitEngine<S, C>
where
    S: CommitStore + SecretStore,
    C: ContentStore,
{
    pub fn new(
        stores: S,
        content: C,
        candidates: CandidateRegistry,
        election_id: ElectionId,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            stores,
            content,
            candidates,
            election_id,
            clock,
            voter_locks: Mutex::new(HashMap::new()),
            halted: AtomicBool::new(false),
        }
    }

    pub fn candidates(&self) -> &CandidateRegistry {
        &self.candidates
    }

    pub fn stores(&self) -> &S {
        &self.stores
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// Pre-flight gate: is the content store reachable right now?
    pub async fn check_content_store(&self) -> Result<NodeIdentity, BallotError> {
        Ok(self.content.check_liveness().await?)
    }

    /// Whether a commit is already staged for `voter_id`.
    pub fn has_voted(&self, voter_id: &VoterId) -> Result<bool, BallotError> {
        Ok(self.stores.has_commit(voter_id)?)
    }

    /// Cast `candidate_id` for `voter_id`.
    ///
    /// Nothing is persisted unless the evidence upload succeeds. The secret
    /// is written before the commit, so a failure between the two leaves at
    /// most a secret without a commit, which never counts as a vote and is
    /// rolled back where possible.
    pub async fn submit_vote(
        &self,
        voter_id: &VoterId,
        candidate_id: CandidateId,
    ) -> Result<VoteReceipt, BallotError> {
        if !self.candidates.contains(candidate_id) {
            return Err(BallotError::UnknownCandidate(candidate_id));
        }

        let voter_lock = self.voter_lock(voter_id).await;
        let _guard = voter_lock.lock().await;

        self.ensure_storage_available()?;

        let already = self
            .stores
            .has_commit(voter_id)
            .map_err(|e| self.halt(e))?;
        if already {
            tracing::info!(voter_id = %voter_id, "rejected repeat vote");
            return Err(BallotError::AlreadyVoted(voter_id.clone()));
        }

        let salt = generate_salt();
        let vote_hash = hash_vote(candidate_id, &salt);
        let timestamp = self.clock.now();

        let document = VoteDocument {
            voter_id: voter_id.clone(),
            vote_hash,
            salt: salt.expose().to_string(),
            candidate_id,
            timestamp,
            election_id: self.election_id.clone(),
        };
        let bytes = document
            .to_bytes()
            .map_err(|e| BallotError::Serialization(e.to_string()))?;

        let cid = match self.content.upload(&document.file_name(), bytes).await {
            Ok(cid) => cid,
            Err(e) => {
                tracing::warn!(voter_id = %voter_id, error = %e, "evidence upload failed; vote not recorded");
                return Err(BallotError::ContentStoreUnavailable(e));
            }
        };

        let secret = SecretRecord {
            voter_id: voter_id.clone(),
            secret: salt.clone(),
            candidate_id,
            timestamp,
            content_cid: cid.clone(),
        };
        let commit = CommitRecord {
            voter_id: voter_id.clone(),
            vote_hash,
            timestamp,
            candidate_id,
            content_cid: cid.clone(),
        };
        self.persist(&commit, &secret)?;

        tracing::info!(voter_id = %voter_id, vote_hash = %vote_hash, cid = %cid, "vote committed");
        Ok(VoteReceipt {
            voter_id: voter_id.clone(),
            candidate_id,
            vote_hash,
            salt,
            cid,
            timestamp,
        })
    }

    /// Counts over the staged records.
    pub fn statistics(&self) -> Result<VoteStatistics, BallotError> {
        let commits = self.stores.load_commits()?;
        let secrets = self.stores.load_secrets()?;
        Ok(vote_statistics(&commits.records, &secrets.records))
    }

    fn persist(&self, commit: &CommitRecord, secret: &SecretRecord) -> Result<(), BallotError> {
        let voter_id = &commit.voter_id;
        let previous_secret = self
            .stores
            .get_secret(voter_id)
            .map_err(|e| self.halt(e))?;

        self.stores
            .upsert_secret(secret)
            .map_err(|e| self.halt(e))?;

        match self.stores.insert_commit(commit) {
            Ok(()) => Ok(()),
            Err(e) => {
                let rollback = match &previous_secret {
                    Some(prev) => self.stores.upsert_secret(prev),
                    None => self.stores.remove_secret(voter_id).map(|_| ()),
                };
                if let Err(rb) = rollback {
                    tracing::error!(voter_id = %voter_id, error = %rb, "could not roll back secret after failed commit");
                }
                if let StoreError::Duplicate(_) = e {
                    return Err(BallotError::AlreadyVoted(voter_id.clone()));
                }
                Err(self.halt(e))
            }
        }
    }

    /// Clear a previous halt if both stores pass their probe again.
    fn ensure_storage_available(&self) -> Result<(), BallotError> {
        if !self.is_halted() {
            return Ok(());
        }
        let probe = self
            .stores
            .probe_commits()
            .and_then(|_| self.stores.probe_secrets());
        match probe {
            Ok(()) => {
                self.halted.store(false, Ordering::SeqCst);
                tracing::info!("vote storage recovered; resuming commits");
                Ok(())
            }
            Err(e) => Err(BallotError::StorageHalted(e.to_string())),
        }
    }

    fn halt(&self, error: StoreError) -> BallotError {
        if !self.halted.swap(true, Ordering::SeqCst) {
            tracing::error!(error = %error, "vote storage failure; halting further commits");
        }
        BallotError::LocalPersistenceError(error)
    }

    async fn voter_lock(&self, voter_id: &VoterId) -> Arc<Mutex<()>> {
        let mut locks = self.voter_locks.lock().await;
        Arc::clone(locks.entry(voter_id.clone()).or_default())
    }
}
