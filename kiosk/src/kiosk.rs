//! One kiosk: gate on the content store, verify a voter, take their vote.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use votekiosk_ballot::{BallotError, VoteCommitEngine, VoteReceipt};
use votekiosk_content_store::{ContentStore, IpfsClient, NodeIdentity};
use votekiosk_store::{CommitStore, FaceTemplateStore, SecretStore, VoterDirectory};
use votekiosk_store_json::{JsonFaceTemplates, JsonVoteStore, JsonVoterDirectory};
use votekiosk_types::{CandidateId, CandidateRegistry, Clock, VoterId, VoterRecord};
use votekiosk_verification::{
    CancelToken, DeviceProvider, FaceMatcher, SessionConfig, SessionContext, SessionOutcome,
    StepOutcome, VerificationSession,
};

use crate::metrics::{
    KioskMetrics, PREFLIGHT_FAILURES, REPEAT_VOTES, SESSIONS_STARTED, VERIFICATION_FAILURES,
    VOTERS_VERIFIED, VOTES_CAST, VOTE_FAILURES,
};
use crate::{KioskConfig, KioskError, ShutdownController};

/// Wait before probing the content store again after a failed pre-flight.
const PREFLIGHT_RETRY: Duration = Duration::from_secs(5);

/// Read-only collaborators and devices a kiosk verifies voters with.
#[derive(Clone)]
pub struct VerificationParts {
    pub directory: Arc<dyn VoterDirectory>,
    pub faces: Arc<dyn FaceTemplateStore>,
    pub matcher: Arc<dyn FaceMatcher>,
    pub devices: Arc<dyn DeviceProvider>,
    pub clock: Arc<dyn Clock>,
    pub session: SessionConfig,
}

/// How one voter's visit ended.
#[derive(Clone, Debug, PartialEq)]
pub enum VisitOutcome {
    Voted(VoteReceipt),
    AlreadyVoted(VoterId),
    NotVerified(votekiosk_verification::FailureReason),
    /// Verified, but left without choosing a candidate.
    Abandoned(VoterId),
}

pub struct Kiosk<S, C> {
    engine: VoteCommitEngine<S, C>,
    parts: VerificationParts,
    busy: Mutex<()>,
    metrics: KioskMetrics,
}

impl Kiosk<JsonVoteStore, IpfsClient> {
    /// Assemble a kiosk on the JSON stores and IPFS node named in `config`.
    pub fn from_config(
        config: &KioskConfig,
        devices: Arc<dyn DeviceProvider>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, KioskError> {
        let candidates = config.candidate_registry();
        if candidates.is_empty() {
            return Err(KioskError::Config("no candidates configured".into()));
        }
        let directory = JsonVoterDirectory::new(&config.voters_file);
        let registered = directory.voter_count()?;
        tracing::info!(
            registered,
            candidates = candidates.len(),
            election = %config.election_id,
            "kiosk data loaded"
        );

        let engine = VoteCommitEngine::new(
            JsonVoteStore::open(&config.votes_dir, config.strictness),
            config.ipfs_client(),
            candidates,
            config.election_id.clone(),
            Arc::clone(&clock),
        );
        let parts = VerificationParts {
            directory: Arc::new(directory),
            faces: Arc::new(JsonFaceTemplates::new(&config.face_db_file)),
            matcher: Arc::new(config.face_matcher()),
            devices,
            clock,
            session: config.session_config(),
        };
        Ok(Self::new(engine, parts))
    }
}

impl<S, C> Kiosk<S, C>
where
    S: CommitStore + SecretStore,
    C: ContentStore,
{
    pub fn new(engine: VoteCommitEngine<S, C>, parts: VerificationParts) -> Self {
        Self {
            engine,
            parts,
            busy: Mutex::new(()),
            metrics: KioskMetrics::new(),
        }
    }

    pub fn engine(&self) -> &VoteCommitEngine<S, C> {
        &self.engine
    }

    pub fn metrics(&self) -> &KioskMetrics {
        &self.metrics
    }

    /// Refuse to start a session while the content store is down, so a
    /// voter is turned away before the biometric steps rather than after.
    pub async fn preflight(&self) -> Result<NodeIdentity, KioskError> {
        match self.engine.check_content_store().await {
            Ok(identity) => {
                tracing::debug!(node = %identity.node_id, version = ?identity.version, "content store reachable");
                Ok(identity)
            }
            Err(e) => {
                self.metrics.record(PREFLIGHT_FAILURES);
                tracing::warn!(error = %e, "pre-flight failed; not accepting voters");
                Err(e.into())
            }
        }
    }

    /// Run one verification session on a blocking worker.
    ///
    /// Devices are opened for this session only and released when it ends,
    /// whatever the outcome.
    pub async fn verify_voter(&self, cancel: &CancelToken) -> Result<SessionOutcome, KioskError> {
        self.metrics.record(SESSIONS_STARTED);
        let parts = self.parts.clone();
        let cancel = cancel.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            let devices = parts.devices.open()?;
            let ctx = SessionContext {
                directory: parts.directory.as_ref(),
                faces: parts.faces.as_ref(),
                matcher: parts.matcher.as_ref(),
                clock: parts.clock.as_ref(),
            };
            let session = VerificationSession::new(parts.session.clone(), parts.clock.now());
            session.run(devices, &ctx, &cancel, |step| {
                if let StepOutcome::Retry(factor, reason) = step {
                    tracing::info!(%factor, %reason, "please try again");
                }
            })
        })
        .await
        .map_err(|e| KioskError::Worker(e.to_string()))??;

        match &outcome {
            SessionOutcome::Verified(_) => self.metrics.record(VOTERS_VERIFIED),
            SessionOutcome::Failed(reason) => {
                self.metrics.record(VERIFICATION_FAILURES);
                tracing::info!(%reason, "verification failed");
            }
        }
        Ok(outcome)
    }

    /// Commit a verified voter's choice.
    pub async fn cast_vote(
        &self,
        voter: &VoterRecord,
        candidate_id: CandidateId,
    ) -> Result<VoteReceipt, KioskError> {
        match self.engine.submit_vote(&voter.uid, candidate_id).await {
            Ok(receipt) => {
                self.metrics.record(VOTES_CAST);
                Ok(receipt)
            }
            Err(e) => {
                if matches!(e, BallotError::AlreadyVoted(_)) {
                    self.metrics.record(REPEAT_VOTES);
                } else {
                    self.metrics.record(VOTE_FAILURES);
                }
                Err(e.into())
            }
        }
    }

    /// Take one voter from card to committed vote.
    ///
    /// `choose` is shown the verified voter and the ballot and returns the
    /// chosen candidate, or `None` if the voter walked away. Only one visit
    /// runs at a time.
    pub async fn serve_voter<F>(
        &self,
        cancel: &CancelToken,
        choose: F,
    ) -> Result<VisitOutcome, KioskError>
    where
        F: FnOnce(&VoterRecord, &CandidateRegistry) -> Option<CandidateId>,
    {
        let _visit = self.busy.try_lock().map_err(|_| KioskError::Busy)?;

        self.preflight().await?;

        let voter = match self.verify_voter(cancel).await? {
            SessionOutcome::Verified(voter) => voter,
            SessionOutcome::Failed(reason) => return Ok(VisitOutcome::NotVerified(reason)),
        };

        if self.engine.has_voted(&voter.uid)? {
            self.metrics.record(REPEAT_VOTES);
            tracing::info!(voter_id = %voter.uid, "verified voter has already voted");
            return Ok(VisitOutcome::AlreadyVoted(voter.uid));
        }

        let Some(candidate_id) = choose(&voter, self.engine.candidates()) else {
            tracing::info!(voter_id = %voter.uid, "voter left without choosing");
            return Ok(VisitOutcome::Abandoned(voter.uid));
        };

        match self.cast_vote(&voter, candidate_id).await {
            Ok(receipt) => Ok(VisitOutcome::Voted(receipt)),
            Err(KioskError::Ballot(BallotError::AlreadyVoted(voter_id))) => {
                Ok(VisitOutcome::AlreadyVoted(voter_id))
            }
            Err(e) => Err(e),
        }
    }

    /// Serve voters one after another until shutdown.
    ///
    /// Errors from a single visit are logged and the kiosk moves on to the
    /// next voter. A failed pre-flight pauses the loop before probing again.
    pub async fn run<F>(&self, shutdown: &ShutdownController, mut choose: F)
    where
        F: FnMut(&VoterRecord, &CandidateRegistry) -> Option<CandidateId>,
    {
        let cancel = shutdown.cancel_token();
        let mut stop = shutdown.subscribe();

        while !shutdown.is_shutting_down() {
            match self.serve_voter(&cancel, &mut choose).await {
                Ok(VisitOutcome::Voted(receipt)) => {
                    tracing::info!(voter_id = %receipt.voter_id, cid = %receipt.cid, "visit complete");
                }
                Ok(outcome) => tracing::debug!(?outcome, "visit ended without a vote"),
                Err(e @ KioskError::Ballot(BallotError::ContentStoreUnavailable(_))) => {
                    tracing::warn!(error = %e, "waiting for content store");
                    tokio::select! {
                        _ = tokio::time::sleep(PREFLIGHT_RETRY) => {}
                        _ = stop.recv() => break,
                    }
                }
                Err(e) => tracing::error!(error = %e, "visit failed"),
            }
        }

        for (name, value) in self.metrics.summary() {
            tracing::info!(counter = name, value, "kiosk stopped");
        }
    }
}
