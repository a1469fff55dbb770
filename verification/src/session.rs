//! The verification session state machine.
//!
//! State changes only through the transition methods below. [`run`]
//! drives them from the hardware; the transition methods are also usable on
//! their own, which is how the unit tests exercise them.
//!
//! [`run`]: VerificationSession::run

use std::time::Duration;

use votekiosk_store::{FaceTemplateStore, VoterDirectory};
use votekiosk_types::{CardId, Clock, FaceDescriptor, Timestamp, VoterRecord};

use crate::{
    CancelToken, Factor, FaceMatcher, FailureReason, FingerprintSearch, KioskDevices,
    RetryReason, SessionState, StepOutcome, VerificationError,
};

#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// How long one card poll blocks before the session checks for
    /// cancellation again.
    pub card_poll_timeout: Duration,
    pub fingerprint_timeout: Duration,
    /// Limit on the time from card acceptance to a verdict.
    pub max_session_secs: u64,
    /// Failed fingerprint or face attempts allowed before the session fails.
    pub max_factor_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            card_poll_timeout: Duration::from_millis(500),
            fingerprint_timeout: Duration::from_secs(10),
            max_session_secs: 180,
            max_factor_attempts: 3,
        }
    }
}

/// Read-only collaborators a session consults.
pub struct SessionContext<'a> {
    pub directory: &'a dyn VoterDirectory,
    pub faces: &'a dyn FaceTemplateStore,
    pub matcher: &'a dyn FaceMatcher,
    pub clock: &'a dyn Clock,
}

/// How a completed session ended.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionOutcome {
    Verified(VoterRecord),
    Failed(FailureReason),
}

pub struct VerificationSession {
    state: SessionState,
    voter: Option<VoterRecord>,
    started_at: Timestamp,
    card_accepted_at: Option<Timestamp>,
    attempts: u32,
    config: SessionConfig,
}

impl VerificationSession {
    pub fn new(config: SessionConfig, started_at: Timestamp) -> Self {
        Self {
            state: SessionState::AwaitingCard,
            voter: None,
            started_at,
            card_accepted_at: None,
            attempts: 0,
            config,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The voter bound by the card, once one has been accepted.
    pub fn voter(&self) -> Option<&VoterRecord> {
        self.voter.as_ref()
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Failed attempts at the current factor.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn present_card(
        &mut self,
        card: &CardId,
        directory: &dyn VoterDirectory,
        now: Timestamp,
    ) -> Result<StepOutcome, VerificationError> {
        self.expect(SessionState::AwaitingCard)?;
        match directory.find_by_card(card)? {
            None => {
                tracing::warn!(card = %card, "card is not registered");
                Ok(self.fail(FailureReason::UnregisteredCard))
            }
            Some(voter) => {
                tracing::info!(voter_id = %voter.uid, "card accepted");
                self.voter = Some(voter);
                self.card_accepted_at = Some(now);
                Ok(self.advance(SessionState::AwaitingFingerprint))
            }
        }
    }

    /// Judge a fingerprint search against the bound voter's template.
    ///
    /// A match on any other template is a mismatch.
    pub fn fingerprint_result(
        &mut self,
        search: FingerprintSearch,
    ) -> Result<StepOutcome, VerificationError> {
        self.expect(SessionState::AwaitingFingerprint)?;
        let expected = self.bound_voter()?.fingerprint_template_id;

        let outcome = match search {
            FingerprintSearch::NoFinger => {
                self.retry(Factor::Fingerprint, RetryReason::NoFingerPresented)
            }
            FingerprintSearch::NoMatch => self.retry(
                Factor::Fingerprint,
                RetryReason::FingerprintMismatch { found: None },
            ),
            FingerprintSearch::Found {
                template_id,
                confidence,
            } if template_id == expected => {
                tracing::info!(confidence, "fingerprint matched");
                self.advance(SessionState::AwaitingFace)
            }
            FingerprintSearch::Found { template_id, .. } => {
                tracing::warn!(expected, found = template_id, "fingerprint matched another template");
                self.retry(
                    Factor::Fingerprint,
                    RetryReason::FingerprintMismatch {
                        found: Some(template_id),
                    },
                )
            }
        };
        Ok(outcome)
    }

    /// Judge a captured face descriptor (`None` when no face was in the
    /// frame) against the bound voter's enrolled descriptors.
    pub fn face_result(
        &mut self,
        descriptor: Option<FaceDescriptor>,
        faces: &dyn FaceTemplateStore,
        matcher: &dyn FaceMatcher,
    ) -> Result<StepOutcome, VerificationError> {
        self.expect(SessionState::AwaitingFace)?;
        let key = self.bound_voter()?.face_key().to_string();

        let Some(known) = faces.descriptors_for(&key)? else {
            tracing::warn!(face_key = %key, "no face template on file");
            return Ok(self.fail(FailureReason::NoBiometricRecord));
        };
        let Some(descriptor) = descriptor else {
            return Ok(self.retry(Factor::Face, RetryReason::NoFaceDetected));
        };

        if matcher.matches(&known, &descriptor) {
            self.attempts = 0;
            self.state = SessionState::Verified;
            tracing::info!(voter_id = ?self.voter.as_ref().map(|v| &v.uid), "voter verified");
            Ok(StepOutcome::Verified)
        } else {
            Ok(self.retry(Factor::Face, RetryReason::FaceMismatch))
        }
    }

    /// Abort from any non-terminal state.
    pub fn cancel(&mut self) -> StepOutcome {
        if self.state.is_terminal() {
            return self.terminal_outcome();
        }
        self.fail(FailureReason::Cancelled)
    }

    /// Fail the session if the voter has taken too long since the card was
    /// accepted. Waiting for a card never times out.
    pub fn check_timeout(&mut self, now: Timestamp) -> Option<StepOutcome> {
        if self.state.is_terminal() {
            return None;
        }
        let accepted = self.card_accepted_at?;
        accepted
            .has_expired(self.config.max_session_secs, now)
            .then(|| self.fail(FailureReason::TimedOut))
    }

    /// Drive the session from the hardware until it reaches a terminal state.
    ///
    /// The devices are owned for the duration of the call and released on
    /// return, including on error. `observe` sees every step outcome.
    pub fn run(
        mut self,
        mut devices: KioskDevices,
        ctx: &SessionContext<'_>,
        cancel: &CancelToken,
        mut observe: impl FnMut(&StepOutcome),
    ) -> Result<SessionOutcome, VerificationError> {
        loop {
            match &self.state {
                SessionState::Verified => {
                    let voter = self.voter.take().ok_or(VerificationError::InvalidState(
                        SessionState::Verified,
                    ))?;
                    return Ok(SessionOutcome::Verified(voter));
                }
                SessionState::Failed(reason) => return Ok(SessionOutcome::Failed(reason.clone())),
                _ => {}
            }

            let outcome = if cancel.is_cancelled() {
                self.cancel()
            } else if let Some(timed_out) = self.check_timeout(ctx.clock.now()) {
                timed_out
            } else {
                self.step(&mut devices, ctx, cancel)?
            };

            if let StepOutcome::Retry(factor, reason) = &outcome {
                if reason.counts_as_attempt() {
                    tracing::debug!(%factor, %reason, attempts = self.attempts, "verification retry");
                }
            }
            observe(&outcome);
        }
    }

    fn step(
        &mut self,
        devices: &mut KioskDevices,
        ctx: &SessionContext<'_>,
        cancel: &CancelToken,
    ) -> Result<StepOutcome, VerificationError> {
        match self.state {
            SessionState::AwaitingCard => {
                match devices
                    .card_reader
                    .scan_card(self.config.card_poll_timeout, cancel)?
                {
                    Some(card) => self.present_card(&card, ctx.directory, ctx.clock.now()),
                    None => Ok(self.retry(Factor::Card, RetryReason::NoCardPresented)),
                }
            }
            SessionState::AwaitingFingerprint => {
                let search = devices
                    .fingerprint
                    .search(self.config.fingerprint_timeout, cancel)?;
                self.fingerprint_result(search)
            }
            SessionState::AwaitingFace => {
                let descriptor = devices.camera.capture_descriptor(cancel)?;
                self.face_result(descriptor, ctx.faces, ctx.matcher)
            }
            SessionState::Verified | SessionState::Failed(_) => {
                Err(VerificationError::InvalidState(self.state.clone()))
            }
        }
    }

    fn expect(&self, expected: SessionState) -> Result<(), VerificationError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(VerificationError::InvalidState(self.state.clone()))
        }
    }

    fn bound_voter(&self) -> Result<&VoterRecord, VerificationError> {
        self.voter
            .as_ref()
            .ok_or_else(|| VerificationError::InvalidState(self.state.clone()))
    }

    fn advance(&mut self, next: SessionState) -> StepOutcome {
        self.attempts = 0;
        self.state = next;
        match self.state.pending_factor() {
            Some(factor) => StepOutcome::Advanced(factor),
            None => self.terminal_outcome(),
        }
    }

    fn retry(&mut self, factor: Factor, reason: RetryReason) -> StepOutcome {
        if reason.counts_as_attempt() {
            self.attempts += 1;
            if self.attempts >= self.config.max_factor_attempts {
                return self.fail(FailureReason::AttemptsExhausted(factor));
            }
        }
        StepOutcome::Retry(factor, reason)
    }

    fn fail(&mut self, reason: FailureReason) -> StepOutcome {
        tracing::info!(%reason, "verification failed");
        self.state = SessionState::Failed(reason.clone());
        StepOutcome::Failed(reason)
    }

    fn terminal_outcome(&self) -> StepOutcome {
        match &self.state {
            SessionState::Failed(reason) => StepOutcome::Failed(reason.clone()),
            _ => StepOutcome::Verified,
        }
    }
}
