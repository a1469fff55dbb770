//! Whole sessions driven through scripted devices.

use std::sync::Arc;
use std::time::Duration;

use votekiosk_nullables::{
    NullCamera, NullCardReader, NullClock, NullFaceTemplates, NullFingerprintSensor,
    NullVoterDirectory, ReleaseLog,
};
use votekiosk_types::{CardId, Clock, FaceDescriptor};
use votekiosk_verification::{
    CancelToken, EuclideanFaceMatcher, Factor, FailureReason, FingerprintSearch,
    FingerprintSensor, KioskDevices, SessionConfig, SessionContext, SessionOutcome, StepOutcome,
    VerificationError, VerificationSession,
};

const CARD: &str = "46OCMOC7";

struct Fixture {
    directory: NullVoterDirectory,
    faces: NullFaceTemplates,
    matcher: EuclideanFaceMatcher,
    clock: Arc<NullClock>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            directory: NullVoterDirectory::new([NullVoterDirectory::voter(CARD, "Ada", 3)]),
            faces: NullFaceTemplates::new().with("Ada", vec![enrolled()]),
            matcher: EuclideanFaceMatcher::default(),
            clock: Arc::new(NullClock::new(1_700_000_000)),
        }
    }

    fn ctx(&self) -> SessionContext<'_> {
        SessionContext {
            directory: &self.directory,
            faces: &self.faces,
            matcher: &self.matcher,
            clock: self.clock.as_ref(),
        }
    }

    fn run(
        &self,
        devices: KioskDevices,
        cancel: &CancelToken,
    ) -> (Result<SessionOutcome, VerificationError>, Vec<StepOutcome>) {
        let session = VerificationSession::new(SessionConfig::default(), self.clock.now());
        let mut steps = Vec::new();
        let result = session.run(devices, &self.ctx(), cancel, |s| steps.push(s.clone()));
        (result, steps)
    }
}

fn enrolled() -> FaceDescriptor {
    FaceDescriptor::new(vec![0.1, 0.2, 0.3, 0.4])
}

fn same_face() -> FaceDescriptor {
    FaceDescriptor::new(vec![0.12, 0.21, 0.28, 0.41])
}

fn other_face() -> FaceDescriptor {
    FaceDescriptor::new(vec![0.9, -0.7, 0.8, -0.6])
}

#[test]
fn three_factors_verify_the_voter_and_release_devices() {
    let fixture = Fixture::new();
    let log = ReleaseLog::new();
    let devices = KioskDevices::new(
        NullCardReader::new([None, Some(CardId::new(CARD))]).releasing_into(&log),
        NullFingerprintSensor::matching(3).releasing_into(&log),
        NullCamera::new([None, Some(same_face())]).releasing_into(&log),
    );

    let (result, steps) = fixture.run(devices, &CancelToken::new());

    match result.unwrap() {
        SessionOutcome::Verified(voter) => assert_eq!(voter.uid.as_str(), CARD),
        other => panic!("expected verification, got {other:?}"),
    }
    assert!(steps.contains(&StepOutcome::Advanced(Factor::Fingerprint)));
    assert!(steps.contains(&StepOutcome::Advanced(Factor::Face)));
    assert_eq!(steps.last(), Some(&StepOutcome::Verified));
    assert_eq!(log.released(), vec!["card_reader", "fingerprint", "camera"]);
}

#[test]
fn unregistered_card_fails_immediately() {
    let fixture = Fixture::new();
    let log = ReleaseLog::new();
    let devices = KioskDevices::new(
        NullCardReader::presenting("DEADBEEF").releasing_into(&log),
        NullFingerprintSensor::default(),
        NullCamera::default(),
    );

    let (result, _) = fixture.run(devices, &CancelToken::new());

    assert_eq!(
        result.unwrap(),
        SessionOutcome::Failed(FailureReason::UnregisteredCard)
    );
    assert_eq!(log.released().len(), 1);
}

#[test]
fn another_voters_finger_exhausts_attempts() {
    let fixture = Fixture::new();
    let wrong = FingerprintSearch::Found {
        template_id: 9,
        confidence: 200,
    };
    let devices = KioskDevices::new(
        NullCardReader::presenting(CARD),
        NullFingerprintSensor::new([wrong.clone(), FingerprintSearch::NoMatch, wrong]),
        NullCamera::default(),
    );

    let (result, _) = fixture.run(devices, &CancelToken::new());

    assert_eq!(
        result.unwrap(),
        SessionOutcome::Failed(FailureReason::AttemptsExhausted(Factor::Fingerprint))
    );
}

#[test]
fn face_mismatch_exhausts_attempts() {
    let fixture = Fixture::new();
    let devices = KioskDevices::new(
        NullCardReader::presenting(CARD),
        NullFingerprintSensor::matching(3),
        NullCamera::new([Some(other_face()), Some(other_face()), Some(other_face())]),
    );

    let (result, _) = fixture.run(devices, &CancelToken::new());

    assert_eq!(
        result.unwrap(),
        SessionOutcome::Failed(FailureReason::AttemptsExhausted(Factor::Face))
    );
}

#[test]
fn missing_face_template_is_a_distinct_failure() {
    let mut fixture = Fixture::new();
    fixture.faces = NullFaceTemplates::new();
    let devices = KioskDevices::new(
        NullCardReader::presenting(CARD),
        NullFingerprintSensor::matching(3),
        NullCamera::showing(same_face()),
    );

    let (result, _) = fixture.run(devices, &CancelToken::new());

    assert_eq!(
        result.unwrap(),
        SessionOutcome::Failed(FailureReason::NoBiometricRecord)
    );
}

#[test]
fn cancellation_while_waiting_for_card_releases_devices() {
    let fixture = Fixture::new();
    let cancel = CancelToken::new();
    let log = ReleaseLog::new();
    let devices = KioskDevices::new(
        NullCardReader::new([None, None])
            .cancel_when_empty(&cancel)
            .releasing_into(&log),
        NullFingerprintSensor::default().releasing_into(&log),
        NullCamera::default().releasing_into(&log),
    );

    let (result, steps) = fixture.run(devices, &cancel);

    assert_eq!(result.unwrap(), SessionOutcome::Failed(FailureReason::Cancelled));
    assert_eq!(steps.last(), Some(&StepOutcome::Failed(FailureReason::Cancelled)));
    assert_eq!(log.released().len(), 3);
}

/// A sensor that never sees a finger while the voter dawdles.
struct IdleSensor {
    clock: Arc<NullClock>,
}

impl FingerprintSensor for IdleSensor {
    fn search(
        &mut self,
        _timeout: Duration,
        _cancel: &CancelToken,
    ) -> Result<FingerprintSearch, VerificationError> {
        self.clock.advance(200);
        Ok(FingerprintSearch::NoFinger)
    }
}

#[test]
fn session_times_out_after_card_acceptance() {
    let fixture = Fixture::new();
    let devices = KioskDevices::new(
        NullCardReader::presenting(CARD),
        IdleSensor {
            clock: fixture.clock.clone(),
        },
        NullCamera::default(),
    );

    let (result, _) = fixture.run(devices, &CancelToken::new());

    assert_eq!(result.unwrap(), SessionOutcome::Failed(FailureReason::TimedOut));
}

#[test]
fn device_fault_aborts_the_session() {
    let fixture = Fixture::new();
    let log = ReleaseLog::new();
    let devices = KioskDevices::new(
        NullCardReader::default()
            .faulty("serial port closed")
            .releasing_into(&log),
        NullFingerprintSensor::default(),
        NullCamera::default(),
    );

    let (result, _) = fixture.run(devices, &CancelToken::new());

    assert!(matches!(result, Err(VerificationError::Device(_))));
    assert_eq!(log.released(), vec!["card_reader"]);
}
