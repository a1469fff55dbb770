//! Full voter visits against nullable devices and stores.

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use votekiosk_ballot::{BallotError, VoteCommitEngine};
use votekiosk_kiosk::{
    Kiosk, KioskConfig, KioskError, ShutdownController, VerificationParts, VisitOutcome,
};
use votekiosk_nullables::{
    NullCamera, NullCardReader, NullClock, NullContentStore, NullFaceTemplates,
    NullFingerprintSensor, NullVoteStore, NullVoterDirectory, ReleaseLog,
};
use votekiosk_types::{Candidate, CandidateId, CandidateRegistry, ElectionId, FaceDescriptor};
use votekiosk_verification::{
    CancelToken, DeviceProvider, EuclideanFaceMatcher, FailureReason, KioskDevices,
    SessionConfig, VerificationError,
};

const CARD: &str = "46OCMOC7";

fn face() -> FaceDescriptor {
    FaceDescriptor::new(vec![0.25; 8])
}

fn candidates() -> CandidateRegistry {
    CandidateRegistry::new([
        Candidate {
            id: CandidateId::new(1),
            name: "Goodluck Jonathan".into(),
        },
        Candidate {
            id: CandidateId::new(2),
            name: "Mohammed Buhari".into(),
        },
    ])
}

struct Setup {
    stores: Arc<NullVoteStore>,
    content: NullContentStore,
    opened: Arc<AtomicUsize>,
    released: ReleaseLog,
}

/// Devices that present `card` and the registered voter's finger and face.
fn devices_for(card: &'static str, opened: Arc<AtomicUsize>, log: ReleaseLog) -> Arc<dyn DeviceProvider> {
    Arc::new(move || -> Result<KioskDevices, VerificationError> {
        opened.fetch_add(1, Ordering::SeqCst);
        Ok(KioskDevices::new(
            NullCardReader::presenting(card).releasing_into(&log),
            NullFingerprintSensor::matching(3).releasing_into(&log),
            NullCamera::showing(face()).releasing_into(&log),
        ))
    })
}

fn kiosk_with(
    devices: impl FnOnce(Arc<AtomicUsize>, ReleaseLog) -> Arc<dyn DeviceProvider>,
) -> (Kiosk<Arc<NullVoteStore>, NullContentStore>, Setup) {
    let stores = Arc::new(NullVoteStore::new());
    let content = NullContentStore::new();
    let opened = Arc::new(AtomicUsize::new(0));
    let released = ReleaseLog::new();
    let clock = Arc::new(NullClock::default());

    let engine = VoteCommitEngine::new(
        stores.clone(),
        content.clone(),
        candidates(),
        ElectionId::default(),
        clock.clone(),
    );
    let parts = VerificationParts {
        directory: Arc::new(NullVoterDirectory::new([NullVoterDirectory::voter(
            CARD, "Ada", 3,
        )])),
        faces: Arc::new(NullFaceTemplates::new().with("Ada", vec![face()])),
        matcher: Arc::new(EuclideanFaceMatcher::default()),
        devices: devices(opened.clone(), released.clone()),
        clock,
        session: SessionConfig::default(),
    };
    (
        Kiosk::new(engine, parts),
        Setup {
            stores,
            content,
            opened,
            released,
        },
    )
}

fn kiosk() -> (Kiosk<Arc<NullVoteStore>, NullContentStore>, Setup) {
    kiosk_with(|opened, log| devices_for(CARD, opened, log))
}

#[tokio::test]
async fn verified_voter_casts_a_vote() {
    let (kiosk, setup) = kiosk();

    let outcome = kiosk
        .serve_voter(&CancelToken::new(), |voter, ballot| {
            assert_eq!(voter.name, "Ada");
            assert_eq!(ballot.len(), 2);
            Some(CandidateId::new(2))
        })
        .await
        .unwrap();

    let VisitOutcome::Voted(receipt) = outcome else {
        panic!("expected a vote, got {outcome:?}");
    };
    assert_eq!(receipt.voter_id.as_str(), CARD);
    assert_eq!(setup.stores.commits().len(), 1);
    assert_eq!(setup.content.liveness_calls(), 1);
    assert_eq!(setup.released.released().len(), 3);
    assert_eq!(kiosk.metrics().get("votes_cast"), 1);
    assert_eq!(kiosk.metrics().get("voters_verified"), 1);
}

#[tokio::test]
async fn unreachable_content_store_turns_voter_away_before_devices_open() {
    let (kiosk, setup) = kiosk();
    setup.content.set_unreachable(true);

    let err = kiosk
        .serve_voter(&CancelToken::new(), |_, _| Some(CandidateId::new(1)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        KioskError::Ballot(BallotError::ContentStoreUnavailable(_))
    ));
    assert_eq!(setup.opened.load(Ordering::SeqCst), 0);
    assert_eq!(kiosk.metrics().get("preflight_failures"), 1);
}

#[tokio::test]
async fn returning_voter_is_not_offered_the_ballot() {
    let (kiosk, setup) = kiosk();
    kiosk
        .serve_voter(&CancelToken::new(), |_, _| Some(CandidateId::new(1)))
        .await
        .unwrap();

    let outcome = kiosk
        .serve_voter(&CancelToken::new(), |_, _| {
            panic!("ballot shown to a voter who already voted")
        })
        .await
        .unwrap();

    assert!(matches!(outcome, VisitOutcome::AlreadyVoted(_)));
    assert_eq!(setup.content.upload_calls(), 1);
    assert_eq!(kiosk.metrics().get("repeat_votes"), 1);
}

#[tokio::test]
async fn voter_who_walks_away_leaves_no_record() {
    let (kiosk, setup) = kiosk();

    let outcome = kiosk
        .serve_voter(&CancelToken::new(), |_, _| None)
        .await
        .unwrap();

    assert!(matches!(outcome, VisitOutcome::Abandoned(_)));
    assert!(setup.stores.commits().is_empty());
    assert_eq!(setup.content.upload_calls(), 0);
}

#[tokio::test]
async fn unregistered_card_is_not_verified() {
    let (kiosk, setup) = kiosk_with(|opened, log| devices_for("DEADBEEF", opened, log));

    let outcome = kiosk
        .serve_voter(&CancelToken::new(), |_, _| Some(CandidateId::new(1)))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        VisitOutcome::NotVerified(FailureReason::UnregisteredCard)
    );
    assert_eq!(setup.opened.load(Ordering::SeqCst), 1);
    assert_eq!(kiosk.metrics().get("verification_failures"), 1);
}

#[tokio::test]
async fn device_open_failure_is_reported() {
    let (kiosk, _) = kiosk_with(|_, _| {
        Arc::new(|| -> Result<KioskDevices, VerificationError> {
            Err(VerificationError::Device("camera not found".into()))
        })
    });

    let err = kiosk
        .serve_voter(&CancelToken::new(), |_, _| Some(CandidateId::new(1)))
        .await
        .unwrap_err();

    assert!(matches!(err, KioskError::Verification(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_loop_stops_on_shutdown() {
    let (kiosk, setup) = kiosk_with(|opened, log| {
        Arc::new(move || -> Result<KioskDevices, VerificationError> {
            opened.fetch_add(1, Ordering::SeqCst);
            // Nobody ever presents a card.
            Ok(KioskDevices::new(
                NullCardReader::new([]).releasing_into(&log),
                NullFingerprintSensor::default().releasing_into(&log),
                NullCamera::default().releasing_into(&log),
            ))
        })
    });
    let shutdown = ShutdownController::new();

    tokio::join!(kiosk.run(&shutdown, |_, _| None), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.shutdown();
    });

    assert!(setup.opened.load(Ordering::SeqCst) >= 1);
    assert_eq!(setup.released.released().len() % 3, 0);
    assert!(setup.stores.commits().is_empty());
}

#[test]
fn kiosk_assembles_from_config_files() {
    let dir = tempfile::tempdir().unwrap();
    let voters = dir.path().join("voters.json");
    fs::write(
        &voters,
        r#"[{"uid":"46OCMOC7","name":"Ada","fingerprint_id":3,"has_voted":false}]"#,
    )
    .unwrap();
    let config = KioskConfig {
        votes_dir: dir.path().to_path_buf(),
        voters_file: voters,
        face_db_file: dir.path().join("face_encodings.json"),
        candidates: candidates().iter().collect(),
        ..Default::default()
    };
    let devices: Arc<dyn DeviceProvider> =
        Arc::new(|| -> Result<KioskDevices, VerificationError> {
            Err(VerificationError::Device("not attached".into()))
        });

    let kiosk = Kiosk::from_config(&config, devices.clone(), Arc::new(NullClock::default()));
    assert!(kiosk.is_ok());

    let empty_ballot = KioskConfig {
        candidates: Vec::new(),
        ..config
    };
    assert!(matches!(
        Kiosk::from_config(&empty_ballot, devices, Arc::new(NullClock::default())),
        Err(KioskError::Config(_))
    ));
}
