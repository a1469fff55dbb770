//! The transactor against a null ledger node, with paused tokio time.

use std::sync::Arc;
use std::time::Duration;

use votekiosk_crypto::{generate_salt, hash_vote};
use votekiosk_ledger::abi::{self, Token};
use votekiosk_ledger::{
    Address, AttemptStatus, LedgerError, LedgerSigner, LedgerTransactor, PhaseResult, RetryPolicy,
    RevealError, SkipReason, TransactorConfig,
};
use votekiosk_nullables::{NullClock, NullJournalStore, NullLedger, NullVoteStore};
use votekiosk_store::{
    CommitRecord, JournalEntry, JournalEvent, JournalStore, SecretRecord,
};
use votekiosk_types::{CandidateId, Cid, Timestamp, TxHash, VoterId};

type Transactor = LedgerTransactor<NullLedger, Arc<NullVoteStore>, Arc<NullJournalStore>>;

struct Harness {
    ledger: NullLedger,
    stores: Arc<NullVoteStore>,
    journal: Arc<NullJournalStore>,
    transactor: Transactor,
}

fn config() -> TransactorConfig {
    let mut config = TransactorConfig::new(Address::new([0x11; 20]));
    config.receipt_timeout = Duration::from_secs(5);
    config.retry = RetryPolicy::new(3, Duration::from_secs(1));
    config
}

fn harness() -> Harness {
    let ledger = NullLedger::new();
    let stores = Arc::new(NullVoteStore::new());
    let journal = Arc::new(NullJournalStore::new());
    let signer = LedgerSigner::from_bytes(&[0x46; 32]).unwrap();
    let transactor = LedgerTransactor::new(
        ledger.clone(),
        stores.clone(),
        journal.clone(),
        signer,
        config(),
        Arc::new(NullClock::default()),
    );
    Harness {
        ledger,
        stores,
        journal,
        transactor,
    }
}

fn voter(id: &str) -> VoterId {
    VoterId::new(id).unwrap()
}

/// Stage a matching commit and secret for `id`.
fn stage_vote(stores: &NullVoteStore, id: &str, candidate: u32) {
    let candidate = CandidateId::new(candidate);
    let salt = generate_salt();
    let cid = Cid::new(format!("Qm{id}")).unwrap();
    stores.put_commit(CommitRecord {
        voter_id: voter(id),
        vote_hash: hash_vote(candidate, &salt),
        timestamp: Timestamp::new(1_700_000_000),
        candidate_id: candidate,
        content_cid: cid.clone(),
    });
    stores.put_secret(SecretRecord {
        voter_id: voter(id),
        secret: salt,
        candidate_id: candidate,
        timestamp: Timestamp::new(1_700_000_000),
        content_cid: cid,
    });
}

fn open_reveal_phase(journal: &NullJournalStore) {
    journal
        .record(
            JournalEvent::RevealPhaseStarted,
            JournalEntry {
                tx_hash: TxHash::new([0xee; 32]),
                confirmed_at: Timestamp::new(1_700_000_000),
                block_number: Some(1),
            },
        )
        .unwrap();
}

fn abi_bool(value: bool) -> Vec<u8> {
    let mut word = vec![0u8; 32];
    word[31] = u8::from(value);
    word
}

fn not_yet_voted(ledger: &NullLedger) {
    ledger.respond_to_selector(abi::selector(abi::CHECK_IF_VOTED), abi_bool(false));
}

#[tokio::test(start_paused = true)]
async fn transient_send_failures_are_retried_with_fresh_nonces() {
    let h = harness();
    h.ledger.reject_sends(2, "connection reset");
    let started = tokio::time::Instant::now();

    let result = h
        .transactor
        .add_candidates(&["Goodluck Jonathan".into(), "Mohammed Buhari".into()])
        .await
        .unwrap();

    let PhaseResult::Submitted(tx) = result else {
        panic!("expected a submission, got {result:?}");
    };
    assert_eq!(h.ledger.nonce_requests(), 3);
    assert_eq!(h.ledger.mined().len(), 1);
    assert_eq!(tx.attempts.len(), 3);
    assert_eq!(tx.attempts[0].status, AttemptStatus::Failed);
    assert_eq!(tx.attempts[2].status, AttemptStatus::Confirmed);
    assert_eq!(tx.attempts[2].retry_count, 2);
    // Linear backoff: 1s after the first failure, 2s after the second.
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert!(h.journal.snapshot().candidates_added.is_some());
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_fail_without_journalling() {
    let h = harness();
    h.ledger.reject_sends(3, "nonce too low");

    let err = h.transactor.start_reveal_phase().await.unwrap_err();

    match err {
        LedgerError::TransactionFailed {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("nonce too low"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(h.ledger.mined().is_empty());
    assert!(!h.journal.snapshot().reveal_phase_open());
}

#[tokio::test(start_paused = true)]
async fn reverted_receipt_counts_as_failed_attempt() {
    let h = harness();
    h.ledger.revert_next();

    let result = h.transactor.end_election().await.unwrap();

    let PhaseResult::Submitted(tx) = result else {
        panic!("expected a submission");
    };
    let mined = h.ledger.mined();
    assert_eq!(mined.len(), 2);
    assert!(!mined[0].success);
    assert_eq!(tx.tx_hash, mined[1].hash);
    assert_eq!(tx.attempts[0].status, AttemptStatus::Failed);
    // The reverted transaction consumed a nonce.
    assert_eq!(tx.attempts[1].nonce, tx.attempts[0].nonce + 1);
}

#[tokio::test(start_paused = true)]
async fn late_receipt_is_found_before_resubmitting() {
    let h = harness();
    h.ledger.delay_receipt(6);

    let result = h.transactor.start_reveal_phase().await.unwrap();

    assert!(matches!(result, PhaseResult::Submitted(_)));
    assert_eq!(h.ledger.send_calls(), 1);
    assert_eq!(h.ledger.mined().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn gas_price_gets_buffer_and_falls_back_when_unavailable() {
    let h = harness();
    let PhaseResult::Submitted(tx) = h.transactor.start_reveal_phase().await.unwrap() else {
        panic!("expected a submission");
    };
    assert_eq!(tx.attempts[0].gas_price, 33_000_000_000);

    h.ledger.set_gas_price(None);
    let PhaseResult::Submitted(tx) = h.transactor.end_election().await.unwrap() else {
        panic!("expected a submission");
    };
    assert_eq!(tx.attempts[0].gas_price, 22_000_000_000);
}

#[tokio::test(start_paused = true)]
async fn journalled_phase_is_not_resubmitted() {
    let h = harness();
    h.transactor.start_reveal_phase().await.unwrap();

    let again = h.transactor.start_reveal_phase().await.unwrap();

    assert!(matches!(again, PhaseResult::AlreadyRecorded(_)));
    assert_eq!(h.ledger.mined().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_inputs_are_rejected() {
    let h = harness();
    assert!(matches!(
        h.transactor.add_candidates(&[]).await,
        Err(LedgerError::NoStagedRecords(_))
    ));
    assert!(matches!(
        h.transactor.commit_votes().await,
        Err(LedgerError::NoStagedRecords(_))
    ));
    open_reveal_phase(&h.journal);
    assert!(matches!(
        h.transactor.reveal_votes().await,
        Err(LedgerError::NoStagedRecords(_))
    ));
    assert_eq!(h.ledger.send_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn commit_batch_submits_each_voter_once() {
    let h = harness();
    not_yet_voted(&h.ledger);
    stage_vote(&h.stores, "V1", 1);
    stage_vote(&h.stores, "V2", 2);

    let first = h.transactor.commit_votes().await.unwrap();
    assert_eq!(first.confirmed.len(), 2);
    assert!(first.is_clean());

    let rerun = h.transactor.commit_votes().await.unwrap();
    assert!(rerun.confirmed.is_empty());
    assert_eq!(
        rerun.skipped,
        vec![
            (voter("V1"), SkipReason::AlreadyJournaled),
            (voter("V2"), SkipReason::AlreadyJournaled),
        ]
    );
    assert_eq!(h.ledger.mined().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn voter_already_on_ledger_is_skipped() {
    let h = harness();
    stage_vote(&h.stores, "V1", 1);
    let check = abi::encode_call(abi::CHECK_IF_VOTED, &[Token::String("V1".into())]);
    h.ledger.respond_to_call(check, abi_bool(true));

    let report = h.transactor.commit_votes().await.unwrap();

    assert_eq!(report.skipped, vec![(voter("V1"), SkipReason::AlreadyOnLedger)]);
    assert!(h.ledger.mined().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_commit_does_not_stop_the_batch() {
    let h = harness();
    not_yet_voted(&h.ledger);
    stage_vote(&h.stores, "V1", 1);
    stage_vote(&h.stores, "V2", 2);
    h.ledger.reject_sends(3, "insufficient funds");

    let report = h.transactor.commit_votes().await.unwrap();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, voter("V1"));
    assert_eq!(report.confirmed.len(), 1);
    assert_eq!(report.confirmed[0].0, voter("V2"));
    assert!(!h.journal.snapshot().is_committed(&voter("V1")));
}

#[tokio::test(start_paused = true)]
async fn reveal_requires_started_reveal_phase() {
    let h = harness();
    stage_vote(&h.stores, "V1", 1);

    let err = h.transactor.reveal_votes().await.unwrap_err();

    assert!(matches!(err, LedgerError::RevealPhaseNotStarted));
    assert_eq!(h.ledger.send_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn secret_without_commit_is_rejected_while_batch_completes() {
    let h = harness();
    open_reveal_phase(&h.journal);
    stage_vote(&h.stores, "V1", 1);
    let salt = generate_salt();
    h.stores.put_secret(SecretRecord {
        voter_id: voter("V9"),
        secret: salt,
        candidate_id: CandidateId::new(2),
        timestamp: Timestamp::new(1_700_000_000),
        content_cid: Cid::new("QmV9").unwrap(),
    });

    let report = h.transactor.reveal_votes().await.unwrap();

    assert_eq!(report.confirmed.len(), 1);
    assert_eq!(report.confirmed[0].0, voter("V1"));
    assert_eq!(report.rejected, vec![RevealError::MissingCommit(voter("V9"))]);
    assert!(h.journal.snapshot().is_revealed(&voter("V1")));
}

#[tokio::test(start_paused = true)]
async fn mismatched_secret_is_reported_distinctly() {
    let h = harness();
    open_reveal_phase(&h.journal);
    stage_vote(&h.stores, "V1", 1);
    let mut secret = h.stores.secrets()[&voter("V1")].clone();
    secret.secret = generate_salt();
    h.stores.put_secret(secret);

    let report = h.transactor.reveal_votes().await.unwrap();

    assert!(report.confirmed.is_empty());
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].code(), "E_HASH_MISMATCH");
    assert_eq!(h.ledger.send_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn revealed_voters_are_skipped_on_rerun() {
    let h = harness();
    open_reveal_phase(&h.journal);
    stage_vote(&h.stores, "V1", 3);

    h.transactor.reveal_votes().await.unwrap();
    let rerun = h.transactor.reveal_votes().await.unwrap();

    assert_eq!(rerun.skipped, vec![(voter("V1"), SkipReason::AlreadyJournaled)]);
    assert_eq!(h.ledger.mined().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn journal_write_failure_is_surfaced() {
    let h = harness();
    h.journal.fail_writes(true);

    let err = h.transactor.end_election().await.unwrap_err();

    assert!(matches!(err, LedgerError::Store(_)));
    // The transaction itself landed.
    assert_eq!(h.ledger.mined().len(), 1);
}
