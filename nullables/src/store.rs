//! Nullable stores: thread-safe in-memory storage for testing.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use votekiosk_store::{
    CommitRecord, CommitStore, FaceTemplateStore, JournalEntry, JournalEvent, JournalStore,
    LedgerJournal, LoadReport, SecretRecord, SecretStore, StoreError, VoterDirectory,
};
use votekiosk_types::{CardId, FaceDescriptor, VoterId, VoterRecord};

use crate::lock;

/// An in-memory commit and secret store.
///
/// Writes can be made to fail to exercise the engine's halt and rollback
/// paths. Thread-safe for use with tokio's multi-threaded runtime.
#[derive(Debug, Default)]
pub struct NullVoteStore {
    commits: Mutex<BTreeMap<VoterId, CommitRecord>>,
    secrets: Mutex<BTreeMap<VoterId, SecretRecord>>,
    fail_commit_writes: AtomicBool,
    fail_secret_writes: AtomicBool,
    fail_probes: AtomicBool,
    commit_reads: AtomicUsize,
}

impl NullVoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `insert_commit` fail with an I/O error.
    pub fn fail_commit_writes(&self, fail: bool) {
        self.fail_commit_writes.store(fail, Ordering::SeqCst);
    }

    /// Make `upsert_secret` and `remove_secret` fail with an I/O error.
    pub fn fail_secret_writes(&self, fail: bool) {
        self.fail_secret_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_probes(&self, fail: bool) {
        self.fail_probes.store(fail, Ordering::SeqCst);
    }

    /// Number of commit lookups and loads served.
    pub fn commit_reads(&self) -> usize {
        self.commit_reads.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> BTreeMap<VoterId, CommitRecord> {
        lock(&self.commits).clone()
    }

    pub fn secrets(&self) -> BTreeMap<VoterId, SecretRecord> {
        lock(&self.secrets).clone()
    }

    /// Stage a commit directly, bypassing duplicate checks.
    pub fn put_commit(&self, record: CommitRecord) {
        lock(&self.commits).insert(record.voter_id.clone(), record);
    }

    /// Stage a secret directly.
    pub fn put_secret(&self, record: SecretRecord) {
        lock(&self.secrets).insert(record.voter_id.clone(), record);
    }

    fn injected(flag: &AtomicBool, what: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Io(format!("scripted {what} failure")));
        }
        Ok(())
    }
}

impl CommitStore for NullVoteStore {
    fn load_commits(&self) -> Result<LoadReport<CommitRecord>, StoreError> {
        self.commit_reads.fetch_add(1, Ordering::SeqCst);
        Ok(LoadReport {
            records: self.commits(),
            quarantined: Vec::new(),
        })
    }

    fn get_commit(&self, voter_id: &VoterId) -> Result<Option<CommitRecord>, StoreError> {
        self.commit_reads.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.commits).get(voter_id).cloned())
    }

    fn insert_commit(&self, record: &CommitRecord) -> Result<(), StoreError> {
        Self::injected(&self.fail_commit_writes, "commit write")?;
        let mut commits = lock(&self.commits);
        if commits.contains_key(&record.voter_id) {
            return Err(StoreError::Duplicate(record.voter_id.to_string()));
        }
        commits.insert(record.voter_id.clone(), record.clone());
        Ok(())
    }

    fn probe_commits(&self) -> Result<(), StoreError> {
        Self::injected(&self.fail_probes, "probe")
    }
}

impl SecretStore for NullVoteStore {
    fn load_secrets(&self) -> Result<LoadReport<SecretRecord>, StoreError> {
        Ok(LoadReport {
            records: self.secrets(),
            quarantined: Vec::new(),
        })
    }

    fn get_secret(&self, voter_id: &VoterId) -> Result<Option<SecretRecord>, StoreError> {
        Ok(lock(&self.secrets).get(voter_id).cloned())
    }

    fn upsert_secret(&self, record: &SecretRecord) -> Result<(), StoreError> {
        Self::injected(&self.fail_secret_writes, "secret write")?;
        lock(&self.secrets).insert(record.voter_id.clone(), record.clone());
        Ok(())
    }

    fn remove_secret(&self, voter_id: &VoterId) -> Result<bool, StoreError> {
        Self::injected(&self.fail_secret_writes, "secret write")?;
        Ok(lock(&self.secrets).remove(voter_id).is_some())
    }

    fn probe_secrets(&self) -> Result<(), StoreError> {
        Self::injected(&self.fail_probes, "probe")
    }
}

/// A fixed voter directory keyed by card UID.
#[derive(Debug, Default)]
pub struct NullVoterDirectory {
    voters: HashMap<CardId, VoterRecord>,
}

impl NullVoterDirectory {
    pub fn new(voters: impl IntoIterator<Item = VoterRecord>) -> Self {
        Self {
            voters: voters
                .into_iter()
                .map(|v| (CardId::new(v.uid.as_str()), v))
                .collect(),
        }
    }

    /// A registered voter whose card UID is `uid`.
    pub fn voter(uid: &str, name: &str, fingerprint_template_id: u32) -> VoterRecord {
        VoterRecord {
            uid: VoterId::new(uid).unwrap_or_else(|e| panic!("test voter id {uid:?}: {e}")),
            name: name.to_string(),
            fingerprint_template_id,
            face_template_ref: None,
            has_voted: false,
            registered_at: None,
        }
    }
}

impl VoterDirectory for NullVoterDirectory {
    fn find_by_card(&self, card: &CardId) -> Result<Option<VoterRecord>, StoreError> {
        Ok(self.voters.get(card).cloned())
    }

    fn voter_count(&self) -> Result<usize, StoreError> {
        Ok(self.voters.len())
    }
}

/// A fixed face template database.
#[derive(Debug, Default)]
pub struct NullFaceTemplates {
    templates: HashMap<String, Vec<FaceDescriptor>>,
}

impl NullFaceTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, descriptors: Vec<FaceDescriptor>) -> Self {
        self.templates.insert(key.to_string(), descriptors);
        self
    }
}

impl FaceTemplateStore for NullFaceTemplates {
    fn descriptors_for(&self, key: &str) -> Result<Option<Vec<FaceDescriptor>>, StoreError> {
        Ok(self
            .templates
            .get(key)
            .filter(|d| !d.is_empty())
            .cloned())
    }
}

/// An in-memory ledger journal.
#[derive(Debug, Default)]
pub struct NullJournalStore {
    journal: Mutex<LedgerJournal>,
    fail_writes: AtomicBool,
}

impl NullJournalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> LedgerJournal {
        lock(&self.journal).clone()
    }
}

impl JournalStore for NullJournalStore {
    fn load_journal(&self) -> Result<LedgerJournal, StoreError> {
        Ok(self.snapshot())
    }

    fn record(&self, event: JournalEvent, entry: JournalEntry) -> Result<(), StoreError> {
        NullVoteStore::injected(&self.fail_writes, "journal write")?;
        lock(&self.journal).apply(event, entry);
        Ok(())
    }
}
