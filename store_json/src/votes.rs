//! The kiosk's commit and secret files.

use std::path::{Path, PathBuf};

use votekiosk_store::{
    CommitRecord, CommitStore, LoadReport, SecretRecord, SecretStore, StoreError, Strictness,
};
use votekiosk_types::VoterId;

use crate::{JsonRecordFile, COMMIT_FILE, SECRET_FILE};

/// `commit.json` and `secrets.json` in one votes directory.
#[derive(Debug, Clone)]
pub struct JsonVoteStore {
    dir: PathBuf,
    commits: JsonRecordFile<CommitRecord>,
    secrets: JsonRecordFile<SecretRecord>,
}

impl JsonVoteStore {
    pub fn open(dir: impl Into<PathBuf>, strictness: Strictness) -> Self {
        let dir = dir.into();
        Self {
            commits: JsonRecordFile::new(dir.join(COMMIT_FILE), strictness),
            secrets: JsonRecordFile::new(dir.join(SECRET_FILE), strictness),
            dir,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn commit_path(&self) -> &Path {
        self.commits.path()
    }

    pub fn secret_path(&self) -> &Path {
        self.secrets.path()
    }
}

impl CommitStore for JsonVoteStore {
    fn load_commits(&self) -> Result<LoadReport<CommitRecord>, StoreError> {
        self.commits.load()
    }

    fn get_commit(&self, voter_id: &VoterId) -> Result<Option<CommitRecord>, StoreError> {
        self.commits.get(voter_id)
    }

    fn insert_commit(&self, record: &CommitRecord) -> Result<(), StoreError> {
        self.commits.insert_new(record)?;
        tracing::debug!(voter_id = %record.voter_id, path = %self.commits.path().display(), "commit persisted");
        Ok(())
    }

    fn probe_commits(&self) -> Result<(), StoreError> {
        self.commits.probe()
    }
}

impl SecretStore for JsonVoteStore {
    fn load_secrets(&self) -> Result<LoadReport<SecretRecord>, StoreError> {
        self.secrets.load()
    }

    fn get_secret(&self, voter_id: &VoterId) -> Result<Option<SecretRecord>, StoreError> {
        self.secrets.get(voter_id)
    }

    fn upsert_secret(&self, record: &SecretRecord) -> Result<(), StoreError> {
        self.secrets.upsert(record)?;
        tracing::debug!(voter_id = %record.voter_id, "secret persisted");
        Ok(())
    }

    fn remove_secret(&self, voter_id: &VoterId) -> Result<bool, StoreError> {
        self.secrets.remove(voter_id)
    }

    fn probe_secrets(&self) -> Result<(), StoreError> {
        self.secrets.probe()
    }
}
