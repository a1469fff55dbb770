//! Commit and secret store traits.

use std::sync::Arc;

use votekiosk_types::VoterId;

use crate::{CommitRecord, LoadReport, SecretRecord, StoreError};

/// Append-only map of voter id to [`CommitRecord`].
pub trait CommitStore: Send + Sync {
    /// Load every commit, validated under the store's strictness.
    fn load_commits(&self) -> Result<LoadReport<CommitRecord>, StoreError>;

    fn get_commit(&self, voter_id: &VoterId) -> Result<Option<CommitRecord>, StoreError>;

    fn has_commit(&self, voter_id: &VoterId) -> Result<bool, StoreError> {
        self.get_commit(voter_id).map(|c| c.is_some())
    }

    /// Insert a commit for a voter that has none.
    ///
    /// The existence check and the write happen under one exclusive
    /// acquisition of the store. Returns [`StoreError::Duplicate`] if a
    /// commit already exists; the existing record is left untouched.
    fn insert_commit(&self, record: &CommitRecord) -> Result<(), StoreError>;

    /// Confirm the store can currently be read and written.
    fn probe_commits(&self) -> Result<(), StoreError>;
}

/// Map of voter id to [`SecretRecord`].
pub trait SecretStore: Send + Sync {
    fn load_secrets(&self) -> Result<LoadReport<SecretRecord>, StoreError>;

    fn get_secret(&self, voter_id: &VoterId) -> Result<Option<SecretRecord>, StoreError>;

    /// Insert or replace the secret for a voter.
    fn upsert_secret(&self, record: &SecretRecord) -> Result<(), StoreError>;

    /// Remove a voter's secret. Returns whether one was present.
    fn remove_secret(&self, voter_id: &VoterId) -> Result<bool, StoreError>;

    fn probe_secrets(&self) -> Result<(), StoreError>;
}

impl<T: CommitStore + ?Sized> CommitStore for Arc<T> {
    fn load_commits(&self) -> Result<LoadReport<CommitRecord>, StoreError> {
        (**self).load_commits()
    }

    fn get_commit(&self, voter_id: &VoterId) -> Result<Option<CommitRecord>, StoreError> {
        (**self).get_commit(voter_id)
    }

    fn has_commit(&self, voter_id: &VoterId) -> Result<bool, StoreError> {
        (**self).has_commit(voter_id)
    }

    fn insert_commit(&self, record: &CommitRecord) -> Result<(), StoreError> {
        (**self).insert_commit(record)
    }

    fn probe_commits(&self) -> Result<(), StoreError> {
        (**self).probe_commits()
    }
}

impl<T: SecretStore + ?Sized> SecretStore for Arc<T> {
    fn load_secrets(&self) -> Result<LoadReport<SecretRecord>, StoreError> {
        (**self).load_secrets()
    }

    fn get_secret(&self, voter_id: &VoterId) -> Result<Option<SecretRecord>, StoreError> {
        (**self).get_secret(voter_id)
    }

    fn upsert_secret(&self, record: &SecretRecord) -> Result<(), StoreError> {
        (**self).upsert_secret(record)
    }

    fn remove_secret(&self, voter_id: &VoterId) -> Result<bool, StoreError> {
        (**self).remove_secret(voter_id)
    }

    fn probe_secrets(&self) -> Result<(), StoreError> {
        (**self).probe_secrets()
    }
}
