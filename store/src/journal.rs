//! Journal of ledger transactions confirmed for this election.
//!
//! The ledger transactor consults the journal so a rerun never resubmits a
//! call that already landed, and so reveals can require an opened reveal
//! phase.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use votekiosk_types::{Timestamp, TxHash, VoterId};

use crate::StoreError;

/// One confirmed transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub tx_hash: TxHash,
    pub confirmed_at: Timestamp,
    #[serde(default)]
    pub block_number: Option<u64>,
}

/// What a confirmed transaction accomplished.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JournalEvent {
    CandidatesAdded,
    CommitConfirmed(VoterId),
    RevealPhaseStarted,
    RevealConfirmed(VoterId),
    ElectionEnded,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerJournal {
    #[serde(default)]
    pub candidates_added: Option<JournalEntry>,
    #[serde(default)]
    pub reveal_started: Option<JournalEntry>,
    #[serde(default)]
    pub election_ended: Option<JournalEntry>,
    #[serde(default)]
    pub commits: BTreeMap<VoterId, JournalEntry>,
    #[serde(default)]
    pub reveals: BTreeMap<VoterId, JournalEntry>,
}

impl LedgerJournal {
    pub fn apply(&mut self, event: JournalEvent, entry: JournalEntry) {
        match event {
            JournalEvent::CandidatesAdded => self.candidates_added = Some(entry),
            JournalEvent::CommitConfirmed(voter) => {
                self.commits.insert(voter, entry);
            }
            JournalEvent::RevealPhaseStarted => self.reveal_started = Some(entry),
            JournalEvent::RevealConfirmed(voter) => {
                self.reveals.insert(voter, entry);
            }
            JournalEvent::ElectionEnded => self.election_ended = Some(entry),
        }
    }

    pub fn is_committed(&self, voter_id: &VoterId) -> bool {
        self.commits.contains_key(voter_id)
    }

    pub fn is_revealed(&self, voter_id: &VoterId) -> bool {
        self.reveals.contains_key(voter_id)
    }

    pub fn reveal_phase_open(&self) -> bool {
        self.reveal_started.is_some()
    }
}

/// Durable home of the [`LedgerJournal`].
pub trait JournalStore: Send + Sync {
    fn load_journal(&self) -> Result<LedgerJournal, StoreError>;

    /// Apply one event under exclusive access and persist the result.
    fn record(&self, event: JournalEvent, entry: JournalEntry) -> Result<(), StoreError>;
}

impl<T: JournalStore + ?Sized> JournalStore for Arc<T> {
    fn load_journal(&self) -> Result<LedgerJournal, StoreError> {
        (**self).load_journal()
    }

    fn record(&self, event: JournalEvent, entry: JournalEntry) -> Result<(), StoreError> {
        (**self).record(event, entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(byte: u8) -> JournalEntry {
        JournalEntry {
            tx_hash: TxHash::new([byte; 32]),
            confirmed_at: Timestamp::new(10),
            block_number: Some(7),
        }
    }

    #[test]
    fn apply_tracks_phases_and_voters() {
        let voter = VoterId::new("V1").unwrap();
        let mut journal = LedgerJournal::default();
        assert!(!journal.reveal_phase_open());

        journal.apply(JournalEvent::CommitConfirmed(voter.clone()), entry(1));
        journal.apply(JournalEvent::RevealPhaseStarted, entry(2));

        assert!(journal.is_committed(&voter));
        assert!(!journal.is_revealed(&voter));
        assert!(journal.reveal_phase_open());
    }

    #[test]
    fn journal_serializes_voter_keys_as_strings() {
        let mut journal = LedgerJournal::default();
        journal.apply(
            JournalEvent::CommitConfirmed(VoterId::new("V1").unwrap()),
            entry(3),
        );
        let json = serde_json::to_string(&journal).unwrap();
        assert!(json.contains("\"V1\""));
        let back: LedgerJournal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, journal);
    }
}
