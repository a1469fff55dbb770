//! Nullable infrastructure for deterministic testing.
//!
//! Every external dependency of the kiosk (clock, card reader, sensors,
//! content store, ledger node, vote files) sits behind a trait. This crate
//! provides implementations that:
//! - Return deterministic, scripted values
//! - Record what they were asked to do
//! - Never touch hardware, the filesystem or the network
//!
//! Usage: swap real implementations for nullables in integration tests.

pub mod clock;
pub mod content;
pub mod devices;
pub mod ledger;
pub mod store;

pub use clock::NullClock;
pub use content::NullContentStore;
pub use devices::{NullCamera, NullCardReader, NullFingerprintSensor, ReleaseLog};
pub use ledger::{MinedTransaction, NullLedger};
pub use store::{NullFaceTemplates, NullJournalStore, NullVoteStore, NullVoterDirectory};

use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, recovering the data if a panicking test poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
