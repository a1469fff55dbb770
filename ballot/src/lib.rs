//! Casting votes on the kiosk.
//!
//! [`VoteCommitEngine::submit_vote`] turns a verified voter's choice into a
//! hash commitment, anchors an evidence document in the content store and
//! only then stages the commit and its secret locally for the ledger.

pub mod document;
pub mod engine;
pub mod error;
pub mod statistics;

pub use document::VoteDocument;
pub use engine::{VoteCommitEngine, VoteReceipt};
pub use error::BallotError;
pub use statistics::{vote_statistics, VoteStatistics};
