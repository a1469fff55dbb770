//! Fundamental types for the voting kiosk.
//!
//! This crate defines the value types shared across every other crate in the workspace:
//! voter and card identifiers, candidates, vote commitments, content identifiers and
//! timestamps. Nothing here performs I/O.

pub mod candidate;
pub mod content;
pub mod error;
pub mod hash;
pub mod time;
pub mod voter;

pub use candidate::{Candidate, CandidateId, CandidateRegistry};
pub use content::{Cid, ElectionId};
pub use error::TypeError;
pub use hash::{Salt, TxHash, VoteHash};
pub use time::{Clock, SystemClock, Timestamp};
pub use voter::{CardId, FaceDescriptor, VoterId, VoterRecord};
