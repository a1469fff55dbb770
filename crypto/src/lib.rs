//! Cryptographic primitives for the voting kiosk.
//!
//! - **SHA-256** for vote commitments: `hash = SHA256("{candidate_id}:{salt}")`
//! - **OS randomness** for commitment salts
//! - **Keccak-256** for ledger transaction hashing and function selectors

pub mod commitment;
pub mod hash;
pub mod salt;

pub use commitment::{hash_vote, verify_vote};
pub use hash::{keccak256, keccak256_multi, sha256};
pub use salt::generate_salt;
