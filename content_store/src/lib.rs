//! Client for the content-addressed store that anchors every vote.
//!
//! A vote is only accepted after its evidence document has been uploaded
//! and a CID returned, so the client is single-shot: no
//! internal retries, explicit timeouts on every request.

pub mod client;
pub mod error;

pub use client::{IpfsClient, DEFAULT_API_URL};
pub use error::ContentStoreError;

use std::future::Future;
use votekiosk_types::Cid;

/// Identity reported by a live store node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeIdentity {
    pub node_id: String,
    /// Daemon version, when the node reports one.
    pub version: Option<String>,
}

/// A content-addressed document store.
pub trait ContentStore: Send + Sync {
    /// Lightweight identity probe used as a pre-flight gate.
    fn check_liveness(&self) -> impl Future<Output = Result<NodeIdentity, ContentStoreError>> + Send;

    /// Upload `bytes` under `file_name` and return its CID.
    fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> impl Future<Output = Result<Cid, ContentStoreError>> + Send;
}
