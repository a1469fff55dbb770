//! Nullable content store: records uploads instead of sending them.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use votekiosk_content_store::{ContentStore, ContentStoreError, NodeIdentity};
use votekiosk_types::Cid;

use crate::lock;

#[derive(Debug, Default)]
struct Inner {
    uploads: Mutex<Vec<(String, Vec<u8>)>>,
    upload_calls: AtomicUsize,
    liveness_calls: AtomicUsize,
    fail_uploads: AtomicBool,
    unreachable: AtomicBool,
    upload_delay: Mutex<Option<Duration>>,
}

/// An in-memory content store.
///
/// Clones share state, so a test can keep a handle while the engine owns
/// another. Returned CIDs are `QmNull<n>` in upload order.
#[derive(Clone, Debug, Default)]
pub struct NullContentStore {
    inner: Arc<Inner>,
}

impl NullContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent upload fail with `UploadFailed`.
    pub fn fail_uploads(&self, fail: bool) {
        self.inner.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Make the node unreachable for both liveness and uploads.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.inner.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Hold every upload for `delay` before answering.
    pub fn set_upload_delay(&self, delay: Duration) {
        *lock(&self.inner.upload_delay) = Some(delay);
    }

    /// Number of upload attempts, including failed ones.
    pub fn upload_calls(&self) -> usize {
        self.inner.upload_calls.load(Ordering::SeqCst)
    }

    pub fn liveness_calls(&self) -> usize {
        self.inner.liveness_calls.load(Ordering::SeqCst)
    }

    /// Successful uploads as `(file_name, bytes)`, in order.
    pub fn uploads(&self) -> Vec<(String, Vec<u8>)> {
        lock(&self.inner.uploads).clone()
    }
}

impl ContentStore for NullContentStore {
    async fn check_liveness(&self) -> Result<NodeIdentity, ContentStoreError> {
        self.inner.liveness_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.unreachable.load(Ordering::SeqCst) {
            return Err(ContentStoreError::Unreachable("null node is offline".into()));
        }
        Ok(NodeIdentity {
            node_id: "12D3KooWNull".into(),
            version: Some("0.0.0-null".into()),
        })
    }

    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<Cid, ContentStoreError> {
        self.inner.upload_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *lock(&self.inner.upload_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.inner.unreachable.load(Ordering::SeqCst) {
            return Err(ContentStoreError::Unreachable("null node is offline".into()));
        }
        if self.inner.fail_uploads.load(Ordering::SeqCst) {
            return Err(ContentStoreError::UploadFailed("scripted failure".into()));
        }
        let mut uploads = lock(&self.inner.uploads);
        uploads.push((file_name.to_string(), bytes));
        Cid::new(format!("QmNull{}", uploads.len()))
            .map_err(|e| ContentStoreError::InvalidResponse(e.to_string()))
    }
}
