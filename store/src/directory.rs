//! Read-only registration data: the voter directory and face templates.

use votekiosk_types::{CardId, FaceDescriptor, VoterRecord};

use crate::StoreError;

/// Registered voters, looked up by the card they were issued.
pub trait VoterDirectory: Send + Sync {
    fn find_by_card(&self, card: &CardId) -> Result<Option<VoterRecord>, StoreError>;

    fn voter_count(&self) -> Result<usize, StoreError>;
}

/// Enrolled face descriptors keyed by [`VoterRecord::face_key`].
pub trait FaceTemplateStore: Send + Sync {
    /// All descriptors on file for `key`, or `None` if the voter has no
    /// biometric record.
    fn descriptors_for(&self, key: &str) -> Result<Option<Vec<FaceDescriptor>>, StoreError>;
}
