//! Hardware capabilities consumed by a verification session.
//!
//! Every call blocks for at most its timeout and polls the [`CancelToken`]
//! between hardware reads, so an abort takes effect at the next poll
//! without touching voter or vote data.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use votekiosk_types::{CardId, FaceDescriptor};

use crate::VerificationError;

/// Cooperative cancellation flag shared between the session worker and
/// whoever may abort it.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub trait CardReader: Send {
    /// Wait up to `timeout` for a card. `None` if no card was presented.
    fn scan_card(
        &mut self,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<Option<CardId>, VerificationError>;

    /// Return the reader to an idle state. Called once when the session ends.
    fn release(&mut self) {}
}

/// What the fingerprint sensor reported for one search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FingerprintSearch {
    /// No finger within the timeout.
    NoFinger,
    /// A finger was read but matched nothing in the sensor's library.
    NoMatch,
    Found { template_id: u32, confidence: u16 },
}

pub trait FingerprintSensor: Send {
    /// Search the sensor's template library for the presented finger.
    fn search(
        &mut self,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<FingerprintSearch, VerificationError>;

    fn release(&mut self) {}
}

pub trait FaceCamera: Send {
    /// Capture a frame and compute a descriptor. `None` if no face is in
    /// the frame.
    fn capture_descriptor(
        &mut self,
        cancel: &CancelToken,
    ) -> Result<Option<FaceDescriptor>, VerificationError>;

    fn release(&mut self) {}
}

/// Verdict on whether a captured descriptor belongs to the enrolled voter.
pub trait FaceMatcher: Send + Sync {
    fn matches(&self, known: &[FaceDescriptor], candidate: &FaceDescriptor) -> bool;
}

/// The devices a single session owns. Dropping releases all three.
pub struct KioskDevices {
    pub card_reader: Box<dyn CardReader>,
    pub fingerprint: Box<dyn FingerprintSensor>,
    pub camera: Box<dyn FaceCamera>,
}

impl KioskDevices {
    pub fn new(
        card_reader: impl CardReader + 'static,
        fingerprint: impl FingerprintSensor + 'static,
        camera: impl FaceCamera + 'static,
    ) -> Self {
        Self {
            card_reader: Box::new(card_reader),
            fingerprint: Box::new(fingerprint),
            camera: Box::new(camera),
        }
    }
}

impl Drop for KioskDevices {
    fn drop(&mut self) {
        self.card_reader.release();
        self.fingerprint.release();
        self.camera.release();
        tracing::debug!("kiosk devices released");
    }
}

/// Opens a fresh set of devices for each session.
pub trait DeviceProvider: Send + Sync {
    fn open(&self) -> Result<KioskDevices, VerificationError>;
}

impl<F> DeviceProvider for F
where
    F: Fn() -> Result<KioskDevices, VerificationError> + Send + Sync,
{
    fn open(&self) -> Result<KioskDevices, VerificationError> {
        self()
    }
}
