//! Voter verification for an unattended kiosk.
//!
//! A [`VerificationSession`] walks a voter through three factors in a fixed
//! order: the RFID card identifies the voter, the fingerprint sensor must
//! find that voter's enrolled template, and the camera must produce a face
//! descriptor close to the one on file. The hardware is reached through the
//! capability traits in [`devices`], opened per session and released when
//! the session ends.

pub mod devices;
pub mod error;
pub mod face;
pub mod session;
pub mod state;

pub use devices::{
    CancelToken, CardReader, DeviceProvider, FaceCamera, FaceMatcher, FingerprintSearch,
    FingerprintSensor, KioskDevices,
};
pub use error::VerificationError;
pub use face::{EuclideanFaceMatcher, DEFAULT_FACE_TOLERANCE};
pub use session::{SessionConfig, SessionContext, SessionOutcome, VerificationSession};
pub use state::{Factor, FailureReason, RetryReason, SessionState, StepOutcome};
