//! Session states and the outcome of a single step.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three verification factors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Factor {
    Card,
    Fingerprint,
    Face,
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Card => f.write_str("card"),
            Self::Fingerprint => f.write_str("fingerprint"),
            Self::Face => f.write_str("face"),
        }
    }
}

/// Where a session is.
///
/// `Verified` and `Failed` are terminal; a new session is needed to start
/// over from the card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    AwaitingCard,
    AwaitingFingerprint,
    AwaitingFace,
    Verified,
    Failed(FailureReason),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified | Self::Failed(_))
    }

    /// The factor this state is waiting on, if any.
    pub fn pending_factor(&self) -> Option<Factor> {
        match self {
            Self::AwaitingCard => Some(Factor::Card),
            Self::AwaitingFingerprint => Some(Factor::Fingerprint),
            Self::AwaitingFace => Some(Factor::Face),
            Self::Verified | Self::Failed(_) => None,
        }
    }
}

/// Why a session ended unsuccessfully.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    UnregisteredCard,
    /// The voter has no face template on file.
    NoBiometricRecord,
    AttemptsExhausted(Factor),
    TimedOut,
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnregisteredCard => f.write_str("unregistered card"),
            Self::NoBiometricRecord => f.write_str("no biometric record"),
            Self::AttemptsExhausted(factor) => write!(f, "too many failed {factor} attempts"),
            Self::TimedOut => f.write_str("session timed out"),
            Self::Cancelled => f.write_str("session cancelled"),
        }
    }
}

/// A recoverable failure: the same factor may be tried again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetryReason {
    NoCardPresented,
    NoFingerPresented,
    /// The sensor found a template, but not the voter's.
    FingerprintMismatch { found: Option<u32> },
    NoFaceDetected,
    FaceMismatch,
}

impl RetryReason {
    /// Whether this retry consumes one of the factor's attempts.
    /// Waiting for a card to be presented does not.
    pub fn counts_as_attempt(&self) -> bool {
        !matches!(self, Self::NoCardPresented)
    }
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCardPresented => f.write_str("no card presented"),
            Self::NoFingerPresented => f.write_str("no finger presented"),
            Self::FingerprintMismatch { .. } => f.write_str("fingerprint does not match"),
            Self::NoFaceDetected => f.write_str("no face detected"),
            Self::FaceMismatch => f.write_str("face does not match"),
        }
    }
}

/// Result of feeding one factor reading into the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Moved on to the next factor.
    Advanced(Factor),
    Retry(Factor, RetryReason),
    Verified,
    Failed(FailureReason),
}
