//! Nullable kiosk hardware: scripted card reader, fingerprint sensor and
//! camera.
//!
//! Each device replays a queue of readings. Once the queue is exhausted the
//! device reports "nothing presented" and, if given a [`CancelToken`],
//! cancels the session so a test can never spin forever.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use votekiosk_types::{CardId, FaceDescriptor};
use votekiosk_verification::{
    CancelToken, CardReader, FaceCamera, FingerprintSearch, FingerprintSensor, VerificationError,
};

use crate::lock;

/// Shared record of which devices were released, in order.
#[derive(Clone, Debug, Default)]
pub struct ReleaseLog(Arc<Mutex<Vec<&'static str>>>);

impl ReleaseLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn released(&self) -> Vec<&'static str> {
        lock(&self.0).clone()
    }

    fn push(&self, device: &'static str) {
        lock(&self.0).push(device);
    }
}

#[derive(Debug)]
struct Script<T> {
    queue: VecDeque<T>,
    cancel_when_empty: Option<CancelToken>,
    fault: Option<String>,
    log: ReleaseLog,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            cancel_when_empty: None,
            fault: None,
            log: ReleaseLog::default(),
        }
    }
}

impl<T> Script<T> {
    fn next(&mut self) -> Result<Option<T>, VerificationError> {
        if let Some(fault) = &self.fault {
            return Err(VerificationError::Device(fault.clone()));
        }
        let item = self.queue.pop_front();
        if item.is_none() {
            if let Some(token) = &self.cancel_when_empty {
                token.cancel();
            }
        }
        Ok(item)
    }
}

/// Replays a sequence of card scans; `None` entries are polls with no card.
#[derive(Debug, Default)]
pub struct NullCardReader {
    script: Script<Option<CardId>>,
}

impl NullCardReader {
    pub fn new(scans: impl IntoIterator<Item = Option<CardId>>) -> Self {
        Self {
            script: Script {
                queue: scans.into_iter().collect(),
                ..Default::default()
            },
        }
    }

    /// A reader that presents one card on the first poll.
    pub fn presenting(card: &str) -> Self {
        Self::new([Some(CardId::new(card))])
    }

    pub fn cancel_when_empty(mut self, token: &CancelToken) -> Self {
        self.script.cancel_when_empty = Some(token.clone());
        self
    }

    pub fn releasing_into(mut self, log: &ReleaseLog) -> Self {
        self.script.log = log.clone();
        self
    }

    /// Fail every scan with a device error.
    pub fn faulty(mut self, message: &str) -> Self {
        self.script.fault = Some(message.to_string());
        self
    }
}

impl CardReader for NullCardReader {
    fn scan_card(
        &mut self,
        _timeout: Duration,
        _cancel: &CancelToken,
    ) -> Result<Option<CardId>, VerificationError> {
        Ok(self.script.next()?.flatten())
    }

    fn release(&mut self) {
        self.script.log.push("card_reader");
    }
}

/// Replays a sequence of fingerprint searches.
#[derive(Debug, Default)]
pub struct NullFingerprintSensor {
    script: Script<FingerprintSearch>,
}

impl NullFingerprintSensor {
    pub fn new(searches: impl IntoIterator<Item = FingerprintSearch>) -> Self {
        Self {
            script: Script {
                queue: searches.into_iter().collect(),
                ..Default::default()
            },
        }
    }

    /// A sensor that finds `template_id` on the first search.
    pub fn matching(template_id: u32) -> Self {
        Self::new([FingerprintSearch::Found {
            template_id,
            confidence: 120,
        }])
    }

    pub fn cancel_when_empty(mut self, token: &CancelToken) -> Self {
        self.script.cancel_when_empty = Some(token.clone());
        self
    }

    pub fn releasing_into(mut self, log: &ReleaseLog) -> Self {
        self.script.log = log.clone();
        self
    }
}

impl FingerprintSensor for NullFingerprintSensor {
    fn search(
        &mut self,
        _timeout: Duration,
        _cancel: &CancelToken,
    ) -> Result<FingerprintSearch, VerificationError> {
        Ok(self.script.next()?.unwrap_or(FingerprintSearch::NoFinger))
    }

    fn release(&mut self) {
        self.script.log.push("fingerprint");
    }
}

/// Replays a sequence of captured frames; `None` entries have no face.
#[derive(Debug, Default)]
pub struct NullCamera {
    script: Script<Option<FaceDescriptor>>,
}

impl NullCamera {
    pub fn new(frames: impl IntoIterator<Item = Option<FaceDescriptor>>) -> Self {
        Self {
            script: Script {
                queue: frames.into_iter().collect(),
                ..Default::default()
            },
        }
    }

    /// A camera that sees `descriptor` on the first capture.
    pub fn showing(descriptor: FaceDescriptor) -> Self {
        Self::new([Some(descriptor)])
    }

    pub fn cancel_when_empty(mut self, token: &CancelToken) -> Self {
        self.script.cancel_when_empty = Some(token.clone());
        self
    }

    pub fn releasing_into(mut self, log: &ReleaseLog) -> Self {
        self.script.log = log.clone();
        self
    }
}

impl FaceCamera for NullCamera {
    fn capture_descriptor(
        &mut self,
        _cancel: &CancelToken,
    ) -> Result<Option<FaceDescriptor>, VerificationError> {
        Ok(self.script.next()?.flatten())
    }

    fn release(&mut self) {
        self.script.log.push("camera");
    }
}
