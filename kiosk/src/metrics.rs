//! Kiosk activity counters.

use votekiosk_utils::StatsCounter;

pub const SESSIONS_STARTED: &str = "sessions_started";
pub const VOTERS_VERIFIED: &str = "voters_verified";
pub const VERIFICATION_FAILURES: &str = "verification_failures";
pub const VOTES_CAST: &str = "votes_cast";
pub const REPEAT_VOTES: &str = "repeat_votes";
pub const VOTE_FAILURES: &str = "vote_failures";
pub const PREFLIGHT_FAILURES: &str = "preflight_failures";

const ALL: &[&str] = &[
    SESSIONS_STARTED,
    VOTERS_VERIFIED,
    VERIFICATION_FAILURES,
    VOTES_CAST,
    REPEAT_VOTES,
    VOTE_FAILURES,
    PREFLIGHT_FAILURES,
];

/// Counters for one kiosk process. Never records voter identities.
pub struct KioskMetrics {
    counters: StatsCounter,
}

impl KioskMetrics {
    pub fn new() -> Self {
        Self {
            counters: StatsCounter::new(ALL),
        }
    }

    pub fn record(&self, name: &str) {
        self.counters.increment(name);
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counters.get(name)
    }

    /// All counters in a stable order, for the shutdown summary.
    pub fn summary(&self) -> Vec<(&'static str, u64)> {
        ALL.iter().map(|&name| (name, self.counters.get(name))).collect()
    }
}

impl Default for KioskMetrics {
    fn default() -> Self {
        Self::new()
    }
}
