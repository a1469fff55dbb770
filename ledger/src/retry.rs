//! Bounded retry policy applied to every contract transaction.

use std::time::Duration;

use votekiosk_types::TxHash;

/// At most `max_attempts` tries, waiting `base_delay * n` after the n-th
/// failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before retrying after `failed_attempt` (1-based) failed.
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        self.base_delay.saturating_mul(failed_attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptStatus {
    Pending,
    Confirmed,
    Failed,
}

/// One try at getting a contract call mined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionAttempt {
    pub nonce: u64,
    pub gas_price: u128,
    /// Zero on the first attempt.
    pub retry_count: u32,
    pub status: AttemptStatus,
    /// Set once the transaction was broadcast.
    pub tx_hash: Option<TxHash>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_backoff() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1000));
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
    }

    #[test]
    fn at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
