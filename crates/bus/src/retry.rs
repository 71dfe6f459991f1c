//! Redelivery policy.

use std::time::Duration;

/// Fixed-backoff redelivery bounded by an attempt count.
///
/// An envelope is delivered up to `max_attempts` times in total; retryable
/// handler failures sleep for `backoff` between attempts. Non-retryable
/// failures and exhausted attempts dead-letter the envelope.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Delay between redeliveries.
    pub backoff: Duration,
    /// Total delivery attempts, including the first.
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Creates a policy with the given backoff and attempt bound.
    pub fn new(backoff: Duration, max_attempts: u32) -> Self {
        Self {
            backoff,
            max_attempts: max_attempts.max(1),
        }
    }
}

impl Default for RetryPolicy {
    /// One initial delivery plus three redeliveries, five seconds apart.
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(5),
            max_attempts: 4,
        }
    }
}

/// Terminal state of one envelope's delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The handler accepted the envelope.
    Succeeded { attempts: u32 },
    /// The envelope was routed to the dead-letter store.
    DeadLettered { attempts: u32, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mirrors_fixed_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff, Duration::from_secs(5));
        assert_eq!(policy.max_attempts, 4);
    }

    #[test]
    fn at_least_one_attempt() {
        let policy = RetryPolicy::new(Duration::from_millis(10), 0);
        assert_eq!(policy.max_attempts, 1);
    }
}
