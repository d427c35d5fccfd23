// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Fixed-count, fixed-interval retry policy.
///
/// The dominant remote failure mode is server memory pressure under
/// pagination, not congestion, so there is no exponential backoff and
/// no jitter. `delay_for_attempt` returns the same wait for every
/// attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub wait: Duration,
}

pub trait BackoffPolicy {
    fn delay_for_attempt(&self, attempt: usize) -> Duration;
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            wait: Duration::from_secs(10),
        }
    }
}

impl BackoffPolicy for RetryPolicy {
    fn delay_for_attempt(&self, _attempt: usize) -> Duration {
        self.wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_is_constant_across_attempts() {
        let policy = RetryPolicy {
            max_attempts: 5,
            wait: Duration::from_millis(250),
        };
        assert_eq!(policy.delay_for_attempt(1), policy.delay_for_attempt(5));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(250));
    }
}
