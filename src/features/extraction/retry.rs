use std::time::Duration;

use crate::core::config::{BackoffKind, ExtractionConfig};

/// Delay schedule and attempt budget for transient extraction failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub backoff: BackoffKind,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: i32,
}

impl RetryPolicy {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            backoff: config.backoff,
            base_delay: config.retry_delay,
            max_delay: config.max_retry_delay,
            max_attempts: config.max_attempts,
        }
    }

    /// Whether a job that has used `attempts` claims may be tried again
    pub fn can_retry(&self, attempts: i32) -> bool {
        attempts < self.max_attempts
    }

    /// Delay before the next try after failed attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: i32) -> Duration {
        let delay = match self.backoff {
            BackoffKind::Fixed => self.base_delay,
            BackoffKind::Exponential => {
                let exponent = attempt.saturating_sub(1).clamp(0, 31) as u32;
                self.base_delay.saturating_mul(1u32 << exponent)
            }
        };
        delay.min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(backoff: BackoffKind) -> RetryPolicy {
        RetryPolicy {
            backoff,
            base_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(3600),
            max_attempts: 3,
        }
    }

    #[test]
    fn test_fixed_delay_is_constant() {
        let p = policy(BackoffKind::Fixed);
        for attempt in 1..10 {
            assert_eq!(p.delay_for(attempt), Duration::from_secs(60));
        }
    }

    #[test]
    fn test_exponential_delay_doubles_then_caps() {
        let p = policy(BackoffKind::Exponential);
        assert_eq!(p.delay_for(1), Duration::from_secs(60));
        assert_eq!(p.delay_for(2), Duration::from_secs(120));
        assert_eq!(p.delay_for(3), Duration::from_secs(240));
        assert_eq!(p.delay_for(7), Duration::from_secs(3600));
        assert_eq!(p.delay_for(i32::MAX), Duration::from_secs(3600));
        assert_eq!(p.delay_for(0), Duration::from_secs(60));
    }

    #[test]
    fn test_attempt_budget() {
        let p = policy(BackoffKind::Fixed);
        assert!(p.can_retry(1));
        assert!(p.can_retry(2));
        assert!(!p.can_retry(3));
        assert!(!p.can_retry(4));
    }
}
