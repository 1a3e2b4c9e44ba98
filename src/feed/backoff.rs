//! Reconnect backoff policy

use std::time::Duration;

/// Delay before reconnect attempt `n` (0-based, reset after each
/// successful open)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// Same delay every time
    Fixed(Duration),
    /// `base * 2^attempt`, never more than `cap`
    Exponential { base: Duration, cap: Duration },
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Exponential {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            BackoffPolicy::Fixed(delay) => delay,
            BackoffPolicy::Exponential { base, cap } => {
                let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
                base.checked_mul(factor).unwrap_or(cap).min(cap)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_exponential() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(4), Duration::from_secs(16));
        assert_eq!(policy.delay(5), Duration::from_secs(30));
        assert_eq!(policy.delay(200), Duration::from_secs(30));
    }

    #[test]
    fn test_fixed() {
        let policy = BackoffPolicy::Fixed(Duration::from_secs(3));
        assert_eq!(policy.delay(0), Duration::from_secs(3));
        assert_eq!(policy.delay(17), Duration::from_secs(3));
    }
}
