//! Bounded exponential backoff

use secdb_core::Result;
use std::time::Duration;

/// Attempt budget and backoff schedule for one classification
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub initial_backoff: Duration,

    /// Growth factor applied after each retry
    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration, multiplier: f64) -> Result<Self> {
        let policy = Self {
            max_attempts,
            initial_backoff,
            multiplier,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(secdb_core::Error::config("retry.max_attempts must be at least 1"));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(secdb_core::Error::config(format!(
                "retry.multiplier must be a finite value >= 1.0, got {}",
                self.multiplier
            )));
        }
        Ok(())
    }

    /// Delay to wait after failed attempt `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        self.initial_backoff.mul_f64(self.multiplier.powi(exponent))
    }

    /// Whether attempt `attempt` (1-based) is the last one allowed
    pub fn is_last(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }

    /// Policy with no waiting, for tests and local backends
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            multiplier: 1.0,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff: Duration::from_secs(2),
            multiplier: 1.7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert!((policy.delay_after(2).as_secs_f64() - 3.4).abs() < 1e-6);
        assert!((policy.delay_after(3).as_secs_f64() - 5.78).abs() < 1e-6);
        assert!(!policy.is_last(3));
        assert!(policy.is_last(4));
    }

    #[test]
    fn test_validation() {
        assert!(RetryPolicy::new(0, Duration::from_secs(1), 1.7).is_err());
        assert!(RetryPolicy::new(3, Duration::from_secs(1), 0.5).is_err());
        assert!(RetryPolicy::new(3, Duration::from_secs(1), f64::NAN).is_err());
        assert!(RetryPolicy::new(1, Duration::ZERO, 1.0).is_ok());
    }

    #[test]
    fn test_immediate_policy() {
        let policy = RetryPolicy::immediate(3);
        assert_eq!(policy.delay_after(2), Duration::ZERO);
        assert!(policy.is_last(3));
    }
}
