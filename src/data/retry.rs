//! Retry policy with capped exponential backoff.

use std::time::{Duration, Instant};

/// HTTP statuses treated as success. Anything else is a failed attempt.
pub const SUCCESS_CODES: [u16; 4] = [200, 201, 202, 204];

/// Configuration for the retry loop of [`crate::data::http::HttpClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base: Duration,
    /// Multiplier applied per further attempt.
    pub factor: f64,
    /// Upper bound on a single delay.
    pub max: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Optional wall-clock deadline across the whole retry loop.
    pub deadline: Option<Instant>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base: Duration::from_secs(1),
            factor: 2.0,
            max: Duration::from_secs(8),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(15),
            deadline: None,
        }
    }
}

impl RetryPolicy {
    /// Same attempt budget, no waiting. Handy for tests and offline tooling.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base: Duration::ZERO,
            max: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Delay after the failed attempt number `attempt` (1-based).
    ///
    /// `base * factor^(attempt - 1)`, capped at `max`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1) as i32;
        let seconds = self.base.as_secs_f64() * self.factor.powi(exp);
        let capped = seconds.min(self.max.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    pub fn is_success(status: u16) -> bool {
        SUCCESS_CODES.contains(&status)
    }

    /// True when sleeping for `delay` would run past the deadline.
    pub fn would_exceed_deadline(&self, delay: Duration) -> bool {
        match self.deadline {
            Some(deadline) => Instant::now() + delay >= deadline,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_doubles_and_caps() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 5);
        assert_eq!(p.delay_after(1), Duration::from_secs(1));
        assert_eq!(p.delay_after(2), Duration::from_secs(2));
        assert_eq!(p.delay_after(3), Duration::from_secs(4));
        assert_eq!(p.delay_after(4), Duration::from_secs(8));
        assert_eq!(p.delay_after(5), Duration::from_secs(8)); // capped
    }

    #[test]
    fn success_whitelist_is_explicit() {
        for code in [200, 201, 202, 204] {
            assert!(RetryPolicy::is_success(code));
        }
        for code in [203, 206, 301, 404, 429, 500] {
            assert!(!RetryPolicy::is_success(code));
        }
    }

    #[test]
    fn immediate_policy_never_waits() {
        let p = RetryPolicy::immediate(3);
        assert_eq!(p.delay_after(1), Duration::ZERO);
        assert_eq!(p.delay_after(7), Duration::ZERO);
    }

    #[test]
    fn deadline_in_the_past_is_exceeded() {
        let p = RetryPolicy::default().with_deadline(Some(Instant::now()));
        assert!(p.would_exceed_deadline(Duration::from_millis(1)));
        assert!(!RetryPolicy::default().would_exceed_deadline(Duration::from_secs(100)));
    }
}
