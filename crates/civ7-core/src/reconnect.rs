//! Reconnect backoff.
//!
//! Exponential backoff with a ceiling and no attempt limit: the game may be
//! restarted at any time, so a session keeps trying for as long as it lives.
//!
//! ```text
//! attempt:  0  1  2  3  4   5   6  ...
//! delay:    1s 2s 4s 8s 16s 30s 30s ...
//! ```

use std::time::Duration;

/// Delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Ceiling on any single delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Growth factor between consecutive delays.
pub const DEFAULT_MULTIPLIER: u32 = 2;

/// Backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay returned for attempt 0
    pub base_delay: Duration,
    /// Upper bound on any returned delay
    pub max_delay: Duration,
    /// Factor applied per attempt
    pub multiplier: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
        }
    }
}

/// Snapshot of the policy for status displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectAttempt {
    /// Number of delays handed out since the last reset
    pub attempt: u32,
    /// Delay the next call to [`ReconnectPolicy::next_delay`] will return
    pub next_delay: Duration,
}

/// Backoff state machine.
///
/// # Invariants
///
/// - `next_delay()` is non-decreasing between resets and never exceeds
///   `max_delay`.
/// - Arithmetic saturates; a policy left running forever stays at
///   `max_delay`.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    attempt: u32,
}

impl ReconnectPolicy {
    /// Create a policy at attempt 0.
    pub fn new(config: ReconnectConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Delay to wait before the next connect attempt. Advances the attempt
    /// counter.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.delay_for(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Back to attempt 0. Call on every successful connect.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Delays handed out since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Current attempt and the delay it will produce, without advancing.
    pub fn peek(&self) -> ReconnectAttempt {
        ReconnectAttempt { attempt: self.attempt, next_delay: self.delay_for(self.attempt) }
    }

    /// Active configuration.
    pub fn config(&self) -> &ReconnectConfig {
        &self.config
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let max = self.config.max_delay;

        self.config
            .multiplier
            .checked_pow(attempt)
            .and_then(|factor| self.config.base_delay.checked_mul(factor))
            .map_or(max, |delay| delay.min(max))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(ReconnectConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(policy: &mut ReconnectPolicy, n: usize) -> Vec<u64> {
        (0..n).map(|_| policy.next_delay().as_secs()).collect()
    }

    #[test]
    fn default_sequence() {
        let mut policy = ReconnectPolicy::default();
        assert_eq!(secs(&mut policy, 8), vec![1, 2, 4, 8, 16, 30, 30, 30]);
        assert_eq!(policy.attempt(), 8);
    }

    #[test]
    fn reset_starts_over() {
        let mut policy = ReconnectPolicy::default();
        secs(&mut policy, 4);

        policy.reset();
        assert_eq!(policy.attempt(), 0);
        assert_eq!(policy.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn peek_does_not_advance() {
        let mut policy = ReconnectPolicy::default();
        policy.next_delay();
        policy.next_delay();

        let peeked = policy.peek();
        assert_eq!(peeked, ReconnectAttempt { attempt: 2, next_delay: Duration::from_secs(4) });
        assert_eq!(policy.next_delay(), Duration::from_secs(4));
    }

    #[test]
    fn huge_attempt_saturates_at_max() {
        let mut policy = ReconnectPolicy::default();
        policy.attempt = u32::MAX;

        assert_eq!(policy.next_delay(), DEFAULT_MAX_DELAY);
        assert_eq!(policy.attempt(), u32::MAX);
    }

    #[test]
    fn base_above_max_is_clamped() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig {
            base_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(5),
            multiplier: 2,
        });

        assert_eq!(policy.next_delay(), Duration::from_secs(5));
    }

    #[test]
    fn multiplier_one_is_constant() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig {
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
            multiplier: 1,
        });

        for _ in 0..10 {
            assert_eq!(policy.next_delay(), Duration::from_millis(250));
        }
    }
}
