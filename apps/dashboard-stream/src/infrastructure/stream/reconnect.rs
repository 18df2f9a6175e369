//! Reconnection Policy
//!
//! Implements bounded exponential backoff with additive jitter for stream
//! reconnection. The policy decides whether another attempt is allowed and
//! how long to wait before it; the stream client owns the timer.
//!
//! The delay for the Nth attempt of a failure run is
//! `min(initial_delay * multiplier^(N-1) + jitter, max_delay)` with
//! `jitter` drawn uniformly from `0..=max_jitter`, and never less than the
//! delay handed out for attempt N-1.

use std::time::Duration;

use rand::Rng;

/// Configuration for reconnection behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt (before jitter).
    pub initial_delay: Duration,
    /// Upper bound on any single delay, jitter included.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (2.0 doubles the delay each attempt).
    pub multiplier: f64,
    /// Largest random jitter added to a delay.
    pub max_jitter: Duration,
    /// Reconnection attempts allowed per failure run; 0 gives up on the first failure.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            multiplier: 2.0,
            max_jitter: Duration::from_millis(1000),
            max_attempts: 5,
        }
    }
}

impl ReconnectConfig {
    /// Create a new configuration with custom values.
    #[must_use]
    pub const fn new(
        initial_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
        max_jitter: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            initial_delay,
            max_delay,
            multiplier,
            max_jitter,
            max_attempts,
        }
    }
}

/// Reconnection policy implementing exponential backoff with jitter.
///
/// # Example
///
/// ```rust
/// use dashboard_stream::infrastructure::stream::reconnect::{ReconnectConfig, ReconnectPolicy};
///
/// let mut policy = ReconnectPolicy::new(ReconnectConfig::default());
///
/// // Get delay for first attempt
/// let delay1 = policy.next_delay();
/// assert!(delay1.is_some());
///
/// // Simulate successful connection
/// policy.reset();
/// assert_eq!(policy.attempt_count(), 0);
/// ```
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    attempt_count: u32,
    last_delay: Duration,
}

impl ReconnectPolicy {
    /// Create a new reconnection policy.
    #[must_use]
    pub const fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempt_count: 0,
            last_delay: Duration::ZERO,
        }
    }

    /// Record a failure and get the delay before the next attempt.
    ///
    /// Returns `None` once `max_attempts` attempts have been handed out;
    /// the counter is left unchanged in that case.
    #[must_use]
    pub fn next_delay(&mut self) -> Option<Duration> {
        if !self.should_retry() {
            return None;
        }

        self.attempt_count += 1;

        let backoff = self.backoff_millis(self.attempt_count);
        let jitter = self.jitter_millis();
        #[allow(clippy::cast_possible_truncation)]
        let max_millis = self.config.max_delay.as_millis().min(u128::from(u64::MAX)) as u64;

        let delay = Duration::from_millis(backoff.saturating_add(jitter).min(max_millis))
            .max(self.last_delay);
        self.last_delay = delay;

        Some(delay)
    }

    /// Reset the policy after a successful connection.
    pub const fn reset(&mut self) {
        self.attempt_count = 0;
        self.last_delay = Duration::ZERO;
    }

    /// Get the current attempt count.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Check if reconnection should continue.
    #[must_use]
    pub const fn should_retry(&self) -> bool {
        self.attempt_count < self.config.max_attempts
    }

    /// Get the policy configuration.
    #[must_use]
    pub const fn config(&self) -> &ReconnectConfig {
        &self.config
    }

    /// Exponential component for a 1-based attempt, saturating at `u64::MAX`.
    #[allow(clippy::cast_precision_loss)]
    fn backoff_millis(&self, attempt: u32) -> u64 {
        let base = self.config.initial_delay.as_millis() as f64;
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let scaled = (base * self.config.multiplier.max(1.0).powi(exponent)).round();

        if !scaled.is_finite() || scaled >= u64::MAX as f64 {
            u64::MAX
        } else if scaled <= 0.0 {
            0
        } else {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                scaled as u64
            }
        }
    }

    fn jitter_millis(&self) -> u64 {
        let max = u64::try_from(self.config.max_jitter.as_millis()).unwrap_or(u64::MAX);
        if max == 0 {
            return 0;
        }
        rand::rng().random_range(0..=max)
    }
}
