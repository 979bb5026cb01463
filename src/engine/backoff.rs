//! # Jittered Backoff
//!
//! Provides the fixed-interval backoff used between retry attempts and waiter polls.
//!
//! Operation deadlines are measured in minutes and the remote's retry envelope is
//! small, so the delay does not grow between attempts. Each delay is the base
//! interval spread by a random factor (±20% by default) so that several
//! operations started together do not poll the remote in lockstep.
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//! use zenlayercloud_provider::engine::backoff::JitteredBackoff;
//!
//! let backoff = JitteredBackoff::new(Duration::from_secs(5), 0.2);
//! let delay = backoff.next_delay();
//! assert!(delay >= Duration::from_secs(4));
//! assert!(delay <= Duration::from_secs(6));
//! ```

use rand::Rng;
use std::time::Duration;

use crate::constants::{DEFAULT_RETRY_INTERVAL_MS, DEFAULT_RETRY_JITTER};

/// Fixed-interval backoff with symmetric random spread
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JitteredBackoff {
    /// Mean delay between attempts
    interval: Duration,
    /// Fraction of the interval the delay may deviate by, in `0.0..=1.0`
    spread: f64,
}

impl Default for JitteredBackoff {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_RETRY_INTERVAL_MS),
            DEFAULT_RETRY_JITTER,
        )
    }
}

impl JitteredBackoff {
    /// Create a backoff with the given mean interval and spread
    ///
    /// The spread is clamped into `0.0..=1.0`.
    #[must_use]
    pub fn new(interval: Duration, spread: f64) -> Self {
        let spread = if spread.is_finite() {
            spread.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self { interval, spread }
    }

    /// Mean delay between attempts
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Longest delay this backoff can produce
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        self.interval.mul_f64(1.0 + self.spread)
    }

    /// Draw the next delay
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use zenlayercloud_provider::engine::backoff::JitteredBackoff;
    ///
    /// let backoff = JitteredBackoff::new(Duration::from_millis(100), 0.0);
    /// assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    /// ```
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        if self.spread <= f64::EPSILON {
            return self.interval;
        }
        let unit: f64 = rand::thread_rng().gen_range(-1.0..=1.0);
        self.delay_for(unit)
    }

    /// Delay for a point `unit` in `-1.0..=1.0` of the spread
    fn delay_for(&self, unit: f64) -> Duration {
        let factor = 1.0 + self.spread * unit.clamp(-1.0, 1.0);
        self.interval.mul_f64(factor)
    }
}
