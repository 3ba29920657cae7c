//! Delay rules between attempts.

use std::time::Duration;

use rand::Rng;

/// Exponential backoff with optional downward jitter.
///
/// The base delay after failed attempt `n` (1-based) is
/// `min(initial_delay * multiplier^(n-1), max_delay)`. Jitter removes a random
/// fraction in `[0, jitter]` of the base, so a delay never exceeds
/// `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Upper bound for any delay.
    pub max_delay: Duration,
    /// Growth factor per attempt, at least 1.0.
    pub multiplier: f64,
    /// Largest fraction of the base delay removed at random, in `[0, 1]`.
    pub jitter: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::exponential(Duration::from_secs(1), 2.0, Duration::from_secs(30))
    }
}

impl Backoff {
    /// Retry immediately.
    #[must_use]
    pub const fn none() -> Self {
        Self::fixed(Duration::ZERO)
    }

    /// The same delay before every retry.
    #[must_use]
    pub const fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
            jitter: 0.0,
        }
    }

    /// Exponential growth from `initial_delay`, capped at `max_delay`.
    ///
    /// Multipliers below 1.0 are raised to 1.0 so delays never shrink.
    #[must_use]
    pub fn exponential(initial_delay: Duration, multiplier: f64, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay: max_delay.max(initial_delay),
            multiplier: multiplier.max(1.0),
            jitter: 0.0,
        }
    }

    /// Sets the jitter fraction, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = if jitter.is_finite() {
            jitter.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    /// Replaces the initial delay, keeping the cap at least as large.
    #[must_use]
    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self.max_delay = self.max_delay.max(initial_delay);
        self
    }

    /// Replaces the cap, keeping the initial delay within it.
    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self.initial_delay = self.initial_delay.min(max_delay);
        self
    }

    /// Delay before the retry that follows failed attempt `attempt`, without
    /// jitter.
    ///
    /// Attempt 0 is treated as attempt 1.
    #[must_use]
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.multiplier.powi(exponent);
        let secs = self.initial_delay.as_secs_f64() * factor;

        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs).min(self.max_delay)
    }

    /// Delay before the retry that follows failed attempt `attempt`, with
    /// jitter applied.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let sample = if self.jitter > 0.0 {
            rand::thread_rng().gen_range(0.0..=1.0)
        } else {
            0.0
        };
        self.jittered(self.base_delay_for(attempt), sample)
    }

    /// Applies jitter for a uniform `sample` in `[0, 1]`.
    fn jittered(&self, base: Duration, sample: f64) -> Duration {
        let fraction = (self.jitter * sample).clamp(0.0, 1.0);
        base.mul_f64(1.0 - fraction)
    }
}
