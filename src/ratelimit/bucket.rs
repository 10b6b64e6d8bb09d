//! Token bucket implementation.

use std::time::{Duration, Instant};

use crate::error::{Result, TollgateError};

/// Validated bucket parameters shared by every bucket a registry creates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketConfig {
    capacity: u32,
    refill_rate_per_second: f64,
}

impl BucketConfig {
    /// Create a bucket configuration.
    ///
    /// # Errors
    ///
    /// Returns `TollgateError::Config` if `capacity` is zero or the refill
    /// rate is not a finite, positive number.
    pub fn new(capacity: u32, refill_rate_per_second: f64) -> Result<Self> {
        if capacity == 0 {
            return Err(TollgateError::Config(
                "bucket capacity must be at least 1".to_string(),
            ));
        }
        if !refill_rate_per_second.is_finite() || refill_rate_per_second <= 0.0 {
            return Err(TollgateError::Config(format!(
                "refill rate must be finite and positive, got {}",
                refill_rate_per_second
            )));
        }
        Ok(Self {
            capacity,
            refill_rate_per_second,
        })
    }

    /// Maximum burst size.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Sustained admission rate in tokens per second.
    pub fn refill_rate_per_second(&self) -> f64 {
        self.refill_rate_per_second
    }
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// One token was consumed.
    Allowed,
    /// The bucket was empty. `retry_after` is the wait until it holds a whole token.
    Limited { retry_after: Duration },
}

impl Decision {
    /// Whether the request may proceed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// A token bucket with continuous refill.
///
/// Tokens accrue fractionally at the configured rate and are capped at the
/// capacity, so bursts are bounded by the capacity and the sustained rate by
/// the refill rate regardless of how often the bucket is consulted.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    config: BucketConfig,
    /// Always within `0.0..=capacity`
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(config: BucketConfig, now: Instant) -> Self {
        Self {
            config,
            tokens: f64::from(config.capacity),
            last_refill: now,
        }
    }

    /// Refill, then try to take one token.
    pub fn allow(&mut self, now: Instant) -> bool {
        self.check(now).is_allowed()
    }

    /// Refill, then try to take one token, reporting how long to wait on failure.
    pub fn check(&mut self, now: Instant) -> Decision {
        self.refill(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Decision::Allowed
        } else {
            let deficit = 1.0 - self.tokens;
            // Very slow rates can put the wait past what a Duration holds.
            let retry_after =
                Duration::try_from_secs_f64(deficit / self.config.refill_rate_per_second)
                    .unwrap_or(Duration::MAX);
            Decision::Limited { retry_after }
        }
    }

    /// Tokens currently available, as of the last refill.
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    fn refill(&mut self, now: Instant) {
        // Readings older than the last refill add nothing and never rewind it.
        let elapsed = now.saturating_duration_since(self.last_refill);
        if elapsed.is_zero() {
            return;
        }

        let capacity = f64::from(self.config.capacity);
        self.tokens =
            (self.tokens + elapsed.as_secs_f64() * self.config.refill_rate_per_second).min(capacity);
        self.last_refill = now;
    }
}
