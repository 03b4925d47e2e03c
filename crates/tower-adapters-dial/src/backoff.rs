use rand::Rng;
use std::time::Duration;

/// Upper clamp for [`ExponentialBackoff`] attempts; keeps `1 << attempt` in range.
pub const MAX_BACKOFF_ATTEMPTS: u32 = 32;

/// Abstraction for computing dial retry intervals.
///
/// Implementations are pure: the attempt counter lives in
/// [`DialPolicy`](crate::DialPolicy), which calls the generator with the
/// already incremented attempt number.
pub trait IntervalFunction: Send + Sync {
    /// Computes the wait before retrying after attempt `attempt`.
    ///
    /// # Arguments
    /// * `attempt` - The attempt number, starting at 1
    ///
    /// Returns `None` once `attempt` exceeds the generator's bound.
    fn next_interval(&self, attempt: u32) -> Option<Duration>;
}

/// Returns the same interval for every attempt up to `max_attempts`.
#[derive(Debug, Clone)]
pub struct Periodic {
    max_attempts: u32,
    interval: Duration,
}

impl Periodic {
    /// Creates a periodic generator. `max_attempts` below 1 is clamped to 1.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    /// The effective attempt bound.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl IntervalFunction for Periodic {
    fn next_interval(&self, attempt: u32) -> Option<Duration> {
        (attempt <= self.max_attempts).then_some(self.interval)
    }
}

/// Randomized exponential backoff.
///
/// Attempt `a` yields a uniformly drawn interval in `[0, unit * 2^a)`. The
/// random value is drawn again on every call.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    max_attempts: u32,
    unit: Duration,
}

impl ExponentialBackoff {
    /// Creates an exponential generator. `max_attempts` is clamped to
    /// `[1, MAX_BACKOFF_ATTEMPTS]`.
    pub fn new(max_attempts: u32, unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, MAX_BACKOFF_ATTEMPTS),
            unit,
        }
    }

    /// The effective attempt bound.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// The exclusive upper bound of the interval for `attempt`.
    pub fn upper_bound(&self, attempt: u32) -> Duration {
        match attempt.min(MAX_BACKOFF_ATTEMPTS) {
            0 => self.unit,
            a => self
                .unit
                .checked_mul(1u32 << (a - 1))
                .and_then(|half| half.checked_mul(2))
                .unwrap_or(Duration::MAX),
        }
    }
}

impl IntervalFunction for ExponentialBackoff {
    fn next_interval(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }

        // attempt <= 32, so the largest slot index is u32::MAX
        let last_slot = ((1u64 << attempt) - 1) as u32;
        let slot = rand::rng().random_range(0..=last_slot);
        Some(self.unit.saturating_mul(slot))
    }
}

/// Function-based interval implementation.
pub struct FnInterval<F> {
    f: F,
}

impl<F> FnInterval<F>
where
    F: Fn(u32) -> Option<Duration> + Send + Sync,
{
    /// Creates a new function-based interval.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> IntervalFunction for FnInterval<F>
where
    F: Fn(u32) -> Option<Duration> + Send + Sync,
{
    fn next_interval(&self, attempt: u32) -> Option<Duration> {
        (self.f)(attempt)
    }
}

impl<F: Clone> Clone for FnInterval<F> {
    fn clone(&self) -> Self {
        Self { f: self.f.clone() }
    }
}

impl<F> std::fmt::Debug for FnInterval<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnInterval")
    }
}
