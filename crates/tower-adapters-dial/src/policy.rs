use crate::backoff::{ExponentialBackoff, FnInterval, IntervalFunction, Periodic};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// A stateful generator of dial retry intervals.
///
/// `next_retry` increments the attempt counter and then computes the wait for
/// the new attempt number as one atomic step. `None` signals that no attempts
/// remain. The counter only moves back through `reset_attempts`.
pub trait RetryPolicy: Send + Sync {
    /// Returns the wait before the next attempt, or `None` when exhausted.
    fn next_retry(&self) -> Option<Duration>;

    /// Restarts the schedule from attempt zero.
    fn reset_attempts(&self);

    /// The current attempt counter.
    fn cur_attempt(&self) -> u32;

    /// A policy with the same schedule and its own counter at zero.
    ///
    /// Dialers that run alongside the adapter's own dial use a fork so their
    /// attempts never count against it.
    fn fork(&self) -> SharedPolicy;
}

/// Policy handle shared between an adapter and its dialers.
pub type SharedPolicy = Arc<dyn RetryPolicy>;

impl<P: RetryPolicy + ?Sized> RetryPolicy for Arc<P> {
    fn next_retry(&self) -> Option<Duration> {
        (**self).next_retry()
    }

    fn reset_attempts(&self) {
        (**self).reset_attempts()
    }

    fn cur_attempt(&self) -> u32 {
        (**self).cur_attempt()
    }

    fn fork(&self) -> SharedPolicy {
        (**self).fork()
    }
}

/// Attempt counter combined with an [`IntervalFunction`].
///
/// A single lock guards the counter for the whole increment-and-compute step,
/// so concurrent callers each observe a distinct attempt number.
pub struct DialPolicy<I> {
    attempt: Mutex<u32>,
    interval: I,
}

impl<I: IntervalFunction> DialPolicy<I> {
    /// Wraps an interval generator with a fresh counter.
    pub fn new(interval: I) -> Self {
        Self {
            attempt: Mutex::new(0),
            interval,
        }
    }

    /// Returns the underlying interval generator.
    pub fn interval(&self) -> &I {
        &self.interval
    }

    /// Converts into a [`SharedPolicy`].
    pub fn shared(self) -> SharedPolicy
    where
        I: Clone + 'static,
    {
        Arc::new(self)
    }
}

impl DialPolicy<Periodic> {
    /// Fixed `interval` between attempts, at most `max_attempts` (min 1) times.
    pub fn periodic(max_attempts: u32, interval: Duration) -> Self {
        Self::new(Periodic::new(max_attempts, interval))
    }
}

impl DialPolicy<ExponentialBackoff> {
    /// Random waits in `[0, unit * 2^attempt)`, `max_attempts` clamped to `[1, 32]`.
    pub fn exponential(max_attempts: u32, unit: Duration) -> Self {
        Self::new(ExponentialBackoff::new(max_attempts, unit))
    }
}

impl<F> DialPolicy<FnInterval<F>>
where
    F: Fn(u32) -> Option<Duration> + Send + Sync,
{
    /// Policy backed by a closure over the attempt number.
    pub fn from_fn(f: F) -> Self {
        Self::new(FnInterval::new(f))
    }
}

impl<I> RetryPolicy for DialPolicy<I>
where
    I: IntervalFunction + Clone + 'static,
{
    fn next_retry(&self) -> Option<Duration> {
        let mut attempt = self.attempt.lock();
        *attempt = attempt.saturating_add(1);
        self.interval.next_interval(*attempt)
    }

    fn reset_attempts(&self) {
        *self.attempt.lock() = 0;
    }

    fn cur_attempt(&self) -> u32 {
        *self.attempt.lock()
    }

    fn fork(&self) -> SharedPolicy {
        Arc::new(Self::new(self.interval.clone()))
    }
}

impl<I: std::fmt::Debug> std::fmt::Debug for DialPolicy<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialPolicy")
            .field("attempt", &*self.attempt.lock())
            .field("interval", &self.interval)
            .finish()
    }
}

impl Default for DialPolicy<Periodic> {
    /// One retry after one second.
    fn default() -> Self {
        Self::periodic(1, Duration::from_secs(1))
    }
}
