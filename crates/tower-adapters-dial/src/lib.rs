//! Dial retry policies for service adapters.
//!
//! A dial policy is a stateful generator of wait intervals between connect
//! attempts. Each call to [`RetryPolicy::next_retry`] bumps the attempt
//! counter and yields the wait for that attempt, or `None` once the
//! configured number of attempts is used up.
//!
//! # Features
//!
//! - **IntervalFunction abstraction**: pluggable, pure interval generators
//!   - [`Periodic`]: the same interval for every attempt
//!   - [`ExponentialBackoff`]: a random interval in `[0, unit * 2^attempt)`
//!   - [`FnInterval`]: any closure
//! - **Thread-safe counter**: [`DialPolicy`] serializes increment and compute
//!   so it can be shared by concurrent dialers
//!
//! # Examples
//!
//! ```
//! use tower_adapters_dial::{DialPolicy, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = DialPolicy::periodic(2, Duration::from_millis(10));
//!
//! assert_eq!(policy.next_retry(), Some(Duration::from_millis(10)));
//! assert_eq!(policy.next_retry(), Some(Duration::from_millis(10)));
//! assert_eq!(policy.next_retry(), None);
//!
//! policy.reset_attempts();
//! assert_eq!(policy.cur_attempt(), 0);
//! ```

mod backoff;
mod policy;

pub use backoff::{ExponentialBackoff, FnInterval, IntervalFunction, Periodic, MAX_BACKOFF_ATTEMPTS};
pub use policy::{DialPolicy, RetryPolicy, SharedPolicy};
