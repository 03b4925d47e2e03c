//! Service lifecycle tests.
//!
//! Test organization:
//! - lifecycle.rs: dial, close and retry timing
//! - config.rs: live reconfiguration and option application
//! - watchdog.rs: backend-reported closes
//! - events.rs: lifecycle event emission
//! - feed.rs: configuration feeds
//! - tcp.rs: the TCP connector against a loopback listener

mod config;
mod support;
mod tcp;
