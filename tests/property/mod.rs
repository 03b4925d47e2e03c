//! Property-based tests for tower-adapters.
//!
//! Run with: cargo test --test property_tests
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold across policies, the notifier and settings parsing.
