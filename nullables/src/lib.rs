//! Nullable infrastructure for deterministic testing.
//!
//! External inputs (time, notifications) are abstracted behind seams in
//! `cinder-types`. This crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the system clock
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod events;

pub use clock::NullClock;
pub use events::EventRecorder;
