//! Vesting: time-locked grants unlocking on a cliff-then-linear curve.
//!
//! Each beneficiary owns an append-only list of schedules. Tokens are pulled
//! into engine custody when a schedule is granted, released to the
//! beneficiary as they vest, and the unvested remainder is refunded to the
//! owner on revocation.

pub mod engine;
pub mod error;
pub mod schedule;

pub use engine::VestingEngine;
pub use error::VestingError;
pub use schedule::VestingSchedule;
