//! Staking: the reward accrual engine.
//!
//! Rewards are a deterministic function of principal and time, realized
//! lazily on every mutation and never stored per second:
//! `pending = principal × rate_bps × elapsed / (seconds_per_year × 10_000)`
//!
//! This crate handles:
//! - Stake, withdraw, claim and exit against engine-held custody
//! - Owner rate changes, reward-pool funding and minimum-stake tuning
//! - Emergency sweep of foreign assets sent to the engine

pub mod engine;
pub mod error;
pub mod params;
pub mod stake;

pub use engine::{ExitOutcome, StakingEngine};
pub use error::StakingError;
pub use params::StakingParams;
pub use stake::{accrued_between, StakeRecord};
