//! Burn-on-transfer policy.
//!
//! [`BurnLedger`] wraps any [`TokenLedger`](cinder_ledger::TokenLedger) and
//! splits every non-mint, non-burn transfer into a burn leg sent to a sink
//! account and a net leg sent to the recipient:
//!
//! `burn = floor(amount × rate_bps / 10_000)`, `net = amount − burn`
//!
//! Transfers where either party is exempt move the full amount.

pub mod error;
pub mod policy;

pub use error::BurnError;
pub use policy::{BurnLedger, DEFAULT_BURN_RATE_BPS};
