//! Per-account stake record and the accrual formula.

use cinder_types::{Timestamp, BPS_DENOMINATOR};
use cinder_utils::mul_div;
use serde::{Deserialize, Serialize};

/// Rewards accrued by `principal` over `elapsed` seconds.
///
/// `principal × rate_bps × elapsed / (seconds_per_year × 10_000)`, truncated
/// toward zero. `None` on overflow or a zero-length year.
pub fn accrued_between(
    principal: u128,
    rate_bps: u32,
    seconds_per_year: u64,
    elapsed: u64,
) -> Option<u128> {
    if principal == 0 || rate_bps == 0 || elapsed == 0 {
        return Some(0);
    }
    let weighted = principal.checked_mul(rate_bps as u128)?;
    let denominator = (seconds_per_year as u128).checked_mul(BPS_DENOMINATOR)?;
    mul_div(weighted, elapsed as u128, denominator)
}

/// Staking state for a single account.
///
/// `accrued` holds rewards computed up to `last_update` only; the open
/// interval `[last_update, now]` is always recomputed on demand. Records are
/// never deleted, even after a full exit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRecord {
    pub principal: u128,

    /// Rewards realized but not yet claimed.
    pub accrued: u128,

    /// When `accrued` was last brought up to date. `None` until the first stake.
    pub last_update: Option<Timestamp>,
}

impl StakeRecord {
    /// Rewards for the open interval `[last_update, now]`.
    pub fn pending_checked(&self, rate_bps: u32, seconds_per_year: u64, now: Timestamp) -> Option<u128> {
        match self.last_update {
            None => Some(0),
            Some(last) => accrued_between(
                self.principal,
                rate_bps,
                seconds_per_year,
                last.elapsed_since(now),
            ),
        }
    }

    /// `accrued` plus the open interval.
    pub fn total_owed_checked(&self, rate_bps: u32, seconds_per_year: u64, now: Timestamp) -> Option<u128> {
        self.pending_checked(rate_bps, seconds_per_year, now)?
            .checked_add(self.accrued)
    }

    /// This record with the open interval folded into `accrued` and
    /// `last_update` advanced to `now`.
    pub fn realized(&self, rate_bps: u32, seconds_per_year: u64, now: Timestamp) -> Option<Self> {
        Some(Self {
            principal: self.principal,
            accrued: self.total_owed_checked(rate_bps, seconds_per_year, now)?,
            last_update: Some(now),
        })
    }

    pub fn is_staked(&self) -> bool {
        self.principal > 0
    }
}
