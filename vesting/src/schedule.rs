//! A single vesting grant and its unlock curve.

use cinder_types::Timestamp;
use serde::{Deserialize, Serialize};

/// `floor(total × elapsed / duration)` for `elapsed < duration`, exact and
/// overflow-free for any `total`.
fn prorate(total: u128, elapsed: u64, duration: u64) -> u128 {
    let (elapsed, duration) = (elapsed as u128, duration as u128);
    (total / duration) * elapsed + (total % duration) * elapsed / duration
}

/// One time-locked grant.
///
/// Invariant: `released_amount <= vested_at(now) <= total_amount`. Once
/// revoked, `total_amount` is frozen at the amount vested at revocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingSchedule {
    pub total_amount: u128,
    pub start_time: Timestamp,
    /// Seconds after `start_time` before anything is releasable.
    pub cliff_duration: u64,
    /// Seconds after `start_time` at which the grant is fully vested.
    pub vesting_duration: u64,
    pub released_amount: u128,
    pub revoked: bool,
}

impl VestingSchedule {
    pub fn new(total_amount: u128, start_time: Timestamp, cliff_duration: u64, vesting_duration: u64) -> Self {
        Self {
            total_amount,
            start_time,
            cliff_duration,
            vesting_duration,
            released_amount: 0,
            revoked: false,
        }
    }

    pub fn cliff_end(&self) -> Timestamp {
        self.start_time.saturating_add(self.cliff_duration)
    }

    pub fn vesting_end(&self) -> Timestamp {
        self.start_time.saturating_add(self.vesting_duration)
    }

    /// Amount vested at `now`.
    ///
    /// Zero before the cliff, everything from the end of vesting, linear
    /// from `start_time` in between. The cliff gates release only; it does
    /// not move the origin of the linear curve.
    pub fn vested_at(&self, now: Timestamp) -> u128 {
        if self.revoked {
            return self.total_amount;
        }
        if now < self.cliff_end() {
            return 0;
        }
        if now >= self.vesting_end() || self.vesting_duration == 0 {
            return self.total_amount;
        }
        prorate(
            self.total_amount,
            self.start_time.elapsed_since(now),
            self.vesting_duration,
        )
    }

    /// `vested − released`, never negative.
    pub fn releasable_at(&self, now: Timestamp) -> u128 {
        self.vested_at(now).saturating_sub(self.released_amount)
    }

    /// Tokens still held in custody for this schedule.
    pub fn locked(&self) -> u128 {
        self.total_amount.saturating_sub(self.released_amount)
    }
}
