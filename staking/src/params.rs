//! Tunable staking parameters.

use crate::error::StakingError;
use cinder_types::{BPS_DENOMINATOR, SECONDS_PER_YEAR, TOKEN_UNIT};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakingParams {
    /// Annualized reward rate in basis points (1000 = 10% APR).
    pub reward_rate_bps: u32,

    /// Floor for an account's first stake (raw units). Top-ups are exempt.
    pub minimum_stake: u128,

    /// Length of the reward year in seconds.
    pub seconds_per_year: u64,
}

impl StakingParams {
    pub const DEFAULT_REWARD_RATE_BPS: u32 = 1_000;

    pub fn validate(&self) -> Result<(), StakingError> {
        if self.reward_rate_bps as u128 > BPS_DENOMINATOR {
            return Err(StakingError::RateTooHigh(self.reward_rate_bps));
        }
        if self.seconds_per_year == 0 {
            return Err(StakingError::InvalidParams(
                "seconds_per_year must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for StakingParams {
    fn default() -> Self {
        Self {
            reward_rate_bps: Self::DEFAULT_REWARD_RATE_BPS,
            minimum_stake: 100 * TOKEN_UNIT,
            seconds_per_year: SECONDS_PER_YEAR,
        }
    }
}
