//! Staking-specific errors.

use cinder_access::AccessError;
use cinder_ledger::LedgerError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StakingError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("first stake of {amount} is below the minimum {minimum}")]
    BelowMinimum { amount: u128, minimum: u128 },

    #[error("insufficient stake: requested {requested}, staked {staked}")]
    InsufficientStake { requested: u128, staked: u128 },

    #[error("no rewards to claim")]
    NoRewards,

    #[error("reward pool holds {pool}, owed {owed}")]
    InsufficientPool { owed: u128, pool: u128 },

    #[error("nothing staked")]
    NothingStaked,

    #[error("reward rate {0} bps exceeds 10000")]
    RateTooHigh(u32),

    #[error("the staking token cannot be recovered")]
    CannotRecoverStakingToken,

    #[error("invalid staking parameters: {0}")]
    InvalidParams(String),

    #[error("arithmetic overflow in reward computation")]
    Overflow,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
