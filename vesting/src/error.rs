//! Vesting-specific errors.

use cinder_access::AccessError;
use cinder_ledger::LedgerError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VestingError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("beneficiary must not be the null account")]
    InvalidBeneficiary,

    #[error("amount must be non-zero")]
    InvalidAmount,

    #[error("vesting duration must be non-zero")]
    InvalidDuration,

    #[error("cliff {cliff}s exceeds vesting duration {vesting}s")]
    CliffExceedsVesting { cliff: u64, vesting: u64 },

    #[error("schedule index {index} out of range ({count} schedules)")]
    InvalidIndex { index: usize, count: usize },

    #[error("schedule {0} has already been revoked")]
    AlreadyRevoked(usize),

    #[error("nothing to release")]
    NothingToRelease,

    #[error("engine address and owner must not be null")]
    InvalidAccount,

    #[error("arithmetic overflow in vesting accounting")]
    Overflow,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
