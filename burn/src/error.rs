//! Burn-policy errors.

use cinder_access::AccessError;
use cinder_ledger::LedgerError;
use cinder_types::AccountId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BurnError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("null account cannot be exempted or used as sink")]
    InvalidAccount,

    #[error("exemption of {0} is pinned and cannot be removed")]
    PinnedExemption(AccountId),

    #[error("burn rate {0} bps exceeds 10000")]
    InvalidRate(u32),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
