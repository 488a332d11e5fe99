use thiserror::Error;

#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("ledger error: {0}")]
    Ledger(#[from] cinder_ledger::LedgerError),

    #[error("burn policy error: {0}")]
    Burn(#[from] cinder_burn::BurnError),

    #[error("staking error: {0}")]
    Staking(#[from] cinder_staking::StakingError),

    #[error("vesting error: {0}")]
    Vesting(#[from] cinder_vesting::VestingError),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
