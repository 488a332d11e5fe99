//! One-call deployment of the cinder token suite.
//!
//! [`Suite::deploy`] builds the fixed-supply token, wraps it in the
//! burn-on-transfer policy and points a staking engine and a vesting engine
//! at the wrapped token. Both engines' custody accounts are exempted from the
//! burn so that moving tokens in and out of custody is lossless.

pub mod config;
pub mod error;

pub use config::{BurnConfig, StakingConfig, SuiteConfig, TokenConfig, VestingConfig};
pub use error::SuiteError;

use std::sync::Arc;

use cinder_burn::BurnLedger;
use cinder_ledger::{MemoryLedger, TokenLedger};
use cinder_staking::StakingEngine;
use cinder_types::{AccountId, Clock};
use cinder_vesting::VestingEngine;

/// The deployed token: an in-memory ledger behind the burn policy.
pub type SuiteToken = BurnLedger<MemoryLedger>;

/// The four deployed contracts.
pub struct Suite {
    pub token: Arc<SuiteToken>,
    pub staking: StakingEngine<SuiteToken>,
    pub vesting: VestingEngine<SuiteToken>,
}

impl Suite {
    /// Validate `config` and deploy every contract with `owner` as the
    /// owner and initial holder of the whole supply.
    pub fn deploy(config: &SuiteConfig, owner: AccountId, clock: Arc<dyn Clock>) -> Result<Self, SuiteError> {
        config.validate()?;

        let supply = config.token.initial_supply_units()?;
        let inner = MemoryLedger::with_supply(config.token.address, config.token.metadata(), &owner, supply)?;
        let token = Arc::new(BurnLedger::with_rate(
            inner,
            owner,
            config.burn.sink,
            config.burn.rate_bps,
        )?);

        let staking = StakingEngine::new(
            config.staking.address,
            Arc::clone(&token),
            owner,
            config.staking.params(config.token.decimals)?,
            Arc::clone(&clock),
        )?;
        let vesting = VestingEngine::new(config.vesting.address, Arc::clone(&token), owner, clock)?;

        token.pin_exempt(&owner, &[staking.address(), vesting.address()])?;

        tracing::info!(
            token = %token.address(),
            symbol = %config.token.symbol,
            supply,
            burn_rate_bps = token.burn_rate_bps(),
            staking = %staking.address(),
            vesting = %vesting.address(),
            %owner,
            "suite deployed"
        );
        Ok(Self {
            token,
            staking,
            vesting,
        })
    }
}
