//! Suite configuration with TOML file support.
//!
//! Amounts are given in whole tokens and scaled by `10^decimals` at deploy
//! time, which keeps them inside the integer range TOML can carry.

use serde::{Deserialize, Serialize};
use std::path::Path;

use cinder_burn::DEFAULT_BURN_RATE_BPS;
use cinder_ledger::TokenMetadata;
use cinder_staking::StakingParams;
use cinder_types::{AccountId, BPS_DENOMINATOR, SECONDS_PER_YEAR};
use cinder_utils::{init_logging, LogFormat};

use crate::SuiteError;

/// Largest supported `decimals`: `10^36` still leaves room in a `u128`.
pub const MAX_DECIMALS: u8 = 36;

/// Configuration for a suite deployment.
///
/// Can be loaded from a TOML file via [`SuiteConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter, overridden by `RUST_LOG` when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub token: TokenConfig,

    #[serde(default)]
    pub burn: BurnConfig,

    #[serde(default)]
    pub staking: StakingConfig,

    #[serde(default)]
    pub vesting: VestingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    #[serde(default = "default_token_address")]
    pub address: AccountId,

    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_symbol")]
    pub symbol: String,

    #[serde(default = "default_decimals")]
    pub decimals: u8,

    /// Whole tokens minted once to the owner.
    #[serde(default = "default_initial_supply")]
    pub initial_supply: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnConfig {
    #[serde(default = "default_burn_rate")]
    pub rate_bps: u32,

    #[serde(default = "default_sink")]
    pub sink: AccountId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingConfig {
    #[serde(default = "default_staking_address")]
    pub address: AccountId,

    #[serde(default = "default_reward_rate")]
    pub reward_rate_bps: u32,

    /// Whole tokens.
    #[serde(default = "default_minimum_stake")]
    pub minimum_stake: u64,

    #[serde(default = "default_seconds_per_year")]
    pub seconds_per_year: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingConfig {
    #[serde(default = "default_vesting_address")]
    pub address: AccountId,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}

fn default_token_address() -> AccountId {
    AccountId::from_low_u64(0xc1d0_0001)
}

fn default_name() -> String {
    "Cinder".to_string()
}

fn default_symbol() -> String {
    "CDR".to_string()
}

fn default_decimals() -> u8 {
    18
}

fn default_initial_supply() -> u64 {
    1_000_000_000
}

fn default_burn_rate() -> u32 {
    DEFAULT_BURN_RATE_BPS
}

fn default_sink() -> AccountId {
    AccountId::DEAD
}

fn default_staking_address() -> AccountId {
    AccountId::from_low_u64(0xc1d0_0002)
}

fn default_reward_rate() -> u32 {
    StakingParams::DEFAULT_REWARD_RATE_BPS
}

fn default_minimum_stake() -> u64 {
    100
}

fn default_seconds_per_year() -> u64 {
    SECONDS_PER_YEAR
}

fn default_vesting_address() -> AccountId {
    AccountId::from_low_u64(0xc1d0_0003)
}

// ── Impl ───────────────────────────────────────────────────────────────

fn scale(whole: u64, decimals: u8) -> Result<u128, SuiteError> {
    10u128
        .checked_pow(decimals as u32)
        .and_then(|unit| unit.checked_mul(whole as u128))
        .ok_or_else(|| SuiteError::Config(format!("{whole} tokens overflow at {decimals} decimals")))
}

impl SuiteConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, SuiteError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, SuiteError> {
        toml::from_str(s).map_err(|e| SuiteError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, SuiteError> {
        toml::to_string_pretty(self).map_err(|e| SuiteError::Config(e.to_string()))
    }

    /// Install the global tracing subscriber described by this config.
    pub fn init_logging(&self) -> bool {
        init_logging(self.log_format, &self.log_level)
    }

    /// Reject configurations no deployment could honour.
    pub fn validate(&self) -> Result<(), SuiteError> {
        if self.token.decimals > MAX_DECIMALS {
            return Err(SuiteError::Config(format!(
                "decimals {} exceeds {MAX_DECIMALS}",
                self.token.decimals
            )));
        }
        for (what, bps) in [
            ("burn rate", self.burn.rate_bps),
            ("reward rate", self.staking.reward_rate_bps),
        ] {
            if bps as u128 > BPS_DENOMINATOR {
                return Err(SuiteError::Config(format!(
                    "{what} {bps} bps exceeds {BPS_DENOMINATOR}"
                )));
            }
        }
        if self.staking.seconds_per_year == 0 {
            return Err(SuiteError::Config("seconds_per_year must be positive".into()));
        }

        let accounts = [
            ("token", self.token.address),
            ("burn sink", self.burn.sink),
            ("staking", self.staking.address),
            ("vesting", self.vesting.address),
        ];
        for (i, (what, account)) in accounts.iter().enumerate() {
            if account.is_zero() {
                return Err(SuiteError::Config(format!("{what} account must not be null")));
            }
            if let Some((other, _)) = accounts[..i].iter().find(|(_, a)| a == account) {
                return Err(SuiteError::Config(format!(
                    "{what} account {account} is also the {other} account"
                )));
            }
        }
        self.token.initial_supply_units()?;
        Ok(())
    }
}

impl TokenConfig {
    pub fn metadata(&self) -> TokenMetadata {
        TokenMetadata {
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            decimals: self.decimals,
        }
    }

    /// `initial_supply` in raw units.
    pub fn initial_supply_units(&self) -> Result<u128, SuiteError> {
        scale(self.initial_supply, self.decimals)
    }
}

impl StakingConfig {
    /// Engine parameters with the minimum scaled to raw units.
    pub fn params(&self, decimals: u8) -> Result<StakingParams, SuiteError> {
        Ok(StakingParams {
            reward_rate_bps: self.reward_rate_bps,
            minimum_stake: scale(self.minimum_stake, decimals)?,
            seconds_per_year: self.seconds_per_year,
        })
    }
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            token: TokenConfig::default(),
            burn: BurnConfig::default(),
            staking: StakingConfig::default(),
            vesting: VestingConfig::default(),
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            address: default_token_address(),
            name: default_name(),
            symbol: default_symbol(),
            decimals: default_decimals(),
            initial_supply: default_initial_supply(),
        }
    }
}

impl Default for BurnConfig {
    fn default() -> Self {
        Self {
            rate_bps: default_burn_rate(),
            sink: default_sink(),
        }
    }
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            address: default_staking_address(),
            reward_rate_bps: default_reward_rate(),
            minimum_stake: default_minimum_stake(),
            seconds_per_year: default_seconds_per_year(),
        }
    }
}

impl Default for VestingConfig {
    fn default() -> Self {
        Self {
            address: default_vesting_address(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = SuiteConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = SuiteConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = SuiteConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.token.symbol, "CDR");
        assert_eq!(config.burn.rate_bps, 100);
        assert_eq!(config.burn.sink, AccountId::DEAD);
        assert_eq!(config.staking.reward_rate_bps, 1_000);
        assert_eq!(config.log_format, LogFormat::Human);
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            log_format = "json"

            [token]
            symbol = "ASH"
            initial_supply = 21000000

            [burn]
            rate_bps = 250
            sink = "0x000000000000000000000000000000000000beef"
        "#;
        let config = SuiteConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.token.symbol, "ASH");
        assert_eq!(config.token.name, "Cinder"); // default
        assert_eq!(config.token.initial_supply, 21_000_000);
        assert_eq!(config.burn.rate_bps, 250);
        assert_eq!(config.burn.sink, AccountId::from_low_u64(0xbeef));
        assert_eq!(config.staking.minimum_stake, 100); // default
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let result = SuiteConfig::from_toml_str("[burn]\nrate_bps = \"lots\"");
        assert!(matches!(result, Err(SuiteError::Config(_))));
    }

    #[test]
    fn bad_address_is_a_config_error() {
        let result = SuiteConfig::from_toml_str("[burn]\nsink = \"0xnothex\"");
        assert!(matches!(result, Err(SuiteError::Config(_))));
    }

    #[test]
    fn nonexistent_file_is_an_io_error() {
        let result = SuiteConfig::from_toml_file("/nonexistent/cinder.toml");
        assert!(matches!(result, Err(SuiteError::Io(_))));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[staking]\nreward_rate_bps = 500\nminimum_stake = 1").unwrap();
        let config = SuiteConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.staking.reward_rate_bps, 500);
        assert_eq!(config.staking.params(18).unwrap().minimum_stake, 10u128.pow(18));
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut config = SuiteConfig::default();
        config.token.decimals = 37;
        assert!(config.validate().is_err());

        let mut config = SuiteConfig::default();
        config.staking.reward_rate_bps = 10_001;
        assert!(config.validate().is_err());

        let mut config = SuiteConfig::default();
        config.staking.seconds_per_year = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_shared_or_null_accounts() {
        let mut config = SuiteConfig::default();
        config.vesting.address = config.staking.address;
        assert!(config.validate().is_err());

        let mut config = SuiteConfig::default();
        config.burn.sink = AccountId::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn supply_overflow_is_reported() {
        let mut config = SuiteConfig::default();
        config.token.decimals = 36;
        config.token.initial_supply = u64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn full_rate_is_allowed() {
        let mut config = SuiteConfig::default();
        config.burn.rate_bps = 10_000;
        assert!(config.validate().is_ok());
    }
}
