//! Amount units and fixed-point constants.
//!
//! Amounts are raw `u128` units. A whole token is `TOKEN_UNIT` raw units
//! (18 decimals). Rates are expressed in basis points over `BPS_DENOMINATOR`.

/// Decimals of every token in the suite.
pub const TOKEN_DECIMALS: u8 = 18;

/// One whole token in raw units.
pub const TOKEN_UNIT: u128 = 1_000_000_000_000_000_000;

/// Denominator for basis-point rates (100% = 10_000 bps).
pub const BPS_DENOMINATOR: u128 = 10_000;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Length of the reward year used by the accrual formula (365 days).
pub const SECONDS_PER_YEAR: u64 = 365 * SECONDS_PER_DAY;
