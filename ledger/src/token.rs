//! The ledger interface consumed by the engines.

use crate::error::LedgerError;
use cinder_types::{AccountId, EventBus};
use serde::{Deserialize, Serialize};

/// Descriptive token metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// A fungible-token ledger.
///
/// Implementations provide interior mutability: every method takes `&self`
/// so one ledger can be shared by several engines. Each mutating call is
/// atomic; a failure leaves every balance and allowance unchanged.
pub trait TokenLedger: Send + Sync {
    /// Identity of the token contract.
    fn address(&self) -> AccountId;

    fn metadata(&self) -> TokenMetadata;

    fn balance_of(&self, account: &AccountId) -> u128;

    fn total_supply(&self) -> u128;

    fn allowance(&self, owner: &AccountId, spender: &AccountId) -> u128;

    /// Set `spender`'s allowance over `owner`'s balance.
    fn approve(&self, owner: &AccountId, spender: &AccountId, amount: u128)
        -> Result<(), LedgerError>;

    /// Debit `from` once per leg and credit each leg's recipient.
    ///
    /// When `spender` is set, its allowance over `from` is charged with the
    /// sum of all legs. Either every leg is applied or none is.
    fn transfer_legs(
        &self,
        spender: Option<&AccountId>,
        from: &AccountId,
        legs: &[(AccountId, u128)],
    ) -> Result<(), LedgerError>;

    fn mint(&self, to: &AccountId, amount: u128) -> Result<(), LedgerError>;

    /// Destroy `amount` of `from`'s balance, reducing total supply.
    fn burn(&self, from: &AccountId, amount: u128) -> Result<(), LedgerError>;

    /// Event stream of this token.
    fn events(&self) -> &EventBus;

    fn transfer(&self, from: &AccountId, to: &AccountId, amount: u128) -> Result<(), LedgerError> {
        self.transfer_legs(None, from, &[(*to, amount)])
    }

    /// Move `owner`'s tokens to `to` on behalf of `spender` (pull via prior approval).
    fn transfer_from(
        &self,
        spender: &AccountId,
        owner: &AccountId,
        to: &AccountId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        self.transfer_legs(Some(spender), owner, &[(*to, amount)])
    }
}
