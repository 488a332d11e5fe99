//! In-memory fungible-token ledger.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::LedgerError;
use crate::token::{TokenLedger, TokenMetadata};
use cinder_types::{AccountId, ContractEvent, EventBus};

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<AccountId, u128>,
    allowances: HashMap<(AccountId, AccountId), u128>,
    total_supply: u128,
}

impl LedgerState {
    fn balance(&self, account: &AccountId) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &AccountId, spender: &AccountId) -> u128 {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }
}

/// Thread-safe in-memory token ledger.
///
/// Invariant: the sum of all balances equals `total_supply`. An allowance of
/// `u128::MAX` is treated as unlimited and never decremented.
pub struct MemoryLedger {
    address: AccountId,
    metadata: TokenMetadata,
    state: Mutex<LedgerState>,
    events: EventBus,
}

impl MemoryLedger {
    /// An empty ledger with zero supply.
    pub fn new(address: AccountId, metadata: TokenMetadata) -> Self {
        Self {
            address,
            metadata,
            state: Mutex::new(LedgerState::default()),
            events: EventBus::new(),
        }
    }

    /// A fixed-supply token: the whole `supply` is minted once to `holder`.
    pub fn with_supply(
        address: AccountId,
        metadata: TokenMetadata,
        holder: &AccountId,
        supply: u128,
    ) -> Result<Self, LedgerError> {
        let ledger = Self::new(address, metadata);
        ledger.mint(holder, supply)?;
        Ok(ledger)
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenLedger for MemoryLedger {
    fn address(&self) -> AccountId {
        self.address
    }

    fn metadata(&self) -> TokenMetadata {
        self.metadata.clone()
    }

    fn balance_of(&self, account: &AccountId) -> u128 {
        self.lock().balance(account)
    }

    fn total_supply(&self) -> u128 {
        self.lock().total_supply
    }

    fn allowance(&self, owner: &AccountId, spender: &AccountId) -> u128 {
        self.lock().allowance(owner, spender)
    }

    fn approve(
        &self,
        owner: &AccountId,
        spender: &AccountId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        if owner.is_zero() || spender.is_zero() {
            return Err(LedgerError::InvalidAccount);
        }
        self.lock().allowances.insert((*owner, *spender), amount);
        self.events.emit(&ContractEvent::Approval {
            owner: *owner,
            spender: *spender,
            amount,
        });
        Ok(())
    }

    fn transfer_legs(
        &self,
        spender: Option<&AccountId>,
        from: &AccountId,
        legs: &[(AccountId, u128)],
    ) -> Result<(), LedgerError> {
        if from.is_zero() || spender.is_some_and(|s| s.is_zero()) {
            return Err(LedgerError::InvalidAccount);
        }
        if legs.iter().any(|(to, _)| to.is_zero()) {
            return Err(LedgerError::InvalidAccount);
        }
        let total = legs
            .iter()
            .try_fold(0u128, |acc, (_, amount)| acc.checked_add(*amount))
            .ok_or(LedgerError::Overflow)?;

        {
            let mut state = self.lock();

            let remaining_allowance = match spender {
                Some(spender) => {
                    let available = state.allowance(from, spender);
                    if available < total {
                        return Err(LedgerError::InsufficientAllowance {
                            needed: total,
                            available,
                        });
                    }
                    if available == u128::MAX {
                        None
                    } else {
                        Some((*spender, available - total))
                    }
                }
                None => None,
            };

            let available = state.balance(from);
            if available < total {
                return Err(LedgerError::InsufficientBalance {
                    needed: total,
                    available,
                });
            }

            // Validation is complete; nothing below can fail.
            if let Some((spender, remaining)) = remaining_allowance {
                state.allowances.insert((*from, spender), remaining);
            }
            state.balances.insert(*from, available - total);
            for (to, amount) in legs {
                // Balances sum to total_supply, so a credit cannot overflow.
                *state.balances.entry(*to).or_insert(0) += *amount;
            }
        }

        for (to, amount) in legs.iter().filter(|(_, amount)| *amount > 0) {
            tracing::trace!(token = %self.address, %from, %to, amount, "transfer");
            self.events.emit(&ContractEvent::Transfer {
                from: *from,
                to: *to,
                amount: *amount,
            });
        }
        Ok(())
    }

    fn mint(&self, to: &AccountId, amount: u128) -> Result<(), LedgerError> {
        if to.is_zero() {
            return Err(LedgerError::InvalidAccount);
        }
        {
            let mut state = self.lock();
            state.total_supply = state
                .total_supply
                .checked_add(amount)
                .ok_or(LedgerError::Overflow)?;
            *state.balances.entry(*to).or_insert(0) += amount;
        }
        tracing::debug!(token = %self.address, %to, amount, "mint");
        self.events.emit(&ContractEvent::Transfer {
            from: AccountId::ZERO,
            to: *to,
            amount,
        });
        Ok(())
    }

    fn burn(&self, from: &AccountId, amount: u128) -> Result<(), LedgerError> {
        if from.is_zero() {
            return Err(LedgerError::InvalidAccount);
        }
        {
            let mut state = self.lock();
            let available = state.balance(from);
            if available < amount {
                return Err(LedgerError::InsufficientBalance {
                    needed: amount,
                    available,
                });
            }
            state.balances.insert(*from, available - amount);
            state.total_supply -= amount;
        }
        tracing::debug!(token = %self.address, %from, amount, "burn");
        self.events.emit(&ContractEvent::Transfer {
            from: *from,
            to: AccountId::ZERO,
            amount,
        });
        Ok(())
    }

    fn events(&self) -> &EventBus {
        &self.events
    }
}

impl std::fmt::Debug for MemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLedger")
            .field("address", &self.address)
            .field("symbol", &self.metadata.symbol)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    fn account(n: u64) -> AccountId {
        AccountId::from_low_u64(n)
    }

    fn metadata() -> TokenMetadata {
        TokenMetadata {
            name: "Test".into(),
            symbol: "TST".into(),
            decimals: 18,
        }
    }

    fn make_ledger(supply: u128) -> MemoryLedger {
        MemoryLedger::with_supply(account(1000), metadata(), &account(1), supply).unwrap()
    }

    #[test]
    fn with_supply_mints_once_to_holder() {
        let ledger = make_ledger(1_000_000);
        assert_eq!(ledger.total_supply(), 1_000_000);
        assert_eq!(ledger.balance_of(&account(1)), 1_000_000);
        assert_eq!(ledger.balance_of(&account(2)), 0);
    }

    #[test]
    fn transfer_moves_exact_amount() {
        let ledger = make_ledger(1_000);
        ledger.transfer(&account(1), &account(2), 300).unwrap();
        assert_eq!(ledger.balance_of(&account(1)), 700);
        assert_eq!(ledger.balance_of(&account(2)), 300);
        assert_eq!(ledger.total_supply(), 1_000);
    }

    #[test]
    fn insufficient_balance_leaves_state_untouched() {
        let ledger = make_ledger(100);
        let err = ledger.transfer(&account(1), &account(2), 101).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                needed: 101,
                available: 100
            }
        );
        assert_eq!(ledger.balance_of(&account(1)), 100);
        assert_eq!(ledger.balance_of(&account(2)), 0);
    }

    #[test]
    fn null_recipient_rejected() {
        let ledger = make_ledger(100);
        assert_eq!(
            ledger.transfer(&account(1), &AccountId::ZERO, 1),
            Err(LedgerError::InvalidAccount)
        );
    }

    #[test]
    fn legs_are_all_or_nothing() {
        let ledger = make_ledger(100);
        let legs = [(account(2), 60), (account(3), 41)];
        assert!(ledger.transfer_legs(None, &account(1), &legs).is_err());
        assert_eq!(ledger.balance_of(&account(1)), 100);
        assert_eq!(ledger.balance_of(&account(2)), 0);

        let legs = [(account(2), 60), (account(3), 40)];
        ledger.transfer_legs(None, &account(1), &legs).unwrap();
        assert_eq!(ledger.balance_of(&account(1)), 0);
        assert_eq!(ledger.balance_of(&account(2)), 60);
        assert_eq!(ledger.balance_of(&account(3)), 40);
    }

    #[test]
    fn transfer_from_spends_allowance() {
        let ledger = make_ledger(1_000);
        ledger.approve(&account(1), &account(9), 500).unwrap();
        ledger
            .transfer_from(&account(9), &account(1), &account(2), 200)
            .unwrap();
        assert_eq!(ledger.allowance(&account(1), &account(9)), 300);
        assert_eq!(ledger.balance_of(&account(2)), 200);

        let err = ledger
            .transfer_from(&account(9), &account(1), &account(2), 301)
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientAllowance {
                needed: 301,
                available: 300
            }
        );
        assert_eq!(ledger.allowance(&account(1), &account(9)), 300);
    }

    #[test]
    fn failed_transfer_from_keeps_allowance() {
        let ledger = make_ledger(100);
        ledger.approve(&account(1), &account(9), 1_000).unwrap();
        assert!(ledger
            .transfer_from(&account(9), &account(1), &account(2), 500)
            .is_err());
        assert_eq!(ledger.allowance(&account(1), &account(9)), 1_000);
    }

    #[test]
    fn unlimited_allowance_is_not_decremented() {
        let ledger = make_ledger(1_000);
        ledger.approve(&account(1), &account(9), u128::MAX).unwrap();
        ledger
            .transfer_from(&account(9), &account(1), &account(2), 400)
            .unwrap();
        assert_eq!(ledger.allowance(&account(1), &account(9)), u128::MAX);
    }

    #[test]
    fn burn_reduces_supply() {
        let ledger = make_ledger(1_000);
        ledger.burn(&account(1), 250).unwrap();
        assert_eq!(ledger.total_supply(), 750);
        assert_eq!(ledger.balance_of(&account(1)), 750);
        assert!(ledger.burn(&account(1), 751).is_err());
    }

    #[test]
    fn mint_overflow_rejected() {
        let ledger = make_ledger(u128::MAX);
        assert_eq!(ledger.mint(&account(2), 1), Err(LedgerError::Overflow));
        assert_eq!(ledger.balance_of(&account(2)), 0);
    }

    #[test]
    fn events_follow_committed_movements() {
        let ledger = make_ledger(1_000);
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        ledger
            .events()
            .subscribe(move |e| sink.lock().unwrap().push(e.clone()));

        ledger.transfer(&account(1), &account(2), 10).unwrap();
        ledger.transfer(&account(1), &account(2), 0).unwrap();
        let _ = ledger.transfer(&account(1), &account(2), 10_000);

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![ContractEvent::Transfer {
                from: account(1),
                to: account(2),
                amount: 10
            }]
        );
    }
}
