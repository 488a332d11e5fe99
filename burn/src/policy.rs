//! The burn-on-transfer ledger decorator.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::BurnError;
use cinder_access::Ownership;
use cinder_ledger::{LedgerError, TokenLedger, TokenMetadata};
use cinder_types::{AccountId, ContractEvent, EventBus, BPS_DENOMINATOR};
use cinder_utils::apply_bps;

/// Protocol-wide burn rate: 1% (100 of 10_000 bps).
pub const DEFAULT_BURN_RATE_BPS: u32 = 100;

#[derive(Debug)]
struct BurnState {
    ownership: Ownership,
    exempt: HashSet<AccountId>,
    /// Exemptions that can never be removed, such as engine custody.
    pinned: HashSet<AccountId>,
    total_burned: u128,
}

/// A ledger that burns a fixed fraction of every transfer.
///
/// The burn leg is moved to `sink` rather than destroyed, so
/// `circulating_supply() + balance_of(sink) == total_supply()` always holds.
/// `mint` and `burn` pass through untouched.
///
/// Transfers are serialized by their own lock, which views never take, and
/// the policy state is never held while the inner ledger runs. Listeners may
/// read any view from inside an event callback but must not start another
/// transfer on the same token.
pub struct BurnLedger<L> {
    inner: L,
    sink: AccountId,
    burn_rate_bps: u32,
    state: Mutex<BurnState>,
    transfers: Mutex<()>,
}

impl<L: TokenLedger> BurnLedger<L> {
    /// Wrap `inner` with the default 1% burn into `sink`.
    ///
    /// The owner starts out exempt.
    pub fn new(inner: L, owner: AccountId, sink: AccountId) -> Result<Self, BurnError> {
        Self::with_rate(inner, owner, sink, DEFAULT_BURN_RATE_BPS)
    }

    pub fn with_rate(
        inner: L,
        owner: AccountId,
        sink: AccountId,
        burn_rate_bps: u32,
    ) -> Result<Self, BurnError> {
        if owner.is_zero() || sink.is_zero() {
            return Err(BurnError::InvalidAccount);
        }
        if burn_rate_bps as u128 > BPS_DENOMINATOR {
            return Err(BurnError::InvalidRate(burn_rate_bps));
        }
        let mut exempt = HashSet::new();
        exempt.insert(owner);
        Ok(Self {
            inner,
            sink,
            burn_rate_bps,
            state: Mutex::new(BurnState {
                ownership: Ownership::new(owner),
                exempt,
                pinned: HashSet::new(),
                total_burned: 0,
            }),
            transfers: Mutex::new(()),
        })
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    pub fn sink(&self) -> AccountId {
        self.sink
    }

    pub fn burn_rate_bps(&self) -> u32 {
        self.burn_rate_bps
    }

    pub fn owner(&self) -> AccountId {
        self.lock().ownership.owner()
    }

    pub fn total_burned(&self) -> u128 {
        self.lock().total_burned
    }

    pub fn is_exempt(&self, account: &AccountId) -> bool {
        self.lock().exempt.contains(account)
    }

    pub fn is_pinned(&self, account: &AccountId) -> bool {
        self.lock().pinned.contains(account)
    }

    /// `total_supply − balance_of(sink)`.
    pub fn circulating_supply(&self) -> u128 {
        self.inner
            .total_supply()
            .saturating_sub(self.inner.balance_of(&self.sink))
    }

    /// The `(burn, net)` split a transfer from `from` to `to` would get now.
    pub fn preview_burn(&self, from: &AccountId, to: &AccountId, amount: u128) -> (u128, u128) {
        let state = self.lock();
        let burn = self.burn_for(&state, from, to, amount);
        (burn, amount - burn)
    }

    /// Owner-only: add or remove `account` from the exemption set.
    pub fn set_exempt(
        &self,
        caller: &AccountId,
        account: &AccountId,
        exempt: bool,
    ) -> Result<(), BurnError> {
        self.set_exempt_batch(caller, std::slice::from_ref(account), exempt)
    }

    /// Owner-only batch variant. Nothing changes if any account is null or
    /// if the batch would lift a pinned exemption.
    pub fn set_exempt_batch(
        &self,
        caller: &AccountId,
        accounts: &[AccountId],
        exempt: bool,
    ) -> Result<(), BurnError> {
        self.update_exemptions(caller, accounts, exempt, false)
    }

    /// Owner-only: exempt `accounts` for good. Custody accounts that credit
    /// deposits at face value are pinned so they never receive a net leg.
    pub fn pin_exempt(&self, caller: &AccountId, accounts: &[AccountId]) -> Result<(), BurnError> {
        self.update_exemptions(caller, accounts, true, true)
    }

    fn update_exemptions(
        &self,
        caller: &AccountId,
        accounts: &[AccountId],
        exempt: bool,
        pin: bool,
    ) -> Result<(), BurnError> {
        {
            let mut state = self.lock();
            state.ownership.ensure_owner(caller)?;
            if accounts.iter().any(AccountId::is_zero) {
                return Err(BurnError::InvalidAccount);
            }
            if !exempt {
                if let Some(account) = accounts.iter().find(|a| state.pinned.contains(*a)) {
                    return Err(BurnError::PinnedExemption(*account));
                }
            }
            for account in accounts {
                if pin {
                    state.pinned.insert(*account);
                }
                if exempt {
                    state.exempt.insert(*account);
                } else {
                    state.exempt.remove(account);
                }
            }
        }
        for account in accounts {
            tracing::info!(%account, exempt, pinned = pin, "burn exemption updated");
            self.inner.events().emit(&ContractEvent::ExemptionUpdated {
                account: *account,
                exempt,
            });
        }
        Ok(())
    }

    pub fn transfer_ownership(
        &self,
        caller: &AccountId,
        new_owner: AccountId,
    ) -> Result<(), BurnError> {
        let previous_owner = self.lock().ownership.transfer(caller, new_owner)?;
        self.inner.events().emit(&ContractEvent::OwnershipTransferred {
            previous_owner,
            new_owner,
        });
        Ok(())
    }

    fn burn_for(&self, state: &BurnState, from: &AccountId, to: &AccountId, amount: u128) -> u128 {
        if state.exempt.contains(from) || state.exempt.contains(to) {
            0
        } else {
            apply_bps(amount, self.burn_rate_bps)
        }
    }

    fn lock(&self) -> MutexGuard<'_, BurnState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<L: TokenLedger> TokenLedger for BurnLedger<L> {
    fn address(&self) -> AccountId {
        self.inner.address()
    }

    fn metadata(&self) -> TokenMetadata {
        self.inner.metadata()
    }

    fn balance_of(&self, account: &AccountId) -> u128 {
        self.inner.balance_of(account)
    }

    fn total_supply(&self) -> u128 {
        self.inner.total_supply()
    }

    fn allowance(&self, owner: &AccountId, spender: &AccountId) -> u128 {
        self.inner.allowance(owner, spender)
    }

    fn approve(
        &self,
        owner: &AccountId,
        spender: &AccountId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        self.inner.approve(owner, spender, amount)
    }

    /// Split each leg into a burn leg to the sink and a net leg, then hand
    /// the expanded list to the inner ledger as one atomic movement.
    fn transfer_legs(
        &self,
        spender: Option<&AccountId>,
        from: &AccountId,
        legs: &[(AccountId, u128)],
    ) -> Result<(), LedgerError> {
        // Only transfers move total_burned, so the sum computed below is
        // still current when it is committed.
        let _serial = self.transfers.lock().unwrap_or_else(PoisonError::into_inner);

        let mut expanded = Vec::with_capacity(legs.len() * 2);
        let mut burns = Vec::new();
        let total_burned = {
            let state = self.lock();
            for (to, amount) in legs {
                let burn = self.burn_for(&state, from, to, *amount);
                if burn > 0 {
                    expanded.push((self.sink, burn));
                    burns.push((*to, burn));
                }
                expanded.push((*to, amount - burn));
            }
            burns
                .iter()
                .try_fold(state.total_burned, |acc, (_, burn)| acc.checked_add(*burn))
                .ok_or(LedgerError::Overflow)?
        };

        self.inner.transfer_legs(spender, from, &expanded)?;
        self.lock().total_burned = total_burned;

        for (to, amount) in burns {
            tracing::debug!(%from, %to, amount, "transfer burn");
            self.inner.events().emit(&ContractEvent::Burned {
                from: *from,
                to,
                amount,
            });
        }
        Ok(())
    }

    fn mint(&self, to: &AccountId, amount: u128) -> Result<(), LedgerError> {
        self.inner.mint(to, amount)
    }

    fn burn(&self, from: &AccountId, amount: u128) -> Result<(), LedgerError> {
        self.inner.burn(from, amount)
    }

    fn events(&self) -> &EventBus {
        self.inner.events()
    }
}
