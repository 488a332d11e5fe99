//! Core vesting engine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::VestingError;
use crate::schedule::VestingSchedule;
use cinder_access::{Ownership, ReentrancyGuard};
use cinder_ledger::TokenLedger;
use cinder_types::{AccountId, Clock, ContractEvent, EventBus};
use cinder_utils::format_duration;

#[derive(Debug)]
struct VestingState {
    ownership: Ownership,
    schedules: HashMap<AccountId, Vec<VestingSchedule>>,
    total_locked: u128,
}

impl VestingState {
    fn schedule(&self, beneficiary: &AccountId, index: usize) -> Result<&VestingSchedule, VestingError> {
        let list = self.schedules.get(beneficiary).map(Vec::as_slice).unwrap_or(&[]);
        list.get(index).ok_or(VestingError::InvalidIndex {
            index,
            count: list.len(),
        })
    }

    fn schedule_mut(&mut self, beneficiary: &AccountId, index: usize) -> Option<&mut VestingSchedule> {
        self.schedules.get_mut(beneficiary)?.get_mut(index)
    }
}

/// The vesting engine: holds granted tokens in custody and releases them
/// to beneficiaries along each schedule's curve.
///
/// Same locking discipline as the staking engine: mutators take the
/// reentrancy guard, compute under the state lock, release it for the
/// ledger call and commit afterwards.
///
/// Grants are credited at the requested amount, so on a burning token the
/// custody account must be permanently burn-exempt (see
/// `BurnLedger::pin_exempt`).
///
/// The guard fails fast: concurrent mutators from different threads get
/// [`ReentrantCall`](cinder_access::AccessError::ReentrantCall) instead of waiting. Callers sharing an
/// engine across threads serialize access themselves.
pub struct VestingEngine<L> {
    address: AccountId,
    token: Arc<L>,
    clock: Arc<dyn Clock>,
    guard: ReentrancyGuard,
    state: Mutex<VestingState>,
    events: EventBus,
}

impl<L: TokenLedger> VestingEngine<L> {
    pub fn new(
        address: AccountId,
        token: Arc<L>,
        owner: AccountId,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, VestingError> {
        if address.is_zero() || owner.is_zero() {
            return Err(VestingError::InvalidAccount);
        }
        Ok(Self {
            address,
            token,
            clock,
            guard: ReentrancyGuard::new(),
            state: Mutex::new(VestingState {
                ownership: Ownership::new(owner),
                schedules: HashMap::new(),
                total_locked: 0,
            }),
            events: EventBus::new(),
        })
    }

    /// Owner-only. Pulls `amount` from the owner into custody and appends a
    /// schedule starting now. Returns the new schedule's index.
    pub fn create_vesting(
        &self,
        caller: &AccountId,
        beneficiary: &AccountId,
        amount: u128,
        cliff_duration: u64,
        vesting_duration: u64,
    ) -> Result<usize, VestingError> {
        let _entered = self.guard.enter()?;
        let total_locked = {
            let state = self.lock();
            state.ownership.ensure_owner(caller)?;
            if beneficiary.is_zero() {
                return Err(VestingError::InvalidBeneficiary);
            }
            if amount == 0 {
                return Err(VestingError::InvalidAmount);
            }
            if vesting_duration == 0 {
                return Err(VestingError::InvalidDuration);
            }
            if cliff_duration > vesting_duration {
                return Err(VestingError::CliffExceedsVesting {
                    cliff: cliff_duration,
                    vesting: vesting_duration,
                });
            }
            state
                .total_locked
                .checked_add(amount)
                .ok_or(VestingError::Overflow)?
        };

        self.token
            .transfer_from(&self.address, caller, &self.address, amount)?;

        let start_time = self.clock.now();
        let index = {
            let mut state = self.lock();
            let list = state.schedules.entry(*beneficiary).or_default();
            list.push(VestingSchedule::new(
                amount,
                start_time,
                cliff_duration,
                vesting_duration,
            ));
            let index = list.len() - 1;
            state.total_locked = total_locked;
            index
        };

        tracing::info!(
            %beneficiary,
            index,
            amount,
            cliff = %format_duration(cliff_duration),
            vesting = %format_duration(vesting_duration),
            "vesting created"
        );
        self.events.emit(&ContractEvent::VestingCreated {
            beneficiary: *beneficiary,
            index,
            amount,
            cliff_duration,
            vesting_duration,
        });
        Ok(index)
    }

    /// Pay the caller everything releasable on one schedule.
    pub fn release(&self, caller: &AccountId, index: usize) -> Result<u128, VestingError> {
        let _entered = self.guard.enter()?;
        let now = self.clock.now();
        let amount = {
            let state = self.lock();
            let schedule = state.schedule(caller, index)?;
            if schedule.revoked {
                return Err(VestingError::AlreadyRevoked(index));
            }
            let releasable = schedule.releasable_at(now);
            if releasable == 0 {
                return Err(VestingError::NothingToRelease);
            }
            releasable
        };

        self.token.transfer(&self.address, caller, amount)?;

        {
            let mut state = self.lock();
            if let Some(schedule) = state.schedule_mut(caller, index) {
                schedule.released_amount += amount;
            }
            state.total_locked -= amount;
        }

        tracing::debug!(beneficiary = %caller, index, amount, "tokens released");
        self.events.emit(&ContractEvent::TokensReleased {
            beneficiary: *caller,
            amount,
        });
        Ok(amount)
    }

    /// Release across all of the caller's live schedules in one transfer.
    /// Revoked schedules are skipped.
    pub fn release_all(&self, caller: &AccountId) -> Result<u128, VestingError> {
        let _entered = self.guard.enter()?;
        let now = self.clock.now();
        let (updates, total) = {
            let state = self.lock();
            let mut updates = Vec::new();
            let mut total: u128 = 0;
            for (index, schedule) in state.schedules.get(caller).into_iter().flatten().enumerate() {
                if schedule.revoked {
                    continue;
                }
                let releasable = schedule.releasable_at(now);
                if releasable > 0 {
                    total = total.checked_add(releasable).ok_or(VestingError::Overflow)?;
                    updates.push((index, releasable));
                }
            }
            if total == 0 {
                return Err(VestingError::NothingToRelease);
            }
            (updates, total)
        };

        self.token.transfer(&self.address, caller, total)?;

        {
            let mut state = self.lock();
            for &(index, amount) in &updates {
                if let Some(schedule) = state.schedule_mut(caller, index) {
                    schedule.released_amount += amount;
                }
            }
            state.total_locked -= total;
        }

        tracing::debug!(beneficiary = %caller, schedules = updates.len(), amount = total, "tokens released");
        self.events.emit(&ContractEvent::TokensReleased {
            beneficiary: *caller,
            amount: total,
        });
        Ok(total)
    }

    /// Owner-only. Freezes the schedule at what has vested so far and
    /// refunds the unvested remainder to the owner. Returns the refund.
    ///
    /// Vested but unreleased tokens stay in custody: a revoked schedule can
    /// no longer be released.
    pub fn revoke(&self, caller: &AccountId, beneficiary: &AccountId, index: usize) -> Result<u128, VestingError> {
        let _entered = self.guard.enter()?;
        let now = self.clock.now();
        let (owner, vested_now, refund) = {
            let state = self.lock();
            state.ownership.ensure_owner(caller)?;
            if beneficiary.is_zero() {
                return Err(VestingError::InvalidBeneficiary);
            }
            let schedule = state.schedule(beneficiary, index)?;
            if schedule.revoked {
                return Err(VestingError::AlreadyRevoked(index));
            }
            let vested_now = schedule.vested_at(now);
            (
                state.ownership.owner(),
                vested_now,
                schedule.total_amount - vested_now,
            )
        };

        if refund > 0 {
            self.token.transfer(&self.address, &owner, refund)?;
        }

        {
            let mut state = self.lock();
            if let Some(schedule) = state.schedule_mut(beneficiary, index) {
                schedule.total_amount = vested_now;
                schedule.revoked = true;
            }
            state.total_locked -= refund;
        }

        tracing::info!(%beneficiary, index, vested = vested_now, refunded = refund, "vesting revoked");
        self.events.emit(&ContractEvent::VestingRevoked {
            beneficiary: *beneficiary,
            index,
            refunded: refund,
        });
        Ok(refund)
    }

    pub fn transfer_ownership(&self, caller: &AccountId, new_owner: AccountId) -> Result<(), VestingError> {
        let _entered = self.guard.enter()?;
        let previous_owner = self.lock().ownership.transfer(caller, new_owner)?;
        self.events.emit(&ContractEvent::OwnershipTransferred {
            previous_owner,
            new_owner,
        });
        Ok(())
    }

    pub fn schedule_count(&self, beneficiary: &AccountId) -> usize {
        self.lock().schedules.get(beneficiary).map_or(0, Vec::len)
    }

    pub fn schedule(&self, beneficiary: &AccountId, index: usize) -> Option<VestingSchedule> {
        self.lock().schedule(beneficiary, index).ok().cloned()
    }

    pub fn schedules(&self, beneficiary: &AccountId) -> Vec<VestingSchedule> {
        self.lock()
            .schedules
            .get(beneficiary)
            .cloned()
            .unwrap_or_default()
    }

    pub fn vested_amount(&self, beneficiary: &AccountId, index: usize) -> Result<u128, VestingError> {
        let now = self.clock.now();
        Ok(self.lock().schedule(beneficiary, index)?.vested_at(now))
    }

    pub fn releasable_amount(&self, beneficiary: &AccountId, index: usize) -> Result<u128, VestingError> {
        let now = self.clock.now();
        Ok(self.lock().schedule(beneficiary, index)?.releasable_at(now))
    }

    /// What `release_all` would pay right now.
    pub fn total_releasable(&self, beneficiary: &AccountId) -> u128 {
        let now = self.clock.now();
        self.lock()
            .schedules
            .get(beneficiary)
            .into_iter()
            .flatten()
            .filter(|s| !s.revoked)
            .fold(0u128, |acc, s| acc.saturating_add(s.releasable_at(now)))
    }

    pub fn total_locked(&self) -> u128 {
        self.lock().total_locked
    }

    pub fn owner(&self) -> AccountId {
        self.lock().ownership.owner()
    }

    pub fn address(&self) -> AccountId {
        self.address
    }

    pub fn token(&self) -> &Arc<L> {
        &self.token
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    fn lock(&self) -> MutexGuard<'_, VestingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
