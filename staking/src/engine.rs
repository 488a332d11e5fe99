//! Core staking engine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::StakingError;
use crate::params::StakingParams;
use crate::stake::StakeRecord;
use cinder_access::{Ownership, ReentrancyGuard};
use cinder_ledger::TokenLedger;
use cinder_types::{AccountId, Clock, ContractEvent, EventBus, Timestamp, BPS_DENOMINATOR};
use cinder_utils::apply_bps;

#[derive(Debug)]
struct StakingState {
    ownership: Ownership,
    params: StakingParams,
    stakes: HashMap<AccountId, StakeRecord>,
    total_staked: u128,
    reward_pool: u128,
    total_rewards_claimed: u128,
}

impl StakingState {
    fn record(&self, account: &AccountId) -> StakeRecord {
        self.stakes.get(account).cloned().unwrap_or_default()
    }

    fn realize(&self, account: &AccountId, now: Timestamp) -> Result<StakeRecord, StakingError> {
        self.record(account)
            .realized(self.params.reward_rate_bps, self.params.seconds_per_year, now)
            .ok_or(StakingError::Overflow)
    }
}

/// What an [`StakingEngine::exit`] actually paid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExitOutcome {
    /// Principal returned (always the full stake).
    pub withdrawn: u128,
    /// Rewards paid; zero when the reward leg was skipped.
    pub rewards_paid: u128,
}

/// The staking engine: holds principal in custody and pays rewards from a
/// separately funded pool of the same token.
///
/// Custody is the engine's own `address` on the token ledger. Stakers and
/// the owner approve the engine before `stake` / `fund_reward_pool`.
/// Deposits are credited at the requested amount, so on a burning token the
/// custody account must be permanently burn-exempt (see
/// `BurnLedger::pin_exempt`).
///
/// Every mutating entry point runs under the instance's reentrancy guard.
/// The state lock is never held across a ledger call: accounting is computed
/// first, the tokens move, then the result is committed. A failed ledger
/// call therefore leaves the engine untouched.
///
/// The guard fails fast rather than queueing: two threads calling mutators
/// at the same moment get [`ReentrantCall`](cinder_access::AccessError::ReentrantCall) for the loser.
/// Embedders sharing one engine across threads serialize calls themselves.
pub struct StakingEngine<L> {
    address: AccountId,
    token: Arc<L>,
    clock: Arc<dyn Clock>,
    guard: ReentrancyGuard,
    state: Mutex<StakingState>,
    events: EventBus,
}

impl<L: TokenLedger> StakingEngine<L> {
    pub fn new(
        address: AccountId,
        token: Arc<L>,
        owner: AccountId,
        params: StakingParams,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StakingError> {
        params.validate()?;
        if address.is_zero() || owner.is_zero() {
            return Err(StakingError::InvalidParams(
                "engine address and owner must not be null".into(),
            ));
        }
        Ok(Self {
            address,
            token,
            clock,
            guard: ReentrancyGuard::new(),
            state: Mutex::new(StakingState {
                ownership: Ownership::new(owner),
                params,
                stakes: HashMap::new(),
                total_staked: 0,
                reward_pool: 0,
                total_rewards_claimed: 0,
            }),
            events: EventBus::new(),
        })
    }

    /// Lock `amount` of the caller's tokens as principal.
    ///
    /// An account without principal must stake at least the minimum; top-ups
    /// are not floored. Pending rewards are realized before principal changes.
    pub fn stake(&self, caller: &AccountId, amount: u128) -> Result<(), StakingError> {
        let _entered = self.guard.enter()?;
        if amount == 0 {
            return Err(StakingError::ZeroAmount);
        }
        let now = self.clock.now();
        let (record, total_staked) = {
            let state = self.lock();
            let mut record = state.realize(caller, now)?;
            if !record.is_staked() && amount < state.params.minimum_stake {
                return Err(StakingError::BelowMinimum {
                    amount,
                    minimum: state.params.minimum_stake,
                });
            }
            record.principal = record
                .principal
                .checked_add(amount)
                .ok_or(StakingError::Overflow)?;
            let total_staked = state
                .total_staked
                .checked_add(amount)
                .ok_or(StakingError::Overflow)?;
            (record, total_staked)
        };

        self.token
            .transfer_from(&self.address, caller, &self.address, amount)?;

        let principal = record.principal;
        {
            let mut state = self.lock();
            state.stakes.insert(*caller, record);
            state.total_staked = total_staked;
        }

        tracing::debug!(account = %caller, amount, principal, "staked");
        self.events.emit(&ContractEvent::Staked {
            account: *caller,
            amount,
        });
        Ok(())
    }

    /// Return `amount` of the caller's principal.
    pub fn withdraw(&self, caller: &AccountId, amount: u128) -> Result<(), StakingError> {
        let _entered = self.guard.enter()?;
        if amount == 0 {
            return Err(StakingError::ZeroAmount);
        }
        let now = self.clock.now();
        let mut record = self.lock().realize(caller, now)?;
        if amount > record.principal {
            return Err(StakingError::InsufficientStake {
                requested: amount,
                staked: record.principal,
            });
        }
        record.principal -= amount;

        self.token.transfer(&self.address, caller, amount)?;

        let principal = record.principal;
        {
            let mut state = self.lock();
            state.stakes.insert(*caller, record);
            state.total_staked -= amount;
        }

        tracing::debug!(account = %caller, amount, principal, "withdrawn");
        self.events.emit(&ContractEvent::Withdrawn {
            account: *caller,
            amount,
        });
        Ok(())
    }

    /// Pay out everything the caller is owed. Returns the amount paid.
    pub fn claim_rewards(&self, caller: &AccountId) -> Result<u128, StakingError> {
        let _entered = self.guard.enter()?;
        let now = self.clock.now();
        let mut record = {
            let state = self.lock();
            let record = state.realize(caller, now)?;
            if record.accrued == 0 {
                return Err(StakingError::NoRewards);
            }
            if state.reward_pool < record.accrued {
                return Err(StakingError::InsufficientPool {
                    owed: record.accrued,
                    pool: state.reward_pool,
                });
            }
            record
        };
        let owed = record.accrued;

        self.token.transfer(&self.address, caller, owed)?;

        record.accrued = 0;
        {
            let mut state = self.lock();
            state.stakes.insert(*caller, record);
            state.reward_pool -= owed;
            state.total_rewards_claimed = state.total_rewards_claimed.saturating_add(owed);
        }

        tracing::debug!(account = %caller, amount = owed, "rewards claimed");
        self.events.emit(&ContractEvent::RewardsClaimed {
            account: *caller,
            amount: owed,
        });
        Ok(owed)
    }

    /// Withdraw all principal, then try to claim all rewards.
    ///
    /// The withdrawal always commits. If the pool cannot cover the rewards
    /// the reward leg is skipped, not rolled back, and the rewards stay
    /// claimable later.
    pub fn exit(&self, caller: &AccountId) -> Result<ExitOutcome, StakingError> {
        let _entered = self.guard.enter()?;
        let now = self.clock.now();
        let mut record = self.lock().realize(caller, now)?;
        if !record.is_staked() {
            return Err(StakingError::NothingStaked);
        }
        let withdrawn = record.principal;

        self.token.transfer(&self.address, caller, withdrawn)?;

        record.principal = 0;
        let owed = record.accrued;
        let pool = {
            let mut state = self.lock();
            state.stakes.insert(*caller, record);
            state.total_staked -= withdrawn;
            state.reward_pool
        };
        tracing::debug!(account = %caller, amount = withdrawn, "withdrawn on exit");
        self.events.emit(&ContractEvent::Withdrawn {
            account: *caller,
            amount: withdrawn,
        });

        let rewards_paid = if owed == 0 {
            0
        } else if pool < owed {
            tracing::warn!(account = %caller, owed, pool, "reward pool short on exit, reward leg skipped");
            0
        } else if let Err(e) = self.token.transfer(&self.address, caller, owed) {
            tracing::warn!(account = %caller, owed, error = %e, "exit reward leg failed, skipped");
            0
        } else {
            {
                let mut state = self.lock();
                if let Some(record) = state.stakes.get_mut(caller) {
                    record.accrued = 0;
                }
                state.reward_pool -= owed;
                state.total_rewards_claimed = state.total_rewards_claimed.saturating_add(owed);
            }
            tracing::debug!(account = %caller, amount = owed, "rewards claimed on exit");
            self.events.emit(&ContractEvent::RewardsClaimed {
                account: *caller,
                amount: owed,
            });
            owed
        };

        Ok(ExitOutcome {
            withdrawn,
            rewards_paid,
        })
    }

    /// Owner-only. Applies to every account's open interval from now on;
    /// already-realized rewards keep their old pricing.
    pub fn set_reward_rate(&self, caller: &AccountId, new_rate_bps: u32) -> Result<(), StakingError> {
        let _entered = self.guard.enter()?;
        let old_rate_bps = {
            let mut state = self.lock();
            state.ownership.ensure_owner(caller)?;
            if new_rate_bps as u128 > BPS_DENOMINATOR {
                return Err(StakingError::RateTooHigh(new_rate_bps));
            }
            std::mem::replace(&mut state.params.reward_rate_bps, new_rate_bps)
        };

        tracing::info!(old_rate_bps, new_rate_bps, "reward rate updated");
        self.events.emit(&ContractEvent::RewardRateUpdated {
            old_rate_bps,
            new_rate_bps,
        });
        Ok(())
    }

    /// Owner-only: floor applied to first stakes.
    pub fn set_minimum_stake(&self, caller: &AccountId, new_minimum: u128) -> Result<(), StakingError> {
        let _entered = self.guard.enter()?;
        let old_minimum = {
            let mut state = self.lock();
            state.ownership.ensure_owner(caller)?;
            std::mem::replace(&mut state.params.minimum_stake, new_minimum)
        };

        tracing::info!(old_minimum, new_minimum, "minimum stake updated");
        self.events.emit(&ContractEvent::MinimumStakeUpdated {
            old_minimum,
            new_minimum,
        });
        Ok(())
    }

    /// Owner-only: pull `amount` from the owner into the reward pool.
    pub fn fund_reward_pool(&self, caller: &AccountId, amount: u128) -> Result<(), StakingError> {
        let _entered = self.guard.enter()?;
        let pool = {
            let state = self.lock();
            state.ownership.ensure_owner(caller)?;
            if amount == 0 {
                return Err(StakingError::ZeroAmount);
            }
            state
                .reward_pool
                .checked_add(amount)
                .ok_or(StakingError::Overflow)?
        };

        self.token
            .transfer_from(&self.address, caller, &self.address, amount)?;

        self.lock().reward_pool = pool;
        tracing::info!(amount, pool, "reward pool funded");
        self.events.emit(&ContractEvent::RewardPoolFunded { amount });
        Ok(())
    }

    /// Owner-only emergency sweep of a foreign asset held by the engine.
    pub fn recover_tokens(
        &self,
        caller: &AccountId,
        asset: &dyn TokenLedger,
        amount: u128,
    ) -> Result<(), StakingError> {
        let _entered = self.guard.enter()?;
        let owner = {
            let state = self.lock();
            state.ownership.ensure_owner(caller)?;
            state.ownership.owner()
        };
        if asset.address() == self.token.address() {
            return Err(StakingError::CannotRecoverStakingToken);
        }
        if amount == 0 {
            return Err(StakingError::ZeroAmount);
        }

        asset.transfer(&self.address, &owner, amount)?;

        let token = asset.address();
        tracing::warn!(%token, amount, "foreign tokens recovered");
        self.events.emit(&ContractEvent::TokensRecovered { token, amount });
        Ok(())
    }

    pub fn transfer_ownership(&self, caller: &AccountId, new_owner: AccountId) -> Result<(), StakingError> {
        let _entered = self.guard.enter()?;
        let previous_owner = self.lock().ownership.transfer(caller, new_owner)?;
        self.events.emit(&ContractEvent::OwnershipTransferred {
            previous_owner,
            new_owner,
        });
        Ok(())
    }

    /// Everything `account` could claim right now, with checked arithmetic.
    pub fn pending_rewards_checked(&self, account: &AccountId) -> Result<u128, StakingError> {
        let now = self.clock.now();
        let state = self.lock();
        state
            .record(account)
            .total_owed_checked(state.params.reward_rate_bps, state.params.seconds_per_year, now)
            .ok_or(StakingError::Overflow)
    }

    /// Everything `account` could claim right now, returning 0 on overflow.
    pub fn pending_rewards(&self, account: &AccountId) -> u128 {
        self.pending_rewards_checked(account).unwrap_or(0)
    }

    /// Reward a principal would earn over one full year at the current rate.
    pub fn annual_reward(&self, principal: u128) -> u128 {
        apply_bps(principal, self.lock().params.reward_rate_bps)
    }

    pub fn stake_of(&self, account: &AccountId) -> StakeRecord {
        self.lock().record(account)
    }

    pub fn total_staked(&self) -> u128 {
        self.lock().total_staked
    }

    pub fn reward_pool(&self) -> u128 {
        self.lock().reward_pool
    }

    pub fn total_rewards_claimed(&self) -> u128 {
        self.lock().total_rewards_claimed
    }

    pub fn reward_rate_bps(&self) -> u32 {
        self.lock().params.reward_rate_bps
    }

    pub fn minimum_stake(&self) -> u128 {
        self.lock().params.minimum_stake
    }

    pub fn params(&self) -> StakingParams {
        self.lock().params.clone()
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

    fn lock(&self) -> MutexGuard<'_, StakingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_access::AccessError;
    use cinder_ledger::{LedgerError, MemoryLedger, TokenMetadata};
    use cinder_nullables::{EventRecorder, NullClock};
    use cinder_types::SECONDS_PER_YEAR;
    use std::sync::OnceLock;

    const OWNER: u64 = 1;
    const ENGINE: u64 = 900;
    const START: u64 = 1_700_000_000;

    fn account(n: u64) -> AccountId {
        AccountId::from_low_u64(n)
    }

    fn metadata(symbol: &str) -> TokenMetadata {
        TokenMetadata {
            name: symbol.into(),
            symbol: symbol.into(),
            decimals: 18,
        }
    }

    struct Fixture {
        token: Arc<MemoryLedger>,
        clock: Arc<NullClock>,
        engine: StakingEngine<MemoryLedger>,
    }

    fn setup() -> Fixture {
        let token = Arc::new(
            MemoryLedger::with_supply(account(500), metadata("CDR"), &account(OWNER), 10_000_000)
                .unwrap(),
        );
        for n in [2, 3] {
            token.transfer(&account(OWNER), &account(n), 100_000).unwrap();
        }
        for n in [OWNER, 2, 3] {
            token.approve(&account(n), &account(ENGINE), u128::MAX).unwrap();
        }
        let clock = Arc::new(NullClock::new(START));
        let params = StakingParams {
            minimum_stake: 100,
            ..Default::default()
        };
        let engine = StakingEngine::new(
            account(ENGINE),
            Arc::clone(&token),
            account(OWNER),
            params,
            clock.clone(),
        )
        .unwrap();
        Fixture {
            token,
            clock,
            engine,
        }
    }

    #[test]
    fn one_year_at_default_rate_accrues_ten_percent() {
        let f = setup();
        f.engine.stake(&account(2), 1_000).unwrap();
        f.clock.advance(SECONDS_PER_YEAR);
        assert_eq!(f.engine.pending_rewards(&account(2)), 100);
    }

    #[test]
    fn stake_moves_tokens_into_custody() {
        let f = setup();
        f.engine.stake(&account(2), 1_000).unwrap();
        assert_eq!(f.token.balance_of(&account(ENGINE)), 1_000);
        assert_eq!(f.token.balance_of(&account(2)), 99_000);
        assert_eq!(f.engine.total_staked(), 1_000);
        let record = f.engine.stake_of(&account(2));
        assert_eq!(record.principal, 1_000);
        assert_eq!(record.last_update, Some(Timestamp::new(START)));
    }

    #[test]
    fn claim_pays_and_zeroes_pending() {
        let f = setup();
        f.engine.fund_reward_pool(&account(OWNER), 1_000).unwrap();
        f.engine.stake(&account(2), 1_000).unwrap();
        f.clock.advance(SECONDS_PER_YEAR);

        let paid = f.engine.claim_rewards(&account(2)).unwrap();
        assert_eq!(paid, 100);
        assert_eq!(f.engine.pending_rewards(&account(2)), 0);
        assert_eq!(f.engine.reward_pool(), 900);
        assert_eq!(f.engine.total_rewards_claimed(), 100);
        assert_eq!(f.token.balance_of(&account(2)), 99_100);
    }

    #[test]
    fn zero_amounts_rejected() {
        let f = setup();
        assert_eq!(f.engine.stake(&account(2), 0), Err(StakingError::ZeroAmount));
        assert_eq!(f.engine.withdraw(&account(2), 0), Err(StakingError::ZeroAmount));
        assert_eq!(
            f.engine.fund_reward_pool(&account(OWNER), 0),
            Err(StakingError::ZeroAmount)
        );
    }

    #[test]
    fn minimum_applies_only_to_first_stake() {
        let f = setup();
        assert_eq!(
            f.engine.stake(&account(2), 99),
            Err(StakingError::BelowMinimum {
                amount: 99,
                minimum: 100
            })
        );
        f.engine.stake(&account(2), 100).unwrap();
        f.engine.stake(&account(2), 1).unwrap();
        assert_eq!(f.engine.stake_of(&account(2)).principal, 101);
    }

    #[test]
    fn minimum_applies_again_after_full_withdrawal() {
        let f = setup();
        f.engine.stake(&account(2), 100).unwrap();
        f.engine.withdraw(&account(2), 100).unwrap();
        assert!(matches!(
            f.engine.stake(&account(2), 50),
            Err(StakingError::BelowMinimum { .. })
        ));
    }

    #[test]
    fn withdraw_more_than_principal_rejected() {
        let f = setup();
        f.engine.stake(&account(2), 1_000).unwrap();
        assert_eq!(
            f.engine.withdraw(&account(2), 1_001),
            Err(StakingError::InsufficientStake {
                requested: 1_001,
                staked: 1_000
            })
        );
        assert_eq!(f.engine.total_staked(), 1_000);
    }

    #[test]
    fn partial_withdraw_realizes_rewards_first() {
        let f = setup();
        f.engine.stake(&account(2), 1_000).unwrap();
        f.clock.advance(SECONDS_PER_YEAR / 2);
        f.engine.withdraw(&account(2), 500).unwrap();
        assert_eq!(f.engine.stake_of(&account(2)).accrued, 50);

        f.clock.advance(SECONDS_PER_YEAR / 2);
        assert_eq!(f.engine.pending_rewards(&account(2)), 75);
        assert_eq!(f.token.balance_of(&account(2)), 99_500);
    }

    #[test]
    fn claim_without_rewards_rejected() {
        let f = setup();
        assert_eq!(f.engine.claim_rewards(&account(2)), Err(StakingError::NoRewards));
        f.engine.stake(&account(2), 1_000).unwrap();
        assert_eq!(f.engine.claim_rewards(&account(2)), Err(StakingError::NoRewards));
    }

    #[test]
    fn claim_with_short_pool_changes_nothing() {
        let f = setup();
        f.engine.fund_reward_pool(&account(OWNER), 10).unwrap();
        f.engine.stake(&account(2), 1_000).unwrap();
        f.clock.advance(SECONDS_PER_YEAR);

        assert_eq!(
            f.engine.claim_rewards(&account(2)),
            Err(StakingError::InsufficientPool { owed: 100, pool: 10 })
        );
        assert_eq!(f.engine.pending_rewards(&account(2)), 100);
        assert_eq!(f.engine.stake_of(&account(2)).accrued, 0);
        assert_eq!(f.engine.reward_pool(), 10);
    }

    #[test]
    fn exit_returns_principal_and_rewards() {
        let f = setup();
        f.engine.fund_reward_pool(&account(OWNER), 1_000).unwrap();
        f.engine.stake(&account(2), 1_000).unwrap();
        f.clock.advance(SECONDS_PER_YEAR);

        let outcome = f.engine.exit(&account(2)).unwrap();
        assert_eq!(
            outcome,
            ExitOutcome {
                withdrawn: 1_000,
                rewards_paid: 100
            }
        );
        assert_eq!(f.token.balance_of(&account(2)), 100_100);
        assert_eq!(f.engine.total_staked(), 0);
        assert_eq!(f.engine.exit(&account(2)), Err(StakingError::NothingStaked));
    }

    #[test]
    fn exit_with_short_pool_still_returns_principal() {
        let f = setup();
        f.engine.stake(&account(2), 1_000).unwrap();
        f.clock.advance(SECONDS_PER_YEAR);

        let outcome = f.engine.exit(&account(2)).unwrap();
        assert_eq!(outcome.withdrawn, 1_000);
        assert_eq!(outcome.rewards_paid, 0);
        assert_eq!(f.token.balance_of(&account(2)), 100_000);
        assert_eq!(f.engine.total_staked(), 0);
        assert_eq!(f.engine.exit(&account(2)), Err(StakingError::NothingStaked));

        // Rewards survive the skipped leg and stop accruing.
        f.clock.advance(SECONDS_PER_YEAR);
        assert_eq!(f.engine.pending_rewards(&account(2)), 100);
        f.engine.fund_reward_pool(&account(OWNER), 500).unwrap();
        assert_eq!(f.engine.claim_rewards(&account(2)).unwrap(), 100);
    }

    #[test]
    fn exit_without_stake_rejected() {
        let f = setup();
        assert_eq!(f.engine.exit(&account(3)), Err(StakingError::NothingStaked));
    }

    #[test]
    fn reward_rate_is_owner_only_and_capped() {
        let f = setup();
        assert_eq!(
            f.engine.set_reward_rate(&account(2), 500),
            Err(StakingError::Access(AccessError::Unauthorized { caller: account(2) }))
        );
        assert_eq!(
            f.engine.set_reward_rate(&account(OWNER), 10_001),
            Err(StakingError::RateTooHigh(10_001))
        );
        f.engine.set_reward_rate(&account(OWNER), 10_000).unwrap();
        assert_eq!(f.engine.reward_rate_bps(), 10_000);
    }

    #[test]
    fn realized_rewards_keep_old_rate() {
        let f = setup();
        f.engine.stake(&account(2), 1_000).unwrap();
        f.clock.advance(SECONDS_PER_YEAR / 2);
        f.engine.stake(&account(2), 1_000).unwrap();
        f.engine.set_reward_rate(&account(OWNER), 2_000).unwrap();
        f.clock.advance(SECONDS_PER_YEAR / 2);
        // 50 realized at 10%, then 2000 * 20% / 2 = 200.
        assert_eq!(f.engine.pending_rewards(&account(2)), 250);
    }

    #[test]
    fn fund_reward_pool_is_owner_only() {
        let f = setup();
        assert!(matches!(
            f.engine.fund_reward_pool(&account(2), 100),
            Err(StakingError::Access(AccessError::Unauthorized { .. }))
        ));
        f.engine.fund_reward_pool(&account(OWNER), 5_000).unwrap();
        assert_eq!(f.engine.reward_pool(), 5_000);
        assert_eq!(f.token.balance_of(&account(ENGINE)), 5_000);
    }

    #[test]
    fn minimum_stake_is_owner_tunable() {
        let f = setup();
        assert!(f.engine.set_minimum_stake(&account(2), 1).is_err());
        f.engine.set_minimum_stake(&account(OWNER), 5_000).unwrap();
        assert_eq!(f.engine.minimum_stake(), 5_000);
        assert!(matches!(
            f.engine.stake(&account(2), 1_000),
            Err(StakingError::BelowMinimum { .. })
        ));
    }

    #[test]
    fn recover_sweeps_foreign_asset_only() {
        let f = setup();
        let foreign =
            MemoryLedger::with_supply(account(600), metadata("OTH"), &account(3), 1_000).unwrap();
        foreign.transfer(&account(3), &account(ENGINE), 250).unwrap();

        f.engine
            .recover_tokens(&account(OWNER), &foreign, 250)
            .unwrap();
        assert_eq!(foreign.balance_of(&account(OWNER)), 250);
        assert_eq!(foreign.balance_of(&account(ENGINE)), 0);

        assert_eq!(
            f.engine
                .recover_tokens(&account(OWNER), &*f.token, 1),
            Err(StakingError::CannotRecoverStakingToken)
        );
        assert!(matches!(
            f.engine.recover_tokens(&account(2), &foreign, 1),
            Err(StakingError::Access(AccessError::Unauthorized { .. }))
        ));
    }

    #[test]
    fn failed_pull_leaves_engine_untouched() {
        let f = setup();
        f.token.transfer(&account(OWNER), &account(4), 5_000).unwrap();
        let err = f.engine.stake(&account(4), 1_000).unwrap_err();
        assert!(matches!(
            err,
            StakingError::Ledger(LedgerError::InsufficientAllowance { .. })
        ));
        assert_eq!(f.engine.total_staked(), 0);
        assert_eq!(f.engine.stake_of(&account(4)), StakeRecord::default());
    }

    #[test]
    fn custody_matches_staked_plus_pool() {
        let f = setup();
        f.engine.fund_reward_pool(&account(OWNER), 10_000).unwrap();
        f.engine.stake(&account(2), 4_000).unwrap();
        f.engine.stake(&account(3), 6_000).unwrap();
        f.clock.advance(SECONDS_PER_YEAR / 4);
        f.engine.withdraw(&account(3), 1_000).unwrap();
        f.engine.claim_rewards(&account(2)).unwrap();
        f.engine.exit(&account(3)).unwrap();

        assert_eq!(
            f.token.balance_of(&account(ENGINE)),
            f.engine.total_staked() + f.engine.reward_pool()
        );
        assert_eq!(f.engine.total_staked(), 4_000);
    }

    #[test]
    fn operations_emit_events() {
        let f = setup();
        let recorder = EventRecorder::attach(f.engine.events());
        f.engine.fund_reward_pool(&account(OWNER), 1_000).unwrap();
        f.engine.stake(&account(2), 1_000).unwrap();
        f.clock.advance(SECONDS_PER_YEAR);
        f.engine.withdraw(&account(2), 400).unwrap();
        f.engine.claim_rewards(&account(2)).unwrap();

        assert_eq!(
            recorder.events(),
            vec![
                ContractEvent::RewardPoolFunded { amount: 1_000 },
                ContractEvent::Staked {
                    account: account(2),
                    amount: 1_000
                },
                ContractEvent::Withdrawn {
                    account: account(2),
                    amount: 400
                },
                ContractEvent::RewardsClaimed {
                    account: account(2),
                    amount: 100
                },
            ]
        );
    }

    #[test]
    fn ownership_transfer_moves_privileges() {
        let f = setup();
        f.engine
            .transfer_ownership(&account(OWNER), account(3))
            .unwrap();
        assert_eq!(f.engine.owner(), account(3));
        assert!(f.engine.set_reward_rate(&account(OWNER), 1).is_err());
        f.engine.set_reward_rate(&account(3), 1).unwrap();
    }

    #[test]
    fn invalid_construction_rejected() {
        let token = Arc::new(MemoryLedger::new(account(500), metadata("CDR")));
        let clock: Arc<dyn Clock> = Arc::new(NullClock::new(START));
        let bad_rate = StakingParams {
            reward_rate_bps: 20_000,
            ..Default::default()
        };
        assert!(matches!(
            StakingEngine::new(account(ENGINE), Arc::clone(&token), account(OWNER), bad_rate, clock.clone()),
            Err(StakingError::RateTooHigh(20_000))
        ));
        assert!(matches!(
            StakingEngine::new(AccountId::ZERO, token, account(OWNER), StakingParams::default(), clock),
            Err(StakingError::InvalidParams(_))
        ));
    }

    /// Ledger that runs a callback before every movement.
    struct HookLedger {
        inner: MemoryLedger,
        hook: OnceLock<Box<dyn Fn() + Send + Sync>>,
    }

    impl TokenLedger for HookLedger {
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
        fn approve(&self, owner: &AccountId, spender: &AccountId, amount: u128) -> Result<(), LedgerError> {
            self.inner.approve(owner, spender, amount)
        }
        fn transfer_legs(
            &self,
            spender: Option<&AccountId>,
            from: &AccountId,
            legs: &[(AccountId, u128)],
        ) -> Result<(), LedgerError> {
            if let Some(hook) = self.hook.get() {
                hook();
            }
            self.inner.transfer_legs(spender, from, legs)
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

    #[test]
    fn reentrant_call_from_ledger_is_rejected() {
        let inner =
            MemoryLedger::with_supply(account(500), metadata("CDR"), &account(2), 10_000).unwrap();
        inner.approve(&account(2), &account(ENGINE), u128::MAX).unwrap();
        let ledger = Arc::new(HookLedger {
            inner,
            hook: OnceLock::new(),
        });
        let engine = Arc::new(
            StakingEngine::new(
                account(ENGINE),
                Arc::clone(&ledger),
                account(OWNER),
                StakingParams {
                    minimum_stake: 1,
                    ..Default::default()
                },
                Arc::new(NullClock::new(START)),
            )
            .unwrap(),
        );

        let observed = Arc::new(std::sync::Mutex::new(None));
        let weak = Arc::downgrade(&engine);
        let sink = Arc::clone(&observed);
        let _ = ledger.hook.set(Box::new(move || {
            if let Some(engine) = weak.upgrade() {
                let nested = engine.stake(&account(2), 500);
                let view = engine.total_staked();
                *sink.lock().unwrap() = Some((nested, view));
            }
        }));

        engine.stake(&account(2), 1_000).unwrap();
        let (nested, view) = observed.lock().unwrap().take().unwrap();
        assert_eq!(nested, Err(StakingError::Access(AccessError::ReentrantCall)));
        assert_eq!(view, 0, "views see the pre-commit state");
        assert_eq!(engine.total_staked(), 1_000);
        assert_eq!(ledger.balance_of(&account(ENGINE)), 1_000);
    }
}
