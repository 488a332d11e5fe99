//! Notifications emitted by the contracts, and the bus that fans them out.

use crate::address::AccountId;
use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock};

/// Every notification a contract in the suite can emit.
///
/// Events are emitted only after the operation has committed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractEvent {
    /// Tokens moved between two accounts on the ledger.
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: u128,
    },
    /// An allowance was set.
    Approval {
        owner: AccountId,
        spender: AccountId,
        amount: u128,
    },
    /// Part of a transfer was diverted to the burn sink.
    Burned {
        from: AccountId,
        to: AccountId,
        amount: u128,
    },
    ExemptionUpdated {
        account: AccountId,
        exempt: bool,
    },
    Staked {
        account: AccountId,
        amount: u128,
    },
    Withdrawn {
        account: AccountId,
        amount: u128,
    },
    RewardsClaimed {
        account: AccountId,
        amount: u128,
    },
    RewardRateUpdated {
        old_rate_bps: u32,
        new_rate_bps: u32,
    },
    RewardPoolFunded {
        amount: u128,
    },
    MinimumStakeUpdated {
        old_minimum: u128,
        new_minimum: u128,
    },
    /// A foreign asset was swept to the owner.
    TokensRecovered {
        token: AccountId,
        amount: u128,
    },
    VestingCreated {
        beneficiary: AccountId,
        index: usize,
        amount: u128,
        cliff_duration: u64,
        vesting_duration: u64,
    },
    TokensReleased {
        beneficiary: AccountId,
        amount: u128,
    },
    VestingRevoked {
        beneficiary: AccountId,
        index: usize,
        refunded: u128,
    },
    OwnershipTransferred {
        previous_owner: AccountId,
        new_owner: AccountId,
    },
}

type Listener = Box<dyn Fn(&ContractEvent) + Send + Sync>;

/// Synchronous fan-out event bus.
///
/// Listeners are invoked inline on the emitting thread, in subscription
/// order. Keep handlers fast and never call back into the emitting contract.
pub struct EventBus {
    listeners: RwLock<Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&ContractEvent) + Send + Sync + 'static) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }

    pub fn emit(&self, event: &ContractEvent) {
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
