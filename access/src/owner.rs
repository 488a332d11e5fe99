//! Single-owner capability.

use crate::error::AccessError;
use cinder_types::AccountId;

/// The privileged owner of a contract instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ownership {
    owner: AccountId,
}

impl Ownership {
    pub fn new(owner: AccountId) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub fn is_owner(&self, caller: &AccountId) -> bool {
        !caller.is_zero() && *caller == self.owner
    }

    /// Fail with `Unauthorized` unless `caller` is the owner.
    pub fn ensure_owner(&self, caller: &AccountId) -> Result<(), AccessError> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(AccessError::Unauthorized { caller: *caller })
        }
    }

    /// Hand the role to `new_owner`. Returns the previous owner.
    pub fn transfer(
        &mut self,
        caller: &AccountId,
        new_owner: AccountId,
    ) -> Result<AccountId, AccessError> {
        self.ensure_owner(caller)?;
        if new_owner.is_zero() {
            return Err(AccessError::InvalidOwner);
        }
        let previous = self.owner;
        self.owner = new_owner;
        tracing::info!(%previous, %new_owner, "ownership transferred");
        Ok(previous)
    }
}
