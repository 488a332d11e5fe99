use cinder_types::AccountId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("caller {caller} is not the owner")]
    Unauthorized { caller: AccountId },

    #[error("reentrant call rejected")]
    ReentrantCall,

    #[error("new owner must not be the null account")]
    InvalidOwner,
}
