//! Fundamental types for the cinder token suite.
//!
//! This crate defines the types shared by every other crate in the workspace:
//! account identifiers, amount constants, timestamps and the clock seam,
//! and the contract event stream.

pub mod address;
pub mod amount;
pub mod error;
pub mod event;
pub mod time;

pub use address::AccountId;
pub use amount::{BPS_DENOMINATOR, SECONDS_PER_DAY, SECONDS_PER_YEAR, TOKEN_DECIMALS, TOKEN_UNIT};
pub use error::TypesError;
pub use event::{ContractEvent, EventBus};
pub use time::{Clock, SystemClock, Timestamp};
