//! Token ledger boundary.
//!
//! [`TokenLedger`] is the only interface through which the engines move
//! tokens. [`MemoryLedger`] is the trusted fungible-token ledger the suite
//! is deployed against: balances, allowances, mint and burn, with every
//! movement applied as one indivisible step.

pub mod error;
pub mod memory;
pub mod token;

pub use error::LedgerError;
pub use memory::MemoryLedger;
pub use token::{TokenLedger, TokenMetadata};
