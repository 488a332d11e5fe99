//! Access control for the cinder contracts.
//!
//! - [`Ownership`]: an explicit caller-vs-owner comparison performed at the
//!   start of every privileged operation.
//! - [`ReentrancyGuard`]: a per-instance flag that serializes every entry
//!   point performing an external token movement, failing fast on nested or
//!   concurrent entry.

pub mod error;
pub mod guard;
pub mod owner;

pub use error::AccessError;
pub use guard::{GuardToken, ReentrancyGuard};
pub use owner::Ownership;
