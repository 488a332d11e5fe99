//! Shared utilities for the cinder token suite.

pub mod logging;
pub mod math;
pub mod time;

pub use logging::{init_logging, LogFormat};
pub use math::{apply_bps, mul_div};
pub use time::format_duration;
