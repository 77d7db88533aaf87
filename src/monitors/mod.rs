//! Synchronous evaluation logic, independent of any transport
//!
//! - [`state`]: maps a score to OK/WARN/CRIT
//! - [`grace`]: the `BATTERY_LOW` grace period
//! - [`pipeline`]: the per-message evaluation step that ties everything together

pub mod grace;
pub mod pipeline;
pub mod state;
