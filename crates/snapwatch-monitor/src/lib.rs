//! Fetch invocation and per-owner monitor scheduling.
//!
//! [`fetch`] wraps the external fetch tool behind the [`FetchRunner`] trait;
//! [`scheduler`] owns the set of running poll loops and guarantees at most one
//! loop per owner.

pub mod error;
pub mod fetch;
pub mod scheduler;

pub use error::FetchError;
pub use fetch::{CycleOutcome, FetchCommand, FetchInvoker, FetchRunner, ProcessRunner};
pub use scheduler::MonitorScheduler;

#[cfg(test)]
mod testing;
