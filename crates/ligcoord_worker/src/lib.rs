//! Per-executor state machine and job driver.
//!
//! A [`Worker`] owns one [`ligcoord_executor::ExecutorClient`] and drives it through
//! `Idle`/`Loaded`/`Busy` transitions as it pulls [`JobDescriptor`]s off the shared
//! queue the manager owns. See `worker.rs` for the invariants this relies on.

mod job;
mod locks;
mod status;
mod worker;

pub use job::{JobDescriptor, Rendezvous};
pub use locks::{JobLockGuard, JobLocks};
pub use status::{WorkerHandle, WorkerStatus, WorkerStatusSnapshot};
pub use worker::Worker;
