//! Synchronization primitives for fan-out runs.
//!
//! - [`AdmissionGate`]: capacity-bounded admission (how many jobs fetch at once)
//! - [`ResultLock`]: FIFO mutual exclusion around the result sink
//!
//! Both hand out RAII values ([`GateToken`], [`ResultLockGuard`]) so a task
//! that is cancelled mid-flight gives its slot back when it is dropped.

mod error;
mod gate;
mod lock;

pub use error::ConcurrencyError;
pub use gate::{AdmissionGate, GateStatus, GateToken};
pub use lock::{ResultLock, ResultLockGuard};
