//! Capacity-bounded admission gate.
//!
//! Wraps a tokio [`Semaphore`], whose waiters are served in FIFO order, so a
//! caller cannot be overtaken indefinitely by newer arrivals.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::ConcurrencyError;

struct GateInner {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    /// Callers currently suspended in `acquire`.
    waiting: AtomicUsize,
}

/// Admits at most `capacity` concurrent holders.
///
/// Cheaply cloneable; clones share the same slots.
#[derive(Clone)]
pub struct AdmissionGate {
    inner: Arc<GateInner>,
}

/// Proof of admission. Dropping the token releases the slot.
#[must_use = "dropping a GateToken releases the slot immediately"]
pub struct GateToken {
    _permit: OwnedSemaphorePermit,
    gate: Arc<GateInner>,
}

/// Point-in-time view of a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateStatus {
    pub capacity: usize,
    pub in_use: usize,
    pub waiting: usize,
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} with {} waiting",
            self.in_use, self.capacity, self.waiting
        )
    }
}

/// Keeps `waiting` accurate even when the acquiring future is dropped.
struct WaitRegistration<'a>(&'a AtomicUsize);

impl<'a> WaitRegistration<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for WaitRegistration<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AdmissionGate {
    /// Create a gate with `capacity` slots.
    pub fn new(capacity: usize) -> Result<Self, ConcurrencyError> {
        if capacity == 0 {
            return Err(ConcurrencyError::InvalidCapacity(capacity));
        }

        Ok(Self {
            inner: Arc::new(GateInner {
                semaphore: Arc::new(Semaphore::new(capacity)),
                capacity,
                waiting: AtomicUsize::new(0),
            }),
        })
    }

    /// Suspend until a slot is free, then take it.
    pub async fn acquire(&self) -> Result<GateToken, ConcurrencyError> {
        let _registration = WaitRegistration::enter(&self.inner.waiting);
        let permit = Arc::clone(&self.inner.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| ConcurrencyError::GateClosed)?;

        Ok(GateToken {
            _permit: permit,
            gate: Arc::clone(&self.inner),
        })
    }

    /// Take a slot if one is free right now.
    pub fn try_acquire(&self) -> Option<GateToken> {
        let permit = Arc::clone(&self.inner.semaphore).try_acquire_owned().ok()?;
        Some(GateToken {
            _permit: permit,
            gate: Arc::clone(&self.inner),
        })
    }

    /// Give a slot back and wake the next waiter.
    ///
    /// Fails with [`ConcurrencyError::NotHeld`] if `token` came from another
    /// gate; that token is still returned to the gate that issued it.
    pub fn release(&self, token: GateToken) -> Result<(), ConcurrencyError> {
        let owned = Arc::ptr_eq(&self.inner, &token.gate);
        drop(token);
        if owned {
            Ok(())
        } else {
            Err(ConcurrencyError::NotHeld)
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Slots currently held.
    pub fn in_use(&self) -> usize {
        self.inner.capacity - self.inner.semaphore.available_permits()
    }

    /// Callers currently suspended in [`acquire`](Self::acquire).
    pub fn waiting(&self) -> usize {
        self.inner.waiting.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> GateStatus {
        GateStatus {
            capacity: self.capacity(),
            in_use: self.in_use(),
            waiting: self.waiting(),
        }
    }
}

impl fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionGate")
            .field("status", &self.status())
            .finish()
    }
}

impl fmt::Debug for GateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateToken")
            .field("capacity", &self.gate.capacity)
            .finish()
    }
}
