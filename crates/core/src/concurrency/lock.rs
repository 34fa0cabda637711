//! FIFO mutual exclusion around a shared resource.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use super::ConcurrencyError;

/// Serializes access to `T`; waiters are handed the lock in arrival order.
///
/// Not reentrant: acquiring twice from the same task deadlocks.
pub struct ResultLock<T> {
    inner: Arc<Mutex<T>>,
}

/// Exclusive access to the guarded value. Dropping the guard releases the lock.
#[must_use = "dropping a ResultLockGuard releases the lock immediately"]
pub struct ResultLockGuard<T> {
    guard: OwnedMutexGuard<T>,
    owner: Arc<Mutex<T>>,
}

impl<T> Clone for ResultLock<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> ResultLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(value)),
        }
    }

    /// Suspend until no other holder exists.
    pub async fn acquire(&self) -> ResultLockGuard<T> {
        let guard = Arc::clone(&self.inner).lock_owned().await;
        ResultLockGuard {
            guard,
            owner: Arc::clone(&self.inner),
        }
    }

    /// Hand the lock to the next waiter.
    ///
    /// A guard issued by a different lock is a discipline violation and yields
    /// [`ConcurrencyError::NotHeld`]; that guard is still dropped, releasing
    /// its own lock.
    pub fn release(&self, guard: ResultLockGuard<T>) -> Result<(), ConcurrencyError> {
        let owned = Arc::ptr_eq(&self.inner, &guard.owner);
        drop(guard);
        if owned {
            Ok(())
        } else {
            Err(ConcurrencyError::NotHeld)
        }
    }

    /// Whether some task currently holds the lock.
    pub fn is_held(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}

impl<T> Deref for ResultLockGuard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for ResultLockGuard<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> fmt::Debug for ResultLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultLock")
            .field("held", &self.is_held())
            .finish()
    }
}

impl<T> fmt::Debug for ResultLockGuard<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultLockGuard").finish_non_exhaustive()
    }
}
