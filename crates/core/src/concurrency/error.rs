use thiserror::Error;

/// Errors raised by the admission gate and the result lock.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConcurrencyError {
    /// The gate was built with no capacity.
    #[error("invalid capacity {0}: must be at least 1")]
    InvalidCapacity(usize),

    /// A token or guard was handed back to a primitive that did not issue it.
    #[error("not held: token or guard was issued by a different primitive")]
    NotHeld,

    /// The gate's underlying semaphore was closed.
    #[error("admission gate closed")]
    GateClosed,
}
