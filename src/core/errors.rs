/*!
 * Error Types
 * Centralized error handling with thiserror
 */

use thiserror::Error;

/// Synchronization errors surfaced to callers
///
/// Every variant is reported at the call site and nothing is retried
/// internally. Internal structural corruption is not represented here:
/// it is fatal (see [`invariant_failure`]).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Caller is not a suspendable executor thread")]
    NotOnManagedThread,

    #[error("Insufficient parallelism: {available} effective executors, need {required}")]
    InsufficientParallelism { available: usize, required: usize },
}

/// Abort on structural corruption of a waiter pool.
///
/// A broken treap or chain link means waiter memory has been corrupted;
/// unwinding would let other threads observe the damage, so the process
/// aborts instead.
#[cold]
pub(crate) fn invariant_failure(msg: &str) -> ! {
    log::error!("wait list invariant violated: {}", msg);
    std::process::abort();
}
