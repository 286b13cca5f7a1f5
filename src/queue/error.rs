//! Error types for the write queue.

use std::time::Duration;
use thiserror::Error;

/// Errors raised synchronously by queue operations.
///
/// Task failures are never raised: a failed archive write is contained
/// inside its task and surfaces only through [`super::Queue::status`]
/// polling or notifier callbacks.
#[derive(Debug, Error)]
pub enum QueueError {
    /// A submission could not acquire in-flight capacity before the
    /// configured deadline. Fatal to that submission only; the queue
    /// remains usable and no task identifier was consumed.
    #[error("unable to queue write task; {timeout_secs}-second time limit expired")]
    AdmissionTimeout {
        /// The admission timeout that expired, in seconds.
        timeout_secs: u64,
    },

    /// A bounded drain gave up before all in-flight tasks completed.
    /// The remaining tasks keep running; only the wait is abandoned.
    #[error("queue drain abandoned after {waited:?} with {remaining} task(s) still in flight")]
    DrainTimeout {
        /// How long the drain waited before giving up.
        waited: Duration,
        /// Number of tasks still in flight when the wait was abandoned.
        remaining: u32,
    },
}
