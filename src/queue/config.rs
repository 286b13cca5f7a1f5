//! Queue configuration.

// =============================================================================
// Configuration Constants
// =============================================================================

/// Default maximum number of tasks in flight at once.
pub const DEFAULT_CAPACITY: u32 = 100;

/// Default admission timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// Queue Configuration
// =============================================================================

/// Configuration for the write queue.
///
/// Both fields remain mutable after construction via
/// [`super::Queue::set_capacity`] and [`super::Queue::set_timeout_secs`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueConfig {
    /// Maximum number of in-flight tasks. Values below 1 are coerced to 1.
    pub capacity: u32,

    /// Maximum whole seconds a submission may wait for admission.
    /// Zero disallows any wait beyond a single non-blocking check.
    pub timeout_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl QueueConfig {
    /// Creates a configuration with the given capacity and default timeout.
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }
}
