//! Task identifiers, subscription identifiers, and completion status.

use std::fmt;

/// Identifier of a spooled write task.
///
/// Allocated from a monotonic 32-bit counter starting at 1. Identifiers are
/// never reused; very long-running processes that submit on the order of
/// 2^32 tasks would overflow the counter. The width is kept at 32 bits
/// because callers may depend on identifier compactness.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub(crate) u32);

impl TaskId {
    /// Builds an identifier from its raw value.
    ///
    /// Useful for persisting identifiers outside the queue; a raw value
    /// that was never allocated simply queries as unknown.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier value.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Identifier of a notifier subscription.
///
/// Allocated from its own monotonic 32-bit counter, independent of task
/// identifiers. Subscription order is ascending identifier order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub(crate) u32);

impl SubscriptionId {
    /// Returns the raw identifier value.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Completion status of a spooled write task.
///
/// `Unknown` is a query-time answer, not a stored state: it means no record
/// exists for the identifier, either because the task was never submitted or
/// because its terminal status was already observed and cleared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Status {
    /// Admitted, not yet finished.
    #[default]
    Pending,

    /// The archive write completed successfully.
    Succeeded,

    /// The archive write failed (error or panic inside the write).
    Failed,

    /// No record exists for the queried identifier.
    Unknown,
}

impl Status {
    /// Returns true if this is a terminal status (`Succeeded` or `Failed`).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns the status name for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
