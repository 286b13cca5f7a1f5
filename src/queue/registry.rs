//! Status and notifier registries.
//!
//! Two independently-owned, independently-guarded maps back the queue's
//! completion bookkeeping. No lock ever spans both:
//!
//! - [`StatusRegistry`] maps task identifiers to completion status. It is
//!   mutated from worker threads (completion) and caller threads (polling)
//!   concurrently, so it uses a sharded lock-free map.
//! - [`NotifierRegistry`] maps subscription identifiers to observer
//!   callbacks. It is consulted on every completion and mutated only by
//!   subscription management, so a plain mutex over an ordered map is
//!   enough. Fan-out takes a snapshot and invokes observers with the guard
//!   released, which makes reentrant subscription calls from inside an
//!   observer safe.

use super::status::{Status, SubscriptionId, TaskId};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

// =============================================================================
// Status Registry
// =============================================================================

/// Concurrent map from task identifier to completion status.
///
/// Entry lifecycle: created as `Pending` at admission, overwritten with a
/// terminal status exactly once by the task's completion, then removed
/// either by notifier fan-out (if any observer was registered) or lazily by
/// the first poll that observes the terminal value.
#[derive(Debug, Default)]
pub(crate) struct StatusRegistry {
    entries: DashMap<TaskId, Status>,
}

impl StatusRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the status for a task.
    pub(crate) fn set(&self, id: TaskId, status: Status) {
        self.entries.insert(id, status);
    }

    /// Returns the current status for a task without ever blocking.
    ///
    /// A terminal status is consumed by the poll that observes it: the
    /// entry is removed and subsequent polls return [`Status::Unknown`].
    pub(crate) fn poll(&self, id: TaskId) -> Status {
        loop {
            // Remove-and-return only when the entry is already terminal, so
            // a Pending entry is left in place for the completion to update.
            if let Some((_, status)) = self.entries.remove_if(&id, |_, s| s.is_terminal()) {
                return status;
            }
            match self.entries.get(&id).map(|entry| *entry.value()) {
                None => return Status::Unknown,
                Some(Status::Pending) => return Status::Pending,
                // Turned terminal between the two lookups; consume it.
                Some(_) => continue,
            }
        }
    }

    /// Removes a task's entry after notifier fan-out.
    pub(crate) fn discard(&self, id: TaskId) {
        self.entries.remove(&id);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

// =============================================================================
// Notifier Registry
// =============================================================================

/// Observer callback invoked with `(task id, terminal status)` on every
/// task's completion.
pub type Notifier = std::sync::Arc<dyn Fn(TaskId, Status) + Send + Sync>;

/// Registry of completion observers.
///
/// Observers are independent of any single task: each registered observer
/// receives every task's completion event until it is removed. Invocation
/// order is ascending subscription-identifier order, which the `BTreeMap`
/// gives for free.
#[derive(Default)]
pub(crate) struct NotifierRegistry {
    observers: Mutex<BTreeMap<SubscriptionId, Notifier>>,
    next_id: AtomicU32,
}

impl NotifierRegistry {
    pub(crate) fn new() -> Self {
        Self {
            observers: Mutex::new(BTreeMap::new()),
            next_id: AtomicU32::new(1),
        }
    }

    /// Registers an observer and returns its subscription identifier.
    pub(crate) fn add(&self, notifier: Notifier) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers
            .lock()
            .expect("notifier registry poisoned")
            .insert(id, notifier);
        id
    }

    /// Removes an observer. No-op if the identifier is not registered.
    pub(crate) fn remove(&self, id: SubscriptionId) {
        self.observers
            .lock()
            .expect("notifier registry poisoned")
            .remove(&id);
    }

    /// Removes all observers.
    pub(crate) fn clear(&self) {
        self.observers
            .lock()
            .expect("notifier registry poisoned")
            .clear();
    }

    /// Snapshots the current observers in ascending subscription-id order.
    ///
    /// The snapshot is taken under the guard, but observers are invoked
    /// after it is released. An observer removed concurrently with a
    /// completion may therefore still see that one event.
    pub(crate) fn snapshot(&self) -> Vec<Notifier> {
        self.observers
            .lock()
            .expect("notifier registry poisoned")
            .values()
            .cloned()
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.observers
            .lock()
            .expect("notifier registry poisoned")
            .len()
    }
}

impl std::fmt::Debug for NotifierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .observers
            .lock()
            .map(|observers| observers.len())
            .unwrap_or(0);
        f.debug_struct("NotifierRegistry")
            .field("observers", &count)
            .finish()
    }
}
