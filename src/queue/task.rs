//! The spooled write task: one admitted unit of work.

use super::core::QueueState;
use super::status::{Status, TaskId};
use crate::archive::{Archive, GridRef, MetaMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

/// Narrow completion handle handed to each write task.
///
/// The sink reaches back into the queue's completion path and nothing
/// else: a task can report its terminal status but cannot touch queue
/// configuration or the registries directly.
#[derive(Clone)]
pub(crate) struct CompletionSink {
    state: Arc<QueueState>,
}

impl CompletionSink {
    pub(crate) fn new(state: Arc<QueueState>) -> Self {
        Self { state }
    }

    /// Reports a task's terminal status to the owning queue.
    fn complete(&self, id: TaskId, status: Status) {
        self.state.complete(id, status);
    }
}

/// One admitted write: a set of grids, an owned archive copy, and a
/// metadata snapshot, bound to a completion sink.
///
/// The task owns an independent archive clone because the caller's archive
/// reference is not guaranteed to outlive the asynchronous execution.
pub(crate) struct WriteTask {
    id: TaskId,
    grids: Vec<GridRef>,
    archive: Box<dyn Archive>,
    metadata: MetaMap,
    sink: CompletionSink,
}

impl WriteTask {
    pub(crate) fn new(
        id: TaskId,
        grids: Vec<GridRef>,
        archive: Box<dyn Archive>,
        metadata: MetaMap,
        sink: CompletionSink,
    ) -> Self {
        Self {
            id,
            grids,
            archive,
            metadata,
            sink,
        }
    }

    /// Performs the write and reports a terminal status exactly once.
    ///
    /// Nothing escapes this method: write errors are logged and converted
    /// to [`Status::Failed`], and panics from the archive are caught the
    /// same way. A task that let an error propagate would tear down a
    /// backend worker thread instead of surfacing as a queryable failure.
    pub(crate) fn execute(self) {
        let Self {
            id,
            grids,
            archive,
            metadata,
            sink,
        } = self;

        debug!(task_id = %id, grid_count = grids.len(), "Starting archive write");

        let result = panic::catch_unwind(AssertUnwindSafe(|| archive.write(&grids, &metadata)));
        let status = match result {
            Ok(Ok(())) => Status::Succeeded,
            Ok(Err(err)) => {
                error!(task_id = %id, error = %err, "Archive write failed");
                Status::Failed
            }
            Err(payload) => {
                error!(
                    task_id = %id,
                    reason = panic_message(&payload),
                    "Archive write panicked"
                );
                Status::Failed
            }
        };

        sink.complete(id, status);
    }
}

/// Best-effort extraction of a panic payload message for logging.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_str() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
    }

    #[test]
    fn test_panic_message_string() {
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("kaboom"));
        assert_eq!(panic_message(payload.as_ref()), "kaboom");
    }

    #[test]
    fn test_panic_message_other() {
        let payload: Box<dyn std::any::Any + Send> = Box::new(17u64);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
