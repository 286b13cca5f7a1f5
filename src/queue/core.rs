//! Queue core - the spooling facade.
//!
//! The [`Queue`] admits write tasks against a bounded in-flight capacity,
//! allocates identifiers, owns the status and notifier registries, and
//! hands admitted work to an [`ExecutionBackend`]. Admission is the only
//! operation that may block the caller, and only while waiting for
//! capacity; completion wakes waiters through a [`Notify`] rather than a
//! fixed-interval polling loop.

use super::backend::{ExecutionBackend, TokioBackend};
use super::config::QueueConfig;
use super::error::QueueError;
use super::registry::{NotifierRegistry, StatusRegistry};
use super::status::{Status, SubscriptionId, TaskId};
use super::task::{CompletionSink, WriteTask};
use crate::archive::{Archive, GridRef, MetaMap};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, warn};

// =============================================================================
// Shared State
// =============================================================================

/// State shared between the queue facade and in-flight tasks.
///
/// Tasks reach this only through [`CompletionSink`], which exposes the
/// completion path and nothing else. The in-flight counter is maintained
/// with atomics alone; the two registries carry their own independent
/// guards and no lock ever spans both.
pub(crate) struct QueueState {
    /// Maximum permitted in-flight tasks, always >= 1.
    capacity: AtomicU32,

    /// Admission timeout in whole seconds. Zero means a single
    /// non-blocking capacity check.
    timeout_secs: AtomicU64,

    /// Tasks admitted but not yet completed. Incremented at admission,
    /// decremented at completion, never negative.
    in_flight: AtomicU32,

    /// Monotonic task identifier counter, starting at 1.
    next_task_id: AtomicU32,

    /// Task identifier -> completion status.
    status: StatusRegistry,

    /// Subscription identifier -> observer callback.
    notifiers: NotifierRegistry,

    /// Signalled on every completion and on capacity raises, waking
    /// admission and drain waiters.
    completion: Notify,
}

impl QueueState {
    fn new(capacity: u32, timeout_secs: u64) -> Self {
        Self {
            capacity: AtomicU32::new(capacity.max(1)),
            timeout_secs: AtomicU64::new(timeout_secs),
            in_flight: AtomicU32::new(0),
            next_task_id: AtomicU32::new(1),
            status: StatusRegistry::new(),
            notifiers: NotifierRegistry::new(),
            completion: Notify::new(),
        }
    }

    /// Attempts to claim one unit of in-flight capacity.
    fn try_admit(&self) -> bool {
        let capacity = self.capacity.load(Ordering::Acquire);
        let mut current = self.in_flight.load(Ordering::Acquire);
        while current < capacity {
            match self.in_flight.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
        false
    }

    /// Handles one task's completion. Called exactly once per admitted
    /// task, by that task's own unit of work, with a terminal status.
    pub(crate) fn complete(&self, id: TaskId, status: Status) {
        // 1. Record the terminal status.
        self.status.set(id, status);

        // 2. Fan out to every registered observer, in ascending
        //    subscription-id order. The snapshot is taken under the
        //    registry guard but invocation happens outside it, so an
        //    observer may manage subscriptions reentrantly.
        let observers = self.notifiers.snapshot();
        for observer in &observers {
            observer(id, status);
        }

        // 3. Once observers have been told, keeping the entry would leak
        //    it for the queue's lifetime; a poll after this point reports
        //    Unknown.
        if !observers.is_empty() {
            self.status.discard(id);
        }

        // 4. Free one unit of capacity regardless of observers.
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.completion.notify_waiters();

        debug!(task_id = %id, status = %status, "Write task completed");
    }
}

// =============================================================================
// Queue
// =============================================================================

/// Capacity-bounded spooling queue for archive writes.
///
/// Submitting a write admits one task against the configured capacity,
/// stamps it pending, and dispatches it to the execution backend. Callers
/// learn the outcome by polling [`Queue::status`] or by registering a
/// completion observer with [`Queue::subscribe`]; submission itself never
/// waits for a task to finish.
///
/// Dropping the queue does not wait for in-flight work. Call
/// [`Queue::drain`] (or [`Queue::drain_timeout`] for a bounded wait)
/// before dropping if outstanding writes must land first.
pub struct Queue {
    state: Arc<QueueState>,
    backend: Arc<dyn ExecutionBackend>,
}

impl Queue {
    /// Creates a queue that dispatches writes onto tokio's blocking pool.
    ///
    /// Must be used from within a tokio runtime. For runtime-free
    /// environments, pass [`super::InlineBackend`] to
    /// [`Queue::with_backend`].
    pub fn new(config: QueueConfig) -> Self {
        Self::with_backend(config, Arc::new(TokioBackend::new()))
    }

    /// Creates a queue with an explicit execution backend.
    pub fn with_backend(config: QueueConfig, backend: Arc<dyn ExecutionBackend>) -> Self {
        Self {
            state: Arc::new(QueueState::new(config.capacity, config.timeout_secs)),
            backend,
        }
    }

    // -------------------------------------------------------------------------
    // Submission
    // -------------------------------------------------------------------------

    /// Spools a single grid for writing.
    ///
    /// Equivalent to [`Queue::submit_batch`] with a one-element grid set.
    pub async fn submit(
        &self,
        grid: GridRef,
        archive: &dyn Archive,
        metadata: MetaMap,
    ) -> Result<TaskId, QueueError> {
        self.submit_batch(vec![grid], archive, metadata).await
    }

    /// Spools a set of grids to be written as a single task.
    ///
    /// All grids are written through one archive call, so the batch
    /// succeeds or fails as a unit. Blocks only while waiting for
    /// admission capacity, up to the configured timeout; on timeout the
    /// submission fails with [`QueueError::AdmissionTimeout`] and no task
    /// identifier is consumed. On success the identifier is returned
    /// immediately and the write proceeds on the execution backend.
    pub async fn submit_batch(
        &self,
        grids: Vec<GridRef>,
        archive: &dyn Archive,
        metadata: MetaMap,
    ) -> Result<TaskId, QueueError> {
        self.admit().await?;

        let id = TaskId(self.state.next_task_id.fetch_add(1, Ordering::Relaxed));
        self.state.status.set(id, Status::Pending);

        let task = WriteTask::new(
            id,
            grids,
            archive.clone_box(),
            metadata,
            CompletionSink::new(Arc::clone(&self.state)),
        );

        debug!(task_id = %id, in_flight = self.size(), "Write task admitted");
        self.backend.dispatch(Box::new(move || task.execute()));

        Ok(id)
    }

    /// Waits for in-flight capacity, claiming one unit on success.
    async fn admit(&self) -> Result<(), QueueError> {
        if self.state.try_admit() {
            return Ok(());
        }

        let timeout_secs = self.state.timeout_secs.load(Ordering::Acquire);
        let deadline = Instant::now() + Duration::from_secs(timeout_secs);
        loop {
            // The waiter must be registered before the capacity re-check,
            // otherwise a completion between the check and the await would
            // be missed.
            let notified = self.state.completion.notified();
            if self.state.try_admit() {
                return Ok(());
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Err(QueueError::AdmissionTimeout { timeout_secs });
            }
        }
    }

    // -------------------------------------------------------------------------
    // Status
    // -------------------------------------------------------------------------

    /// Returns the current status of a task. Never blocks.
    ///
    /// A terminal status is consumed by the first poll that observes it:
    /// the same identifier reports [`Status::Unknown`] afterwards, as it
    /// does for identifiers that were never submitted or whose entry was
    /// already consumed by notifier fan-out.
    pub fn status(&self, id: TaskId) -> Status {
        self.state.status.poll(id)
    }

    // -------------------------------------------------------------------------
    // Notifier Subscriptions
    // -------------------------------------------------------------------------

    /// Registers an observer invoked with `(task id, terminal status)` on
    /// every task's completion.
    ///
    /// Observers run on the thread that completes the task. Invocation
    /// order across observers is ascending subscription-id order. A task
    /// that completes with at least one observer registered has its status
    /// entry consumed by the fan-out, so a later poll reports
    /// [`Status::Unknown`].
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(TaskId, Status) + Send + Sync + 'static,
    {
        self.state.notifiers.add(Arc::new(observer))
    }

    /// Removes an observer. No-op if the subscription does not exist.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.state.notifiers.remove(id);
    }

    /// Removes all observers.
    pub fn clear_subscriptions(&self) {
        self.state.notifiers.clear();
    }

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------

    /// Returns the maximum number of in-flight tasks.
    pub fn capacity(&self) -> u32 {
        self.state.capacity.load(Ordering::Acquire)
    }

    /// Sets the maximum number of in-flight tasks. Values below 1 are
    /// coerced to 1. Raising the capacity wakes blocked submissions.
    pub fn set_capacity(&self, capacity: u32) {
        self.state.capacity.store(capacity.max(1), Ordering::Release);
        self.state.completion.notify_waiters();
    }

    /// Returns the admission timeout in whole seconds.
    pub fn timeout_secs(&self) -> u64 {
        self.state.timeout_secs.load(Ordering::Acquire)
    }

    /// Sets the admission timeout in whole seconds. Zero disallows any
    /// wait beyond a single non-blocking capacity check.
    pub fn set_timeout_secs(&self, timeout_secs: u64) {
        self.state.timeout_secs.store(timeout_secs, Ordering::Release);
    }

    // -------------------------------------------------------------------------
    // Introspection and Lifecycle
    // -------------------------------------------------------------------------

    /// Returns the number of tasks currently in flight.
    pub fn size(&self) -> u32 {
        self.state.in_flight.load(Ordering::Acquire)
    }

    /// Returns true if no tasks are in flight.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Waits until every in-flight task has completed.
    ///
    /// There is no cancellation path for admitted tasks, so a write that
    /// never finishes (a hung destination) makes this wait forever. Use
    /// [`Queue::drain_timeout`] when that liveness risk is unacceptable.
    pub async fn drain(&self) {
        loop {
            let notified = self.state.completion.notified();
            if self.is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// Waits until every in-flight task has completed, or until `limit`
    /// elapses.
    ///
    /// On timeout the remaining tasks keep running and keep their
    /// completion contract; only the wait is abandoned.
    pub async fn drain_timeout(&self, limit: Duration) -> Result<(), QueueError> {
        let start = Instant::now();
        let deadline = start + limit;
        loop {
            let notified = self.state.completion.notified();
            if self.is_empty() {
                return Ok(());
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Err(QueueError::DrainTimeout {
                    waited: start.elapsed(),
                    remaining: self.size(),
                });
            }
        }
    }
}

impl Drop for Queue {
    fn drop(&mut self) {
        let remaining = self.size();
        if remaining > 0 {
            warn!(
                remaining,
                "Queue dropped with tasks still in flight; outstanding writes \
                 continue on the backend but can no longer be observed"
            );
        }
    }
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("capacity", &self.capacity())
            .field("timeout_secs", &self.timeout_secs())
            .field("in_flight", &self.size())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveError, Grid};
    use crate::queue::backend::InlineBackend;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    struct DenseGrid(&'static str);

    impl Grid for DenseGrid {
        fn name(&self) -> &str {
            self.0
        }
    }

    fn grid(name: &'static str) -> GridRef {
        Arc::new(DenseGrid(name))
    }

    #[derive(Clone, Default)]
    struct RecordingArchive {
        writes: Arc<AtomicUsize>,
        fail: bool,
    }

    impl Archive for RecordingArchive {
        fn write(&self, _grids: &[GridRef], _metadata: &MetaMap) -> Result<(), ArchiveError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ArchiveError::write("simulated failure"))
            } else {
                Ok(())
            }
        }

        fn clone_box(&self) -> Box<dyn Archive> {
            Box::new(self.clone())
        }
    }

    fn inline_queue(capacity: u32) -> Queue {
        Queue::with_backend(
            QueueConfig::with_capacity(capacity),
            Arc::new(InlineBackend::new()),
        )
    }

    #[tokio::test]
    async fn test_queue_creation_defaults() {
        let queue = inline_queue(8);
        assert_eq!(queue.capacity(), 8);
        assert_eq!(
            queue.timeout_secs(),
            crate::queue::config::DEFAULT_TIMEOUT_SECS
        );
        assert!(queue.is_empty());
        assert_eq!(queue.size(), 0);
    }

    #[tokio::test]
    async fn test_set_capacity_coerces_to_one() {
        let queue = inline_queue(4);
        queue.set_capacity(0);
        assert_eq!(queue.capacity(), 1);
        queue.set_capacity(16);
        assert_eq!(queue.capacity(), 16);
    }

    #[tokio::test]
    async fn test_capacity_below_one_coerced_at_construction() {
        let queue = inline_queue(0);
        assert_eq!(queue.capacity(), 1);
    }

    #[tokio::test]
    async fn test_submit_assigns_monotonic_ids_from_one() {
        let queue = inline_queue(4);
        let archive = RecordingArchive::default();

        let a = queue
            .submit(grid("density"), &archive, MetaMap::new())
            .await
            .unwrap();
        let b = queue
            .submit(grid("velocity"), &archive, MetaMap::new())
            .await
            .unwrap();

        assert_eq!(a.as_u32(), 1);
        assert_eq!(b.as_u32(), 2);
    }

    #[tokio::test]
    async fn test_inline_submit_completes_before_return() {
        let queue = inline_queue(4);
        let archive = RecordingArchive::default();

        let id = queue
            .submit(grid("density"), &archive, MetaMap::new())
            .await
            .unwrap();

        assert_eq!(archive.writes.load(Ordering::SeqCst), 1);
        assert!(queue.is_empty());
        // First poll consumes the terminal status, second reports Unknown.
        assert_eq!(queue.status(id), Status::Succeeded);
        assert_eq!(queue.status(id), Status::Unknown);
    }

    #[tokio::test]
    async fn test_failed_write_reports_failed_once() {
        let queue = inline_queue(4);
        let archive = RecordingArchive {
            fail: true,
            ..Default::default()
        };

        let id = queue
            .submit(grid("density"), &archive, MetaMap::new())
            .await
            .unwrap();

        assert_eq!(queue.status(id), Status::Failed);
        assert_eq!(queue.status(id), Status::Unknown);
    }

    #[tokio::test]
    async fn test_panicking_archive_reports_failed() {
        #[derive(Clone)]
        struct PanickingArchive;

        impl Archive for PanickingArchive {
            fn write(&self, _grids: &[GridRef], _metadata: &MetaMap) -> Result<(), ArchiveError> {
                panic!("corrupted stream");
            }

            fn clone_box(&self) -> Box<dyn Archive> {
                Box::new(self.clone())
            }
        }

        let queue = inline_queue(4);
        let id = queue
            .submit(grid("density"), &PanickingArchive, MetaMap::new())
            .await
            .unwrap();

        assert_eq!(queue.status(id), Status::Failed);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_notifier_fanout_consumes_status_entry() {
        let queue = inline_queue(4);
        let archive = RecordingArchive::default();
        let seen: Arc<Mutex<Vec<(TaskId, Status)>>> = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = seen.clone();
        queue.subscribe(move |id, status| {
            seen_clone.lock().unwrap().push((id, status));
        });

        let id = queue
            .submit(grid("density"), &archive, MetaMap::new())
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(id, Status::Succeeded)]);
        // Fan-out already consumed the entry.
        assert_eq!(queue.status(id), Status::Unknown);
    }

    #[tokio::test]
    async fn test_unsubscribed_observer_not_invoked() {
        let queue = inline_queue(4);
        let archive = RecordingArchive::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_clone = calls.clone();
        let sub = queue.subscribe(move |_, _| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        queue.unsubscribe(sub);

        queue
            .submit(grid("density"), &archive, MetaMap::new())
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_clear_subscriptions() {
        let queue = inline_queue(4);
        let archive = RecordingArchive::default();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls_clone = calls.clone();
            queue.subscribe(move |_, _| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            });
        }
        queue.clear_subscriptions();

        let id = queue
            .submit(grid("density"), &archive, MetaMap::new())
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        // No observer ran, so the entry survives for lazy polling.
        assert_eq!(queue.status(id), Status::Succeeded);
    }

    #[tokio::test]
    async fn test_submit_batch_is_one_task_one_write() {
        let queue = inline_queue(4);
        let archive = RecordingArchive::default();

        let id = queue
            .submit_batch(
                vec![grid("density"), grid("velocity"), grid("temperature")],
                &archive,
                MetaMap::new(),
            )
            .await
            .unwrap();

        // One archive call for the whole batch.
        assert_eq!(archive.writes.load(Ordering::SeqCst), 1);
        assert_eq!(queue.status(id), Status::Succeeded);
    }

    #[tokio::test]
    async fn test_drain_on_empty_queue_returns_immediately() {
        let queue = inline_queue(4);
        queue.drain().await;
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_status_of_unsubmitted_id_is_unknown() {
        let queue = inline_queue(4);
        assert_eq!(queue.status(TaskId(999)), Status::Unknown);
    }

    #[tokio::test]
    async fn test_debug_format() {
        let queue = inline_queue(4);
        let debug = format!("{:?}", queue);
        assert!(debug.contains("capacity"));
        assert!(debug.contains("in_flight"));
    }
}
