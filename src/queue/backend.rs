//! Execution backend abstraction.
//!
//! The queue runs no threads of its own. Admitted work is handed to an
//! [`ExecutionBackend`], a single-operation trait: dispatch a zero-argument
//! callable for execution. Running in parallel versus running inline is a
//! backend choice, not a compile-time code path, so both modes share the
//! same admission, status, and notifier machinery.

/// A one-shot unit of work handed to a backend.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Trait for dispatching spooled write work.
///
/// Implementations decide where the callable runs. The callable is fully
/// self-contained: it reports its outcome through the queue's completion
/// path and never panics, so backends need no error channel.
pub trait ExecutionBackend: Send + Sync + 'static {
    /// Dispatches a unit of work for execution.
    ///
    /// The backend may run the work on another thread or invoke it before
    /// returning; callers must not rely on either behavior.
    fn dispatch(&self, work: Work);
}

/// Backend that runs work on tokio's blocking thread pool.
///
/// Archive writes are blocking I/O, so they are dispatched via
/// `tokio::task::spawn_blocking` rather than onto async worker threads.
/// This is the production backend; it must be used from within a tokio
/// runtime.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioBackend;

impl TokioBackend {
    /// Creates a new tokio-backed dispatcher.
    pub fn new() -> Self {
        Self
    }
}

impl ExecutionBackend for TokioBackend {
    fn dispatch(&self, work: Work) {
        tokio::task::spawn_blocking(work);
    }
}

/// Backend that runs work inline on the dispatching thread.
///
/// This is the degradation path for environments without a parallel
/// execution backend: the write runs to completion inside the submit call,
/// but the external contract (identifiers, status polling, notifiers) is
/// unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineBackend;

impl InlineBackend {
    /// Creates a new inline dispatcher.
    pub fn new() -> Self {
        Self
    }
}

impl ExecutionBackend for InlineBackend {
    fn dispatch(&self, work: Work) {
        work();
    }
}
