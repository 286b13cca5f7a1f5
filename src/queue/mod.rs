//! Asynchronous, capacity-bounded write queue.
//!
//! This module provides the spooling machinery for offloading archive
//! writes from the submitting caller.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Queue                                │
//! │  Admission with timeout backpressure, id allocation          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐   │
//! │  │ Status       │  │ Notifier     │  │ Execution        │   │
//! │  │ Registry     │  │ Registry     │  │ Backend          │   │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Core Concepts
//!
//! - **Task**: one admitted archive write with a single terminal outcome,
//!   identified by a [`TaskId`].
//!
//! - **Capacity**: the maximum number of tasks in flight at once. A
//!   submission that would exceed it waits, up to the configured timeout,
//!   for a completion to free a slot.
//!
//! - **Status Registry**: a concurrent map answering "did task T finish,
//!   and how?" with lazy and fan-out-triggered entry eviction.
//!
//! - **Notifiers**: observer callbacks receiving every task's completion
//!   event, invoked in subscription order.
//!
//! - **Execution Backend**: where admitted work runs — tokio's blocking
//!   pool in production, or inline on the submitting thread as the
//!   single-threaded degradation path.
//!
//! # Example
//!
//! ```ignore
//! use gridspool::queue::{Queue, QueueConfig, Status};
//!
//! let queue = Queue::new(QueueConfig { capacity: 2, timeout_secs: 5 });
//!
//! let sub = queue.subscribe(|id, status| {
//!     tracing::info!(task_id = %id, status = %status, "write finished");
//! });
//!
//! let id = queue.submit(grid, &archive, metadata).await?;
//! // ... later ...
//! queue.drain().await;
//! ```

mod backend;
mod config;
mod core;
mod error;
mod registry;
mod status;
mod task;

pub use backend::{ExecutionBackend, InlineBackend, TokioBackend, Work};
pub use config::{QueueConfig, DEFAULT_CAPACITY, DEFAULT_TIMEOUT_SECS};
pub use core::Queue;
pub use error::QueueError;
pub use registry::Notifier;
pub use status::{Status, SubscriptionId, TaskId};
