//! GridSpool - asynchronous write spooling for volumetric grid archives
//!
//! This library provides a capacity-bounded work queue that offloads
//! potentially slow archival writes (serializing volumetric grids to a file
//! or stream) so the submitting caller is never blocked on I/O.
//!
//! # High-Level API
//!
//! The [`queue`] module provides the [`queue::Queue`] facade:
//!
//! ```ignore
//! use gridspool::queue::{Queue, QueueConfig, Status};
//!
//! let queue = Queue::new(QueueConfig::default());
//!
//! // Spool a write; returns as soon as the task is admitted.
//! let task_id = queue.submit(grid, &archive, metadata).await?;
//!
//! // Poll for the outcome, or subscribe for completion events.
//! let sub = queue.subscribe(|id, status| println!("{id}: {status}"));
//! ```
//!
//! The queue runs no threads of its own: submitted work executes on a
//! pluggable [`queue::ExecutionBackend`], either tokio's blocking pool or
//! inline on the submitting thread.

pub mod archive;
pub mod config;
pub mod logging;
pub mod queue;

/// Version of the gridspool library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
