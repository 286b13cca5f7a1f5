//! Archive boundary types.
//!
//! The queue treats grids, metadata, and the archive destination as opaque
//! collaborators: it never inspects grid contents, only forwards collections
//! of grid handles and a metadata bundle to an [`Archive`] implementation.
//!
//! Implementations of [`Archive`] know how to durably write a set of grids
//! plus metadata to a destination (a `.vdb` file, a socket, a blob store).
//! An archive must be cloneable via [`Archive::clone_box`] so that a spooled
//! write owns an independent copy that is safe to run after the caller's
//! archive reference has gone out of scope.

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Opaque handle to a volumetric grid.
///
/// The queue only ever reads the grid's name, for logging. Everything else
/// about the grid (tree topology, voxel data, transforms) is the archive's
/// business.
pub trait Grid: Send + Sync {
    /// Returns the grid's name for logging and diagnostics.
    fn name(&self) -> &str;
}

/// Shared-ownership grid reference.
///
/// Grids are shared between the caller and in-flight write tasks, so they
/// are passed by `Arc` rather than by value.
pub type GridRef = Arc<dyn Grid>;

/// Opaque key/value metadata bundle forwarded verbatim to the archive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetaMap {
    entries: BTreeMap<String, String>,
}

impl MetaMap {
    /// Creates an empty metadata bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a metadata entry, replacing any existing value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Returns the value for a key, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the bundle has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Errors that can occur while writing to an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Underlying I/O failure (file write, stream write, flush).
    #[error("archive I/O error: {0}")]
    Io(#[from] io::Error),

    /// Destination-specific write failure.
    #[error("archive write failed: {0}")]
    Write(String),
}

impl ArchiveError {
    /// Creates a destination-specific write error.
    pub fn write(message: impl Into<String>) -> Self {
        Self::Write(message.into())
    }
}

/// Destination abstraction capable of durably writing grids and metadata.
///
/// # Contract
///
/// `write` performs the entire write for one task and signals failure by
/// returning an error; it must not panic for ordinary failure modes (the
/// queue converts panics to a failed task status as a last resort, but
/// implementations should not rely on that).
///
/// `clone_box` must produce an independent copy: the clone is moved into a
/// write task and may be used long after the original archive is dropped.
pub trait Archive: Send + Sync {
    /// Writes the given grids and metadata to the destination.
    fn write(&self, grids: &[GridRef], metadata: &MetaMap) -> Result<(), ArchiveError>;

    /// Returns an independent, safely-movable copy of this archive.
    fn clone_box(&self) -> Box<dyn Archive>;
}

impl Clone for Box<dyn Archive> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
