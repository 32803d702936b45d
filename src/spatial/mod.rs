//! Spatial proximity indexing.
//!
//! The compressor merges any input vertex that lands within `resolution` of
//! an already-active vertex. The structure answering "is there an active
//! vertex near this point, and which?" is pluggable behind the
//! [`SpatialIndex`] trait; [`VoxelGrid`] is the reference implementation.
//!
//! # Slot Indices
//!
//! A spatial index hands out dense *slot* indices in insertion order. Slots
//! index the compressor's active-vertex vectors, not the cumulative vertex
//! buffer; after a prune the index is rebuilt and slots are reassigned.

mod grid;

pub use grid::VoxelGrid;

use nalgebra::Point3;

use crate::error::Result;

/// A proximity structure over active vertex positions.
///
/// Implementations must be deterministic: repeated queries against the same
/// state return the same slot, and ties between nearby occupants resolve to
/// the smallest slot index.
pub trait SpatialIndex {
    /// Create an empty index with the given positive resolution.
    fn new(resolution: f64) -> Self
    where
        Self: Sized;

    /// Find the active slot whose occupied cell contains `p`.
    ///
    /// Returns the slot index and the Euclidean distance from `p` to the
    /// slot's position, or `None` when `p` falls outside the index's
    /// current envelope or into an unoccupied cell.
    fn query(&self, p: &Point3<f64>) -> Result<Option<(usize, f64)>>;

    /// Insert a position, extending the envelope if needed.
    ///
    /// Returns the new slot index. Inserting into an already-occupied cell
    /// is permitted and does not displace the occupant; callers decide what
    /// to do with near-duplicates by querying first.
    fn insert(&mut self, p: Point3<f64>) -> Result<usize>;

    /// Drop all state and reinitialize from a fresh position sequence.
    ///
    /// Positions must previously have been accepted by `insert` on some
    /// index of the same resolution.
    fn rebuild(&mut self, positions: &[Point3<f64>]);

    /// The number of slots currently indexed.
    fn len(&self) -> usize;

    /// Whether the index holds no slots.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
