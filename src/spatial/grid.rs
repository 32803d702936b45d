//! Uniform voxel grid spatial index.
//!
//! Space is divided into cubic cells of edge `resolution`; each occupied
//! cell remembers the slot of the first position that landed in it. A query
//! hits iff its point's cell is occupied, which makes the "first point
//! wins" rule double as the deterministic smallest-slot tie-break.

use hashbrown::HashMap;
use nalgebra::Point3;

use super::SpatialIndex;
use crate::error::{CompressionError, Result};

type Cell = (i64, i64, i64);

/// Voxel-grid implementation of [`SpatialIndex`].
///
/// The grid also tracks a cell-aligned bounding envelope of everything
/// inserted so far. Points outside the envelope are reported as unseen
/// without consulting the cell table.
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    resolution: f64,
    cells: HashMap<Cell, usize>,
    positions: Vec<Point3<f64>>,
    /// Componentwise min/max of occupied cell coordinates, if any.
    envelope: Option<(Cell, Cell)>,
}

impl VoxelGrid {
    /// Map a point to its grid cell, rejecting non-finite coordinates.
    fn cell_of(&self, p: &Point3<f64>) -> Result<Cell> {
        if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
            return Err(CompressionError::SpatialIndex {
                details: format!("position ({}, {}, {}) is not finite", p.x, p.y, p.z),
            });
        }
        let quantize = |v: f64| (v / self.resolution).floor() as i64;
        Ok((quantize(p.x), quantize(p.y), quantize(p.z)))
    }

    fn envelope_contains(&self, cell: Cell) -> bool {
        match self.envelope {
            Some((lo, hi)) => {
                cell.0 >= lo.0
                    && cell.0 <= hi.0
                    && cell.1 >= lo.1
                    && cell.1 <= hi.1
                    && cell.2 >= lo.2
                    && cell.2 <= hi.2
            }
            None => false,
        }
    }

    fn grow_envelope(&mut self, cell: Cell) {
        self.envelope = Some(match self.envelope {
            Some((lo, hi)) => (
                (lo.0.min(cell.0), lo.1.min(cell.1), lo.2.min(cell.2)),
                (hi.0.max(cell.0), hi.1.max(cell.1), hi.2.max(cell.2)),
            ),
            None => (cell, cell),
        });
    }
}

impl SpatialIndex for VoxelGrid {
    fn new(resolution: f64) -> Self {
        Self {
            resolution,
            cells: HashMap::new(),
            positions: Vec::new(),
            envelope: None,
        }
    }

    fn query(&self, p: &Point3<f64>) -> Result<Option<(usize, f64)>> {
        let cell = self.cell_of(p)?;
        if !self.envelope_contains(cell) {
            return Ok(None);
        }
        Ok(self.cells.get(&cell).map(|&slot| {
            let distance = (p - self.positions[slot]).norm();
            (slot, distance)
        }))
    }

    fn insert(&mut self, p: Point3<f64>) -> Result<usize> {
        let cell = self.cell_of(&p)?;
        let slot = self.positions.len();
        self.positions.push(p);
        // First occupant keeps the cell; later arrivals are still slots.
        self.cells.entry(cell).or_insert(slot);
        self.grow_envelope(cell);
        Ok(slot)
    }

    fn rebuild(&mut self, positions: &[Point3<f64>]) {
        self.cells.clear();
        self.positions.clear();
        self.envelope = None;
        for &p in positions {
            debug_assert!(
                p.x.is_finite() && p.y.is_finite() && p.z.is_finite(),
                "rebuild positions must have been accepted by insert"
            );
            let quantize = |v: f64| (v / self.resolution).floor() as i64;
            let cell = (quantize(p.x), quantize(p.y), quantize(p.z));
            let slot = self.positions.len();
            self.positions.push(p);
            self.cells.entry(cell).or_insert(slot);
            self.grow_envelope(cell);
        }
    }

    fn len(&self) -> usize {
        self.positions.len()
    }
}
