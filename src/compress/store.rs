//! Canonical mesh storage.
//!
//! The store owns the cumulative compressed mesh (append-only vertex and
//! triangle buffers plus vertex-to-triangle adjacency) and the active
//! subset of vertices still eligible for proximity matching. The active
//! subset is three parallel vectors indexed by spatial-index slot:
//! position, owning [`VertexId`], and last-seen timestamp.

use std::collections::HashMap;

use nalgebra::Point3;

use crate::mesh::{ColoredVertex, Triangle, VertexId};

/// Entry-point sizes captured at the start of a batch, for rollback.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StoreSnapshot {
    num_vertices: usize,
    num_polygons: usize,
    num_active: usize,
}

/// Cumulative compressed mesh plus active-vertex bookkeeping.
#[derive(Debug, Default)]
pub(crate) struct MeshStore {
    /// Every vertex ever committed, indexed by `VertexId`. Append-only.
    all_vertices: Vec<ColoredVertex>,

    /// Every triangle ever committed. Append-only.
    polygons: Vec<Triangle>,

    /// Triangle indices incident to each vertex. Entries exist only for
    /// vertices still in the active set.
    adjacency: HashMap<VertexId, Vec<usize>>,

    // Active set, parallel vectors indexed by spatial-index slot.
    active_positions: Vec<Point3<f64>>,
    active_to_all: Vec<VertexId>,
    active_last_seen: Vec<f64>,
}

impl MeshStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_vertices(&self) -> usize {
        self.all_vertices.len()
    }

    pub fn num_active_vertices(&self) -> usize {
        self.active_positions.len()
    }

    pub fn all_vertices(&self) -> &[ColoredVertex] {
        &self.all_vertices
    }

    pub fn polygons(&self) -> &[Triangle] {
        &self.polygons
    }

    pub fn active_positions(&self) -> &[Point3<f64>] {
        &self.active_positions
    }

    pub fn active_to_all(&self) -> &[VertexId] {
        &self.active_to_all
    }

    pub fn active_last_seen(&self) -> &[f64] {
        &self.active_last_seen
    }

    pub fn adjacent_polygons(&self, id: VertexId) -> Option<&[usize]> {
        self.adjacency.get(&id).map(Vec::as_slice)
    }

    /// Advance the last-seen time of an active slot.
    pub fn touch(&mut self, slot: usize, stamp_in_sec: f64) {
        self.active_last_seen[slot] = stamp_in_sec;
    }

    /// Commit a vertex: append to the cumulative buffer and the active set.
    ///
    /// The new vertex starts with an empty adjacency entry; the caller is
    /// expected to append at least one triangle referencing it within the
    /// same batch.
    pub fn append_vertex(&mut self, v: ColoredVertex, stamp_in_sec: f64) -> VertexId {
        let id = VertexId::new(self.all_vertices.len());
        self.all_vertices.push(v);
        self.active_positions.push(v.position);
        self.active_to_all.push(id);
        self.active_last_seen.push(stamp_in_sec);
        self.adjacency.insert(id, Vec::new());
        id
    }

    /// Commit a triangle and index it under each of its vertices.
    pub fn append_triangle(&mut self, t: Triangle) {
        let idx = self.polygons.len();
        self.polygons.push(t);
        for v in t.vertices() {
            self.adjacency.entry(v).or_default().push(idx);
        }
    }

    /// Check whether `t` already exists as an unordered vertex set among
    /// the polygons adjacent to any of its vertices.
    pub fn surface_exists(&self, t: &Triangle) -> bool {
        for v in t.vertices() {
            if let Some(list) = self.adjacency.get(&v) {
                if list.iter().any(|&idx| self.polygons[idx].same_surface(t)) {
                    return true;
                }
            }
        }
        false
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            num_vertices: self.all_vertices.len(),
            num_polygons: self.polygons.len(),
            num_active: self.active_positions.len(),
        }
    }

    /// Roll back everything appended since `snap` was taken.
    ///
    /// Last-seen times advanced for reobservations are not restored; they
    /// only ever move forward.
    pub fn truncate_to(&mut self, snap: &StoreSnapshot) {
        for list in self.adjacency.values_mut() {
            list.retain(|&idx| idx < snap.num_polygons);
        }
        self.adjacency.retain(|id, _| id.index() < snap.num_vertices);
        self.polygons.truncate(snap.num_polygons);
        self.all_vertices.truncate(snap.num_vertices);
        self.active_positions.truncate(snap.num_active);
        self.active_to_all.truncate(snap.num_active);
        self.active_last_seen.truncate(snap.num_active);
    }

    /// Drop active slots last seen at or before `earliest_time_sec`.
    ///
    /// Returns whether the active set changed (the caller must then rebuild
    /// its spatial index from [`active_positions`](Self::active_positions)).
    /// The cumulative buffers are untouched; adjacency entries survive only
    /// for vertices that remain active.
    pub fn prune(&mut self, earliest_time_sec: f64) -> bool {
        if self.active_positions.is_empty() {
            return false;
        }
        if self.active_last_seen.len() != self.active_positions.len() {
            log::warn!(
                "active vertex times ({}) disagree with active positions ({}); pruning over the shorter",
                self.active_last_seen.len(),
                self.active_positions.len()
            );
        }
        if self.active_to_all.len() != self.active_positions.len() {
            log::warn!(
                "active vertex indices ({}) disagree with active positions ({}); pruning over the shorter",
                self.active_to_all.len(),
                self.active_positions.len()
            );
        }
        let len = self
            .active_positions
            .len()
            .min(self.active_last_seen.len())
            .min(self.active_to_all.len());

        let mut positions = Vec::with_capacity(len);
        let mut to_all = Vec::with_capacity(len);
        let mut last_seen = Vec::with_capacity(len);
        for i in 0..len {
            if self.active_last_seen[i] > earliest_time_sec {
                positions.push(self.active_positions[i]);
                to_all.push(self.active_to_all[i]);
                last_seen.push(self.active_last_seen[i]);
            }
        }

        if positions.len() == self.active_positions.len() {
            return false;
        }

        let mut adjacency = HashMap::with_capacity(to_all.len());
        for &id in &to_all {
            if let Some(list) = self.adjacency.get(&id) {
                adjacency.insert(id, list.clone());
            }
        }

        self.active_positions = positions;
        self.active_to_all = to_all;
        self.active_last_seen = last_seen;
        self.adjacency = adjacency;
        true
    }
}
