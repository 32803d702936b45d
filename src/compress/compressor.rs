//! Batch compression and integration.
//!
//! [`MeshCompressor`] ingests batches of triangle-mesh fragments and folds
//! them into a cumulative compressed mesh, emitting only what each batch
//! genuinely added.
//!
//! # Algorithm
//!
//! Each batch runs four strictly ordered phases:
//!
//! 1. **Classify vertices.** Every input vertex is either a *reobservation*
//!    of an active vertex (spatial-index hit), a *duplicate* of an earlier
//!    provisional in the same batch (temp-index hit), or a *fresh
//!    provisional* (inserted into the temp index).
//! 2. **Prefilter triangles.** A provisional survives only if at least one
//!    non-degenerate input triangle references it.
//! 3. **Commit provisionals.** Surviving provisionals become canonical
//!    vertices: appended to the cumulative buffer, the active set, and the
//!    main spatial index. Inputs that collapsed onto a committed
//!    provisional are fanned out into the remap.
//! 4. **Commit triangles.** Input triangles are rewritten through the
//!    remap; triangles that lost a vertex, degenerated, or duplicate an
//!    already-stored surface are dropped, the rest are appended.
//!
//! During phase 1, indices at or above the pre-batch vertex count denote
//! provisional slots (`slot = index - pre_batch_count`); smaller indices
//! are committed vertex IDs. This encoding is what lets phase 2 reason
//! about mixed triangles without committing anything.
//!
//! # Failure
//!
//! A spatial-index failure mid-batch abandons the batch: the store is
//! rolled back to its pre-batch sizes, the main index is rebuilt from the
//! surviving active set, and the error propagates. Only last-seen times
//! already advanced for reobservations remain advanced.

use std::collections::{HashMap, HashSet};

use nalgebra::Point3;

use super::remap::{BlockRemap, FlatRemap, RemapSink};
use super::store::MeshStore;
use crate::error::{CompressionError, Result};
use crate::mesh::{BlockMesh, ColoredVertex, Triangle, TriangleMesh, VertexId};
use crate::spatial::{SpatialIndex, VoxelGrid};

/// Everything a single batch contributed to the compressed mesh.
#[derive(Debug)]
pub struct CompressionOutput<R> {
    /// Vertices committed by this batch, in commit order.
    pub new_vertices: Vec<ColoredVertex>,

    /// Triangles committed by this batch, in input order.
    pub new_triangles: Vec<Triangle>,

    /// Every vertex ID touched by this batch: reobservations in input
    /// order, then fresh commits in commit order.
    pub new_indices: Vec<VertexId>,

    /// Input-to-canonical remapping for every input vertex referenced by a
    /// surviving triangle.
    pub remap: R,
}

/// Incremental compressor for streaming triangle meshes.
///
/// Vertices closer than `resolution` to an active vertex are merged into
/// it; triangles that degenerate under that merge, or that duplicate an
/// already-stored surface, are dropped. Batches are integrated one at a
/// time through `&mut self`, so a compressor shared between threads needs
/// an external mutex.
///
/// # Example
///
/// ```
/// use mince::prelude::*;
///
/// let mut compressor = MeshCompressor::new(1.0)?;
/// let mesh = TriangleMesh {
///     vertices: vec![
///         ColoredVertex::from_coords(0.0, 0.0, 0.0),
///         ColoredVertex::from_coords(2.0, 0.0, 0.0),
///         ColoredVertex::from_coords(0.0, 2.0, 0.0),
///     ],
///     triangles: vec![[0, 1, 2]],
/// };
///
/// let output = compressor.compress_mesh(&mesh, 1.0)?;
/// assert_eq!(output.new_vertices.len(), 3);
/// assert_eq!(output.new_triangles.len(), 1);
///
/// // Resubmitting the same geometry adds nothing.
/// let output = compressor.compress_mesh(&mesh, 2.0)?;
/// assert!(output.new_vertices.is_empty());
/// assert!(output.new_triangles.is_empty());
/// # Ok::<(), mince::CompressionError>(())
/// ```
#[derive(Debug)]
pub struct MeshCompressor<S: SpatialIndex = VoxelGrid> {
    resolution: f64,
    store: MeshStore,
    index: S,
}

impl MeshCompressor {
    /// Create a compressor backed by a [`VoxelGrid`] at the given
    /// resolution.
    ///
    /// # Errors
    ///
    /// [`CompressionError::InvalidResolution`] if `resolution` is not a
    /// positive, finite number.
    pub fn new(resolution: f64) -> Result<Self> {
        Self::with_index(resolution)
    }
}

impl<S: SpatialIndex> MeshCompressor<S> {
    /// Create a compressor backed by a custom [`SpatialIndex`]
    /// implementation.
    pub fn with_index(resolution: f64) -> Result<Self> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(CompressionError::InvalidResolution { value: resolution });
        }
        Ok(Self {
            resolution,
            store: MeshStore::new(),
            index: S::new(resolution),
        })
    }

    /// The spatial dedup resolution, in meters.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Total number of vertices ever committed.
    pub fn num_vertices(&self) -> usize {
        self.store.num_vertices()
    }

    /// Number of vertices still eligible for proximity matching.
    pub fn num_active_vertices(&self) -> usize {
        self.store.num_active_vertices()
    }

    /// Every vertex ever committed, indexed by [`VertexId`].
    pub fn all_vertices(&self) -> &[ColoredVertex] {
        self.store.all_vertices()
    }

    /// Every triangle ever committed.
    pub fn polygons(&self) -> &[Triangle] {
        self.store.polygons()
    }

    /// Positions of the active vertices, by spatial-index slot.
    pub fn active_positions(&self) -> &[Point3<f64>] {
        self.store.active_positions()
    }

    /// Canonical IDs of the active vertices, by spatial-index slot.
    pub fn active_vertex_ids(&self) -> &[VertexId] {
        self.store.active_to_all()
    }

    /// Last-seen timestamps of the active vertices, by spatial-index slot.
    pub fn active_timestamps(&self) -> &[f64] {
        self.store.active_last_seen()
    }

    /// Indices of the triangles incident to an *active* vertex.
    ///
    /// Returns `None` for unknown or pruned vertex IDs.
    pub fn adjacent_polygons(&self, id: VertexId) -> Option<&[usize]> {
        self.store.adjacent_polygons(id)
    }

    /// Materialize the cumulative compressed mesh.
    pub fn compressed_mesh(&self) -> TriangleMesh {
        TriangleMesh {
            vertices: self.store.all_vertices().to_vec(),
            triangles: self
                .store
                .polygons()
                .iter()
                .map(|t| {
                    let [a, b, c] = t.vertices();
                    [a.index(), b.index(), c.index()]
                })
                .collect(),
        }
    }

    /// Compress and integrate a flat triangle mesh.
    ///
    /// See [`compress_vertices`](Self::compress_vertices).
    pub fn compress_mesh(
        &mut self,
        mesh: &TriangleMesh,
        stamp_in_sec: f64,
    ) -> Result<CompressionOutput<FlatRemap>> {
        self.compress_vertices(&mesh.vertices, &mesh.triangles, stamp_in_sec)
    }

    /// Compress and integrate a batch given as separate vertex and surface
    /// sequences.
    ///
    /// Batches with fewer than three vertices or no surfaces produce empty
    /// output without touching the store.
    ///
    /// # Errors
    ///
    /// [`CompressionError::InvalidVertexIndex`] if a surface indexes past
    /// the vertex sequence, and [`CompressionError::SpatialIndex`] on a
    /// backend failure (the store is rolled back first).
    pub fn compress_vertices(
        &mut self,
        vertices: &[ColoredVertex],
        surfaces: &[[usize; 3]],
        stamp_in_sec: f64,
    ) -> Result<CompressionOutput<FlatRemap>> {
        let mut remap = FlatRemap::default();
        let (new_vertices, new_triangles, new_indices) =
            self.compress_batch(vertices, surfaces, &mut remap, stamp_in_sec)?;
        Ok(CompressionOutput {
            new_vertices,
            new_triangles,
            new_indices,
            remap,
        })
    }

    /// Compress and integrate a block-structured mesh.
    ///
    /// Every consecutive three vertices within a block form one triangle;
    /// triangles never span blocks. The returned remap is keyed by
    /// `(block index, offset within block)`.
    ///
    /// # Errors
    ///
    /// [`CompressionError::RaggedBlock`] if a block's vertex count is not a
    /// multiple of three, plus the errors of
    /// [`compress_vertices`](Self::compress_vertices).
    pub fn compress_blocks(
        &mut self,
        mesh: &BlockMesh,
        stamp_in_sec: f64,
    ) -> Result<CompressionOutput<BlockRemap>> {
        let total = mesh.num_vertices();
        let mut vertices = Vec::with_capacity(total);
        let mut surfaces = Vec::with_capacity(total / 3);
        let mut layout = Vec::with_capacity(total);
        for block in &mesh.blocks {
            if block.vertices.len() % 3 != 0 {
                return Err(CompressionError::RaggedBlock {
                    block: block.index,
                    len: block.vertices.len(),
                });
            }
            for (offset, &v) in block.vertices.iter().enumerate() {
                let count = vertices.len();
                vertices.push(v);
                layout.push((block.index, offset));
                if offset % 3 == 2 {
                    surfaces.push([count - 2, count - 1, count]);
                }
            }
        }

        let mut remap = BlockRemap::for_layout(mesh.blocks.iter().map(|b| b.index), layout);
        let (new_vertices, new_triangles, new_indices) =
            self.compress_batch(&vertices, &surfaces, &mut remap, stamp_in_sec)?;
        Ok(CompressionOutput {
            new_vertices,
            new_triangles,
            new_indices,
            remap,
        })
    }

    /// Drop active vertices last seen at or before `earliest_time_sec`.
    ///
    /// Vertex IDs and the cumulative buffers are unaffected; only the
    /// active set shrinks, and the spatial index is rebuilt from the
    /// survivors. A pruned position becomes unseen: its next observation
    /// commits a brand-new vertex ID. Does nothing when no slot is stale.
    pub fn prune(&mut self, earliest_time_sec: f64) {
        if self.store.prune(earliest_time_sec) {
            self.index.rebuild(self.store.active_positions());
        }
    }

    fn compress_batch<R: RemapSink>(
        &mut self,
        vertices: &[ColoredVertex],
        surfaces: &[[usize; 3]],
        sink: &mut R,
        stamp_in_sec: f64,
    ) -> Result<(Vec<ColoredVertex>, Vec<Triangle>, Vec<VertexId>)> {
        if vertices.len() < 3 || surfaces.is_empty() {
            return Ok((Vec::new(), Vec::new(), Vec::new()));
        }
        for (si, s) in surfaces.iter().enumerate() {
            for &v in s {
                if v >= vertices.len() {
                    return Err(CompressionError::InvalidVertexIndex {
                        surface: si,
                        vertex: v,
                        num_vertices: vertices.len(),
                    });
                }
            }
        }

        let snapshot = self.store.snapshot();
        match self.integrate(vertices, surfaces, sink, stamp_in_sec) {
            Ok(out) => Ok(out),
            Err(err) => {
                self.store.truncate_to(&snapshot);
                self.index.rebuild(self.store.active_positions());
                Err(err)
            }
        }
    }

    fn integrate<R: RemapSink>(
        &mut self,
        vertices: &[ColoredVertex],
        surfaces: &[[usize; 3]],
        sink: &mut R,
        stamp_in_sec: f64,
    ) -> Result<(Vec<ColoredVertex>, Vec<Triangle>, Vec<VertexId>)> {
        let num_original_vertices = self.store.num_vertices();

        // Input index -> canonical ID, for inputs resolved so far.
        let mut reindex: HashMap<usize, VertexId> = HashMap::new();
        // Per-input resolution under the provisional encoding: values below
        // `num_original_vertices` are committed IDs, values at or above it
        // are `num_original_vertices + provisional slot`.
        let mut temp_reindex: Vec<usize> = Vec::with_capacity(vertices.len());
        // Provisional slot -> input index that created it.
        let mut provisional: Vec<usize> = Vec::new();
        let mut provisional_kept: Vec<bool> = Vec::new();
        // Provisional slot -> later inputs that collapsed onto it.
        let mut converged: Vec<Vec<usize>> = Vec::new();

        let mut new_vertices = Vec::new();
        let mut new_triangles = Vec::new();
        let mut new_indices: Vec<VertexId> = Vec::new();
        let mut touched: HashSet<VertexId> = HashSet::new();

        // Phase 1: classify input vertices.
        let mut temp_index = S::new(self.resolution);
        for (i, v) in vertices.iter().enumerate() {
            if let Some((slot, _)) = self.index.query(&v.position)? {
                // Reobservation of an active vertex.
                let id = self.store.active_to_all()[slot];
                reindex.insert(i, id);
                sink.record(i, id);
                temp_reindex.push(id.index());
                if touched.insert(id) {
                    new_indices.push(id);
                }
                self.store.touch(slot, stamp_in_sec);
            } else if let Some((slot, _)) = temp_index.query(&v.position)? {
                // Duplicate of an earlier provisional in this batch.
                temp_reindex.push(num_original_vertices + slot);
                converged[slot].push(i);
            } else {
                // Fresh provisional.
                let slot = temp_index.insert(v.position)?;
                debug_assert_eq!(slot, provisional.len());
                provisional.push(i);
                provisional_kept.push(false);
                converged.push(Vec::new());
                temp_reindex.push(num_original_vertices + slot);
            }
        }

        // Phase 2: a provisional survives only if a non-degenerate triangle
        // references it.
        for s in surfaces {
            let r = [temp_reindex[s[0]], temp_reindex[s[1]], temp_reindex[s[2]]];
            if r.iter().all(|&x| x < num_original_vertices) {
                continue;
            }
            if r[0] == r[1] || r[1] == r[2] || r[2] == r[0] {
                continue;
            }
            for &x in &r {
                if x >= num_original_vertices {
                    provisional_kept[x - num_original_vertices] = true;
                }
            }
        }

        // Phase 3: commit surviving provisionals.
        for (slot, &input_idx) in provisional.iter().enumerate() {
            if !provisional_kept[slot] {
                continue;
            }
            let v = vertices[input_idx];
            let id = self.store.append_vertex(v, stamp_in_sec);
            let index_slot = self.index.insert(v.position)?;
            debug_assert_eq!(index_slot + 1, self.store.num_active_vertices());

            reindex.insert(input_idx, id);
            sink.record(input_idx, id);
            for &m in &converged[slot] {
                reindex.insert(m, id);
                sink.record(m, id);
            }

            touched.insert(id);
            new_indices.push(id);
            new_vertices.push(v);
        }

        // Phase 4: commit triangles.
        'surfaces: for s in surfaces {
            let mut ids = [VertexId::new(0); 3];
            for (j, &idx) in s.iter().enumerate() {
                match reindex.get(&idx) {
                    Some(&id) => ids[j] = id,
                    // Its provisional was discarded.
                    None => continue 'surfaces,
                }
            }
            let t = Triangle(ids);
            if t.is_degenerate() {
                continue;
            }
            if self.store.surface_exists(&t) {
                continue;
            }
            self.store.append_triangle(t);
            new_triangles.push(t);
        }

        Ok((new_vertices, new_triangles, new_indices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{BlockIndex, MeshBlock};

    fn verts(coords: &[(f64, f64, f64)]) -> Vec<ColoredVertex> {
        coords
            .iter()
            .map(|&(x, y, z)| ColoredVertex::from_coords(x, y, z))
            .collect()
    }

    fn ids(raw: &[usize]) -> Vec<VertexId> {
        raw.iter().map(|&i| VertexId::new(i)).collect()
    }

    /// Two well-separated triangles, the first batch of most scenarios.
    fn far_triangles() -> (Vec<ColoredVertex>, Vec<[usize; 3]>) {
        (
            verts(&[
                (0.0, 0.0, 0.0),
                (2.0, 0.0, 0.0),
                (0.0, 2.0, 0.0),
                (10.0, 0.0, 0.0),
                (12.0, 0.0, 0.0),
                (10.0, 2.0, 0.0),
            ]),
            vec![[0, 1, 2], [3, 4, 5]],
        )
    }

    /// Full structural invariant sweep over a compressor's state.
    fn check_invariants(c: &MeshCompressor) {
        let num_all = c.num_vertices();

        // Every triangle has three distinct, valid vertex IDs.
        for t in c.polygons() {
            assert!(!t.is_degenerate(), "degenerate triangle {:?}", t);
            for v in t.vertices() {
                assert!(v.index() < num_all, "dangling vertex {:?}", v);
            }
        }

        // No two triangles are equal as unordered vertex sets.
        let mut seen = HashSet::new();
        for t in c.polygons() {
            let mut key = t.vertices();
            key.sort_unstable();
            assert!(seen.insert(key), "duplicate surface {:?}", t);
        }

        // Active positions mirror the cumulative buffer.
        let positions = c.active_positions();
        let to_all = c.active_vertex_ids();
        assert_eq!(positions.len(), to_all.len());
        assert_eq!(positions.len(), c.active_timestamps().len());
        for (pos, id) in positions.iter().zip(to_all) {
            assert_eq!(*pos, c.all_vertices()[id.index()].position);
        }

        // Adjacency of each active vertex is exactly its incident triangles.
        for &id in to_all {
            let expected: Vec<usize> = c
                .polygons()
                .iter()
                .enumerate()
                .filter(|(_, t)| t.contains(id))
                .map(|(i, _)| i)
                .collect();
            assert_eq!(c.adjacent_polygons(id), Some(&expected[..]));
        }
    }

    #[test]
    fn test_two_far_triangles() {
        let mut c = MeshCompressor::new(1.0).unwrap();
        let (vertices, surfaces) = far_triangles();
        let out = c.compress_vertices(&vertices, &surfaces, 1.0).unwrap();

        assert_eq!(out.new_vertices.len(), 6);
        assert_eq!(out.new_triangles.len(), 2);
        assert_eq!(out.new_indices, ids(&[0, 1, 2, 3, 4, 5]));
        for i in 0..6 {
            assert_eq!(out.remap.get(i), Some(VertexId::new(i)));
        }
        assert_eq!(c.num_vertices(), 6);
        assert_eq!(c.num_active_vertices(), 6);
        assert_eq!(c.polygons().len(), 2);
        check_invariants(&c);
    }

    #[test]
    fn test_exact_resubmission_is_idempotent() {
        let mut c = MeshCompressor::new(1.0).unwrap();
        let (vertices, surfaces) = far_triangles();
        c.compress_vertices(&vertices, &surfaces, 1.0).unwrap();
        let out = c.compress_vertices(&vertices, &surfaces, 2.0).unwrap();

        assert!(out.new_vertices.is_empty());
        assert!(out.new_triangles.is_empty());
        assert_eq!(out.new_indices, ids(&[0, 1, 2, 3, 4, 5]));
        assert_eq!(c.num_vertices(), 6);
        assert_eq!(c.polygons().len(), 2);
        // Every slot's last-seen time advanced.
        assert!(c.active_timestamps().iter().all(|&t| t == 2.0));
        check_invariants(&c);
    }

    #[test]
    fn test_proximity_merge() {
        let mut c = MeshCompressor::new(1.0).unwrap();
        let (vertices, surfaces) = far_triangles();
        c.compress_vertices(&vertices, &surfaces, 1.0).unwrap();

        let nearby = verts(&[(0.1, 0.0, 0.0), (2.1, 0.0, 0.0), (0.1, 2.1, 0.0)]);
        let out = c.compress_vertices(&nearby, &[[0, 1, 2]], 3.0).unwrap();

        assert!(out.new_vertices.is_empty());
        assert!(out.new_triangles.is_empty());
        assert_eq!(out.new_indices, ids(&[0, 1, 2]));
        for i in 0..3 {
            assert_eq!(out.remap.get(i), Some(VertexId::new(i)));
        }
        // Only the reobserved slots advanced.
        assert_eq!(c.active_timestamps(), &[3.0, 3.0, 3.0, 1.0, 1.0, 1.0]);
        check_invariants(&c);
    }

    #[test]
    fn test_remap_roundtrip_within_tolerance() {
        let mut c = MeshCompressor::new(1.0).unwrap();
        let (vertices, surfaces) = far_triangles();
        c.compress_vertices(&vertices, &surfaces, 1.0).unwrap();

        let nearby = verts(&[(0.4, 0.9, 0.0), (2.9, 0.3, 0.0), (0.2, 2.2, 0.0)]);
        let out = c.compress_vertices(&nearby, &[[0, 1, 2]], 2.0).unwrap();

        let tolerance = 1.0 * 3.0_f64.sqrt();
        for (i, v) in nearby.iter().enumerate() {
            let id = out.remap.get(i).expect("surviving input must be remapped");
            let canonical = c.all_vertices()[id.index()].position;
            assert!((v.position - canonical).norm() <= tolerance);
        }
    }

    #[test]
    fn test_coincident_inputs_degenerate_triangle() {
        let mut c = MeshCompressor::new(1.0).unwrap();
        let vertices = verts(&[(0.0, 0.0, 0.0), (0.0, 0.0, 0.0), (5.0, 0.0, 0.0)]);
        let out = c.compress_vertices(&vertices, &[[0, 1, 2]], 1.0).unwrap();

        // The coincident pair collapses to one provisional, the triangle
        // degenerates, and no provisional is ever confirmed.
        assert!(out.new_vertices.is_empty());
        assert!(out.new_triangles.is_empty());
        assert!(out.new_indices.is_empty());
        assert!(out.remap.is_empty());
        assert_eq!(c.num_vertices(), 0);
        check_invariants(&c);
    }

    #[test]
    fn test_orphan_provisional_discarded() {
        let mut c = MeshCompressor::new(1.0).unwrap();
        let vertices = verts(&[
            (0.0, 0.0, 0.0),
            (2.0, 0.0, 0.0),
            (0.0, 2.0, 0.0),
            (20.0, 20.0, 20.0),
        ]);
        let out = c.compress_vertices(&vertices, &[[0, 1, 2]], 1.0).unwrap();

        assert_eq!(out.new_vertices.len(), 3);
        assert_eq!(out.new_triangles.len(), 1);
        assert_eq!(out.new_indices, ids(&[0, 1, 2]));
        assert_eq!(out.remap.get(3), None);
        // The unreferenced vertex never received an ID.
        assert_eq!(c.num_vertices(), 3);
        check_invariants(&c);
    }

    #[test]
    fn test_prune_and_rediscovery() {
        let mut c = MeshCompressor::new(1.0).unwrap();
        let (vertices, surfaces) = far_triangles();
        c.compress_vertices(&vertices, &surfaces, 1.0).unwrap();
        c.compress_vertices(&vertices, &surfaces, 2.0).unwrap();

        // Everything was refreshed at 2.0, so a 1.5 cutoff drops nothing.
        c.prune(1.5);
        assert_eq!(c.num_active_vertices(), 6);
        assert_eq!(c.num_vertices(), 6);
        check_invariants(&c);

        c.prune(2.5);
        assert_eq!(c.num_active_vertices(), 0);
        assert_eq!(c.num_vertices(), 6);
        assert_eq!(c.polygons().len(), 2);
        check_invariants(&c);

        // A pruned position is unseen again and commits a fresh ID.
        let vertices = verts(&[(0.0, 0.0, 0.0), (2.0, 0.0, 0.0), (0.0, 2.0, 0.0)]);
        let out = c.compress_vertices(&vertices, &[[0, 1, 2]], 3.0).unwrap();
        assert_eq!(out.new_indices, ids(&[6, 7, 8]));
        assert_eq!(c.num_vertices(), 9);
        check_invariants(&c);
    }

    #[test]
    fn test_prune_monotonicity() {
        let mut c = MeshCompressor::new(1.0).unwrap();
        let (vertices, surfaces) = far_triangles();
        c.compress_vertices(&vertices, &surfaces, 1.0).unwrap();
        let later = verts(&[(50.0, 0.0, 0.0), (52.0, 0.0, 0.0), (50.0, 2.0, 0.0)]);
        c.compress_vertices(&later, &[[0, 1, 2]], 2.0).unwrap();

        c.prune(1.5);
        let after_first: Vec<VertexId> = c.active_vertex_ids().to_vec();
        assert_eq!(after_first, ids(&[6, 7, 8]));

        // A second prune with an equal or earlier cutoff changes nothing.
        c.prune(1.5);
        assert_eq!(c.active_vertex_ids(), &after_first[..]);
        c.prune(1.0);
        assert_eq!(c.active_vertex_ids(), &after_first[..]);
        check_invariants(&c);
    }

    #[test]
    fn test_new_vertices_are_referenced_by_new_triangles() {
        let mut c = MeshCompressor::new(1.0).unwrap();
        let (mut vertices, mut surfaces) = far_triangles();
        vertices.push(ColoredVertex::from_coords(30.0, 30.0, 30.0));
        surfaces.push([0, 1, 6]);
        let out = c.compress_vertices(&vertices, &surfaces, 1.0).unwrap();

        for offset in 0..out.new_vertices.len() {
            let id = VertexId::new(offset); // batch started from an empty store
            assert!(
                out.new_triangles.iter().any(|t| t.contains(id)),
                "committed vertex {:?} is unreferenced",
                id
            );
        }
        check_invariants(&c);
    }

    #[test]
    fn test_duplicate_triangle_within_batch() {
        let mut c = MeshCompressor::new(1.0).unwrap();
        let vertices = verts(&[(0.0, 0.0, 0.0), (2.0, 0.0, 0.0), (0.0, 2.0, 0.0)]);
        let out = c
            .compress_vertices(&vertices, &[[0, 1, 2], [2, 0, 1]], 1.0)
            .unwrap();

        // The rewound copy is the same unordered surface.
        assert_eq!(out.new_triangles.len(), 1);
        assert_eq!(c.polygons().len(), 1);
        check_invariants(&c);
    }

    #[test]
    fn test_duplicate_surface_over_existing_vertices() {
        let mut c = MeshCompressor::new(1.0).unwrap();
        let (vertices, surfaces) = far_triangles();
        c.compress_vertices(&vertices, &surfaces, 1.0).unwrap();

        // Same three positions, different winding: still the same surface.
        let rewound = verts(&[(0.0, 2.0, 0.0), (2.0, 0.0, 0.0), (0.0, 0.0, 0.0)]);
        let out = c.compress_vertices(&rewound, &[[0, 1, 2]], 2.0).unwrap();
        assert!(out.new_triangles.is_empty());
        assert_eq!(c.polygons().len(), 2);
        check_invariants(&c);
    }

    #[test]
    fn test_new_surface_over_existing_vertices() {
        let mut c = MeshCompressor::new(1.0).unwrap();
        let vertices = verts(&[
            (0.0, 0.0, 0.0),
            (2.0, 0.0, 0.0),
            (0.0, 2.0, 0.0),
            (2.0, 2.0, 0.0),
        ]);
        c.compress_vertices(&vertices, &[[0, 1, 2]], 1.0).unwrap();

        // A genuinely new connection among already-known vertices.
        let out = c
            .compress_vertices(&vertices, &[[0, 1, 2], [1, 3, 2]], 2.0)
            .unwrap();
        assert_eq!(out.new_vertices.len(), 1); // (2, 2, 0) is new
        assert_eq!(out.new_triangles.len(), 1);
        assert_eq!(c.polygons().len(), 2);
        check_invariants(&c);
    }

    #[test]
    fn test_empty_and_undersized_batches() {
        let mut c = MeshCompressor::new(1.0).unwrap();
        let out = c.compress_vertices(&[], &[], 1.0).unwrap();
        assert!(out.new_indices.is_empty());

        let two = verts(&[(0.0, 0.0, 0.0), (2.0, 0.0, 0.0)]);
        let out = c.compress_vertices(&two, &[[0, 1, 1]], 1.0).unwrap();
        assert!(out.new_indices.is_empty());

        let (vertices, _) = far_triangles();
        let out = c.compress_vertices(&vertices, &[], 1.0).unwrap();
        assert!(out.new_indices.is_empty());
        assert_eq!(c.num_vertices(), 0);
    }

    #[test]
    fn test_invalid_resolution_rejected() {
        assert!(matches!(
            MeshCompressor::new(0.0),
            Err(CompressionError::InvalidResolution { .. })
        ));
        assert!(matches!(
            MeshCompressor::new(-0.5),
            Err(CompressionError::InvalidResolution { .. })
        ));
        assert!(matches!(
            MeshCompressor::new(f64::NAN),
            Err(CompressionError::InvalidResolution { .. })
        ));
    }

    #[test]
    fn test_out_of_range_surface_rejected() {
        let mut c = MeshCompressor::new(1.0).unwrap();
        let vertices = verts(&[(0.0, 0.0, 0.0), (2.0, 0.0, 0.0), (0.0, 2.0, 0.0)]);
        let err = c.compress_vertices(&vertices, &[[0, 1, 7]], 1.0).unwrap_err();
        assert!(matches!(err, CompressionError::InvalidVertexIndex { vertex: 7, .. }));
        assert_eq!(c.num_vertices(), 0);
    }

    #[test]
    fn test_spatial_failure_rolls_back() {
        let mut c = MeshCompressor::new(1.0).unwrap();
        let (vertices, surfaces) = far_triangles();
        c.compress_vertices(&vertices, &surfaces, 1.0).unwrap();

        let bad = verts(&[(0.0, 0.0, 0.0), (f64::NAN, 0.0, 0.0), (0.0, 2.0, 0.0)]);
        let err = c.compress_vertices(&bad, &[[0, 1, 2]], 2.0).unwrap_err();
        assert!(matches!(err, CompressionError::SpatialIndex { .. }));

        // The store looks exactly as it did before the failed batch.
        assert_eq!(c.num_vertices(), 6);
        assert_eq!(c.num_active_vertices(), 6);
        assert_eq!(c.polygons().len(), 2);
        check_invariants(&c);

        // And the compressor still works.
        let out = c.compress_vertices(&vertices, &surfaces, 3.0).unwrap();
        assert!(out.new_vertices.is_empty());
        assert_eq!(out.new_indices, ids(&[0, 1, 2, 3, 4, 5]));
        check_invariants(&c);
    }

    #[test]
    fn test_block_mesh_with_convergence() {
        let mut c = MeshCompressor::new(1.0).unwrap();
        let a = BlockIndex::new(0, 0, 0);
        let b = BlockIndex::new(1, 0, 0);
        let mesh = BlockMesh::new(
            1.6,
            vec![
                MeshBlock::new(
                    a,
                    verts(&[(0.0, 0.0, 0.0), (2.0, 0.0, 0.0), (0.0, 2.0, 0.0)]),
                ),
                MeshBlock::new(
                    b,
                    verts(&[(2.05, 0.0, 0.0), (4.0, 0.0, 0.0), (2.0, 2.0, 0.0)]),
                ),
            ],
        );
        let out = c.compress_blocks(&mesh, 1.0).unwrap();

        // The shared edge vertex collapses onto block A's provisional.
        assert_eq!(out.new_vertices.len(), 5);
        assert_eq!(out.new_triangles.len(), 2);
        assert_eq!(out.new_indices, ids(&[0, 1, 2, 3, 4]));
        assert_eq!(out.remap.get(a, 0), Some(VertexId::new(0)));
        assert_eq!(out.remap.get(a, 1), Some(VertexId::new(1)));
        assert_eq!(out.remap.get(a, 2), Some(VertexId::new(2)));
        // Convergence fan-out: (b, 0) addresses the same canonical vertex.
        assert_eq!(out.remap.get(b, 0), Some(VertexId::new(1)));
        assert_eq!(out.remap.get(b, 1), Some(VertexId::new(3)));
        assert_eq!(out.remap.get(b, 2), Some(VertexId::new(4)));
        check_invariants(&c);
    }

    #[test]
    fn test_block_mesh_reobservation_remap() {
        let mut c = MeshCompressor::new(1.0).unwrap();
        let a = BlockIndex::new(0, 0, 0);
        let mesh = BlockMesh::new(
            1.6,
            vec![MeshBlock::new(
                a,
                verts(&[(0.0, 0.0, 0.0), (2.0, 0.0, 0.0), (0.0, 2.0, 0.0)]),
            )],
        );
        c.compress_blocks(&mesh, 1.0).unwrap();

        let out = c.compress_blocks(&mesh, 2.0).unwrap();
        assert!(out.new_vertices.is_empty());
        // Reobservations still appear in the block remap.
        assert_eq!(out.remap.get(a, 0), Some(VertexId::new(0)));
        assert_eq!(out.remap.get(a, 1), Some(VertexId::new(1)));
        assert_eq!(out.remap.get(a, 2), Some(VertexId::new(2)));
        check_invariants(&c);
    }

    #[test]
    fn test_ragged_block_rejected() {
        let mut c = MeshCompressor::new(1.0).unwrap();
        let block = BlockIndex::new(0, 0, 0);
        let mesh = BlockMesh::new(
            1.6,
            vec![MeshBlock::new(
                block,
                verts(&[(0.0, 0.0, 0.0), (2.0, 0.0, 0.0), (0.0, 2.0, 0.0), (5.0, 0.0, 0.0)]),
            )],
        );
        let err = c.compress_blocks(&mesh, 1.0).unwrap_err();
        assert!(matches!(err, CompressionError::RaggedBlock { len: 4, .. }));
        assert_eq!(c.num_vertices(), 0);
    }

    #[test]
    fn test_compressed_mesh_accessor() {
        let mut c = MeshCompressor::new(1.0).unwrap();
        let (vertices, surfaces) = far_triangles();
        c.compress_vertices(&vertices, &surfaces, 1.0).unwrap();

        let mesh = c.compressed_mesh();
        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.num_triangles(), 2);
        assert_eq!(mesh.triangles[0], [0, 1, 2]);
        assert_eq!(mesh.triangles[1], [3, 4, 5]);
        for (v, input) in mesh.vertices.iter().zip(&vertices) {
            assert_eq!(v.position, input.position);
        }
    }

    #[test]
    fn test_colors_carried_through() {
        let mut c = MeshCompressor::new(1.0).unwrap();
        let vertices = vec![
            ColoredVertex::new(Point3::new(0.0, 0.0, 0.0), [255, 0, 0, 255]),
            ColoredVertex::new(Point3::new(2.0, 0.0, 0.0), [0, 255, 0, 255]),
            ColoredVertex::new(Point3::new(0.0, 2.0, 0.0), [0, 0, 255, 128]),
        ];
        let out = c.compress_vertices(&vertices, &[[0, 1, 2]], 1.0).unwrap();

        assert_eq!(out.new_vertices[0].color, [255, 0, 0, 255]);
        assert_eq!(out.new_vertices[2].color, [0, 0, 255, 128]);
        assert_eq!(c.all_vertices()[1].color, [0, 255, 0, 255]);
    }

    #[test]
    fn test_compressor_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<MeshCompressor>();
    }
}
