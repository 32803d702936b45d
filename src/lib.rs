//! # Mince
//!
//! An incremental triangle-mesh compressor for streaming 3D reconstruction.
//!
//! Mince ingests successive batches of mesh fragments - as emitted by a
//! real-time reconstruction pipeline - and maintains a single cumulative
//! compressed mesh. Vertices that land within a spatial resolution of an
//! already-known vertex are merged into it; triangles that degenerate under
//! that merge or duplicate an existing surface are dropped. Each batch
//! reports exactly what it added, so downstream consumers can work
//! incrementally instead of re-reading the whole mesh.
//!
//! ## Features
//!
//! - **Spatial deduplication**: voxel-grid proximity merge at a fixed
//!   resolution, pluggable via the [`SpatialIndex`](spatial::SpatialIndex)
//!   trait
//! - **Stable vertex IDs**: once committed, a [`VertexId`](mesh::VertexId)
//!   never moves, even across pruning
//! - **Two input shapes**: flat vertex/triangle lists and block-structured
//!   meshes from voxel-based meshers, with remaps keyed to match
//! - **Time-based pruning**: retire geometry not observed since a cutoff
//!   while keeping the cumulative mesh intact
//!
//! ## Quick Start
//!
//! ```
//! use mince::prelude::*;
//!
//! let mut compressor = MeshCompressor::new(0.1)?;
//!
//! // A batch from upstream: two triangles sharing an edge.
//! let mesh = TriangleMesh {
//!     vertices: vec![
//!         ColoredVertex::from_coords(0.0, 0.0, 0.0),
//!         ColoredVertex::from_coords(1.0, 0.0, 0.0),
//!         ColoredVertex::from_coords(0.0, 1.0, 0.0),
//!         ColoredVertex::from_coords(1.0, 1.0, 0.0),
//!     ],
//!     triangles: vec![[0, 1, 2], [1, 3, 2]],
//! };
//!
//! let output = compressor.compress_mesh(&mesh, 10.0)?;
//! assert_eq!(output.new_vertices.len(), 4);
//! assert_eq!(output.new_triangles.len(), 2);
//!
//! // Later, retire anything not seen since t = 20.0.
//! compressor.prune(20.0);
//! assert_eq!(compressor.num_active_vertices(), 0);
//! assert_eq!(compressor.num_vertices(), 4); // IDs stay valid
//! # Ok::<(), mince::CompressionError>(())
//! ```
//!
//! ## Remapping
//!
//! Callers usually keep their own references into the batches they submit.
//! The per-batch [`remap`](compress::CompressionOutput::remap) translates
//! those references into canonical IDs:
//!
//! ```
//! use mince::prelude::*;
//!
//! let mut compressor = MeshCompressor::new(0.5)?;
//! let mesh = TriangleMesh {
//!     vertices: vec![
//!         ColoredVertex::from_coords(0.0, 0.0, 0.0),
//!         ColoredVertex::from_coords(0.1, 0.0, 0.0), // merges with vertex 0
//!         ColoredVertex::from_coords(2.0, 0.0, 0.0),
//!         ColoredVertex::from_coords(0.0, 2.0, 0.0),
//!     ],
//!     triangles: vec![[0, 2, 3], [1, 2, 3]],
//! };
//!
//! let output = compressor.compress_mesh(&mesh, 1.0)?;
//! // Inputs 0 and 1 collapsed onto the same canonical vertex.
//! assert_eq!(output.remap.get(0), output.remap.get(1));
//! # Ok::<(), mince::CompressionError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compress;
pub mod error;
pub mod mesh;
pub mod spatial;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use mince::prelude::*;
/// ```
pub mod prelude {
    pub use crate::compress::{BlockRemap, CompressionOutput, FlatRemap, MeshCompressor};
    pub use crate::error::{CompressionError, Result};
    pub use crate::mesh::{
        BlockIndex, BlockMesh, ColoredVertex, MeshBlock, Triangle, TriangleMesh, VertexId,
    };
    pub use crate::spatial::{SpatialIndex, VoxelGrid};
}

pub use error::{CompressionError, Result};

// Re-export nalgebra types for convenience
pub use nalgebra;
