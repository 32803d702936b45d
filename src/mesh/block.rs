//! Block-structured mesh input.
//!
//! Upstream voxel meshers emit geometry in blocks: each block carries a
//! 3-integer grid index and a flat run of vertices where every consecutive
//! three vertices form one triangle. Triangles never span block boundaries.
//!
//! Consumers of the compressed output index vertices by
//! `(block index, offset within block)`, so the block-mesh entry point
//! reports its remapping keyed the same way (see
//! [`BlockRemap`](crate::compress::BlockRemap)).

use std::fmt::{self, Debug};

use super::types::ColoredVertex;

/// A 3-integer index identifying a voxel block.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct BlockIndex(pub [i64; 3]);

impl BlockIndex {
    /// Create a block index from its three grid coordinates.
    pub fn new(x: i64, y: i64, z: i64) -> Self {
        Self([x, y, z])
    }
}

impl Debug for BlockIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B({}, {}, {})", self.0[0], self.0[1], self.0[2])
    }
}

impl From<[i64; 3]> for BlockIndex {
    fn from(v: [i64; 3]) -> Self {
        Self(v)
    }
}

/// One block of a [`BlockMesh`].
///
/// The vertex count must be a multiple of three; vertices `3k`, `3k+1`,
/// `3k+2` form triangle `k` of the block.
#[derive(Debug, Clone)]
pub struct MeshBlock {
    /// The block's grid index.
    pub index: BlockIndex,

    /// The block's vertices, three per triangle, colors included.
    pub vertices: Vec<ColoredVertex>,
}

impl MeshBlock {
    /// Create a block from its index and vertex run.
    pub fn new(index: BlockIndex, vertices: Vec<ColoredVertex>) -> Self {
        Self { index, vertices }
    }

    /// The number of triangles encoded by this block.
    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.vertices.len() / 3
    }
}

/// A block-structured triangle mesh, as produced by upstream voxel meshers.
#[derive(Debug, Clone)]
pub struct BlockMesh {
    /// Edge length of one block in meters, as reported upstream.
    pub block_edge_length: f64,

    /// The mesh blocks.
    pub blocks: Vec<MeshBlock>,
}

impl BlockMesh {
    /// Create a block mesh.
    pub fn new(block_edge_length: f64, blocks: Vec<MeshBlock>) -> Self {
        Self {
            block_edge_length,
            blocks,
        }
    }

    /// Total vertex count across all blocks.
    pub fn num_vertices(&self) -> usize {
        self.blocks.iter().map(|b| b.vertices.len()).sum()
    }
}
