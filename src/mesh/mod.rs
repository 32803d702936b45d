//! Core mesh data structures.
//!
//! This module provides the vertex, triangle, and input-mesh types consumed
//! and produced by the compressor.
//!
//! # Overview
//!
//! Compression input arrives in one of two shapes:
//!
//! - [`TriangleMesh`] - a flat list of colored vertices plus index triples
//! - [`BlockMesh`] - vertices grouped into voxel blocks, one triangle per
//!   three consecutive vertices within a block
//!
//! Compression output always refers to vertices by [`VertexId`], the stable
//! index into the compressor's cumulative vertex buffer.
//!
//! # Index Stability
//!
//! A [`VertexId`] never moves or disappears: the cumulative buffer is
//! append-only, and pruning only shrinks the *active* subset eligible for
//! proximity matching. Triangles therefore stay valid for the lifetime of
//! the compressor.

mod block;
mod types;

pub use block::{BlockIndex, BlockMesh, MeshBlock};
pub use types::{ColoredVertex, Triangle, TriangleMesh, VertexId};
