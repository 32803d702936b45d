//! Incremental compression of streaming mesh batches.
//!
//! # Overview
//!
//! The entry point is [`MeshCompressor`]: construct it once with a dedup
//! `resolution`, then feed it batches via
//! [`compress_mesh`](MeshCompressor::compress_mesh),
//! [`compress_vertices`](MeshCompressor::compress_vertices), or
//! [`compress_blocks`](MeshCompressor::compress_blocks). Each call returns
//! a [`CompressionOutput`]: the vertices and triangles this batch genuinely
//! added, the IDs it touched, and a remap from the caller's vertex
//! references to canonical [`VertexId`]s.
//!
//! Stale geometry is dropped with [`prune`](MeshCompressor::prune), which
//! retires active vertices not seen since a caller-supplied cutoff while
//! leaving the cumulative mesh (and all previously returned IDs) intact.
//!
//! [`VertexId`]: crate::mesh::VertexId

mod compressor;
mod remap;
mod store;

pub use compressor::{CompressionOutput, MeshCompressor};
pub use remap::{BlockRemap, FlatRemap, RemapSink};
