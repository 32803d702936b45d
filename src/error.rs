//! Error types for mince.
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

use crate::mesh::BlockIndex;

/// Result type alias using [`CompressionError`].
pub type Result<T> = std::result::Result<T, CompressionError>;

/// Errors that can occur during mesh compression.
#[derive(Error, Debug)]
pub enum CompressionError {
    /// The compression resolution is not a positive, finite number.
    #[error("invalid resolution: {value} (must be positive and finite)")]
    InvalidResolution {
        /// The rejected resolution value.
        value: f64,
    },

    /// A surface references a vertex index outside the input batch.
    #[error("surface {surface} references invalid vertex index {vertex} (batch has {num_vertices} vertices)")]
    InvalidVertexIndex {
        /// The surface index within the input batch.
        surface: usize,
        /// The invalid vertex index.
        vertex: usize,
        /// The number of vertices in the input batch.
        num_vertices: usize,
    },

    /// A mesh block's vertex count is not a multiple of three.
    ///
    /// Block meshes encode one triangle per three consecutive vertices, so
    /// a ragged block cannot be interpreted as a triangle soup.
    #[error("mesh block {block:?} has {len} vertices, not a multiple of 3")]
    RaggedBlock {
        /// The offending block.
        block: BlockIndex,
        /// The block's vertex count.
        len: usize,
    },

    /// The spatial index backend failed during an insert or query.
    ///
    /// When this occurs mid-batch, the compressor rolls the mesh store back
    /// to its pre-batch state before propagating the error.
    #[error("spatial index failure: {details}")]
    SpatialIndex {
        /// Description of the backend failure.
        details: String,
    },
}
