//! Core mesh element types.
//!
//! This module provides the vertex and triangle types used by the
//! compressor, along with the type-safe [`VertexId`] index wrapper.

use std::fmt::{self, Debug};

use nalgebra::Point3;

/// A type-safe index into the cumulative vertex buffer.
///
/// A `VertexId` is assigned the first time a vertex is committed and stays
/// valid for the lifetime of the compressor, even after the vertex is
/// pruned from the active set.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct VertexId(usize);

impl VertexId {
    /// Create a new index from a raw value.
    #[inline]
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Get the raw index value.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl Debug for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V({})", self.0)
    }
}

impl From<usize> for VertexId {
    fn from(v: usize) -> Self {
        Self(v)
    }
}

/// A mesh vertex: 3D position plus RGBA color.
///
/// The position participates in proximity matching; the color is carried
/// through compression untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColoredVertex {
    /// The 3D position of this vertex.
    pub position: Point3<f64>,

    /// RGBA color, carried through unmodified.
    pub color: [u8; 4],
}

impl ColoredVertex {
    /// Create a new vertex at the given position with the given color.
    pub fn new(position: Point3<f64>, color: [u8; 4]) -> Self {
        Self { position, color }
    }

    /// Create a new white vertex from coordinates.
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z), [255, 255, 255, 255])
    }
}

/// A triangle over committed vertices.
///
/// The vertex order is preserved as given by the caller, but triangle
/// identity for duplicate detection is the *unordered* vertex set: two
/// triangles with the same three vertices in any winding are the same
/// surface.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Triangle(pub [VertexId; 3]);

impl Triangle {
    /// Create a triangle from three vertex IDs.
    pub fn new(a: VertexId, b: VertexId, c: VertexId) -> Self {
        Self([a, b, c])
    }

    /// The three vertex IDs in caller order.
    #[inline]
    pub fn vertices(&self) -> [VertexId; 3] {
        self.0
    }

    /// Check whether this triangle references the given vertex.
    #[inline]
    pub fn contains(&self, v: VertexId) -> bool {
        self.0.contains(&v)
    }

    /// Check whether any two vertex IDs coincide.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.0[0] == self.0[1] || self.0[1] == self.0[2] || self.0[2] == self.0[0]
    }

    /// Compare against another triangle as unordered vertex sets.
    pub fn same_surface(&self, other: &Triangle) -> bool {
        self.sorted() == other.sorted()
    }

    fn sorted(&self) -> [VertexId; 3] {
        let mut v = self.0;
        v.sort_unstable();
        v
    }
}

/// A flat triangle mesh: colored vertices plus index triples over them.
///
/// This is both the primary input shape for [`compress_mesh`] and the
/// output shape of [`compressed_mesh`].
///
/// [`compress_mesh`]: crate::compress::MeshCompressor::compress_mesh
/// [`compressed_mesh`]: crate::compress::MeshCompressor::compressed_mesh
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    /// Vertex positions and colors.
    pub vertices: Vec<ColoredVertex>,

    /// Triangles as index triples into `vertices`.
    pub triangles: Vec<[usize; 3]>,
}

impl TriangleMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of triangles.
    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }
}
