//! Indexed triangle set.

use crate::geometry::{BoundingBox3F, Point3F};
use crate::{CoordF, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One triangle as three indices into the vertex array.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triangle {
    pub indices: [u32; 3],
}

impl Triangle {
    #[inline]
    pub const fn new(v0: u32, v1: u32, v2: u32) -> Self {
        Self {
            indices: [v0, v1, v2],
        }
    }

    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.indices[0] == self.indices[1]
            || self.indices[1] == self.indices[2]
            || self.indices[2] == self.indices[0]
    }
}

impl fmt::Debug for Triangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Triangle({}, {}, {})",
            self.indices[0], self.indices[1], self.indices[2]
        )
    }
}

/// A 3D triangle mesh in millimeter coordinates.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct TriangleMesh {
    vertices: Vec<Point3F>,
    indices: Vec<Triangle>,
}

impl TriangleMesh {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertex_count: usize, triangle_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            indices: Vec::with_capacity(triangle_count),
        }
    }

    pub fn from_parts(vertices: Vec<Point3F>, indices: Vec<Triangle>) -> Self {
        Self { vertices, indices }
    }

    #[inline]
    pub fn vertices(&self) -> &[Point3F] {
        &self.vertices
    }

    #[inline]
    pub fn indices(&self) -> &[Triangle] {
        &self.indices
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Append a vertex and return its index.
    pub fn add_vertex(&mut self, v: Point3F) -> u32 {
        let idx = self.vertices.len() as u32;
        self.vertices.push(v);
        idx
    }

    pub fn add_triangle(&mut self, v0: u32, v1: u32, v2: u32) {
        self.indices.push(Triangle::new(v0, v1, v2));
    }

    /// The three vertex indices of triangle `tri_idx`.
    #[inline]
    pub fn triangle_indices(&self, tri_idx: usize) -> [u32; 3] {
        self.indices[tri_idx].indices
    }

    /// The three corner positions of triangle `tri_idx`.
    #[inline]
    pub fn triangle_vertices(&self, tri_idx: usize) -> [Point3F; 3] {
        let t = &self.indices[tri_idx];
        [
            self.vertices[t.indices[0] as usize],
            self.vertices[t.indices[1] as usize],
            self.vertices[t.indices[2] as usize],
        ]
    }

    pub fn bounding_box(&self) -> BoundingBox3F {
        let mut bb = BoundingBox3F::new();
        for v in &self.vertices {
            bb.merge_point(*v);
        }
        bb
    }

    pub fn translate(&mut self, v: Point3F) {
        for vertex in &mut self.vertices {
            *vertex = *vertex + v;
        }
    }

    /// Append another mesh, remapping its vertex indices.
    pub fn merge(&mut self, other: &TriangleMesh) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|t| {
            Triangle::new(
                t.indices[0] + base,
                t.indices[1] + base,
                t.indices[2] + base,
            )
        }));
    }

    /// Outward normal of a triangle (CCW winding seen from outside).
    pub fn triangle_normal(&self, tri_idx: usize) -> Point3F {
        let [a, b, c] = self.triangle_vertices(tri_idx);
        (b - a).cross(&(c - a)).normalize()
    }

    /// Check that every triangle references an existing vertex.
    pub fn validate(&self) -> Result<()> {
        let n = self.vertices.len() as u32;
        for (i, t) in self.indices.iter().enumerate() {
            if t.indices.iter().any(|&idx| idx >= n) {
                return Err(Error::Mesh(format!(
                    "triangle {} references a vertex out of range (vertex count {})",
                    i, n
                )));
            }
        }
        Ok(())
    }

    /// Axis-aligned cube centered at the origin; test fixture.
    pub fn cube(size: CoordF) -> Self {
        let h = size / 2.0;
        let vertices = vec![
            Point3F::new(-h, -h, -h),
            Point3F::new(h, -h, -h),
            Point3F::new(h, h, -h),
            Point3F::new(-h, h, -h),
            Point3F::new(-h, -h, h),
            Point3F::new(h, -h, h),
            Point3F::new(h, h, h),
            Point3F::new(-h, h, h),
        ];
        let indices = vec![
            Triangle::new(0, 2, 1),
            Triangle::new(0, 3, 2),
            Triangle::new(4, 5, 6),
            Triangle::new(4, 6, 7),
            Triangle::new(0, 1, 5),
            Triangle::new(0, 5, 4),
            Triangle::new(2, 3, 7),
            Triangle::new(2, 7, 6),
            Triangle::new(0, 4, 7),
            Triangle::new(0, 7, 3),
            Triangle::new(1, 2, 6),
            Triangle::new(1, 6, 5),
        ];
        Self::from_parts(vertices, indices)
    }
}

impl fmt::Debug for TriangleMesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TriangleMesh({} vertices, {} triangles)",
            self.vertices.len(),
            self.indices.len()
        )
    }
}
