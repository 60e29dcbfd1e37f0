//! Spatial index for vertical ray queries against a mesh.

use crate::geometry::{Point3F, PointF};
use crate::mesh::TriangleMesh;
use crate::{CoordF, EPSILON};

/// A hit of a vertical ray against a triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Z coordinate of the intersection.
    pub z: CoordF,
    /// Triangle index in the source mesh.
    pub triangle: usize,
}

/// XY bucket grid over mesh triangles.
///
/// The index only answers vertical (±Z) ray queries, which is all the
/// support router needs. Each bucket holds the triangles whose XY
/// footprint overlaps that cell.
#[derive(Debug)]
pub struct MeshIndex<'a> {
    mesh: &'a TriangleMesh,
    grid: Vec<Vec<u32>>,
    cols: usize,
    rows: usize,
    origin: PointF,
    cell: CoordF,
}

impl<'a> MeshIndex<'a> {
    pub fn new(mesh: &'a TriangleMesh) -> Self {
        let bb = mesh.bounding_box();
        if !bb.is_defined() || mesh.is_empty() {
            return Self {
                mesh,
                grid: Vec::new(),
                cols: 0,
                rows: 0,
                origin: PointF::new(0.0, 0.0),
                cell: 1.0,
            };
        }

        let size_x = (bb.max.x - bb.min.x).max(EPSILON);
        let size_y = (bb.max.y - bb.min.y).max(EPSILON);

        // Aim for roughly one triangle per cell on an evenly meshed model.
        let target = (mesh.triangle_count() as CoordF).sqrt().ceil().max(1.0);
        let cell = (size_x.max(size_y) / target).max(EPSILON);

        let cols = (size_x / cell).ceil() as usize + 1;
        let rows = (size_y / cell).ceil() as usize + 1;
        let origin = PointF::new(bb.min.x, bb.min.y);

        let mut grid = vec![Vec::new(); cols * rows];
        for tri_idx in 0..mesh.triangle_count() {
            let [a, b, c] = mesh.triangle_vertices(tri_idx);
            let min_x = a.x.min(b.x).min(c.x);
            let max_x = a.x.max(b.x).max(c.x);
            let min_y = a.y.min(b.y).min(c.y);
            let max_y = a.y.max(b.y).max(c.y);

            let c0 = (((min_x - origin.x) / cell).floor() as isize).max(0) as usize;
            let c1 = ((((max_x - origin.x) / cell).floor() as isize).max(0) as usize)
                .min(cols - 1);
            let r0 = (((min_y - origin.y) / cell).floor() as isize).max(0) as usize;
            let r1 = ((((max_y - origin.y) / cell).floor() as isize).max(0) as usize)
                .min(rows - 1);

            for r in r0..=r1 {
                for col in c0.min(cols - 1)..=c1 {
                    grid[r * cols + col].push(tri_idx as u32);
                }
            }
        }

        Self {
            mesh,
            grid,
            cols,
            rows,
            origin,
            cell,
        }
    }

    fn bucket(&self, x: CoordF, y: CoordF) -> Option<&[u32]> {
        if self.grid.is_empty() {
            return None;
        }
        let col = ((x - self.origin.x) / self.cell).floor() as isize;
        let row = ((y - self.origin.y) / self.cell).floor() as isize;
        if col < 0 || row < 0 || col as usize >= self.cols || row as usize >= self.rows {
            return None;
        }
        Some(&self.grid[row as usize * self.cols + col as usize])
    }

    /// Cast a ray straight down from `from` and return the closest hit
    /// strictly below `from.z - EPSILON`.
    pub fn raycast_down(&self, from: Point3F) -> Option<RayHit> {
        let candidates = self.bucket(from.x, from.y)?;
        let mut best: Option<RayHit> = None;
        for &tri in candidates {
            let tri = tri as usize;
            if let Some(z) = triangle_z_at(self.mesh.triangle_vertices(tri), from.x, from.y) {
                if z < from.z - EPSILON
                    && best.map_or(true, |hit| z > hit.z)
                {
                    best = Some(RayHit { z, triangle: tri });
                }
            }
        }
        best
    }

    /// Cast a ray straight up from `from` and return the closest hit
    /// strictly above `from.z + EPSILON`.
    pub fn raycast_up(&self, from: Point3F) -> Option<RayHit> {
        let candidates = self.bucket(from.x, from.y)?;
        let mut best: Option<RayHit> = None;
        for &tri in candidates {
            let tri = tri as usize;
            if let Some(z) = triangle_z_at(self.mesh.triangle_vertices(tri), from.x, from.y) {
                if z > from.z + EPSILON
                    && best.map_or(true, |hit| z < hit.z)
                {
                    best = Some(RayHit { z, triangle: tri });
                }
            }
        }
        best
    }
}

/// Z of the triangle plane at (x, y), if the point projects inside the
/// triangle's XY footprint.
fn triangle_z_at(tri: [Point3F; 3], x: CoordF, y: CoordF) -> Option<CoordF> {
    let [a, b, c] = tri;

    let v0x = b.x - a.x;
    let v0y = b.y - a.y;
    let v1x = c.x - a.x;
    let v1y = c.y - a.y;
    let denom = v0x * v1y - v1x * v0y;
    if denom.abs() < 1e-12 {
        // Vertical triangle, no well defined footprint.
        return None;
    }

    let px = x - a.x;
    let py = y - a.y;
    let u = (px * v1y - v1x * py) / denom;
    let v = (v0x * py - px * v0y) / denom;
    if u < -1e-9 || v < -1e-9 || u + v > 1.0 + 1e-9 {
        return None;
    }

    Some(a.z + u * (b.z - a.z) + v * (c.z - a.z))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raycast_down_hits_cube_top() {
        let mesh = TriangleMesh::cube(10.0);
        let index = MeshIndex::new(&mesh);

        let hit = index
            .raycast_down(Point3F::new(0.0, 0.0, 20.0))
            .expect("ray should hit the cube");
        assert!((hit.z - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_raycast_down_from_inside_hits_bottom() {
        let mesh = TriangleMesh::cube(10.0);
        let index = MeshIndex::new(&mesh);

        let hit = index
            .raycast_down(Point3F::new(1.0, 1.0, 0.0))
            .expect("ray should hit the cube floor");
        assert!((hit.z - (-5.0)).abs() < 1e-9);
    }

    #[test]
    fn test_raycast_misses_outside_footprint() {
        let mesh = TriangleMesh::cube(10.0);
        let index = MeshIndex::new(&mesh);
        assert!(index.raycast_down(Point3F::new(50.0, 50.0, 20.0)).is_none());
    }

    #[test]
    fn test_raycast_up() {
        let mesh = TriangleMesh::cube(10.0);
        let index = MeshIndex::new(&mesh);
        let hit = index
            .raycast_up(Point3F::new(0.0, 0.0, -20.0))
            .expect("ray should hit the cube underside");
        assert!((hit.z - (-5.0)).abs() < 1e-9);
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = TriangleMesh::new();
        let index = MeshIndex::new(&mesh);
        assert!(index.raycast_down(Point3F::new(0.0, 0.0, 1.0)).is_none());
    }
}
