//! Triangle meshes for individual lattice struts.

use crate::geometry::Point3F;
use crate::mesh::TriangleMesh;
use crate::CoordF;

/// Facets around a strut circumference.
const STEPS: u32 = 24;

/// Orthonormal basis perpendicular to `axis` (unit length).
fn perpendicular_frame(axis: Point3F) -> (Point3F, Point3F) {
    let seed = if axis.z.abs() < 0.9 {
        Point3F::new(0.0, 0.0, 1.0)
    } else {
        Point3F::new(1.0, 0.0, 0.0)
    };
    let u = axis.cross(&seed).normalize();
    let v = axis.cross(&u).normalize();
    (u, v)
}

/// Capped tube from `p1` to `p2` with end radii `r1` and `r2`.
///
/// Equal radii give a cylinder, unequal give a frustum (used for the
/// widened pillar base).
pub fn tube(p1: Point3F, p2: Point3F, r1: CoordF, r2: CoordF) -> TriangleMesh {
    let axis = (p2 - p1).normalize();
    let (u, v) = perpendicular_frame(axis);

    let mut mesh = TriangleMesh::with_capacity((2 * STEPS + 2) as usize, (4 * STEPS) as usize);

    let ring = |center: Point3F, r: CoordF, mesh: &mut TriangleMesh| -> u32 {
        let first = mesh.vertex_count() as u32;
        for i in 0..STEPS {
            let phi = 2.0 * std::f64::consts::PI * i as CoordF / STEPS as CoordF;
            let offset = u * (r * phi.cos()) + v * (r * phi.sin());
            mesh.add_vertex(center + offset);
        }
        first
    };

    let bottom = ring(p1, r1, &mut mesh);
    let top = ring(p2, r2, &mut mesh);
    let c1 = mesh.add_vertex(p1);
    let c2 = mesh.add_vertex(p2);

    for i in 0..STEPS {
        let j = (i + 1) % STEPS;
        // Side wall, wound outward.
        mesh.add_triangle(bottom + i, top + i, top + j);
        mesh.add_triangle(bottom + i, top + j, bottom + j);
        // End caps.
        mesh.add_triangle(c1, bottom + j, bottom + i);
        mesh.add_triangle(c2, top + i, top + j);
    }
    mesh
}

/// UV sphere centered at `center`.
pub fn sphere(center: Point3F, radius: CoordF) -> TriangleMesh {
    let rings = STEPS / 2;
    let mut mesh = TriangleMesh::new();

    let north = mesh.add_vertex(center + Point3F::new(0.0, 0.0, radius));
    let mut ring_starts = Vec::with_capacity(rings as usize);
    for ring in 1..rings {
        let theta = std::f64::consts::PI * ring as CoordF / rings as CoordF;
        let z = radius * theta.cos();
        let r = radius * theta.sin();
        let first = mesh.vertex_count() as u32;
        ring_starts.push(first);
        for i in 0..STEPS {
            let phi = 2.0 * std::f64::consts::PI * i as CoordF / STEPS as CoordF;
            mesh.add_vertex(center + Point3F::new(r * phi.cos(), r * phi.sin(), z));
        }
    }
    let south = mesh.add_vertex(center + Point3F::new(0.0, 0.0, -radius));

    let last = ring_starts[ring_starts.len() - 1];
    for i in 0..STEPS {
        let j = (i + 1) % STEPS;
        mesh.add_triangle(north, ring_starts[0] + i, ring_starts[0] + j);
        mesh.add_triangle(south, last + j, last + i);
    }
    for w in ring_starts.windows(2) {
        let (a, b) = (w[0], w[1]);
        for i in 0..STEPS {
            let j = (i + 1) % STEPS;
            mesh.add_triangle(a + i, b + i, b + j);
            mesh.add_triangle(a + i, b + j, a + j);
        }
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tube_bbox() {
        let mesh = tube(
            Point3F::new(0.0, 0.0, 0.0),
            Point3F::new(0.0, 0.0, 10.0),
            0.5,
            0.5,
        );
        assert!(mesh.validate().is_ok());

        let bb = mesh.bounding_box();
        assert!((bb.min.z - 0.0).abs() < 1e-9);
        assert!((bb.max.z - 10.0).abs() < 1e-9);
        assert!((bb.max.x - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_tube_tilted() {
        let mesh = tube(
            Point3F::new(0.0, 0.0, 0.0),
            Point3F::new(5.0, 0.0, 5.0),
            0.3,
            0.3,
        );
        assert!(mesh.validate().is_ok());
        assert!(mesh.triangle_count() > 0);
    }

    #[test]
    fn test_sphere_bbox() {
        let mesh = sphere(Point3F::new(1.0, 2.0, 3.0), 2.0);
        assert!(mesh.validate().is_ok());

        let bb = mesh.bounding_box();
        assert!((bb.min.z - 1.0).abs() < 1e-9);
        assert!((bb.max.z - 5.0).abs() < 1e-9);
    }
}
