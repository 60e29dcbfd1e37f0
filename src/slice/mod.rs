//! Triangle-plane slicing.
//!
//! Computes the intersection of a triangle mesh with horizontal planes:
//! each facet contributes a line segment per plane it crosses, the
//! segments are stitched into closed loops, and the loops are classified
//! into contours and holes. A small morphological closing is applied at
//! the end to heal hairline gaps from nearly degenerate facets.

use crate::clipper::{self, OffsetJoinType};
use crate::geometry::{ExPolygon, ExPolygons, Point, Polygon};
use crate::mesh::TriangleMesh;
use crate::{scale, Coord, CoordF};
use rayon::prelude::*;
use std::collections::HashMap;

/// Default gap-healing radius in millimeters.
pub const CLOSING_RADIUS: CoordF = 0.005;

/// Endpoint of an intersection segment, tagged with its provenance so
/// that chaining can match endpoints exactly instead of by coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum EndTag {
    /// The segment endpoint is a mesh vertex.
    Vertex(u32),
    /// The segment endpoint lies on a mesh edge.
    Edge(u32),
}

#[derive(Clone, Debug)]
struct Segment {
    a: Point,
    b: Point,
    a_tag: EndTag,
    b_tag: EndTag,
    used: bool,
}

/// Build evenly spaced slicing planes over `[start, end]`.
///
/// The first plane sits at `start + stride`, matching a first layer of
/// full `stride` thickness; the span end is always included even when
/// it does not fall on the stride grid.
pub fn grid(start: CoordF, end: CoordF, stride: CoordF) -> Vec<CoordF> {
    assert!(stride > 0.0, "slicing stride must be positive");
    let mut zs = Vec::new();
    let mut z = start + stride;
    while z < end - 1e-9 {
        zs.push(z);
        z += stride;
    }
    zs.push(end);
    zs
}

/// Canonical edge key shared by the two facets adjoining an edge.
fn edge_key(v0: u32, v1: u32) -> (u32, u32) {
    if v0 < v1 {
        (v0, v1)
    } else {
        (v1, v0)
    }
}

fn build_edge_ids(mesh: &TriangleMesh) -> Vec<[u32; 3]> {
    let mut edge_map: HashMap<(u32, u32), u32> = HashMap::new();
    let mut result = Vec::with_capacity(mesh.triangle_count());
    for tri_idx in 0..mesh.triangle_count() {
        let idx = mesh.triangle_indices(tri_idx);
        let mut ids = [0u32; 3];
        for i in 0..3 {
            let key = edge_key(idx[i], idx[(i + 1) % 3]);
            let next = edge_map.len() as u32;
            ids[i] = *edge_map.entry(key).or_insert(next);
        }
        result.push(ids);
    }
    result
}

/// Intersect one facet with the plane at `slice_z`.
///
/// Returns the oriented segment (material to the left, matching CCW
/// outer contours) or `None` when the facet does not produce a usable
/// segment at this height. Horizontal facets are skipped; the facets
/// around them close the loop.
fn slice_facet(
    slice_z: CoordF,
    verts: &[[CoordF; 3]; 3],
    vertex_ids: &[u32; 3],
    edge_ids: &[u32; 3],
) -> Option<Segment> {
    const Z_EPS: CoordF = 1e-10;

    let min_z = verts[0][2].min(verts[1][2]).min(verts[2][2]);
    let max_z = verts[0][2].max(verts[1][2]).max(verts[2][2]);
    if (max_z - min_z).abs() < Z_EPS {
        return None;
    }

    let mut points: Vec<(Point, EndTag)> = Vec::with_capacity(2);
    let mut seen_vertex: Option<u32> = None;

    for k in 0..3 {
        let l = (k + 1) % 3;
        let a = &verts[k];
        let b = &verts[l];
        let a_id = vertex_ids[k];
        let b_id = vertex_ids[l];

        // Edge lying in the plane: the edge itself is the segment.
        if (a[2] - slice_z).abs() < Z_EPS && (b[2] - slice_z).abs() < Z_EPS {
            let c = &verts[(k + 2) % 3];
            // Only emit when the rest of the facet is below the plane,
            // otherwise the twin facet above produces the segment.
            if c[2] >= slice_z {
                return None;
            }
            let pa = Point::new(scale(a[0]), scale(a[1]));
            let pb = Point::new(scale(b[0]), scale(b[1]));
            if pa == pb {
                return None;
            }
            return Some(Segment {
                a: pb,
                b: pa,
                a_tag: EndTag::Vertex(b_id),
                b_tag: EndTag::Vertex(a_id),
                used: false,
            });
        }

        if (a[2] - slice_z).abs() < Z_EPS {
            if seen_vertex != Some(a_id) {
                seen_vertex = Some(a_id);
                points.push((Point::new(scale(a[0]), scale(a[1])), EndTag::Vertex(a_id)));
            }
        } else if (b[2] - slice_z).abs() < Z_EPS {
            // Handled when the next edge starts at b.
        } else if (a[2] < slice_z) != (b[2] < slice_z) {
            // Interpolate from the lower-indexed vertex for a result
            // that is bit-identical on the twin facet.
            let (lo, hi) = if a_id < b_id { (a, b) } else { (b, a) };
            let t = (slice_z - lo[2]) / (hi[2] - lo[2]);
            let x = lo[0] + (hi[0] - lo[0]) * t;
            let y = lo[1] + (hi[1] - lo[1]) * t;
            points.push((
                Point::new(scale(x), scale(y)),
                EndTag::Edge(edge_ids[k]),
            ));
        }
    }

    if points.len() != 2 || points[0].0 == points[1].0 {
        return None;
    }

    // Orient the segment so the facet interior below the plane is on
    // its left: project the facet normal into the plane.
    let v01 = [
        verts[1][0] - verts[0][0],
        verts[1][1] - verts[0][1],
        verts[1][2] - verts[0][2],
    ];
    let v02 = [
        verts[2][0] - verts[0][0],
        verts[2][1] - verts[0][1],
        verts[2][2] - verts[0][2],
    ];
    let normal_xy = (
        v01[1] * v02[2] - v01[2] * v02[1],
        v01[2] * v02[0] - v01[0] * v02[2],
    );

    let (p0, t0) = points[0];
    let (p1, t1) = points[1];
    let dir = (p1.x - p0.x, p1.y - p0.y);
    // Segment direction must be the plane normal rotated +90 degrees.
    let cross =
        normal_xy.0 * dir.1 as CoordF - normal_xy.1 * dir.0 as CoordF;
    let (a, b, a_tag, b_tag) = if cross >= 0.0 {
        (p0, p1, t0, t1)
    } else {
        (p1, p0, t1, t0)
    };

    Some(Segment {
        a,
        b,
        a_tag,
        b_tag,
        used: false,
    })
}

fn slice_mesh_to_segments(mesh: &TriangleMesh, zs: &[CoordF]) -> Vec<Vec<Segment>> {
    let mut layers: Vec<Vec<Segment>> = vec![Vec::new(); zs.len()];
    if mesh.is_empty() || zs.is_empty() {
        return layers;
    }

    let edge_ids = build_edge_ids(mesh);
    for tri_idx in 0..mesh.triangle_count() {
        let v = mesh.triangle_vertices(tri_idx);
        let verts = [
            [v[0].x, v[0].y, v[0].z],
            [v[1].x, v[1].y, v[1].z],
            [v[2].x, v[2].y, v[2].z],
        ];
        let vertex_ids = mesh.triangle_indices(tri_idx);

        let min_z = verts[0][2].min(verts[1][2]).min(verts[2][2]);
        let max_z = verts[0][2].max(verts[1][2]).max(verts[2][2]);
        let first = zs.partition_point(|&z| z < min_z);
        let last = zs.partition_point(|&z| z <= max_z);

        for layer_idx in first..last {
            if let Some(seg) = slice_facet(zs[layer_idx], &verts, &vertex_ids, &edge_ids[tri_idx]) {
                layers[layer_idx].push(seg);
            }
        }
    }
    layers
}

/// Stitch segments into closed loops by matching endpoint tags, with a
/// coordinate fallback for non-manifold spots.
fn chain_segments(segments: &mut [Segment]) -> Vec<Polygon> {
    let mut by_start: HashMap<EndTag, Vec<usize>> = HashMap::new();
    let mut by_coord: HashMap<(Coord, Coord), Vec<usize>> = HashMap::new();
    for (idx, seg) in segments.iter().enumerate() {
        by_start.entry(seg.a_tag).or_default().push(idx);
        by_coord.entry((seg.a.x, seg.a.y)).or_default().push(idx);
    }

    let mut polygons = Vec::new();
    for start in 0..segments.len() {
        if segments[start].used {
            continue;
        }
        segments[start].used = true;
        let mut points = vec![segments[start].a];
        let mut tail_tag = segments[start].b_tag;
        let mut tail = segments[start].b;
        let mut closed = false;

        loop {
            if tail_tag == segments[start].a_tag || tail == segments[start].a {
                closed = true;
                break;
            }
            let next = by_start
                .get(&tail_tag)
                .and_then(|c| c.iter().copied().find(|&i| !segments[i].used))
                .or_else(|| {
                    by_coord
                        .get(&(tail.x, tail.y))
                        .and_then(|c| c.iter().copied().find(|&i| !segments[i].used))
                });
            match next {
                Some(i) => {
                    segments[i].used = true;
                    points.push(segments[i].a);
                    tail_tag = segments[i].b_tag;
                    tail = segments[i].b;
                }
                None => break,
            }
        }

        if closed && points.len() >= 3 {
            polygons.push(Polygon::from_points(points));
        }
    }
    polygons
}

/// Group loops into contours with their holes.
fn make_expolygons(polygons: Vec<Polygon>) -> ExPolygons {
    let mut contours: Vec<Polygon> = Vec::new();
    let mut holes: Vec<Polygon> = Vec::new();
    for mut poly in polygons {
        let area = poly.signed_area();
        if area > 0.0 {
            contours.push(poly);
        } else if area < 0.0 {
            poly.reverse();
            holes.push(poly);
        }
    }

    contours.sort_by(|a, b| {
        b.area()
            .partial_cmp(&a.area())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut expolygons: ExPolygons = Vec::new();
    for contour in contours {
        let mut expoly = ExPolygon::new(contour);
        let mut i = 0;
        while i < holes.len() {
            let keep = match holes[i].points().first() {
                Some(p) => {
                    expoly.contour.contains_point(p)
                        && !expoly.holes.iter().any(|h| h.contains_point(p))
                }
                None => false,
            };
            if keep {
                expoly.add_hole(holes.remove(i));
            } else {
                i += 1;
            }
        }
        expolygons.push(expoly);
    }
    expolygons
}

fn close_layer(expolys: ExPolygons, closing_radius: CoordF) -> ExPolygons {
    if closing_radius <= 0.0 || expolys.is_empty() {
        return clipper::union_ex(&expolys);
    }
    let grown = clipper::grow(&expolys, closing_radius, OffsetJoinType::Round);
    clipper::shrink(&grown, closing_radius, OffsetJoinType::Round)
}

/// Slice a mesh at every height in `zs`.
///
/// Layers are independent, so loop stitching and polygon clipping run
/// in parallel.
pub fn slice_mesh(mesh: &TriangleMesh, zs: &[CoordF], closing_radius: CoordF) -> Vec<ExPolygons> {
    let mut layers = slice_mesh_to_segments(mesh, zs);
    layers
        .par_iter_mut()
        .map(|segments| {
            let polygons = chain_segments(segments);
            close_layer(make_expolygons(polygons), closing_radius)
        })
        .collect()
}

/// Slice a mesh at a single height.
pub fn slice_mesh_at_z(mesh: &TriangleMesh, z: CoordF, closing_radius: CoordF) -> ExPolygons {
    slice_mesh(mesh, &[z], closing_radius)
        .pop()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SCALING_FACTOR;

    #[test]
    fn test_grid_spacing() {
        let zs = grid(0.0, 1.0, 0.25);
        assert_eq!(zs.len(), 4);
        assert!((zs[0] - 0.25).abs() < 1e-9);
        assert!((zs[3] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_grid_includes_ragged_end() {
        let zs = grid(0.0, 1.1, 0.25);
        assert!((zs.last().unwrap() - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_slice_cube_midplane() {
        let mesh = TriangleMesh::cube(10.0);
        let result = slice_mesh_at_z(&mesh, 0.0, 0.0);

        assert_eq!(result.len(), 1);
        assert!(result[0].holes.is_empty());

        let area = result[0].area();
        let expected = 100.0 * SCALING_FACTOR * SCALING_FACTOR;
        assert!(
            (area - expected).abs() < expected * 0.01,
            "area {} not close to {}",
            area,
            expected
        );
    }

    #[test]
    fn test_slice_cube_many_layers() {
        let mesh = TriangleMesh::cube(10.0);
        let zs: Vec<f64> = (-4..=4).map(|i| i as f64).collect();
        let results = slice_mesh(&mesh, &zs, CLOSING_RADIUS);

        assert_eq!(results.len(), zs.len());
        for (i, layer) in results.iter().enumerate() {
            assert_eq!(layer.len(), 1, "layer {} at z={}", i, zs[i]);
        }
    }

    #[test]
    fn test_slice_outside_mesh() {
        let mesh = TriangleMesh::cube(10.0);
        assert!(slice_mesh_at_z(&mesh, 10.0, 0.0).is_empty());
        assert!(slice_mesh_at_z(&mesh, -10.0, 0.0).is_empty());
    }

    #[test]
    fn test_slice_empty_mesh() {
        let mesh = TriangleMesh::new();
        assert!(slice_mesh_at_z(&mesh, 0.0, 0.0).is_empty());
    }

    #[test]
    fn test_mesh_with_hole() {
        // Outer cube with a merged inner cube sharing no volume makes
        // two disjoint contours, not a hole; use two nested squares via
        // two cubes would need CSG. Instead verify two separate cubes
        // yield two contours.
        let mut mesh = TriangleMesh::cube(4.0);
        let mut other = TriangleMesh::cube(4.0);
        other.translate(crate::geometry::Point3F::new(10.0, 0.0, 0.0));
        mesh.merge(&other);

        let result = slice_mesh_at_z(&mesh, 0.0, 0.0);
        assert_eq!(result.len(), 2);
    }
}
