//! Base pad generation.
//!
//! The pad is a solid slab under the object and its supports, built by
//! projecting footprints to 2D, merging and outsetting them, then
//! extruding the result. A positive wall height turns the rim into
//! raised wings around the slab.

use crate::clipper::{self, OffsetJoinType};
use crate::geometry::{ExPolygon, ExPolygons, Point, Polygon, Point3F};
use crate::mesh::TriangleMesh;
use crate::slice::{slice_mesh, CLOSING_RADIUS};
use crate::{unscale, CoordF, Error, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How the pad relates to an object standing on the plate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedObject {
    /// Wrap the pad around the object footprint instead of under it.
    pub enabled: bool,
    /// Union the model footprint into the pad as well.
    pub everywhere: bool,
}

/// Parameters of the base pad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PadConfig {
    /// Slab thickness.
    pub thickness_mm: CoordF,
    /// Height of the raised rim above the slab; zero for a flat pad.
    pub wall_height_mm: CoordF,
    /// Thickness of the rim wall.
    pub wall_thickness_mm: CoordF,
    /// Outset applied around the merged footprint.
    pub brim_size_mm: CoordF,
    /// Islands closer than this are merged into one pad.
    pub max_merge_distance_mm: CoordF,
    pub embed: EmbedObject,
}

impl Default for PadConfig {
    fn default() -> Self {
        Self {
            thickness_mm: 2.0,
            wall_height_mm: 0.0,
            wall_thickness_mm: 2.0,
            brim_size_mm: 1.6,
            max_merge_distance_mm: 50.0,
            embed: EmbedObject::default(),
        }
    }
}

impl PadConfig {
    /// Total height of the pad including the rim.
    pub fn full_height(&self) -> CoordF {
        self.thickness_mm + self.wall_height_mm
    }

    /// Returns one message per violated constraint, empty when valid.
    pub fn validate(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.thickness_mm <= 0.0 {
            violations.push("thickness_mm must be positive".to_string());
        }
        if self.wall_height_mm < 0.0 {
            violations.push("wall_height_mm must be non-negative".to_string());
        }
        if self.wall_height_mm > 0.0 && self.wall_thickness_mm <= 0.0 {
            violations.push("wall_thickness_mm must be positive when walls are enabled".to_string());
        }
        if self.brim_size_mm < 0.0 {
            violations.push("brim_size_mm must be non-negative".to_string());
        }
        if self.max_merge_distance_mm < 0.0 {
            violations.push("max_merge_distance_mm must be non-negative".to_string());
        }
        violations
    }
}

/// Footprint of a mesh at its lowest extent.
///
/// Slices a few layers just above the bottom and unions them, which
/// tolerates a slightly uneven underside.
pub fn pad_blueprint(mesh: &TriangleMesh) -> ExPolygons {
    let bb = mesh.bounding_box();
    if !bb.is_defined() {
        return Vec::new();
    }
    let span = (bb.max.z - bb.min.z).min(0.3);
    let zs: Vec<CoordF> = (1..=3).map(|i| bb.min.z + span * i as CoordF / 3.0).collect();
    let layers = slice_mesh(mesh, &zs, CLOSING_RADIUS);
    let mut all: ExPolygons = layers.into_iter().flatten().collect();
    all = clipper::union_ex(&all);
    all
}

/// Build the pad mesh from the support and model footprints.
///
/// The slab occupies `[0, thickness_mm]` in Z with wings rising to
/// `full_height()`; the caller translates it under the object.
pub fn create_pad(
    support_blueprint: &[ExPolygon],
    model_blueprint: &[ExPolygon],
    cfg: &PadConfig,
) -> Result<TriangleMesh> {
    let violations = cfg.validate();
    if !violations.is_empty() {
        return Err(Error::Config(violations.join("; ")));
    }

    let base: ExPolygons = if cfg.embed.enabled && !cfg.embed.everywhere {
        support_blueprint.to_vec()
    } else {
        let mut combined = support_blueprint.to_vec();
        combined.extend_from_slice(model_blueprint);
        clipper::union_ex(&combined)
    };
    if base.is_empty() {
        return Ok(TriangleMesh::new());
    }

    // Merge nearby islands, then apply the brim.
    let half_merge = cfg.max_merge_distance_mm / 2.0;
    let mut footprint = clipper::grow(&base, half_merge, OffsetJoinType::Round);
    footprint = clipper::shrink(&footprint, half_merge, OffsetJoinType::Round);
    footprint = clipper::grow(&footprint, cfg.brim_size_mm, OffsetJoinType::Round);
    debug!("pad footprint has {} islands", footprint.len());

    let mut pad = TriangleMesh::new();
    for expoly in &footprint {
        pad.merge(&extrude(expoly, 0.0, cfg.thickness_mm));
    }

    if cfg.wall_height_mm > 0.0 {
        let inner = clipper::shrink(&footprint, cfg.wall_thickness_mm, OffsetJoinType::Round);
        let rim = clipper::difference(&footprint, &inner);
        for expoly in &rim {
            pad.merge(&extrude(expoly, cfg.thickness_mm, cfg.full_height()));
        }
    }
    Ok(pad)
}

fn ring_point(p: Point, z: CoordF) -> Point3F {
    Point3F::new(unscale(p.x), unscale(p.y), z)
}

/// Prism between `z0` and `z1` over a polygon with holes.
///
/// Side walls follow every ring exactly; the caps cover the contour
/// minus the holes, so hole openings stay open between the walls.
fn extrude(expoly: &ExPolygon, z0: CoordF, z1: CoordF) -> TriangleMesh {
    let mut mesh = TriangleMesh::new();
    // Bottom vertex index of every ring point; the top twin is +1.
    let mut ring_vertex: HashMap<Point, u32> = HashMap::new();

    let mut wall = |ring: &Polygon, outward: bool| {
        let n = ring.len();
        if n < 3 {
            return;
        }
        let first = mesh.vertex_count() as u32;
        for (i, p) in ring.points().iter().enumerate() {
            ring_vertex.insert(*p, first + 2 * i as u32);
            mesh.add_vertex(ring_point(*p, z0));
            mesh.add_vertex(ring_point(*p, z1));
        }
        for i in 0..n as u32 {
            let j = (i + 1) % n as u32;
            let (b0, t0) = (first + 2 * i, first + 2 * i + 1);
            let (b1, t1) = (first + 2 * j, first + 2 * j + 1);
            if outward {
                mesh.add_triangle(b0, b1, t1);
                mesh.add_triangle(b0, t1, t0);
            } else {
                mesh.add_triangle(b0, t1, b1);
                mesh.add_triangle(b0, t0, t1);
            }
        }
    };

    wall(&expoly.contour, true);
    for hole in &expoly.holes {
        wall(hole, false);
    }

    // Caps reuse the wall vertices, so the prism stays index-welded.
    for [a, b, c] in triangulate(expoly) {
        let (ia, ib, ic) = match (ring_vertex.get(&a), ring_vertex.get(&b), ring_vertex.get(&c)) {
            (Some(&ia), Some(&ib), Some(&ic)) => (ia, ib, ic),
            _ => continue,
        };
        // Bottom cap faces down.
        mesh.add_triangle(ia, ic, ib);
        mesh.add_triangle(ia + 1, ib + 1, ic + 1);
    }
    mesh
}

fn cross(o: Point, a: Point, b: Point) -> i128 {
    let (ax, ay) = ((a.x - o.x) as i128, (a.y - o.y) as i128);
    let (bx, by) = ((b.x - o.x) as i128, (b.y - o.y) as i128);
    ax * by - ay * bx
}

fn point_in_triangle(p: Point, a: Point, b: Point, c: Point) -> bool {
    let d1 = cross(a, b, p);
    let d2 = cross(b, c, p);
    let d3 = cross(c, a, p);
    let has_neg = d1 < 0 || d2 < 0 || d3 < 0;
    let has_pos = d1 > 0 || d2 > 0 || d3 > 0;
    !(has_neg && has_pos)
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Whether segments `a-b` and `c-d` intersect or touch anywhere.
fn segments_touch(a: Point, b: Point, c: Point, d: Point) -> bool {
    let d1 = cross(c, d, a);
    let d2 = cross(c, d, b);
    let d3 = cross(a, b, c);
    let d4 = cross(a, b, d);
    if ((d1 > 0 && d2 < 0) || (d1 < 0 && d2 > 0))
        && ((d3 > 0 && d4 < 0) || (d3 < 0 && d4 > 0))
    {
        return true;
    }
    (d1 == 0 && on_segment(c, d, a))
        || (d2 == 0 && on_segment(c, d, b))
        || (d3 == 0 && on_segment(a, b, c))
        || (d4 == 0 && on_segment(a, b, d))
}

/// Splice every hole into the outer contour through a mutually visible
/// vertex pair, leaving one weakly simple CCW ring.
fn bridge_holes(expoly: &ExPolygon) -> Vec<Point> {
    let mut outer: Vec<Point> = expoly.contour.points().to_vec();
    if expoly.contour.is_clockwise() {
        outer.reverse();
    }
    let mut holes: Vec<Vec<Point>> = expoly
        .holes
        .iter()
        .filter(|h| h.len() >= 3)
        .map(|h| {
            let mut pts = h.points().to_vec();
            if !h.is_clockwise() {
                pts.reverse();
            }
            pts
        })
        .collect();
    // Rightmost holes first, so a later bridge cannot be blocked by a
    // hole that is already part of the ring.
    holes.sort_by_key(|h| {
        std::cmp::Reverse(h.iter().map(|p| p.x).max().unwrap_or(crate::Coord::MIN))
    });

    for k in 0..holes.len() {
        let hole = &holes[k];
        let m_idx = (0..hole.len())
            .max_by_key(|&i| (hole[i].x, hole[i].y))
            .unwrap_or(0);
        let m = hole[m_idx];

        // Nearest visible outer vertex; the bridge segment must not
        // cross the ring or any hole not yet spliced in.
        let mut order: Vec<usize> = (0..outer.len()).collect();
        order.sort_by_key(|&i| outer[i].distance_squared(&m));
        let visible = |p: Point| {
            std::iter::once(&outer).chain(holes[k..].iter()).all(|ring| {
                let n = ring.len();
                (0..n).all(|i| {
                    let (u, v) = (ring[i], ring[(i + 1) % n]);
                    u == m || v == m || u == p || v == p || !segments_touch(m, p, u, v)
                })
            })
        };
        let Some(&p_idx) = order.iter().find(|&&i| visible(outer[i])) else {
            continue;
        };

        let mut merged = Vec::with_capacity(outer.len() + hole.len() + 2);
        merged.extend_from_slice(&outer[..=p_idx]);
        for off in 0..=hole.len() {
            merged.push(hole[(m_idx + off) % hole.len()]);
        }
        merged.extend_from_slice(&outer[p_idx..]);
        outer = merged;
    }
    outer
}

/// Ear-clipping triangulation of a polygon with holes.
fn triangulate(expoly: &ExPolygon) -> Vec<[Point; 3]> {
    let mut pts = bridge_holes(expoly);
    let mut triangles = Vec::new();

    while pts.len() > 3 {
        let n = pts.len();
        let mut clipped = false;
        for i in 0..n {
            let prev = pts[(i + n - 1) % n];
            let curr = pts[i];
            let next = pts[(i + 1) % n];
            if cross(prev, curr, next) <= 0 {
                continue;
            }
            // Bridge splicing duplicates vertices; a point coincident
            // with an ear corner does not block the ear.
            let blocked = pts.iter().any(|p| {
                *p != prev
                    && *p != curr
                    && *p != next
                    && point_in_triangle(*p, prev, curr, next)
            });
            if blocked {
                continue;
            }
            triangles.push([prev, curr, next]);
            pts.remove(i);
            clipped = true;
            break;
        }
        if !clipped {
            // Degenerate remainder, give up on what is left.
            break;
        }
    }
    if pts.len() == 3 && cross(pts[0], pts[1], pts[2]) > 0 {
        triangles.push([pts[0], pts[1], pts[2]]);
    }
    triangles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::scale;

    fn square_footprint(side: CoordF) -> ExPolygons {
        let h = scale(side / 2.0);
        vec![ExPolygon::new(Polygon::rectangle(
            Point::new(-h, -h),
            Point::new(h, h),
        ))]
    }

    #[test]
    fn test_full_height() {
        let cfg = PadConfig {
            thickness_mm: 2.0,
            wall_height_mm: 3.0,
            ..PadConfig::default()
        };
        assert!((cfg.full_height() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_flat_pad_height_matches_config() {
        let cfg = PadConfig::default();
        let pad = create_pad(&square_footprint(10.0), &[], &cfg).unwrap();
        assert!(!pad.is_empty());
        assert!(pad.validate().is_ok());

        let bb = pad.bounding_box();
        assert!((bb.max.z - bb.min.z - cfg.full_height()).abs() < 1e-9);
        // Brim extends the footprint.
        assert!(bb.max.x > 5.0 + cfg.brim_size_mm - 0.1);
    }

    #[test]
    fn test_winged_pad_reaches_full_height() {
        let cfg = PadConfig {
            wall_height_mm: 4.0,
            ..PadConfig::default()
        };
        let pad = create_pad(&square_footprint(10.0), &[], &cfg).unwrap();
        let bb = pad.bounding_box();
        assert!((bb.max.z - bb.min.z - cfg.full_height()).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = PadConfig {
            thickness_mm: 0.0,
            ..PadConfig::default()
        };
        assert!(matches!(
            create_pad(&square_footprint(5.0), &[], &cfg),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_islands_merge_within_distance() {
        let mut islands = square_footprint(4.0);
        let far = scale(6.0);
        let mut other = square_footprint(4.0);
        other[0].translate(Point::new(far, 0));
        islands.extend(other);

        let cfg = PadConfig {
            max_merge_distance_mm: 10.0,
            ..PadConfig::default()
        };
        let pad = create_pad(&islands, &[], &cfg).unwrap();
        // Merged into one slab spanning both islands.
        let bb = pad.bounding_box();
        assert!(bb.max.x - bb.min.x > 10.0);
    }

    #[test]
    fn test_cap_triangulation_leaves_holes_open() {
        let outer = Polygon::rectangle(Point::new_scale(-5.0, -5.0), Point::new_scale(5.0, 5.0));
        let hole = Polygon::rectangle(Point::new_scale(-2.0, -2.0), Point::new_scale(2.0, 2.0));
        let expoly = ExPolygon::with_holes(outer, vec![hole]);

        let tris = triangulate(&expoly);
        // The triangles tile exactly the contour minus the hole.
        let covered: f64 = tris.iter().map(|[a, b, c]| cross(*a, *b, *c) as f64 / 2.0).sum();
        let expected = expoly.area();
        assert!((covered - expected).abs() < expected * 1e-9);
        // No triangle reaches into the hole interior.
        let lim = scale(2.0) as i128 * 3;
        for [a, b, c] in &tris {
            let cx = a.x as i128 + b.x as i128 + c.x as i128;
            let cy = a.y as i128 + b.y as i128 + c.y as i128;
            assert!(
                cx.abs() >= lim || cy.abs() >= lim,
                "cap triangle centered over the hole"
            );
        }
    }

    #[test]
    fn test_empty_footprints_give_empty_pad() {
        let pad = create_pad(&[], &[], &PadConfig::default()).unwrap();
        assert!(pad.is_empty());
    }

    #[test]
    fn test_blueprint_of_cube() {
        let mesh = TriangleMesh::cube(10.0);
        let fp = pad_blueprint(&mesh);
        assert_eq!(fp.len(), 1);
        let area = fp[0].area() / (crate::SCALING_FACTOR * crate::SCALING_FACTOR);
        assert!((area - 100.0).abs() < 2.0);
    }
}
