//! Polygon boolean and offset operations.
//!
//! Thin wrappers over the geo-clipper library used for footprint unions,
//! morphological closing of slices, pad outsetting, and the
//! support-vs-model intersection checks.

use crate::geometry::{ExPolygon, ExPolygons, Point, Polygon};
use crate::{scale, unscale, CoordF};
use geo::{Coord as GeoCoord, LineString, MultiPolygon, Polygon as GeoPolygon};
use geo_clipper::{Clipper, EndType, JoinType};

/// Clipper works on f64 millimeters internally; this is the fixed-point
/// factor it uses for robustness.
const CLIPPER_FACTOR: f64 = 1000.0;

/// Join style for offset corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetJoinType {
    Square,
    #[default]
    Round,
    Miter,
}

impl From<OffsetJoinType> for JoinType {
    fn from(jt: OffsetJoinType) -> Self {
        match jt {
            OffsetJoinType::Square => JoinType::Square,
            OffsetJoinType::Round => JoinType::Round(0.25),
            OffsetJoinType::Miter => JoinType::Miter(2.0),
        }
    }
}

fn ring_to_geo(poly: &Polygon) -> LineString<f64> {
    let mut coords: Vec<GeoCoord<f64>> = poly
        .points()
        .iter()
        .map(|p| GeoCoord {
            x: unscale(p.x),
            y: unscale(p.y),
        })
        .collect();
    // geo rings are explicitly closed
    if let (Some(first), Some(last)) = (coords.first().copied(), coords.last().copied()) {
        if first != last {
            coords.push(first);
        }
    }
    LineString::new(coords)
}

fn expolygon_to_geo(expoly: &ExPolygon) -> GeoPolygon<f64> {
    GeoPolygon::new(
        ring_to_geo(&expoly.contour),
        expoly.holes.iter().map(ring_to_geo).collect(),
    )
}

fn expolygons_to_geo(expolys: &[ExPolygon]) -> MultiPolygon<f64> {
    MultiPolygon::new(expolys.iter().map(expolygon_to_geo).collect())
}

fn geo_ring_to_polygon(ring: &LineString<f64>) -> Polygon {
    let mut points: Vec<Point> = ring
        .coords()
        .map(|c| Point::new(scale(c.x), scale(c.y)))
        .collect();
    // drop the duplicated closing point
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    Polygon::from_points(points)
}

fn geo_to_expolygons(multi: &MultiPolygon<f64>) -> ExPolygons {
    multi
        .0
        .iter()
        .map(|p| {
            ExPolygon::with_holes(
                geo_ring_to_polygon(p.exterior()),
                p.interiors().iter().map(geo_ring_to_polygon).collect(),
            )
        })
        .collect()
}

/// Union of two polygon sets.
pub fn union(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() {
        return clip.to_vec();
    }
    if clip.is_empty() {
        return subject.to_vec();
    }
    let result = expolygons_to_geo(subject).union(&expolygons_to_geo(clip), CLIPPER_FACTOR);
    geo_to_expolygons(&result)
}

/// Union of one possibly self-overlapping polygon set.
pub fn union_ex(expolys: &[ExPolygon]) -> ExPolygons {
    match expolys.split_first() {
        None => vec![],
        Some((_, [])) => expolys.to_vec(),
        Some((first, rest)) => {
            // One clipper pass: first polygon unioned against the rest.
            let result = expolygons_to_geo(std::slice::from_ref(first))
                .union(&expolygons_to_geo(rest), CLIPPER_FACTOR);
            geo_to_expolygons(&result)
        }
    }
}

/// Intersection of two polygon sets.
pub fn intersection(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() || clip.is_empty() {
        return vec![];
    }
    let result = expolygons_to_geo(subject).intersection(&expolygons_to_geo(clip), CLIPPER_FACTOR);
    geo_to_expolygons(&result)
}

/// Difference `subject - clip`.
pub fn difference(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() {
        return vec![];
    }
    if clip.is_empty() {
        return subject.to_vec();
    }
    let result = expolygons_to_geo(subject).difference(&expolygons_to_geo(clip), CLIPPER_FACTOR);
    geo_to_expolygons(&result)
}

/// Offset polygons by `delta` millimeters; positive grows, negative shrinks.
pub fn offset_expolygons(
    expolys: &[ExPolygon],
    delta: CoordF,
    join_type: OffsetJoinType,
) -> ExPolygons {
    if expolys.is_empty() {
        return vec![];
    }
    let result = expolygons_to_geo(expolys).offset(
        delta,
        join_type.into(),
        EndType::ClosedPolygon,
        CLIPPER_FACTOR,
    );
    geo_to_expolygons(&result)
}

/// Outset by a positive distance.
pub fn grow(expolys: &[ExPolygon], distance: CoordF, join_type: OffsetJoinType) -> ExPolygons {
    offset_expolygons(expolys, distance.abs(), join_type)
}

/// Inset by a positive distance.
pub fn shrink(expolys: &[ExPolygon], distance: CoordF, join_type: OffsetJoinType) -> ExPolygons {
    offset_expolygons(expolys, -distance.abs(), join_type)
}

/// Total net area of a polygon set in squared scaled units.
pub fn total_area(expolys: &[ExPolygon]) -> CoordF {
    expolys.iter().map(|e| e.area()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> ExPolygon {
        ExPolygon::rectangle(Point::new_scale(x0, y0), Point::new_scale(x1, y1))
    }

    #[test]
    fn test_union_of_overlapping_squares() {
        let merged = union(&[square(0.0, 0.0, 2.0, 2.0)], &[square(1.0, 0.0, 3.0, 2.0)]);
        assert_eq!(merged.len(), 1);
        let area_mm2 = total_area(&merged) / (crate::SCALING_FACTOR * crate::SCALING_FACTOR);
        assert!((area_mm2 - 6.0).abs() < 0.01);
    }

    #[test]
    fn test_union_ex_merges_overlapping_set() {
        let set = [
            square(0.0, 0.0, 2.0, 2.0),
            square(1.0, 0.0, 3.0, 2.0),
            square(2.0, 0.0, 4.0, 2.0),
        ];
        let merged = union_ex(&set);
        assert_eq!(merged.len(), 1);
        let area_mm2 = total_area(&merged) / (crate::SCALING_FACTOR * crate::SCALING_FACTOR);
        assert!((area_mm2 - 8.0).abs() < 0.01);
    }

    #[test]
    fn test_intersection_disjoint_is_empty() {
        let isec = intersection(&[square(0.0, 0.0, 1.0, 1.0)], &[square(5.0, 5.0, 6.0, 6.0)]);
        assert!(isec.is_empty());
    }

    #[test]
    fn test_difference_carves_hole() {
        let diff = difference(&[square(0.0, 0.0, 4.0, 4.0)], &[square(1.0, 1.0, 3.0, 3.0)]);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].holes.len(), 1);
        let area_mm2 = total_area(&diff) / (crate::SCALING_FACTOR * crate::SCALING_FACTOR);
        assert!((area_mm2 - 12.0).abs() < 0.01);
    }

    #[test]
    fn test_grow_then_shrink_restores_area() {
        let original = [square(0.0, 0.0, 5.0, 5.0)];
        let closed = shrink(&grow(&original, 0.5, OffsetJoinType::Round), 0.5, OffsetJoinType::Round);
        let area_mm2 = total_area(&closed) / (crate::SCALING_FACTOR * crate::SCALING_FACTOR);
        assert!((area_mm2 - 25.0).abs() < 0.1);
    }
}
