//! Closed polygon contour.

use super::{BoundingBox, Point};
use crate::{Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A closed polygon, stored as an open point loop (the closing edge from
/// the last point back to the first is implicit).
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    #[inline]
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    #[inline]
    pub fn from_points(points: Vec<Point>) -> Self {
        Self { points }
    }

    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    #[inline]
    pub fn points_mut(&mut self) -> &mut Vec<Point> {
        &mut self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn push(&mut self, p: Point) {
        self.points.push(p);
    }

    /// Twice the signed area via the shoelace formula; positive when the
    /// loop winds counter-clockwise.
    pub fn signed_area(&self) -> CoordF {
        if self.points.len() < 3 {
            return 0.0;
        }
        let mut acc: i128 = 0;
        for i in 0..self.points.len() {
            let a = self.points[i];
            let b = self.points[(i + 1) % self.points.len()];
            acc += a.cross(&b);
        }
        acc as CoordF / 2.0
    }

    /// Absolute enclosed area in squared scaled units.
    #[inline]
    pub fn area(&self) -> CoordF {
        self.signed_area().abs()
    }

    #[inline]
    pub fn is_counter_clockwise(&self) -> bool {
        self.signed_area() > 0.0
    }

    #[inline]
    pub fn is_clockwise(&self) -> bool {
        self.signed_area() < 0.0
    }

    pub fn make_counter_clockwise(&mut self) {
        if self.is_clockwise() {
            self.reverse();
        }
    }

    pub fn make_clockwise(&mut self) {
        if self.is_counter_clockwise() {
            self.reverse();
        }
    }

    #[inline]
    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut bb = BoundingBox::new();
        for p in &self.points {
            bb.merge_point(*p);
        }
        bb
    }

    /// Even-odd point-in-polygon test; boundary points are unspecified.
    pub fn contains_point(&self, p: &Point) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[j];
            if (a.y > p.y) != (b.y > p.y) {
                let t = (p.y - a.y) as f64 / (b.y - a.y) as f64;
                let x = a.x as f64 + t * (b.x - a.x) as f64;
                if (p.x as f64) < x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    pub fn translate(&mut self, v: Point) {
        for p in &mut self.points {
            *p += v;
        }
    }

    pub fn translated(&self, v: Point) -> Self {
        let mut out = self.clone();
        out.translate(v);
        out
    }

    /// Axis-aligned rectangle, counter-clockwise.
    pub fn rectangle(min: Point, max: Point) -> Self {
        Self::from_points(vec![
            min,
            Point::new(max.x, min.y),
            max,
            Point::new(min.x, max.y),
        ])
    }

    /// Regular polygon approximation of a circle, counter-clockwise.
    pub fn circle(center: Point, radius: Coord, segments: usize) -> Self {
        let n = segments.max(3);
        let mut points = Vec::with_capacity(n);
        for i in 0..n {
            let a = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
            points.push(Point::new(
                center.x + (radius as f64 * a.cos()).round() as Coord,
                center.y + (radius as f64 * a.sin()).round() as Coord,
            ));
        }
        Self::from_points(points)
    }
}

impl fmt::Debug for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Polygon({} points)", self.points.len())
    }
}

impl std::ops::Index<usize> for Polygon {
    type Output = Point;

    #[inline]
    fn index(&self, i: usize) -> &Point {
        &self.points[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Polygon {
        Polygon::rectangle(Point::new(0, 0), Point::new(100, 100))
    }

    #[test]
    fn test_signed_area_orientation() {
        let mut poly = unit_square();
        assert!((poly.signed_area() - 10_000.0).abs() < 1e-9);
        assert!(poly.is_counter_clockwise());

        poly.reverse();
        assert!(poly.is_clockwise());
        poly.make_counter_clockwise();
        assert!(poly.is_counter_clockwise());
    }

    #[test]
    fn test_contains_point() {
        let poly = unit_square();
        assert!(poly.contains_point(&Point::new(50, 50)));
        assert!(!poly.contains_point(&Point::new(150, 50)));
        assert!(!poly.contains_point(&Point::new(-1, 50)));
    }

    #[test]
    fn test_translate() {
        let poly = unit_square().translated(Point::new(10, 20));
        assert_eq!(poly[0], Point::new(10, 20));
        assert_eq!(poly[2], Point::new(110, 120));
    }

    #[test]
    fn test_circle_area() {
        let poly = Polygon::circle(Point::zero(), 1_000, 64);
        // 64-gon area is within a percent of the circle area
        let circle_area = std::f64::consts::PI * 1_000.0 * 1_000.0;
        assert!((poly.area() - circle_area).abs() / circle_area < 0.01);
    }

    #[test]
    fn test_bounding_box() {
        let bb = unit_square().bounding_box();
        assert_eq!(bb.min, Point::new(0, 0));
        assert_eq!(bb.max, Point::new(100, 100));
    }
}
