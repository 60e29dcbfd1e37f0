//! Polygon-with-holes.

use super::{BoundingBox, Point, Polygon};
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A polygon with holes: one outer contour (counter-clockwise) plus any
/// number of interior hole contours (clockwise).
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExPolygon {
    pub contour: Polygon,
    pub holes: Vec<Polygon>,
}

/// A set of polygons-with-holes; the unit every slice layer is made of.
pub type ExPolygons = Vec<ExPolygon>;

impl ExPolygon {
    #[inline]
    pub fn new(contour: Polygon) -> Self {
        Self {
            contour,
            holes: Vec::new(),
        }
    }

    #[inline]
    pub fn with_holes(contour: Polygon, holes: Vec<Polygon>) -> Self {
        Self { contour, holes }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contour.is_empty()
    }

    #[inline]
    pub fn add_hole(&mut self, hole: Polygon) {
        self.holes.push(hole);
    }

    /// Net enclosed area: contour minus holes.
    pub fn area(&self) -> CoordF {
        let holes: CoordF = self.holes.iter().map(|h| h.area()).sum();
        self.contour.area() - holes
    }

    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        self.contour.bounding_box()
    }

    /// True when `p` is inside the contour and outside every hole.
    pub fn contains_point(&self, p: &Point) -> bool {
        self.contour.contains_point(p) && !self.holes.iter().any(|h| h.contains_point(p))
    }

    pub fn translate(&mut self, v: Point) {
        self.contour.translate(v);
        for hole in &mut self.holes {
            hole.translate(v);
        }
    }

    pub fn translated(&self, v: Point) -> Self {
        let mut out = self.clone();
        out.translate(v);
        out
    }

    /// Contour and holes as one polygon list, contour first.
    pub fn to_polygons(&self) -> Vec<Polygon> {
        let mut out = Vec::with_capacity(1 + self.holes.len());
        out.push(self.contour.clone());
        out.extend(self.holes.iter().cloned());
        out
    }

    pub fn rectangle(min: Point, max: Point) -> Self {
        Self::new(Polygon::rectangle(min, max))
    }
}

impl fmt::Debug for ExPolygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExPolygon({} contour points, {} holes)",
            self.contour.len(),
            self.holes.len()
        )
    }
}

impl From<Polygon> for ExPolygon {
    fn from(contour: Polygon) -> Self {
        Self::new(contour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_with_hole() -> ExPolygon {
        let contour = Polygon::rectangle(Point::new(0, 0), Point::new(100, 100));
        let mut hole = Polygon::rectangle(Point::new(25, 25), Point::new(75, 75));
        hole.make_clockwise();
        ExPolygon::with_holes(contour, vec![hole])
    }

    #[test]
    fn test_area_subtracts_holes() {
        let ex = square_with_hole();
        assert!((ex.area() - 7_500.0).abs() < 1e-9);
    }

    #[test]
    fn test_contains_point_respects_holes() {
        let ex = square_with_hole();
        assert!(ex.contains_point(&Point::new(10, 10)));
        assert!(!ex.contains_point(&Point::new(50, 50)));
        assert!(!ex.contains_point(&Point::new(200, 10)));
    }

    #[test]
    fn test_translate_moves_holes() {
        let ex = square_with_hole().translated(Point::new(5, 5));
        assert!(ex.contains_point(&Point::new(15, 15)));
        assert!(!ex.contains_point(&Point::new(55, 55)));
    }
}
