//! Axis-aligned bounding boxes.

use super::{Point, Point3F};
use crate::{Coord, CoordF};
use serde::{Deserialize, Serialize};

/// 2D bounding box in scaled integer coordinates.
///
/// A freshly constructed box is empty (inverted extents); merge points
/// into it to define it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    pub fn new() -> Self {
        Self {
            min: Point::new(Coord::MAX, Coord::MAX),
            max: Point::new(Coord::MIN, Coord::MIN),
        }
    }

    pub fn from_points(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn is_defined(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y
    }

    pub fn merge_point(&mut self, p: Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    pub fn merge(&mut self, other: &BoundingBox) {
        if other.is_defined() {
            self.merge_point(other.min);
            self.merge_point(other.max);
        }
    }

    #[inline]
    pub fn center(&self) -> Point {
        Point::new((self.min.x + self.max.x) / 2, (self.min.y + self.max.y) / 2)
    }

    #[inline]
    pub fn width(&self) -> Coord {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> Coord {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new()
    }
}

/// 3D bounding box in millimeters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox3F {
    pub min: Point3F,
    pub max: Point3F,
}

impl BoundingBox3F {
    pub fn new() -> Self {
        Self {
            min: Point3F::new(CoordF::INFINITY, CoordF::INFINITY, CoordF::INFINITY),
            max: Point3F::new(
                CoordF::NEG_INFINITY,
                CoordF::NEG_INFINITY,
                CoordF::NEG_INFINITY,
            ),
        }
    }

    #[inline]
    pub fn is_defined(&self) -> bool {
        self.min.x <= self.max.x
    }

    pub fn merge_point(&mut self, p: Point3F) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    pub fn merge(&mut self, other: &BoundingBox3F) {
        if other.is_defined() {
            self.merge_point(other.min);
            self.merge_point(other.max);
        }
    }

    #[inline]
    pub fn center(&self) -> Point3F {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn size(&self) -> Point3F {
        self.max - self.min
    }
}

impl Default for BoundingBox3F {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_2d_merge() {
        let mut bb = BoundingBox::new();
        assert!(!bb.is_defined());

        bb.merge_point(Point::new(10, -5));
        bb.merge_point(Point::new(-3, 7));
        assert!(bb.is_defined());
        assert_eq!(bb.min, Point::new(-3, -5));
        assert_eq!(bb.max, Point::new(10, 7));
        assert_eq!(bb.width(), 13);
        assert_eq!(bb.height(), 12);
    }

    #[test]
    fn test_bbox_3d_merge() {
        let mut bb = BoundingBox3F::new();
        bb.merge_point(Point3F::new(0.0, 0.0, 0.0));
        bb.merge_point(Point3F::new(1.0, 2.0, 3.0));
        assert!(bb.is_defined());
        assert!((bb.size().z - 3.0).abs() < 1e-12);
        assert!((bb.center().y - 1.0).abs() < 1e-12);
    }
}
