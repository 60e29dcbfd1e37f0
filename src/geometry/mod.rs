//! Geometry primitives shared by the support, pad and raster subsystems.
//!
//! 2D types use scaled integer coordinates; 3D types used for meshing and
//! support routing are floating-point millimeters.

mod bounding_box;
mod expolygon;
mod point;
mod polygon;

pub use bounding_box::{BoundingBox, BoundingBox3F};
pub use expolygon::{ExPolygon, ExPolygons};
pub use point::{Point, Point3F, PointF, Points};
pub use polygon::Polygon;
