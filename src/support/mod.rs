//! Support lattice generation for mask-projection printing.
//!
//! An object printed above the build plate hangs from a lattice of
//! near-vertical pillars, bridges from anchor points down to pillars,
//! and cross-bridges that brace tall pillars against their neighbors.
//! [`build`] turns a cloud of anchor points into a [`SupportTree`];
//! the tree meshes itself on demand for slicing.

mod builder;
mod strut_mesh;
mod tree;

pub use builder::{build, CancelToken, SupportableMesh};
pub use strut_mesh::{sphere, tube};
pub use tree::{Bridge, Pillar, SupportTree};

use crate::geometry::Point3F;
use crate::{CoordF, EPSILON};
use serde::{Deserialize, Serialize};

/// One anchor on the model surface requiring support.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportPoint {
    /// Position in millimeters.
    pub pos: Point3F,
    /// Radius hint for the contact head.
    pub head_radius: CoordF,
}

impl SupportPoint {
    pub fn new(pos: Point3F, head_radius: CoordF) -> Self {
        Self { pos, head_radius }
    }
}

/// Pillar radius as a multiple of the head front radius.
pub(crate) const PILLAR_WIDENING_FACTOR: CoordF = 3.0;

/// Parameters of the support lattice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportConfig {
    /// Distance the object is lifted above the build plate.
    pub object_elevation_mm: CoordF,
    /// Height of the widened base frustum under each ground pillar.
    pub base_height_mm: CoordF,
    /// How deep a head tip sinks into the model surface. Negative
    /// values pull the tip away from the surface instead.
    pub head_penetration_mm: CoordF,
    /// Radius of the head contact cone at the model surface.
    pub head_front_radius_mm: CoordF,
    /// A taller ground pillar must cascade to at least one neighbor.
    pub max_solo_pillar_height_mm: CoordF,
    /// A pillar taller than this must cascade to at least two.
    pub max_dual_pillar_height_mm: CoordF,
    /// Upper bound on cross-bridge links per pillar.
    pub pillar_cascade_neighbors: u32,
    /// Upper bound on anchor bridges landing on one pillar.
    pub max_bridges_on_pillar: u32,
    /// Minimum bridge angle from horizontal, in radians.
    pub bridge_slope: CoordF,
    /// Maximum length of an anchor-to-pillar bridge.
    pub max_bridge_length_mm: CoordF,
    /// Maximum horizontal distance between cascaded pillars.
    pub max_pillar_link_distance_mm: CoordF,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            object_elevation_mm: 5.0,
            base_height_mm: 1.0,
            head_penetration_mm: 0.2,
            head_front_radius_mm: 0.2,
            max_solo_pillar_height_mm: 15.0,
            max_dual_pillar_height_mm: 35.0,
            pillar_cascade_neighbors: 3,
            max_bridges_on_pillar: 3,
            bridge_slope: std::f64::consts::FRAC_PI_4,
            max_bridge_length_mm: 15.0,
            max_pillar_link_distance_mm: 10.0,
        }
    }
}

impl SupportConfig {
    /// Radius of pillar shafts.
    pub fn pillar_radius(&self) -> CoordF {
        self.head_front_radius_mm * PILLAR_WIDENING_FACTOR
    }

    /// Check the configuration; returns one message per violated
    /// constraint, empty when valid.
    pub fn validate(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.object_elevation_mm < 0.0 {
            violations.push("object_elevation_mm must be non-negative".to_string());
        }
        if self.head_front_radius_mm <= 0.0 {
            violations.push("head_front_radius_mm must be positive".to_string());
        }
        if self.max_solo_pillar_height_mm > self.max_dual_pillar_height_mm {
            violations.push(
                "max_solo_pillar_height_mm must not exceed max_dual_pillar_height_mm".to_string(),
            );
        }
        if self.pillar_cascade_neighbors == 0 {
            violations.push("pillar_cascade_neighbors must be at least 1".to_string());
        }
        if !(0.0..std::f64::consts::FRAC_PI_2).contains(&self.bridge_slope) {
            violations.push("bridge_slope must be in (0, pi/2)".to_string());
        }
        if self.max_bridge_length_mm <= 0.0 {
            violations.push("max_bridge_length_mm must be positive".to_string());
        }
        if self.max_pillar_link_distance_mm <= 0.0 {
            violations.push("max_pillar_link_distance_mm must be positive".to_string());
        }
        violations
    }
}

/// Symmetric pairing key for unordered pillar index pairs.
///
/// Orders the pair and applies the triangular pairing function, so
/// `pairhash(i, j) == pairhash(j, i)` and distinct unordered pairs map
/// to distinct keys for indices well below `2^32`.
pub fn pairhash(i: u64, j: u64) -> u64 {
    let (lo, hi) = if i < j { (i, j) } else { (j, i) };
    hi * (hi + 1) / 2 + lo
}

/// Drop anchors that sit on or below the effective ground level.
///
/// Used when the object rests directly on the plate; such anchors
/// would produce zero-length struts.
pub fn remove_bottom_points(points: &mut Vec<SupportPoint>, floor_z: CoordF) {
    points.retain(|p| p.pos.z > floor_z + EPSILON);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairhash_symmetry() {
        assert_eq!(pairhash(3, 7), pairhash(7, 3));
        assert_eq!(pairhash(0, 1), 1);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(SupportConfig::default().validate().is_empty());
    }

    #[test]
    fn test_validate_reports_violations() {
        let cfg = SupportConfig {
            max_solo_pillar_height_mm: 50.0,
            max_dual_pillar_height_mm: 35.0,
            bridge_slope: 2.0,
            ..SupportConfig::default()
        };
        let violations = cfg.validate();
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn test_remove_bottom_points() {
        let mut pts = vec![
            SupportPoint::new(Point3F::new(0.0, 0.0, 0.5), 0.2),
            SupportPoint::new(Point3F::new(0.0, 0.0, 10.0), 0.2),
            SupportPoint::new(Point3F::new(0.0, 0.0, 1.00005), 0.2),
        ];
        remove_bottom_points(&mut pts, 1.0);
        assert_eq!(pts.len(), 1);
        assert!((pts[0].pos.z - 10.0).abs() < 1e-12);
    }
}
