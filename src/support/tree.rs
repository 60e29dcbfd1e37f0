//! The assembled support lattice.

use crate::geometry::{ExPolygons, Point3F};
use crate::mesh::TriangleMesh;
use crate::slice::slice_mesh;
use crate::support::strut_mesh::{sphere, tube};
use crate::{CoordF, Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Base frustum widening relative to the pillar shaft.
const BASE_RADIUS_FACTOR: CoordF = 2.0;

/// A near-vertical strut from a junction down to the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pillar {
    /// Upper end, where the anchor head or a bridge lands.
    pub top: Point3F,
    /// Lower end, on the ground plane.
    pub endpoint: Point3F,
    pub height: CoordF,
    pub radius: CoordF,
    /// Cross-bridge links to sibling pillars.
    pub links: u32,
    /// Anchor bridges landing on this pillar.
    pub bridges: u32,
    /// Index of the anchor this pillar was routed for.
    pub anchor: Option<usize>,
}

impl Pillar {
    pub fn new(top: Point3F, endpoint: Point3F, radius: CoordF) -> Self {
        Self {
            top,
            endpoint,
            height: top.z - endpoint.z,
            radius,
            links: 0,
            bridges: 0,
            anchor: None,
        }
    }

    pub fn with_anchor(mut self, anchor_idx: usize) -> Self {
        self.anchor = Some(anchor_idx);
        self
    }
}

/// A sloped strut: anchor head to pillar, or pillar to pillar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bridge {
    pub start: Point3F,
    pub end: Point3F,
    pub radius: CoordF,
}

impl Bridge {
    pub fn new(start: Point3F, end: Point3F, radius: CoordF) -> Self {
        Self { start, end, radius }
    }

    pub fn length(&self) -> CoordF {
        self.start.distance(&self.end)
    }

    /// Angle from horizontal, in radians.
    pub fn slope(&self) -> CoordF {
        let dz = (self.end.z - self.start.z).abs();
        let dxy = self.start.distance_xy(&self.end);
        dz.atan2(dxy)
    }
}

/// Arena of pillars and bridges plus the derived lattice mesh.
///
/// Entities are addressed by index and never removed; counters on
/// pillars are only grown while the builder runs.
#[derive(Debug, Default)]
pub struct SupportTree {
    pillars: Vec<Pillar>,
    bridges: Vec<Bridge>,
    crossbridges: Vec<Bridge>,
    ground_level: CoordF,
    base_height: CoordF,
    unroutable: Vec<usize>,
    uncascaded: Vec<usize>,
    mesh: OnceLock<TriangleMesh>,
}

impl SupportTree {
    pub fn new(ground_level: CoordF, base_height: CoordF) -> Self {
        Self {
            ground_level,
            base_height,
            ..Self::default()
        }
    }

    pub fn ground_level(&self) -> CoordF {
        self.ground_level
    }

    pub fn pillars(&self) -> &[Pillar] {
        &self.pillars
    }

    pub fn bridges(&self) -> &[Bridge] {
        &self.bridges
    }

    pub fn crossbridges(&self) -> &[Bridge] {
        &self.crossbridges
    }

    /// Indices into the input anchor list that could not be routed to
    /// the ground within the configured constraints.
    pub fn unroutable_anchors(&self) -> &[usize] {
        &self.unroutable
    }

    /// Anchors whose ground pillar exceeds its solo height limit but
    /// could not be braced with enough cross-bridges.
    pub fn uncascaded_anchors(&self) -> &[usize] {
        &self.uncascaded
    }

    /// Error carrying the failed anchor indices, for callers that treat
    /// any unrouted or under-braced anchor as fatal.
    pub fn check_routed(&self) -> Result<()> {
        if self.unroutable.is_empty() && self.uncascaded.is_empty() {
            return Ok(());
        }
        let mut failed: Vec<usize> = self
            .unroutable
            .iter()
            .chain(self.uncascaded.iter())
            .copied()
            .collect();
        failed.sort_unstable();
        failed.dedup();
        Err(Error::Unroutable(failed))
    }

    pub(crate) fn add_pillar(&mut self, pillar: Pillar) -> usize {
        self.pillars.push(pillar);
        self.pillars.len() - 1
    }

    pub(crate) fn pillar_mut(&mut self, idx: usize) -> &mut Pillar {
        &mut self.pillars[idx]
    }

    pub(crate) fn add_bridge(&mut self, bridge: Bridge) {
        self.bridges.push(bridge);
    }

    pub(crate) fn add_crossbridge(&mut self, bridge: Bridge) {
        self.crossbridges.push(bridge);
    }

    pub(crate) fn mark_unroutable(&mut self, anchor_idx: usize) {
        self.unroutable.push(anchor_idx);
    }

    pub(crate) fn mark_uncascaded(&mut self, anchor_idx: usize) {
        self.uncascaded.push(anchor_idx);
    }

    /// The lattice as one merged triangle mesh, built on first use.
    pub fn retrieve_mesh(&self) -> &TriangleMesh {
        self.mesh.get_or_init(|| self.build_mesh())
    }

    /// Cross-sections of the lattice mesh at the given heights.
    pub fn slice(&self, zs: &[CoordF], closing_radius: CoordF) -> Vec<ExPolygons> {
        slice_mesh(self.retrieve_mesh(), zs, closing_radius)
    }

    fn build_mesh(&self) -> TriangleMesh {
        let mut mesh = TriangleMesh::new();
        for pillar in &self.pillars {
            mesh.merge(&tube(pillar.endpoint, pillar.top, pillar.radius, pillar.radius));
            mesh.merge(&sphere(pillar.top, pillar.radius));
            // Widened footing for grip on the plate.
            if self.base_height > 0.0 {
                let base_top = Point3F::new(
                    pillar.endpoint.x,
                    pillar.endpoint.y,
                    pillar.endpoint.z + self.base_height.min(pillar.height),
                );
                mesh.merge(&tube(
                    pillar.endpoint,
                    base_top,
                    pillar.radius * BASE_RADIUS_FACTOR,
                    pillar.radius,
                ));
            }
        }
        // Bridge tubes are capped; end spheres would bulge past the
        // anchor tip and into the model when the head penetration is
        // negative.
        for bridge in self.bridges.iter().chain(self.crossbridges.iter()) {
            mesh.merge(&tube(bridge.start, bridge.end, bridge.radius, bridge.radius));
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_slope_and_length() {
        let b = Bridge::new(
            Point3F::new(0.0, 0.0, 10.0),
            Point3F::new(3.0, 0.0, 7.0),
            0.3,
        );
        assert!((b.slope() - std::f64::consts::FRAC_PI_4).abs() < 1e-9);
        assert!((b.length() - 18.0f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_pillar_height() {
        let p = Pillar::new(
            Point3F::new(1.0, 1.0, 12.0),
            Point3F::new(1.0, 1.0, 0.0),
            0.5,
        );
        assert!((p.height - 12.0).abs() < 1e-12);
        assert_eq!(p.links, 0);
        assert_eq!(p.bridges, 0);
    }

    #[test]
    fn test_mesh_covers_all_struts() {
        let mut tree = SupportTree::new(0.0, 0.5);
        tree.add_pillar(Pillar::new(
            Point3F::new(0.0, 0.0, 8.0),
            Point3F::new(0.0, 0.0, 0.0),
            0.6,
        ));
        tree.add_bridge(Bridge::new(
            Point3F::new(2.0, 0.0, 10.0),
            Point3F::new(0.0, 0.0, 8.0),
            0.3,
        ));

        let mesh = tree.retrieve_mesh();
        assert!(mesh.validate().is_ok());

        let bb = mesh.bounding_box();
        assert!(bb.min.z < 1e-9);
        assert!(bb.max.z > 10.0);
        assert!(bb.max.x > 2.0);
    }

    #[test]
    fn test_empty_tree_meshes_empty() {
        let tree = SupportTree::new(0.0, 1.0);
        assert!(tree.retrieve_mesh().is_empty());
        assert!(tree.slice(&[1.0], 0.0)[0].is_empty());
    }
}
