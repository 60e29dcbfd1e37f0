//! Routing of anchor points into a connected support lattice.
//!
//! Every anchor must end up connected to the ground plane: straight
//! down through a solo pillar when the path is clear, or through a
//! bridge onto a neighboring pillar when the model is in the way.
//! Tall ground pillars are then braced against each other with
//! cross-bridges laid at the minimum allowed slope.

use crate::geometry::Point3F;
use crate::mesh::{MeshIndex, TriangleMesh};
use crate::support::tree::{Bridge, Pillar, SupportTree};
use crate::support::{pairhash, SupportConfig, SupportPoint};
use crate::{CoordF, Error, Result, EPSILON};
use log::{debug, warn};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag, checked between build phases.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Everything the builder needs about the object being supported.
pub struct SupportableMesh<'a> {
    pub mesh: &'a TriangleMesh,
    pub points: &'a [SupportPoint],
    pub cfg: SupportConfig,
}

impl<'a> SupportableMesh<'a> {
    pub fn new(mesh: &'a TriangleMesh, points: &'a [SupportPoint], cfg: SupportConfig) -> Self {
        Self { mesh, points, cfg }
    }
}

/// Build the support lattice.
///
/// Deterministic for identical inputs. Anchors that cannot be routed
/// or braced within the constraints are recorded on the tree rather
/// than aborting the whole build; cancellation discards everything.
pub fn build(
    sm: &SupportableMesh,
    cancel: &CancelToken,
    mut progress: impl FnMut(f64),
) -> Result<SupportTree> {
    let cfg = &sm.cfg;
    let bb = sm.mesh.bounding_box();
    let ground_level = if bb.is_defined() {
        bb.min.z - cfg.object_elevation_mm
    } else {
        -cfg.object_elevation_mm
    };

    let mut tree = SupportTree::new(ground_level, cfg.base_height_mm);
    progress(0.0);

    // Phase 1: filter anchors.
    let mut anchors: Vec<(usize, SupportPoint)> =
        sm.points.iter().copied().enumerate().collect();
    if cfg.object_elevation_mm < EPSILON {
        // Object on the plate: anchors at floor level need no strut.
        let floor = ground_level + cfg.base_height_mm;
        anchors.retain(|(_, p)| p.pos.z > floor + EPSILON);
    }
    cancel.check()?;
    progress(0.1);

    // Phase 2: route every anchor to the ground.
    let index = MeshIndex::new(sm.mesh);
    let total = anchors.len().max(1) as f64;
    for (routed, (anchor_idx, point)) in anchors.iter().enumerate() {
        route_anchor(&mut tree, &index, cfg, *anchor_idx, point, ground_level);
        progress(0.1 + 0.6 * (routed + 1) as f64 / total);
    }
    cancel.check()?;

    // Phase 3: cascade tall ground pillars.
    cascade_pillars(&mut tree, cfg, ground_level);
    cancel.check()?;
    progress(0.9);

    if !tree.unroutable_anchors().is_empty() {
        warn!(
            "{} of {} anchors could not be routed to the ground",
            tree.unroutable_anchors().len(),
            sm.points.len()
        );
    }
    debug!(
        "support lattice: {} pillars, {} bridges, {} cross-bridges",
        tree.pillars().len(),
        tree.bridges().len(),
        tree.crossbridges().len()
    );
    progress(1.0);
    Ok(tree)
}

/// Junction point under the anchor head where struts may attach.
///
/// Anchors are treated as sitting on downward-facing surface; positive
/// head penetration sinks the tip upward into the material, negative
/// pulls it clear. The junction hangs one pillar radius below the tip
/// so the connecting strut spheres stay out of the model.
fn head_junction(point: &SupportPoint, cfg: &SupportConfig) -> (Point3F, Point3F) {
    let tip = Point3F::new(
        point.pos.x,
        point.pos.y,
        point.pos.z + cfg.head_penetration_mm.min(0.0),
    );
    let junction = Point3F::new(tip.x, tip.y, tip.z - cfg.pillar_radius());
    (tip, junction)
}

fn route_anchor(
    tree: &mut SupportTree,
    index: &MeshIndex,
    cfg: &SupportConfig,
    anchor_idx: usize,
    point: &SupportPoint,
    ground_level: CoordF,
) {
    let (tip, junction) = head_junction(point, cfg);
    if junction.z <= ground_level + EPSILON {
        tree.mark_unroutable(anchor_idx);
        return;
    }

    // Clear path straight down: solo pillar.
    if index.raycast_down(junction).is_none() {
        let endpoint = Point3F::new(junction.x, junction.y, ground_level);
        let idx = tree.add_pillar(
            Pillar::new(junction, endpoint, cfg.pillar_radius()).with_anchor(anchor_idx),
        );
        tree.add_bridge(Bridge::new(tip, junction, point.head_radius));
        debug!("anchor {} routed to solo pillar {}", anchor_idx, idx);
        return;
    }

    // Obstructed: bridge onto the best existing pillar.
    if let Some((pillar_idx, end)) = nearest_bridge_target(tree, cfg, junction) {
        tree.pillar_mut(pillar_idx).bridges += 1;
        tree.add_bridge(Bridge::new(tip, junction, point.head_radius));
        tree.add_bridge(Bridge::new(junction, end, cfg.head_front_radius_mm));
        debug!("anchor {} bridged to pillar {}", anchor_idx, pillar_idx);
        return;
    }

    tree.mark_unroutable(anchor_idx);
}

/// Shortest feasible bridge from `junction` onto an existing pillar,
/// laid at exactly the minimum slope.
fn nearest_bridge_target(
    tree: &SupportTree,
    cfg: &SupportConfig,
    junction: Point3F,
) -> Option<(usize, Point3F)> {
    let tan_slope = cfg.bridge_slope.tan();
    let cos_slope = cfg.bridge_slope.cos();

    let mut best: Option<(usize, Point3F, CoordF)> = None;
    for (idx, pillar) in tree.pillars().iter().enumerate() {
        if pillar.bridges >= cfg.max_bridges_on_pillar {
            continue;
        }
        let d = junction.distance_xy(&pillar.top);
        if d < EPSILON {
            continue;
        }
        let length = d / cos_slope;
        if length > cfg.max_bridge_length_mm {
            continue;
        }
        let end_z = junction.z - d * tan_slope;
        if end_z < pillar.endpoint.z - EPSILON || end_z > pillar.top.z + EPSILON {
            continue;
        }
        if best.as_ref().map_or(true, |(_, _, l)| length < *l) {
            best = Some((
                idx,
                Point3F::new(pillar.top.x, pillar.top.y, end_z),
                length,
            ));
        }
    }
    best.map(|(idx, end, _)| (idx, end))
}

/// Link every over-tall ground pillar to enough neighbors.
fn cascade_pillars(tree: &mut SupportTree, cfg: &SupportConfig, ground_level: CoordF) {
    let tan_slope = cfg.bridge_slope.tan();
    let mut linked: HashSet<u64> = HashSet::new();

    for i in 0..tree.pillars().len() {
        let pillar = tree.pillars()[i];
        if (pillar.endpoint.z - ground_level).abs() > EPSILON {
            continue;
        }
        let needed = if pillar.height > cfg.max_dual_pillar_height_mm {
            2
        } else if pillar.height > cfg.max_solo_pillar_height_mm {
            1
        } else {
            continue;
        };

        // Candidates ordered by resulting cross-bridge length, which at
        // a fixed slope is ordered by horizontal distance.
        let mut candidates: Vec<(usize, CoordF)> = tree
            .pillars()
            .iter()
            .enumerate()
            .filter(|(j, other)| {
                *j != i && (other.endpoint.z - ground_level).abs() <= EPSILON
            })
            .map(|(j, other)| (j, pillar.top.distance_xy(&other.top)))
            .filter(|(_, d)| *d > EPSILON && *d <= cfg.max_pillar_link_distance_mm)
            .collect();
        candidates.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        for (j, d) in candidates {
            if tree.pillars()[i].links >= needed
                || tree.pillars()[i].links >= cfg.pillar_cascade_neighbors
            {
                break;
            }
            if linked.contains(&pairhash(i as u64, j as u64)) {
                continue;
            }
            if tree.pillars()[j].links >= cfg.pillar_cascade_neighbors {
                continue;
            }

            let other = tree.pillars()[j];
            let drop = d * tan_slope;
            let start_z = pillar.top.z.min(other.top.z + drop);
            let end_z = start_z - drop;
            if start_z < pillar.endpoint.z + EPSILON || end_z < other.endpoint.z - EPSILON {
                continue;
            }

            tree.add_crossbridge(Bridge::new(
                Point3F::new(pillar.top.x, pillar.top.y, start_z),
                Point3F::new(other.top.x, other.top.y, end_z),
                cfg.pillar_radius(),
            ));
            linked.insert(pairhash(i as u64, j as u64));
            tree.pillar_mut(i).links += 1;
            tree.pillar_mut(j).links += 1;
        }

        if tree.pillars()[i].links < needed {
            warn!(
                "pillar {} has {} of {} required cascade links",
                i,
                tree.pillars()[i].links,
                needed
            );
            // Attribute the shortfall to the anchor the pillar serves.
            if let Some(anchor) = tree.pillars()[i].anchor {
                tree.mark_uncascaded(anchor);
            }
        }
    }
}
