//! Support generation integration tests.
//!
//! These tests validate the structural guarantees of the generated
//! lattice: pairing-key properties, cascade and bridge constraints,
//! clearance from the model, and pad dimensions.

use slaprint::clipper;
use slaprint::geometry::Point3F;
use slaprint::mesh::TriangleMesh;
use slaprint::pad::{create_pad, pad_blueprint, PadConfig};
use slaprint::slice::{grid, slice_mesh, CLOSING_RADIUS};
use slaprint::support::{
    build, pairhash, CancelToken, SupportConfig, SupportPoint, SupportTree, SupportableMesh,
};
use std::collections::HashSet;

/// A 20x20x4 mm slab with its underside at `bottom_z`.
fn slab(bottom_z: f64) -> TriangleMesh {
    let unit = TriangleMesh::cube(1.0);
    let mut mesh = TriangleMesh::new();
    for v in unit.vertices() {
        mesh.add_vertex(Point3F::new(
            v.x * 20.0,
            v.y * 20.0,
            (v.z + 0.5) * 4.0 + bottom_z,
        ));
    }
    for t in 0..unit.triangle_count() {
        let idx = unit.triangle_indices(t);
        mesh.add_triangle(idx[0], idx[1], idx[2]);
    }
    mesh
}

/// Anchors in a grid on the slab underside.
fn underside_anchors(bottom_z: f64) -> Vec<SupportPoint> {
    let mut pts = Vec::new();
    for i in 0..4 {
        for j in 0..4 {
            let x = -7.5 + 5.0 * i as f64;
            let y = -7.5 + 5.0 * j as f64;
            pts.push(SupportPoint::new(Point3F::new(x, y, bottom_z), 0.2));
        }
    }
    pts
}

fn build_tree(mesh: &TriangleMesh, points: &[SupportPoint], cfg: SupportConfig) -> SupportTree {
    let sm = SupportableMesh::new(mesh, points, cfg);
    build(&sm, &CancelToken::new(), |_| {}).expect("support generation failed")
}

/// pairhash must be symmetric and collision-free over the index grid.
#[test]
fn test_pairhash_symmetry_and_injectivity() {
    let mut seen = HashSet::new();
    for i in 0..1000u64 {
        for j in (i + 1)..1000u64 {
            let h = pairhash(i, j);
            assert_eq!(h, pairhash(j, i), "asymmetric at ({}, {})", i, j);
            assert!(seen.insert(h), "collision at ({}, {})", i, j);
        }
    }
}

#[test]
fn test_cascade_invariants_hold() {
    let cfg = SupportConfig {
        object_elevation_mm: 10.0,
        max_solo_pillar_height_mm: 5.0,
        max_dual_pillar_height_mm: 8.0,
        ..SupportConfig::default()
    };
    let limit_links = cfg.pillar_cascade_neighbors;
    let limit_bridges = cfg.max_bridges_on_pillar;
    let h1 = cfg.max_solo_pillar_height_mm;
    let h2 = cfg.max_dual_pillar_height_mm;

    let mesh = slab(cfg.object_elevation_mm);
    let points = underside_anchors(cfg.object_elevation_mm);
    let tree = build_tree(&mesh, &points, cfg);
    assert!(tree.check_routed().is_ok());

    let gnd = tree.ground_level();
    for pillar in tree.pillars() {
        assert!(pillar.links <= limit_links);
        assert!(pillar.bridges <= limit_bridges);
        if (pillar.endpoint.z - gnd).abs() < 1e-6 {
            if pillar.height > h1 {
                assert!(pillar.links >= 1, "tall pillar with no cascade link");
            }
            if pillar.height > h2 {
                assert!(pillar.links >= 2, "very tall pillar with one link");
            }
        }
    }
}

#[test]
fn test_bridge_geometry_invariants() {
    let cfg = SupportConfig {
        object_elevation_mm: 10.0,
        max_solo_pillar_height_mm: 5.0,
        ..SupportConfig::default()
    };
    let slope = cfg.bridge_slope;
    let max_len = cfg.max_bridge_length_mm;
    let max_cross = cfg.max_pillar_link_distance_mm / slope.cos();

    let mesh = slab(cfg.object_elevation_mm);
    let points = underside_anchors(cfg.object_elevation_mm);
    let tree = build_tree(&mesh, &points, cfg);

    for bridge in tree.bridges() {
        assert!(
            bridge.slope() >= slope - 1e-6,
            "bridge shallower than the minimum slope"
        );
        assert!(bridge.length() <= max_len + 1e-6);
    }
    for cross in tree.crossbridges() {
        assert!(cross.length() <= max_cross + 1e-6, "cross-bridge too long");
    }
}

/// With a negative head penetration, support and model slices must not
/// overlap on any shared layer.
#[test]
fn test_supports_clear_of_model() {
    let cfg = SupportConfig {
        object_elevation_mm: 5.0,
        head_penetration_mm: -0.1,
        ..SupportConfig::default()
    };
    let mesh = slab(cfg.object_elevation_mm);
    let points = underside_anchors(cfg.object_elevation_mm);
    let tree = build_tree(&mesh, &points, cfg);
    assert!(tree.check_routed().is_ok());

    let top = mesh.bounding_box().max.z;
    let zs = grid(tree.ground_level(), top, 0.37);
    let support_layers = tree.slice(&zs, CLOSING_RADIUS);
    let model_layers = slice_mesh(&mesh, &zs, CLOSING_RADIUS);

    for (i, (sup, model)) in support_layers.iter().zip(model_layers.iter()).enumerate() {
        let overlap = clipper::intersection(sup, model);
        assert!(
            clipper::total_area(&overlap) < 1.0,
            "support collides with the model at layer {} (z = {})",
            i,
            zs[i]
        );
    }
}

#[test]
fn test_floor_anchors_discarded_without_elevation() {
    let cfg = SupportConfig {
        object_elevation_mm: 0.0,
        ..SupportConfig::default()
    };
    let mesh = slab(0.0);
    // Anchors directly on the plate need no struts.
    let points = vec![
        SupportPoint::new(Point3F::new(0.0, 0.0, 0.0), 0.2),
        SupportPoint::new(Point3F::new(5.0, 5.0, 0.3), 0.2),
    ];
    let tree = build_tree(&mesh, &points, cfg);
    assert!(tree.pillars().is_empty());
    assert!(tree.retrieve_mesh().is_empty());
}

#[test]
fn test_pad_under_support_footprint() {
    let cfg = SupportConfig::default();
    let mesh = slab(cfg.object_elevation_mm);
    let points = underside_anchors(cfg.object_elevation_mm);
    let tree = build_tree(&mesh, &points, cfg);

    let footprint = pad_blueprint(tree.retrieve_mesh());
    assert!(!footprint.is_empty());

    let pad_cfg = PadConfig::default();
    let pad = create_pad(&footprint, &[], &pad_cfg).unwrap();
    let bb = pad.bounding_box();
    assert!((bb.max.z - bb.min.z - pad_cfg.full_height()).abs() < 1e-9);
}

#[test]
fn test_winged_pad_full_height() {
    let pad_cfg = PadConfig {
        wall_height_mm: 3.0,
        ..PadConfig::default()
    };
    let footprint = pad_blueprint(&slab(0.0));
    let pad = create_pad(&footprint, &[], &pad_cfg).unwrap();
    let bb = pad.bounding_box();
    assert!((bb.max.z - bb.min.z - pad_cfg.full_height()).abs() < 1e-9);
}

/// A slice through the wing region must be an annulus: the rim walls
/// enclose an open cavity above the slab.
#[test]
fn test_winged_pad_cavity_stays_open() {
    let pad_cfg = PadConfig {
        wall_height_mm: 3.0,
        ..PadConfig::default()
    };
    let footprint = pad_blueprint(&slab(0.0));
    let pad = create_pad(&footprint, &[], &pad_cfg).unwrap();

    let bb = pad.bounding_box();
    let wing_z = bb.min.z + pad_cfg.thickness_mm + pad_cfg.wall_height_mm / 2.0;
    let section = slice_mesh(&pad, &[wing_z], CLOSING_RADIUS).remove(0);
    assert_eq!(section.len(), 1);
    assert_eq!(section[0].holes.len(), 1, "wing cavity roofed over");

    // The rim ring holds far less material than the slab below it.
    let slab_z = bb.min.z + pad_cfg.thickness_mm / 2.0;
    let slab_section = slice_mesh(&pad, &[slab_z], CLOSING_RADIUS).remove(0);
    assert!(clipper::total_area(&section) < clipper::total_area(&slab_section) / 2.0);
}

#[test]
fn test_tree_slices_on_model_grid() {
    let cfg = SupportConfig::default();
    let mesh = slab(cfg.object_elevation_mm);
    let points = underside_anchors(cfg.object_elevation_mm);
    let tree = build_tree(&mesh, &points, cfg);

    let zs = grid(tree.ground_level(), mesh.bounding_box().max.z, 0.5);
    let layers = tree.slice(&zs, CLOSING_RADIUS);
    assert_eq!(layers.len(), zs.len());
    // Pillar shafts must show up near the plate.
    assert!(!layers[0].is_empty());
}
