//! Raster and slicing benchmarks
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use slaprint::geometry::{ExPolygon, Point, Polygon};
use slaprint::mesh::TriangleMesh;
use slaprint::raster::{Format, PixelDim, Raster, Resolution, Trafo};
use slaprint::scale;
use slaprint::slice::slice_mesh;

fn layer_polygon() -> ExPolygon {
    // A 60 mm disc with a 20 mm hole, roughly a layer-sized workload.
    let mut expoly = ExPolygon::new(Polygon::circle(
        Point::new(scale(60.0), scale(34.0)),
        scale(30.0),
        256,
    ));
    expoly.add_hole(Polygon::circle(
        Point::new(scale(60.0), scale(34.0)),
        scale(10.0),
        128,
    ));
    expoly
}

fn draw_benchmark(c: &mut Criterion) {
    let expoly = layer_polygon();
    let resolution = Resolution::new(2560, 1440);
    let pixdim = PixelDim::new(120.0 / 2560.0, 68.0 / 1440.0);

    c.bench_function("draw_2560x1440_disc", |b| {
        let mut raster = Raster::new();
        raster.reset(resolution, pixdim, Format::Raw, Trafo::default());
        b.iter(|| {
            raster.clear();
            raster.draw(black_box(&expoly));
        })
    });
}

fn save_benchmark(c: &mut Criterion) {
    let expoly = layer_polygon();
    let resolution = Resolution::new(2560, 1440);
    let pixdim = PixelDim::new(120.0 / 2560.0, 68.0 / 1440.0);

    let mut raster = Raster::new();
    raster.reset(resolution, pixdim, Format::Png, Trafo::for_format(Format::Png));
    raster.draw(&expoly);

    c.bench_function("encode_png_2560x1440", |b| {
        b.iter(|| black_box(raster.save_to_vec().unwrap()))
    });
}

fn slice_benchmark(c: &mut Criterion) {
    let mesh = TriangleMesh::cube(40.0);
    let zs: Vec<f64> = (1..400).map(|i| -20.0 + i as f64 * 0.1).collect();

    c.bench_function("slice_cube_400_layers", |b| {
        b.iter(|| black_box(slice_mesh(&mesh, &zs, 0.005)))
    });
}

criterion_group!(benches, draw_benchmark, save_benchmark, slice_benchmark);
criterion_main!(benches);
