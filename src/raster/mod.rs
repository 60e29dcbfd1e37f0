//! Anti-aliased grayscale rasterization of layer cross-sections.
//!
//! Polygons arrive in the shared scaled-integer coordinate space and
//! are converted to floating pixel coordinates only here. Coverage is
//! accumulated with sub-scanline sampling and shaped by a gamma curve,
//! so boundary pixels carry fractional intensity. Mirroring is a path
//! flip about the buffer extents applied before rasterization, which
//! keeps anti-aliasing correct on mirrored edges.

use crate::geometry::{ExPolygon, ExPolygons};
use crate::{unscale, CoordF, Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Sub-scanlines sampled per pixel row.
const SUBSAMPLES: usize = 4;

/// Pixel size of the target display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width_px: usize,
    pub height_px: usize,
}

impl Resolution {
    pub fn new(width_px: usize, height_px: usize) -> Self {
        Self {
            width_px,
            height_px,
        }
    }

    pub fn pixels(&self) -> usize {
        self.width_px * self.height_px
    }
}

/// Physical size of one pixel in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelDim {
    pub w_mm: CoordF,
    pub h_mm: CoordF,
}

impl PixelDim {
    pub fn new(w_mm: CoordF, h_mm: CoordF) -> Self {
        Self { w_mm, h_mm }
    }
}

/// Output encoding of a finished layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Format {
    Png,
    Raw,
}

impl Format {
    /// Where row zero of the encoded image sits.
    pub fn native_origin(&self) -> Origin {
        match self {
            Format::Png => Origin::TopLeft,
            Format::Raw => Origin::BottomLeft,
        }
    }
}

/// Drawing origin convention.
///
/// The engine draws with a bottom-left origin; a top-left origin adds
/// one extra Y flip so the encoded rows come out upright.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    #[default]
    BottomLeft,
    TopLeft,
}

/// Mirror flags, origin convention and the anti-aliasing curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trafo {
    pub origin: Origin,
    pub mirror_x: bool,
    pub mirror_y: bool,
    /// Positive selects a power-law anti-aliasing curve; zero or
    /// negative disables anti-aliasing with a hard 0.5 threshold.
    pub gamma: CoordF,
}

impl Default for Trafo {
    fn default() -> Self {
        Self {
            origin: Origin::BottomLeft,
            mirror_x: false,
            mirror_y: false,
            gamma: 1.0,
        }
    }
}

impl Trafo {
    pub fn new(mirror_x: bool, mirror_y: bool) -> Self {
        Self {
            mirror_x,
            mirror_y,
            ..Self::default()
        }
    }

    /// Trafo with the origin convention the format expects.
    pub fn for_format(format: Format) -> Self {
        Self {
            origin: format.native_origin(),
            ..Self::default()
        }
    }

    /// Whether the drawn rows need a Y flip in total.
    fn flip_y(&self) -> bool {
        self.mirror_y != (self.origin == Origin::TopLeft)
    }
}

struct Inner {
    buf: Vec<u8>,
    resolution: Resolution,
    pixdim: PixelDim,
    trafo: Trafo,
    format: Format,
}

/// One grayscale exposure mask.
///
/// Freshly constructed rasters are empty; [`Raster::reset`] allocates
/// the buffer. Drawing or saving an empty raster is a programming
/// error and panics.
#[derive(Default)]
pub struct Raster {
    inner: Option<Inner>,
}

impl Raster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// Allocate (or reallocate) the zero-filled pixel buffer.
    pub fn reset(
        &mut self,
        resolution: Resolution,
        pixdim: PixelDim,
        format: Format,
        trafo: Trafo,
    ) {
        self.inner = Some(Inner {
            buf: vec![0; resolution.pixels()],
            resolution,
            pixdim,
            trafo,
            format,
        });
    }

    fn inner(&self) -> &Inner {
        self.inner.as_ref().expect("raster not initialized")
    }

    fn inner_mut(&mut self) -> &mut Inner {
        self.inner.as_mut().expect("raster not initialized")
    }

    pub fn resolution(&self) -> Resolution {
        self.inner().resolution
    }

    pub fn pixel_dimensions(&self) -> PixelDim {
        self.inner().pixdim
    }

    /// Raw intensity at pixel `(x, y)`, row zero at the drawing origin.
    pub fn read_pixel(&self, x: usize, y: usize) -> u8 {
        let inner = self.inner();
        inner.buf[y * inner.resolution.width_px + x]
    }

    /// Reset every pixel to black without reallocating.
    pub fn clear(&mut self) {
        self.inner_mut().buf.fill(0);
    }

    /// Rasterize one polygon-with-holes, accumulating white coverage.
    pub fn draw(&mut self, expoly: &ExPolygon) {
        let inner = self.inner_mut();
        let width = inner.resolution.width_px;
        let height = inner.resolution.height_px;
        let flip_x = inner.trafo.mirror_x;
        let flip_y = inner.trafo.flip_y();

        // Collect all rings as pixel-space edge lists; holes cancel
        // via the even-odd fill rule.
        let mut edges: Vec<[(CoordF, CoordF); 2]> = Vec::new();
        let pixdim = inner.pixdim;
        let to_px = |x: crate::Coord, y: crate::Coord| -> (CoordF, CoordF) {
            let mut px = unscale(x) / pixdim.w_mm;
            let mut py = unscale(y) / pixdim.h_mm;
            if flip_x {
                px = width as CoordF - px;
            }
            if flip_y {
                py = height as CoordF - py;
            }
            (px, py)
        };
        let add_ring = |ring: &[crate::geometry::Point],
                            edges: &mut Vec<[(CoordF, CoordF); 2]>| {
            for i in 0..ring.len() {
                let a = ring[i];
                let b = ring[(i + 1) % ring.len()];
                let pa = to_px(a.x, a.y);
                let pb = to_px(b.x, b.y);
                if pa.1 != pb.1 {
                    edges.push([pa, pb]);
                }
            }
        };
        add_ring(expoly.contour.points(), &mut edges);
        for hole in &expoly.holes {
            add_ring(hole.points(), &mut edges);
        }
        if edges.is_empty() {
            return;
        }

        let min_y = edges
            .iter()
            .map(|e| e[0].1.min(e[1].1))
            .fold(CoordF::INFINITY, CoordF::min);
        let max_y = edges
            .iter()
            .map(|e| e[0].1.max(e[1].1))
            .fold(CoordF::NEG_INFINITY, CoordF::max);
        let row_start = (min_y.floor().max(0.0)) as usize;
        let row_end = (max_y.ceil().min(height as CoordF)) as usize;

        let gamma = inner.trafo.gamma;
        let mut coverage = vec![0.0f64; width];
        let mut crossings: Vec<CoordF> = Vec::new();

        for row in row_start..row_end {
            coverage.fill(0.0);
            let mut any = false;

            for sub in 0..SUBSAMPLES {
                let yc = row as CoordF + (sub as CoordF + 0.5) / SUBSAMPLES as CoordF;
                crossings.clear();
                for e in &edges {
                    let (x0, y0) = e[0];
                    let (x1, y1) = e[1];
                    if (y0 <= yc) != (y1 <= yc) {
                        crossings.push(x0 + (x1 - x0) * (yc - y0) / (y1 - y0));
                    }
                }
                if crossings.is_empty() {
                    continue;
                }
                crossings.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

                for pair in crossings.chunks_exact(2) {
                    let (span_a, span_b) = (
                        pair[0].max(0.0).min(width as CoordF),
                        pair[1].max(0.0).min(width as CoordF),
                    );
                    if span_b <= span_a {
                        continue;
                    }
                    any = true;
                    let first = span_a.floor() as usize;
                    let last = (span_b.ceil() as usize).min(width);
                    for px in first..last {
                        let lo = span_a.max(px as CoordF);
                        let hi = span_b.min(px as CoordF + 1.0);
                        if hi > lo {
                            coverage[px] += (hi - lo) / SUBSAMPLES as CoordF;
                        }
                    }
                }
            }
            if !any {
                continue;
            }

            let row_off = row * width;
            for (px, &cov) in coverage.iter().enumerate() {
                if cov <= 0.0 {
                    continue;
                }
                let shaped = apply_gamma(cov.min(1.0), gamma);
                let value = (shaped * 255.0).round() as u8;
                let cell = &mut inner.buf[row_off + px];
                *cell = (*cell).max(value);
            }
        }
    }

    /// Encode the buffer in its configured format.
    pub fn save<W: Write>(&self, out: &mut W) -> Result<()> {
        let bytes = self.save_to_vec()?;
        out.write_all(&bytes)?;
        Ok(())
    }

    /// Encode the buffer into a fresh byte vector.
    pub fn save_to_vec(&self) -> Result<Vec<u8>> {
        let inner = self.inner();
        match inner.format {
            Format::Raw => {
                let mut bytes = format!(
                    "P5 {} {} 255 ",
                    inner.resolution.width_px, inner.resolution.height_px
                )
                .into_bytes();
                bytes.extend_from_slice(&inner.buf);
                Ok(bytes)
            }
            Format::Png => {
                let mut bytes = Vec::new();
                {
                    let mut encoder = png::Encoder::new(
                        &mut bytes,
                        inner.resolution.width_px as u32,
                        inner.resolution.height_px as u32,
                    );
                    encoder.set_color(png::ColorType::Grayscale);
                    encoder.set_depth(png::BitDepth::Eight);
                    let mut writer = encoder
                        .write_header()
                        .map_err(|e| Error::Encode(e.to_string()))?;
                    writer
                        .write_image_data(&inner.buf)
                        .map_err(|e| Error::Encode(e.to_string()))?;
                }
                Ok(bytes)
            }
        }
    }
}

fn apply_gamma(coverage: CoordF, gamma: CoordF) -> CoordF {
    if gamma > 0.0 {
        coverage.powf(gamma)
    } else if coverage >= 0.5 {
        1.0
    } else {
        0.0
    }
}

/// Rasterize and encode a stack of layers, one raster per layer.
///
/// Layers share no state, so encoding runs in parallel.
pub fn rasterize_layers(
    layers: &[ExPolygons],
    resolution: Resolution,
    pixdim: PixelDim,
    format: Format,
    trafo: Trafo,
) -> Result<Vec<Vec<u8>>> {
    layers
        .par_iter()
        .map(|layer| {
            let mut raster = Raster::new();
            raster.reset(resolution, pixdim, format, trafo);
            for expoly in layer {
                raster.draw(expoly);
            }
            raster.save_to_vec()
        })
        .collect()
}
