//! SLA (mask-projection) print preparation library.
//!
//! Given a triangle mesh and a cloud of support-anchor points on its
//! surface, this crate builds the physical support lattice (pillars,
//! bridges, base pad) that holds the object above the build plate, and
//! rasterizes every horizontal cross-section into an anti-aliased 8-bit
//! grayscale exposure mask.
//!
//! The main subsystems:
//! - [`support`] — the support-tree builder
//! - [`pad`] — the base pad generator
//! - [`raster`] — the exposure-mask raster engine
//! - [`slice`] — mesh cross-sectioning shared by all of the above
//!
//! 2D geometry uses scaled integer coordinates (1 unit = 1 nanometer) to
//! avoid floating-point precision issues; conversion to floating point
//! happens only at rasterization and meshing time.

pub mod clipper;
pub mod config;
pub mod geometry;
pub mod mesh;
pub mod pad;
pub mod raster;
pub mod slice;
pub mod support;

use thiserror::Error as ThisError;

/// Scaled integer coordinate type (nanometers).
pub type Coord = i64;

/// Floating-point coordinate type (millimeters).
pub type CoordF = f64;

/// Scaling factor between millimeters and scaled integer units.
pub const SCALING_FACTOR: f64 = 1_000_000.0;

/// Geometric epsilon in millimeters.
pub const EPSILON: CoordF = 1e-4;

/// Convert a millimeter value to scaled integer units.
#[inline]
pub fn scale(v: CoordF) -> Coord {
    (v * SCALING_FACTOR).round() as Coord
}

/// Convert a scaled integer value back to millimeters.
#[inline]
pub fn unscale(v: Coord) -> CoordF {
    v as CoordF / SCALING_FACTOR
}

/// Crate-wide error type.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A mesh was unusable for the requested operation.
    #[error("mesh error: {0}")]
    Mesh(String),

    /// Support generation failed for one or more anchor points.
    /// Carries the indices of the anchors that could not be routed.
    #[error("support generation failed for {} anchor point(s)", .0.len())]
    Unroutable(Vec<usize>),

    /// Generation was cancelled through the cooperative cancel token.
    #[error("operation cancelled")]
    Cancelled,

    /// Image encoding failed; nothing was written to the sink.
    #[error("encode error: {0}")]
    Encode(String),

    /// Error from the underlying byte sink.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
