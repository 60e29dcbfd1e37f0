//! Triangle mesh representation and spatial queries.

mod index;
mod triangle_mesh;

pub use index::{MeshIndex, RayHit};
pub use triangle_mesh::{Triangle, TriangleMesh};
