//! Records stored in the manager's slot pools.

mod material;
mod mesh;
mod pipeline;
mod texture_set;

pub use material::Material;
pub use mesh::{Mesh, MeshCounts};
pub use pipeline::Pipeline;
pub use texture_set::TextureSet;
