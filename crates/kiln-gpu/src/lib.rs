//! Kiln GPU crate.
//!
//! Slot-pooled GPU resources (pipelines, materials, meshes, textures, uniform
//! arenas) and the per-frame draw scheduler that walks them. Everything talks
//! to the device through [`backend::Backend`], so the same manager drives a
//! window surface or a headless recorder.

pub mod backend;
pub mod error;
pub mod layout;
pub mod limits;
pub mod logging;
pub mod pool;
pub mod resources;
pub mod uniform;

mod manager;
mod scheduler;

pub use error::{Error, Resource, Result};
pub use manager::ResourceManager;
pub use pool::{MaterialId, MeshId, PipelineId};
pub use scheduler::{FrameDrawScheduler, FrameReport};
