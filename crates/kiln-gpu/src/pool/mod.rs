//! Fixed-capacity slot pools and the typed handles that index them.

mod handle;
mod slot_pool;

pub use handle::{MaterialId, MeshId, PipelineId};
pub use slot_pool::SlotPool;
