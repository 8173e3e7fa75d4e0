//! Uniform sub-allocation.
//!
//! Each pipeline owns one global arena and each material one local arena. Both
//! are plain CPU mirrors; the GPU copy is refreshed once per frame.

mod arena;

pub use arena::{align_for, UniformArena};
