//! GPU backend boundary.
//!
//! The resource manager never touches a device directly. It asks a [`Backend`]
//! for objects and hands the frame scheduler a [`PassEncoder`] to record into.
//!
//! Two implementations ship with the crate:
//! - [`gpu::WgpuBackend`]: a window surface on a real device
//! - [`recording::RecordingBackend`]: headless, records every call

pub mod recording;
pub mod gpu;

use crate::error::Result;
use crate::limits::MAX_TEXTURES;

/// Color the frame is cleared to before any draw.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClearColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Default for ClearColor {
    fn default() -> Self {
        Self { r: 0.1, g: 0.2, b: 0.3, a: 1.0 }
    }
}

/// Render pipeline request.
///
/// The backend builds the layout `[global uniforms, material uniforms (dynamic
/// offset), texture set]`, the vertex + instance buffer layouts, depth test
/// (less, write enabled), back-face culling and clockwise front faces.
#[derive(Debug, Copy, Clone)]
pub struct PipelineDesc<'a> {
    pub label: &'a str,
    /// WGSL source with `vs_main` and `fs_main` entry points.
    pub shader: &'a str,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BufferKind {
    Vertex,
    Index,
    Uniform,
}

#[derive(Debug, Copy, Clone)]
pub struct BufferDesc<'a> {
    pub label: &'a str,
    pub kind: BufferKind,
    pub size: u64,
}

/// RGBA8 unorm 2D texture request.
#[derive(Debug, Copy, Clone)]
pub struct TextureDesc<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
}

/// Which uniform bind group layout to use.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UniformScope {
    /// Group 0, static offset.
    Global,
    /// Group 1, dynamic offset into the shared material buffer.
    Material,
}

pub trait Backend: Sized {
    type Buffer;
    type Texture;
    type TextureView;
    type Sampler;
    type BindGroup;
    type Pipeline;

    fn create_pipeline(&self, desc: &PipelineDesc<'_>) -> Result<Self::Pipeline>;

    /// Creates a zero-initialized buffer. Buffers are always writable.
    fn create_buffer(&self, desc: &BufferDesc<'_>) -> Result<Self::Buffer>;

    /// Queues `data` for upload at `offset`. Uploads land before the next submit.
    fn write_buffer(&self, buffer: &Self::Buffer, offset: u64, data: &[u8]);

    /// Creates a texture and uploads `pixels` (tightly packed RGBA8 rows).
    fn create_texture(
        &self,
        desc: &TextureDesc<'_>,
        pixels: &[u8],
    ) -> Result<(Self::Texture, Self::TextureView)>;

    /// Linear filtering, clamp-to-edge.
    fn create_sampler(&self, label: &str) -> Result<Self::Sampler>;

    /// Binds `size` bytes of `buffer` at binding 0 of the given uniform layout.
    fn create_uniform_bind_group(
        &self,
        scope: UniformScope,
        buffer: &Self::Buffer,
        size: u64,
    ) -> Result<Self::BindGroup>;

    /// Binding 0 = sampler, bindings 1..=MAX_TEXTURES = `views`.
    fn create_texture_bind_group(
        &self,
        sampler: &Self::Sampler,
        views: [&Self::TextureView; MAX_TEXTURES],
    ) -> Result<Self::BindGroup>;

    /// 1×1 placeholder bound to unfilled texture slots.
    fn default_texture_view(&self) -> &Self::TextureView;

    /// Runs one frame: begins a pass cleared to `clear`, lets `record` fill it,
    /// then submits and presents.
    ///
    /// Returns `Ok(None)` when no surface image was available and the frame was
    /// skipped.
    fn render_frame<R>(
        &self,
        clear: ClearColor,
        record: impl FnOnce(&mut dyn PassEncoder<Self>) -> R,
    ) -> Result<Option<R>>;
}

/// Draw-recording surface handed to the frame scheduler.
pub trait PassEncoder<B: Backend> {
    fn set_pipeline(&mut self, pipeline: &B::Pipeline);
    fn set_bind_group(&mut self, index: u32, group: &B::BindGroup, offsets: &[u32]);
    fn set_vertex_buffer(&mut self, slot: u32, buffer: &B::Buffer);
    /// Indices are always `u32`.
    fn set_index_buffer(&mut self, buffer: &B::Buffer);
    fn draw_indexed(&mut self, index_count: u32, instance_count: u32);
}
