//! Headless backend that records every request.
//!
//! Buffers keep their contents, bind groups keep their entries and each frame
//! keeps its command list, so callers can assert on exactly what a real device
//! would have received.

use std::cell::{Cell, Ref, RefCell};

use crate::error::{Error, Result};
use crate::limits::{texture_byte_len, DEFAULT_TEXEL, MAX_TEXTURES};

use super::{
    Backend, BufferDesc, BufferKind, ClearColor, PassEncoder, PipelineDesc, TextureDesc,
    UniformScope,
};

// ── ids ───────────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BufferRef(pub usize);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureRef(pub usize);

/// Views share the index of the texture they were created from.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ViewRef(pub usize);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SamplerRef(pub usize);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BindGroupRef(pub usize);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PipelineRef(pub usize);

// ── records ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct BufferRecord {
    pub label: String,
    pub kind: BufferKind,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct TextureRecord {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Binding {
    Uniform { buffer: BufferRef, size: u64 },
    Sampler(SamplerRef),
    View(ViewRef),
}

#[derive(Debug, Clone)]
pub struct BindGroupRecord {
    /// `None` for texture-set groups.
    pub scope: Option<UniformScope>,
    pub entries: Vec<Binding>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PassCommand {
    SetPipeline(PipelineRef),
    SetBindGroup {
        index: u32,
        group: BindGroupRef,
        offsets: Vec<u32>,
    },
    SetVertexBuffer {
        slot: u32,
        buffer: BufferRef,
    },
    SetIndexBuffer(BufferRef),
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
    },
}

#[derive(Debug, Clone)]
pub struct FrameRecord {
    pub clear: ClearColor,
    pub commands: Vec<PassCommand>,
}

impl FrameRecord {
    pub fn draws(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.commands.iter().filter_map(|c| match c {
            PassCommand::DrawIndexed { index_count, instance_count } => {
                Some((*index_count, *instance_count))
            }
            _ => None,
        })
    }

    /// `(group index, group, offsets)` for every bind-group command.
    pub fn bind_groups(&self) -> impl Iterator<Item = (u32, BindGroupRef, &[u32])> + '_ {
        self.commands.iter().filter_map(|c| match c {
            PassCommand::SetBindGroup { index, group, offsets } => {
                Some((*index, *group, offsets.as_slice()))
            }
            _ => None,
        })
    }
}

/// Creation call that [`RecordingBackend::fail_next`] can make fail.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FailPoint {
    Pipeline,
    Buffer,
    Texture,
    Sampler,
    BindGroup,
}

#[derive(Debug, Default)]
struct State {
    buffers: Vec<BufferRecord>,
    textures: Vec<TextureRecord>,
    samplers: usize,
    bind_groups: Vec<BindGroupRecord>,
    pipelines: Vec<String>,
    frames: Vec<FrameRecord>,
    write_count: usize,
    fail: Vec<FailPoint>,
}

// ── backend ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct RecordingBackend {
    state: RefCell<State>,
    default_view: ViewRef,
    surface_available: Cell<bool>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        let state = State {
            textures: vec![TextureRecord {
                label: "default texture".to_owned(),
                width: 1,
                height: 1,
                pixels: DEFAULT_TEXEL.to_vec(),
            }],
            ..State::default()
        };
        Self {
            state: RefCell::new(state),
            default_view: ViewRef(0),
            surface_available: Cell::new(true),
        }
    }

    /// Makes the next creation call of kind `point` fail with a backend error.
    pub fn fail_next(&self, point: FailPoint) {
        self.state.borrow_mut().fail.push(point);
    }

    /// While `false`, frames are skipped as if the surface were lost.
    pub fn set_surface_available(&self, available: bool) {
        self.surface_available.set(available);
    }

    pub fn buffer(&self, buffer: BufferRef) -> Ref<'_, BufferRecord> {
        Ref::map(self.state.borrow(), |s| &s.buffers[buffer.0])
    }

    pub fn texture(&self, view: ViewRef) -> Ref<'_, TextureRecord> {
        Ref::map(self.state.borrow(), |s| &s.textures[view.0])
    }

    pub fn bind_group(&self, group: BindGroupRef) -> Ref<'_, BindGroupRecord> {
        Ref::map(self.state.borrow(), |s| &s.bind_groups[group.0])
    }

    pub fn frames(&self) -> Ref<'_, [FrameRecord]> {
        Ref::map(self.state.borrow(), |s| s.frames.as_slice())
    }

    pub fn buffer_count(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    /// Textures created so far, excluding the placeholder.
    pub fn texture_count(&self) -> usize {
        self.state.borrow().textures.len() - 1
    }

    pub fn pipeline_count(&self) -> usize {
        self.state.borrow().pipelines.len()
    }

    pub fn bind_group_count(&self) -> usize {
        self.state.borrow().bind_groups.len()
    }

    pub fn write_count(&self) -> usize {
        self.state.borrow().write_count
    }

    fn take_failure(&self, point: FailPoint) -> Result<()> {
        let mut state = self.state.borrow_mut();
        match state.fail.iter().position(|p| *p == point) {
            Some(i) => {
                state.fail.remove(i);
                Err(Error::backend(format!("injected {point:?} failure")))
            }
            None => Ok(()),
        }
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for RecordingBackend {
    type Buffer = BufferRef;
    type Texture = TextureRef;
    type TextureView = ViewRef;
    type Sampler = SamplerRef;
    type BindGroup = BindGroupRef;
    type Pipeline = PipelineRef;

    fn create_pipeline(&self, desc: &PipelineDesc<'_>) -> Result<PipelineRef> {
        self.take_failure(FailPoint::Pipeline)?;
        for entry in ["fn vs_main", "fn fs_main"] {
            if !desc.shader.contains(entry) {
                return Err(Error::backend(format!(
                    "shader `{}` is missing `{entry}`",
                    desc.label
                )));
            }
        }
        let mut state = self.state.borrow_mut();
        state.pipelines.push(desc.label.to_owned());
        Ok(PipelineRef(state.pipelines.len() - 1))
    }

    fn create_buffer(&self, desc: &BufferDesc<'_>) -> Result<BufferRef> {
        self.take_failure(FailPoint::Buffer)?;
        let mut state = self.state.borrow_mut();
        state.buffers.push(BufferRecord {
            label: desc.label.to_owned(),
            kind: desc.kind,
            data: vec![0; desc.size as usize],
        });
        Ok(BufferRef(state.buffers.len() - 1))
    }

    fn write_buffer(&self, buffer: &BufferRef, offset: u64, data: &[u8]) {
        let mut state = self.state.borrow_mut();
        state.write_count += 1;
        let dst = &mut state.buffers[buffer.0].data;
        let start = offset as usize;
        // Mirrors the device rule: out-of-range writes are dropped whole.
        if let Some(range) = dst.get_mut(start..start + data.len()) {
            range.copy_from_slice(data);
        } else {
            log::error!(
                "write of {} bytes at {start} overflows buffer {} ({} bytes)",
                data.len(),
                buffer.0,
                dst.len()
            );
        }
    }

    fn create_texture(
        &self,
        desc: &TextureDesc<'_>,
        pixels: &[u8],
    ) -> Result<(TextureRef, ViewRef)> {
        self.take_failure(FailPoint::Texture)?;
        let expected = texture_byte_len(desc.width, desc.height).ok_or_else(|| {
            Error::backend(format!(
                "texture `{}` size {}x{} overflows",
                desc.label, desc.width, desc.height
            ))
        })?;
        if pixels.len() != expected {
            return Err(Error::backend(format!(
                "texture `{}` expects {expected} bytes, got {}",
                desc.label,
                pixels.len()
            )));
        }
        let mut state = self.state.borrow_mut();
        state.textures.push(TextureRecord {
            label: desc.label.to_owned(),
            width: desc.width,
            height: desc.height,
            pixels: pixels.to_vec(),
        });
        let index = state.textures.len() - 1;
        Ok((TextureRef(index), ViewRef(index)))
    }

    fn create_sampler(&self, _label: &str) -> Result<SamplerRef> {
        self.take_failure(FailPoint::Sampler)?;
        let mut state = self.state.borrow_mut();
        state.samplers += 1;
        Ok(SamplerRef(state.samplers - 1))
    }

    fn create_uniform_bind_group(
        &self,
        scope: UniformScope,
        buffer: &BufferRef,
        size: u64,
    ) -> Result<BindGroupRef> {
        self.take_failure(FailPoint::BindGroup)?;
        let mut state = self.state.borrow_mut();
        state.bind_groups.push(BindGroupRecord {
            scope: Some(scope),
            entries: vec![Binding::Uniform { buffer: *buffer, size }],
        });
        Ok(BindGroupRef(state.bind_groups.len() - 1))
    }

    fn create_texture_bind_group(
        &self,
        sampler: &SamplerRef,
        views: [&ViewRef; MAX_TEXTURES],
    ) -> Result<BindGroupRef> {
        self.take_failure(FailPoint::BindGroup)?;
        let mut entries = Vec::with_capacity(MAX_TEXTURES + 1);
        entries.push(Binding::Sampler(*sampler));
        entries.extend(views.iter().map(|v| Binding::View(**v)));

        let mut state = self.state.borrow_mut();
        state.bind_groups.push(BindGroupRecord { scope: None, entries });
        Ok(BindGroupRef(state.bind_groups.len() - 1))
    }

    fn default_texture_view(&self) -> &ViewRef {
        &self.default_view
    }

    fn render_frame<R>(
        &self,
        clear: ClearColor,
        record: impl FnOnce(&mut dyn PassEncoder<Self>) -> R,
    ) -> Result<Option<R>> {
        if !self.surface_available.get() {
            log::warn!("surface unavailable; skipping frame");
            return Ok(None);
        }

        let mut pass = RecordingPass { commands: Vec::new() };
        let out = record(&mut pass);

        self.state.borrow_mut().frames.push(FrameRecord {
            clear,
            commands: pass.commands,
        });
        Ok(Some(out))
    }
}

struct RecordingPass {
    commands: Vec<PassCommand>,
}

impl PassEncoder<RecordingBackend> for RecordingPass {
    fn set_pipeline(&mut self, pipeline: &PipelineRef) {
        self.commands.push(PassCommand::SetPipeline(*pipeline));
    }

    fn set_bind_group(&mut self, index: u32, group: &BindGroupRef, offsets: &[u32]) {
        self.commands.push(PassCommand::SetBindGroup {
            index,
            group: *group,
            offsets: offsets.to_vec(),
        });
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: &BufferRef) {
        self.commands.push(PassCommand::SetVertexBuffer { slot, buffer: *buffer });
    }

    fn set_index_buffer(&mut self, buffer: &BufferRef) {
        self.commands.push(PassCommand::SetIndexBuffer(*buffer));
    }

    fn draw_indexed(&mut self, index_count: u32, instance_count: u32) {
        self.commands.push(PassCommand::DrawIndexed { index_count, instance_count });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injected_failure_fires_once() {
        let b = RecordingBackend::new();
        let desc = BufferDesc { label: "vbo", kind: BufferKind::Vertex, size: 48 };

        b.fail_next(FailPoint::Buffer);
        assert!(matches!(b.create_buffer(&desc), Err(Error::Backend(_))));
        assert!(b.create_buffer(&desc).is_ok());
        assert_eq!(b.buffer_count(), 1);
    }

    #[test]
    fn shader_without_entry_points_is_rejected() {
        let b = RecordingBackend::new();
        let desc = PipelineDesc { label: "bad", shader: "fn vs_main() {}" };
        assert!(matches!(b.create_pipeline(&desc), Err(Error::Backend(_))));
        assert_eq!(b.pipeline_count(), 0);
    }

    #[test]
    fn write_buffer_stores_bytes() {
        let b = RecordingBackend::new();
        let buf = b
            .create_buffer(&BufferDesc { label: "ubo", kind: BufferKind::Uniform, size: 8 })
            .unwrap();
        b.write_buffer(&buf, 4, &[1, 2, 3, 4]);
        assert_eq!(b.buffer(buf).data, vec![0, 0, 0, 0, 1, 2, 3, 4]);

        // Overflowing write is dropped.
        b.write_buffer(&buf, 6, &[9, 9, 9, 9]);
        assert_eq!(b.buffer(buf).data[6..], [3, 4]);
    }

    #[test]
    fn placeholder_texture_is_grey() {
        let b = RecordingBackend::new();
        let view = *b.default_texture_view();
        assert_eq!(b.texture(view).pixels, DEFAULT_TEXEL.to_vec());
        assert_eq!(b.texture_count(), 0);
    }

    #[test]
    fn unavailable_surface_skips_frame() {
        let b = RecordingBackend::new();
        b.set_surface_available(false);
        let out = b.render_frame(ClearColor::default(), |_| 1).unwrap();
        assert_eq!(out, None);
        assert!(b.frames().is_empty());
    }
}
