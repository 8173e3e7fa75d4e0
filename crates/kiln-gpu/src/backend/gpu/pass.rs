use crate::backend::PassEncoder;

use super::WgpuBackend;

/// Thin adapter from [`PassEncoder`] onto a live `wgpu::RenderPass`.
pub(crate) struct WgpuPass<'p> {
    pass: wgpu::RenderPass<'p>,
}

impl<'p> WgpuPass<'p> {
    pub(crate) fn new(pass: wgpu::RenderPass<'p>) -> Self {
        Self { pass }
    }
}

impl<'w> PassEncoder<WgpuBackend<'w>> for WgpuPass<'_> {
    fn set_pipeline(&mut self, pipeline: &wgpu::RenderPipeline) {
        self.pass.set_pipeline(pipeline);
    }

    fn set_bind_group(&mut self, index: u32, group: &wgpu::BindGroup, offsets: &[u32]) {
        self.pass.set_bind_group(index, group, offsets);
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: &wgpu::Buffer) {
        self.pass.set_vertex_buffer(slot, buffer.slice(..));
    }

    fn set_index_buffer(&mut self, buffer: &wgpu::Buffer) {
        self.pass.set_index_buffer(buffer.slice(..), wgpu::IndexFormat::Uint32);
    }

    fn draw_indexed(&mut self, index_count: u32, instance_count: u32) {
        self.pass.draw_indexed(0..index_count, 0, 0..instance_count);
    }
}
