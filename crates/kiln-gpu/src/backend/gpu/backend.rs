use std::num::NonZeroU64;

use anyhow::Context;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::backend::{
    Backend, BufferDesc, BufferKind, ClearColor, PassEncoder, PipelineDesc, TextureDesc,
    UniformScope,
};
use crate::error::{Error, Result};
use crate::layout::{Instance, Vertex};
use crate::limits::{texture_byte_len, DEFAULT_TEXEL, MAX_TEXTURES, TEXTURE_BYTES_PER_PIXEL};

use super::init::GpuInit;
use super::layouts::Layouts;
use super::pass::WgpuPass;
use super::surface::{
    choose_alpha_mode, choose_surface_format, map_surface_error, DepthTarget, SurfaceErrorAction,
    DEPTH_FORMAT,
};

/// Window-surface backend on a wgpu device.
///
/// Owns the device, the surface configuration, the three bind group layouts,
/// the placeholder texture and the depth target. The window must outlive it.
pub struct WgpuBackend<'w> {
    _instance: wgpu::Instance,
    surface: wgpu::Surface<'w>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    layouts: Layouts,
    _default_texture: wgpu::Texture,
    default_view: wgpu::TextureView,
    depth: DepthTarget,
}

impl<'w> WgpuBackend<'w> {
    /// Creates the device and surface for `window`.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(window: &'w Window, init: GpuInit) -> anyhow::Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("kiln device"),
                required_features: init.required_features,
                required_limits: init.required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&caps, init.prefer_srgb)
            .context("no supported surface formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: init.present_mode,
            alpha_mode: choose_alpha_mode(&caps, init.alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };
        surface.configure(&device, &config);

        let layouts = Layouts::new(&device);
        let (default_texture, default_view) = upload_texture(
            &device,
            &queue,
            &TextureDesc { label: "kiln default texture", width: 1, height: 1 },
            &DEFAULT_TEXEL,
        );
        let depth = DepthTarget::new(&device, size.width, size.height);

        log::info!(
            "wgpu backend ready: {} ({:?}), surface {format:?} {}x{}",
            adapter.get_info().name,
            adapter.get_info().backend,
            size.width,
            size.height
        );

        Ok(Self {
            _instance: instance,
            surface,
            adapter,
            device,
            queue,
            config,
            size,
            layouts,
            _default_texture: default_texture,
            default_view,
            depth,
        })
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Current drawable size (physical pixels).
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Reconfigures the surface and recreates the depth target.
    ///
    /// wgpu cannot configure a 0x0 surface; in that case only the stored size
    /// changes and frames are skipped until a non-zero size arrives.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.size = new_size;
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthTarget::new(&self.device, new_size.width, new_size.height);
        log::debug!("surface resized to {}x{}", new_size.width, new_size.height);
    }

    fn check_buffer_size(&self, label: &str, size: u64) -> Result<()> {
        let max = self.device.limits().max_buffer_size;
        if size == 0 || size > max {
            return Err(Error::backend(format!(
                "buffer `{label}` size {size} outside 1..={max}"
            )));
        }
        Ok(())
    }
}

impl<'w> Backend for WgpuBackend<'w> {
    type Buffer = wgpu::Buffer;
    type Texture = wgpu::Texture;
    type TextureView = wgpu::TextureView;
    type Sampler = wgpu::Sampler;
    type BindGroup = wgpu::BindGroup;
    type Pipeline = wgpu::RenderPipeline;

    fn create_pipeline(&self, desc: &PipelineDesc<'_>) -> Result<wgpu::RenderPipeline> {
        for entry in ["vs_main", "fs_main"] {
            if !desc.shader.contains(&format!("fn {entry}")) {
                return Err(Error::backend(format!(
                    "shader `{}` has no `{entry}` entry point",
                    desc.label
                )));
            }
        }

        let shader = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.label),
            source: wgpu::ShaderSource::Wgsl(desc.shader.into()),
        });

        let layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(desc.label),
            bind_group_layouts: &[
                &self.layouts.global,
                &self.layouts.material,
                &self.layouts.textures,
            ],
            immediate_size: 0,
        });

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(desc.label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[Vertex::layout(), Instance::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.config.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Cw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("compiled pipeline `{}`", desc.label);
        Ok(pipeline)
    }

    fn create_buffer(&self, desc: &BufferDesc<'_>) -> Result<wgpu::Buffer> {
        self.check_buffer_size(desc.label, desc.size)?;
        let usage = match desc.kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
            BufferKind::Uniform => wgpu::BufferUsages::UNIFORM,
        };
        Ok(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size: desc.size,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }))
    }

    fn write_buffer(&self, buffer: &wgpu::Buffer, offset: u64, data: &[u8]) {
        self.queue.write_buffer(buffer, offset, data);
    }

    fn create_texture(
        &self,
        desc: &TextureDesc<'_>,
        pixels: &[u8],
    ) -> Result<(wgpu::Texture, wgpu::TextureView)> {
        let max = self.device.limits().max_texture_dimension_2d;
        if desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max {
            return Err(Error::backend(format!(
                "texture `{}` size {}x{} outside 1..={max}",
                desc.label, desc.width, desc.height
            )));
        }
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
        Ok(upload_texture(&self.device, &self.queue, desc, pixels))
    }

    fn create_sampler(&self, label: &str) -> Result<wgpu::Sampler> {
        Ok(self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        }))
    }

    fn create_uniform_bind_group(
        &self,
        scope: UniformScope,
        buffer: &wgpu::Buffer,
        size: u64,
    ) -> Result<wgpu::BindGroup> {
        let (layout, label) = match scope {
            UniformScope::Global => (&self.layouts.global, "kiln global uniforms"),
            UniformScope::Material => (&self.layouts.material, "kiln material uniforms"),
        };
        let size = NonZeroU64::new(size)
            .ok_or_else(|| Error::backend(format!("{label}: zero-size binding")))?;

        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: 0,
                    size: Some(size),
                }),
            }],
        }))
    }

    fn create_texture_bind_group(
        &self,
        sampler: &wgpu::Sampler,
        views: [&wgpu::TextureView; MAX_TEXTURES],
    ) -> Result<wgpu::BindGroup> {
        let mut entries = Vec::with_capacity(MAX_TEXTURES + 1);
        entries.push(wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Sampler(sampler),
        });
        entries.extend(views.into_iter().zip(1u32..).map(|(view, binding)| wgpu::BindGroupEntry {
            binding,
            resource: wgpu::BindingResource::TextureView(view),
        }));

        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("kiln texture set"),
            layout: &self.layouts.textures,
            entries: &entries,
        }))
    }

    fn default_texture_view(&self) -> &wgpu::TextureView {
        &self.default_view
    }

    fn render_frame<R>(
        &self,
        clear: ClearColor,
        record: impl FnOnce(&mut dyn PassEncoder<Self>) -> R,
    ) -> Result<Option<R>> {
        if self.size.width == 0 || self.size.height == 0 {
            return Ok(None);
        }

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(err) => {
                let action =
                    map_surface_error(&self.surface, &self.device, &self.config, self.size, &err);
                return match action {
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => {
                        log::warn!("surface error ({err}); frame skipped");
                        Ok(None)
                    }
                    SurfaceErrorAction::Fatal => {
                        log::error!("fatal surface error: {err}");
                        Err(Error::backend(format!("surface: {err}")))
                    }
                };
            }
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("kiln frame encoder"),
            });

        let out = {
            let rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("kiln frame pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear.r,
                            g: clear.g,
                            b: clear.b,
                            a: clear.a,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            let mut pass = WgpuPass::new(rpass);
            record(&mut pass)
        };

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(Some(out))
    }
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    desc: &TextureDesc<'_>,
    pixels: &[u8],
) -> (wgpu::Texture, wgpu::TextureView) {
    let size = wgpu::Extent3d {
        width: desc.width,
        height: desc.height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(desc.label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(desc.width * TEXTURE_BYTES_PER_PIXEL as u32),
            rows_per_image: Some(desc.height),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}
