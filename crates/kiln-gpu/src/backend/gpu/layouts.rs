use std::num::NonZeroU64;

use crate::limits::{GLOBAL_UNIFORM_CAPACITY, MATERIAL_UNIFORM_CAPACITY, MAX_TEXTURES};

/// The three bind group layouts every pipeline is built against.
pub(crate) struct Layouts {
    /// Group 0: pipeline globals.
    pub(crate) global: wgpu::BindGroupLayout,
    /// Group 1: one material window, dynamic offset.
    pub(crate) material: wgpu::BindGroupLayout,
    /// Group 2: sampler + `MAX_TEXTURES` views.
    pub(crate) textures: wgpu::BindGroupLayout,
}

impl Layouts {
    pub(crate) fn new(device: &wgpu::Device) -> Self {
        let global = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("kiln global uniforms bgl"),
            entries: &[uniform_entry(false, GLOBAL_UNIFORM_CAPACITY)],
        });

        let material = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("kiln material uniforms bgl"),
            entries: &[uniform_entry(true, MATERIAL_UNIFORM_CAPACITY)],
        });

        let mut entries = Vec::with_capacity(MAX_TEXTURES + 1);
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
        entries.extend((1..=MAX_TEXTURES as u32).map(|binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        }));
        let textures = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("kiln texture set bgl"),
            entries: &entries,
        });

        Self { global, material, textures }
    }
}

fn uniform_entry(dynamic: bool, size: usize) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: NonZeroU64::new(size as u64),
        },
        count: None,
    }
}
