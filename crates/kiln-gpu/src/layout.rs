//! Host-visible vertex and instance formats.

use bytemuck::{Pod, Zeroable};

use crate::error::{Error, Result};
use crate::limits::{INDEX_SIZE, INSTANCE_STRIDE, VERTEX_STRIDE};

// ── vertex ────────────────────────────────────────────────────────────────

/// Vertex layout (48 bytes, step = vertex):
///
///  offset  0  data          [u32; 4]  loc 0  uint32x4
///  offset 16  position      [f32; 3]  loc 1  float32x3
///  offset 28  normal        [u8; 4]   loc 2  unorm8x4
///  offset 32  tangent       [u8; 4]   loc 3  unorm8x4
///  offset 36  uv            [u16; 2]  loc 4  unorm16x2
///  offset 40  bone_weights  [u8; 4]   loc 5  unorm8x4
///  offset 44  bone_indices  [u8; 4]   loc 6  uint8x4
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub data: [u32; 4],
    pub position: [f32; 3],
    pub normal: [u8; 4],
    pub tangent: [u8; 4],
    pub uv: [u16; 2],
    pub bone_weights: [u8; 4],
    pub bone_indices: [u8; 4],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 7] = wgpu::vertex_attr_array![
        0 => Uint32x4,  // data
        1 => Float32x3, // position
        2 => Unorm8x4,  // normal
        3 => Unorm8x4,  // tangent
        4 => Unorm16x2, // uv
        5 => Unorm8x4,  // bone weights
        6 => Uint8x4    // bone indices
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: VERTEX_STRIDE as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }

    /// Vertex at `position` with every other attribute zeroed.
    pub fn at(position: [f32; 3]) -> Self {
        Self { position, ..Self::default() }
    }
}

// ── instance ──────────────────────────────────────────────────────────────

/// Instance layout (96 bytes, step = instance):
///
///  offset  0  transform  [f32; 16]  loc 7..10  float32x4 columns
///  offset 64  data       [u32; 3]   loc 11     uint32x3
///  offset 76  norms      [u16; 4]   loc 12     unorm16x4
///  offset 84  animation  u32        loc 13     uint32
///  offset 88  frame      f32        loc 14     float32
///  offset 92  atlas_uv   [u16; 2]   loc 15     unorm16x2
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Instance {
    pub transform: [f32; 16],
    pub data: [u32; 3],
    pub norms: [u16; 4],
    pub animation: u32,
    pub frame: f32,
    pub atlas_uv: [u16; 2],
}

impl Instance {
    const ATTRS: [wgpu::VertexAttribute; 9] = wgpu::vertex_attr_array![
        7 => Float32x4,  // transform col 0
        8 => Float32x4,  // transform col 1
        9 => Float32x4,  // transform col 2
        10 => Float32x4, // transform col 3
        11 => Uint32x3,  // data
        12 => Unorm16x4, // norms
        13 => Uint32,    // animation
        14 => Float32,   // frame
        15 => Unorm16x2  // atlas uv
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: INSTANCE_STRIDE as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }

    /// Instance with a translation-only column-major transform.
    pub fn translated(x: f32, y: f32, z: f32) -> Self {
        let mut transform = IDENTITY;
        transform[12] = x;
        transform[13] = y;
        transform[14] = z;
        Self { transform, ..Self::default() }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self {
            transform: IDENTITY,
            data: [0; 3],
            norms: [0; 4],
            animation: 0,
            frame: 0.0,
            atlas_uv: [0; 2],
        }
    }
}

const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

const _: () = assert!(std::mem::size_of::<Vertex>() == VERTEX_STRIDE);
const _: () = assert!(std::mem::size_of::<Instance>() == INSTANCE_STRIDE);

// ── byte-length validation ────────────────────────────────────────────────

/// Number of `stride`-sized elements in `len` bytes.
///
/// Fails with `InvalidData` when `len` is not a whole multiple of `stride`.
pub(crate) fn element_count(len: usize, stride: usize, what: &str) -> Result<u32> {
    if len % stride != 0 {
        return Err(Error::invalid_data(format!(
            "{what} data is {len} bytes, not a multiple of {stride}"
        )));
    }
    u32::try_from(len / stride)
        .map_err(|_| Error::invalid_data(format!("{what} count does not fit in u32")))
}

pub(crate) fn vertex_count(len: usize) -> Result<u32> {
    element_count(len, VERTEX_STRIDE, "vertex")
}

pub(crate) fn index_count(len: usize) -> Result<u32> {
    element_count(len, INDEX_SIZE, "index")
}

pub(crate) fn instance_count(len: usize) -> Result<u32> {
    element_count(len, INSTANCE_STRIDE, "instance")
}
