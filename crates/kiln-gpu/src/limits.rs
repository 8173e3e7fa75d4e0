//! Fixed capacities and layout constants.
//!
//! Every pool, arena and GPU buffer in the crate is sized from these values at
//! startup and never resized. The strides are part of the host data contract and
//! must stay bit-exact with the shaders that consume them.

/// Number of pipeline slots.
pub const MAX_PIPELINES: usize = 2;

/// Number of material slots (shared by all pipelines).
pub const MAX_MATERIALS: usize = 64;

/// Number of mesh slots (shared by all materials).
pub const MAX_MESHES: usize = 128;

/// Texture bindings per material, excluding the sampler.
pub const MAX_TEXTURES: usize = 4;

/// Bytes in each pipeline's global uniform buffer.
pub const GLOBAL_UNIFORM_CAPACITY: usize = 1024;

/// Bytes in each material's uniform region.
///
/// Also the stride between materials in a pipeline's shared material buffer, so
/// it must be a multiple of the device's `min_uniform_buffer_offset_alignment`
/// (256 under default limits).
pub const MATERIAL_UNIFORM_CAPACITY: usize = 256;

/// Total bytes of a pipeline's shared material uniform buffer.
pub const MATERIAL_UNIFORM_BUFFER_SIZE: usize = MATERIAL_UNIFORM_CAPACITY * MAX_MATERIALS;

/// Bytes per vertex.
pub const VERTEX_STRIDE: usize = 48;

/// Bytes per instance.
pub const INSTANCE_STRIDE: usize = 96;

/// Bytes per index (`u32`).
pub const INDEX_SIZE: usize = 4;

/// Bytes per texel of attached textures (RGBA8 unorm).
pub const TEXTURE_BYTES_PER_PIXEL: usize = 4;

/// Texel value of the placeholder bound to unfilled texture slots.
pub const DEFAULT_TEXEL: [u8; 4] = [127, 127, 127, 127];

/// Byte offset of material `index` inside its pipeline's shared material buffer.
#[inline]
pub const fn material_uniform_offset(index: u32) -> u32 {
    index * MATERIAL_UNIFORM_CAPACITY as u32
}

/// Bytes of a `width`×`height` RGBA8 image, or `None` if that overflows `usize`.
pub fn texture_byte_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(TEXTURE_BYTES_PER_PIXEL)
}

// The shared buffer must be addressable with 32-bit dynamic offsets.
const _: () = assert!(MATERIAL_UNIFORM_BUFFER_SIZE <= u32::MAX as usize);
const _: () = assert!(MATERIAL_UNIFORM_CAPACITY % 256 == 0);
