use crate::backend::{Backend, BufferDesc, BufferKind, PipelineDesc, UniformScope};
use crate::error::{Resource, Result};
use crate::limits::{
    GLOBAL_UNIFORM_CAPACITY, MATERIAL_UNIFORM_BUFFER_SIZE, MATERIAL_UNIFORM_CAPACITY,
};
use crate::pool::MaterialId;
use crate::uniform::UniformArena;

/// A compiled shader program and the uniform storage shared by its materials.
///
/// The material buffer holds one `MATERIAL_UNIFORM_CAPACITY` region per material
/// slot, addressed by the material's pool index, so one dynamic-offset bind
/// group serves every material of the pipeline.
pub struct Pipeline<B: Backend> {
    pub(crate) pipeline: B::Pipeline,
    pub(crate) globals: UniformArena,
    pub(crate) global_buffer: B::Buffer,
    pub(crate) global_bind_group: B::BindGroup,
    pub(crate) material_buffer: B::Buffer,
    pub(crate) material_bind_group: B::BindGroup,
    pub(crate) materials: Vec<MaterialId>,
}

impl<B: Backend> Pipeline<B> {
    pub(crate) fn new(backend: &B, label: &str, shader: &str) -> Result<Self> {
        let pipeline = backend.create_pipeline(&PipelineDesc { label, shader })?;

        let global_buffer = backend.create_buffer(&BufferDesc {
            label: &format!("{label} globals"),
            kind: BufferKind::Uniform,
            size: GLOBAL_UNIFORM_CAPACITY as u64,
        })?;
        let global_bind_group = backend.create_uniform_bind_group(
            UniformScope::Global,
            &global_buffer,
            GLOBAL_UNIFORM_CAPACITY as u64,
        )?;

        let material_buffer = backend.create_buffer(&BufferDesc {
            label: &format!("{label} materials"),
            kind: BufferKind::Uniform,
            size: MATERIAL_UNIFORM_BUFFER_SIZE as u64,
        })?;
        // Binds one material-sized window; the offset picks the material.
        let material_bind_group = backend.create_uniform_bind_group(
            UniformScope::Material,
            &material_buffer,
            MATERIAL_UNIFORM_CAPACITY as u64,
        )?;

        Ok(Self {
            pipeline,
            globals: UniformArena::new(Resource::GlobalUniforms, GLOBAL_UNIFORM_CAPACITY),
            global_buffer,
            global_bind_group,
            material_buffer,
            material_bind_group,
            materials: Vec::new(),
        })
    }

    /// Materials in creation order.
    pub fn materials(&self) -> &[MaterialId] {
        &self.materials
    }

    pub fn globals(&self) -> &UniformArena {
        &self.globals
    }

    pub fn global_buffer(&self) -> &B::Buffer {
        &self.global_buffer
    }

    pub fn material_buffer(&self) -> &B::Buffer {
        &self.material_buffer
    }
}
