use crate::backend::Backend;
use crate::error::{Resource, Result};
use crate::limits::MATERIAL_UNIFORM_CAPACITY;
use crate::pool::{MeshId, PipelineId};
use crate::uniform::UniformArena;

use super::TextureSet;

/// Per-material uniforms and textures, plus the meshes drawn with them.
pub struct Material<B: Backend> {
    pub(crate) pipeline: PipelineId,
    pub(crate) uniforms: UniformArena,
    pub(crate) textures: TextureSet<B>,
    pub(crate) meshes: Vec<MeshId>,
}

impl<B: Backend> Material<B> {
    pub(crate) fn new(backend: &B, label: &str, pipeline: PipelineId) -> Result<Self> {
        Ok(Self {
            pipeline,
            uniforms: UniformArena::new(Resource::MaterialUniforms, MATERIAL_UNIFORM_CAPACITY),
            textures: TextureSet::new(backend, label)?,
            meshes: Vec::new(),
        })
    }

    /// Owning pipeline.
    pub fn pipeline(&self) -> PipelineId {
        self.pipeline
    }

    pub fn meshes(&self) -> &[MeshId] {
        &self.meshes
    }

    pub fn uniforms(&self) -> &UniformArena {
        &self.uniforms
    }

    pub fn textures(&self) -> &TextureSet<B> {
        &self.textures
    }
}
