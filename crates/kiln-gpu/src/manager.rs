use crate::backend::{Backend, ClearColor, TextureDesc};
use crate::error::{Error, Resource, Result};
use crate::limits::{texture_byte_len, MAX_MATERIALS, MAX_MESHES, MAX_PIPELINES};
use crate::pool::{MaterialId, MeshId, PipelineId, SlotPool};
use crate::resources::{Material, Mesh, MeshCounts, Pipeline};
use crate::scheduler::{FrameDrawScheduler, FrameReport};

/// Owns the GPU backend and every pipeline, material and mesh created on it.
///
/// Ownership is a tree: pipelines list their materials, materials list their
/// meshes. Creation validates handles and capacity first and only claims a slot
/// once every backend object exists, so a failed call leaves no trace in the
/// pools.
pub struct ResourceManager<B: Backend> {
    backend: B,
    pub(crate) pipelines: SlotPool<Pipeline<B>>,
    pub(crate) materials: SlotPool<Material<B>>,
    pub(crate) meshes: SlotPool<Mesh<B>>,
    clear_color: ClearColor,
}

impl<B: Backend> ResourceManager<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            pipelines: SlotPool::new(Resource::Pipeline, MAX_PIPELINES),
            materials: SlotPool::new(Resource::Material, MAX_MATERIALS),
            meshes: SlotPool::new(Resource::Mesh, MAX_MESHES),
            clear_color: ClearColor::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable backend access for surface maintenance (resize, reconfigure).
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn clear_color(&self) -> ClearColor {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: ClearColor) {
        self.clear_color = color;
    }

    // ── creation ──────────────────────────────────────────────────────────

    /// Compiles `shader` into a pipeline with its uniform buffers.
    pub fn create_pipeline(&mut self, shader: &str) -> Result<PipelineId> {
        let index = self
            .pipelines
            .require_free()
            .inspect_err(|e| log::warn!("create_pipeline: {e}"))?;

        let pipeline = Pipeline::new(&self.backend, &format!("kiln pipeline {index}"), shader)
            .inspect_err(|e| log::warn!("create_pipeline: {e}"))?;

        let id = PipelineId(self.pipelines.acquire(pipeline)?);
        log::debug!("created {id}");
        Ok(id)
    }

    /// Creates a material under `pipeline` with all texture slots on the placeholder.
    pub fn create_material(&mut self, pipeline: PipelineId) -> Result<MaterialId> {
        self.pipelines
            .get(pipeline.0)
            .inspect_err(|e| log::warn!("create_material: {e}"))?;
        let index = self
            .materials
            .require_free()
            .inspect_err(|e| log::warn!("create_material: {e}"))?;

        let material = Material::new(&self.backend, &format!("kiln material {index}"), pipeline)
            .inspect_err(|e| log::warn!("create_material: {e}"))?;

        let id = MaterialId(self.materials.acquire(material)?);
        self.pipelines.get_mut(pipeline.0)?.materials.push(id);
        log::debug!("created {id} under {pipeline}");
        Ok(id)
    }

    /// Creates a mesh under `material` from raw vertex, index and instance bytes.
    ///
    /// Lengths must be whole multiples of `VERTEX_STRIDE`, `INDEX_SIZE` and
    /// `INSTANCE_STRIDE`; vertex and index data must be non-empty.
    pub fn create_mesh(
        &mut self,
        material: MaterialId,
        vertices: &[u8],
        indices: &[u8],
        instances: &[u8],
    ) -> Result<MeshId> {
        self.materials
            .get(material.0)
            .inspect_err(|e| log::warn!("create_mesh: {e}"))?;
        let index = self
            .meshes
            .require_free()
            .inspect_err(|e| log::warn!("create_mesh: {e}"))?;

        let mesh = Mesh::new(
            &self.backend,
            &format!("kiln mesh {index}"),
            material,
            vertices,
            indices,
            instances,
        )
        .inspect_err(|e| log::warn!("create_mesh: {e}"))?;

        let id = MeshId(self.meshes.acquire(mesh)?);
        self.materials.get_mut(material.0)?.meshes.push(id);
        log::debug!("created {id} under {material}");
        Ok(id)
    }

    /// Uploads an RGBA8 image into the material's next texture slot.
    ///
    /// Returns the slot index. Checks capacity before anything is uploaded.
    pub fn attach_texture(
        &mut self,
        material: MaterialId,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<usize> {
        self.try_attach_texture(material, pixels, width, height)
            .inspect_err(|e| log::warn!("attach_texture: {e}"))
    }

    /// Same as [`attach_texture`](Self::attach_texture), addressed through a mesh.
    pub fn attach_mesh_texture(
        &mut self,
        mesh: MeshId,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<usize> {
        let material = self
            .meshes
            .get(mesh.0)
            .inspect_err(|e| log::warn!("attach_mesh_texture: {e}"))?
            .material;
        self.attach_texture(material, pixels, width, height)
    }

    fn try_attach_texture(
        &mut self,
        material: MaterialId,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<usize> {
        if width == 0 || height == 0 {
            return Err(Error::invalid_data(format!("texture size {width}x{height}")));
        }
        let expected = texture_byte_len(width, height).ok_or_else(|| {
            Error::invalid_data(format!("texture size {width}x{height} overflows"))
        })?;
        if pixels.len() != expected {
            return Err(Error::invalid_data(format!(
                "{width}x{height} texture needs {expected} bytes, got {}",
                pixels.len()
            )));
        }

        let record = self.materials.get_mut(material.0)?;
        if record.textures.is_full() {
            return Err(Error::CapacityExceeded { resource: Resource::TextureSlot });
        }

        let label = format!("{material} texture {}", record.textures.len());
        let (texture, view) = self
            .backend
            .create_texture(&TextureDesc { label: &label, width, height }, pixels)?;
        let slot = record.textures.attach(&self.backend, texture, view)?;
        log::debug!("attached {width}x{height} texture to {material} slot {slot}");
        Ok(slot)
    }

    // ── uniforms ──────────────────────────────────────────────────────────

    /// Appends `bytes` to the pipeline's global arena and returns their offset.
    pub fn add_global_uniform(&mut self, pipeline: PipelineId, bytes: &[u8]) -> Result<usize> {
        self.pipelines
            .get_mut(pipeline.0)
            .and_then(|p| p.globals.push(bytes))
            .inspect_err(|e| log::warn!("add_global_uniform: {e}"))
    }

    pub fn set_global_uniform(
        &mut self,
        pipeline: PipelineId,
        offset: usize,
        bytes: &[u8],
    ) -> Result<()> {
        self.pipelines
            .get_mut(pipeline.0)
            .and_then(|p| p.globals.write(offset, bytes))
            .inspect_err(|e| log::warn!("set_global_uniform: {e}"))
    }

    pub fn global_uniform(&self, pipeline: PipelineId, offset: usize, len: usize) -> Result<&[u8]> {
        self.pipelines
            .get(pipeline.0)
            .and_then(|p| p.globals.read(offset, len))
            .inspect_err(|e| log::warn!("global_uniform: {e}"))
    }

    /// Appends `bytes` to the material's local arena and returns their offset.
    pub fn add_material_uniform(&mut self, material: MaterialId, bytes: &[u8]) -> Result<usize> {
        self.materials
            .get_mut(material.0)
            .and_then(|m| m.uniforms.push(bytes))
            .inspect_err(|e| log::warn!("add_material_uniform: {e}"))
    }

    pub fn set_material_uniform(
        &mut self,
        material: MaterialId,
        offset: usize,
        bytes: &[u8],
    ) -> Result<()> {
        self.materials
            .get_mut(material.0)
            .and_then(|m| m.uniforms.write(offset, bytes))
            .inspect_err(|e| log::warn!("set_material_uniform: {e}"))
    }

    pub fn material_uniform(
        &self,
        material: MaterialId,
        offset: usize,
        len: usize,
    ) -> Result<&[u8]> {
        self.materials
            .get(material.0)
            .and_then(|m| m.uniforms.read(offset, len))
            .inspect_err(|e| log::warn!("material_uniform: {e}"))
    }

    // ── instances / teardown ──────────────────────────────────────────────

    /// Replaces the mesh's instance data. An empty slice stops it from drawing.
    pub fn set_instances(&mut self, mesh: MeshId, instances: &[u8]) -> Result<()> {
        let backend = &self.backend;
        self.meshes
            .get_mut(mesh.0)
            .and_then(|m| m.set_instances(backend, instances))
            .inspect_err(|e| log::warn!("set_instances: {e}"))
    }

    /// Frees the mesh slot and unlinks it from its material.
    pub fn destroy_mesh(&mut self, mesh: MeshId) -> Result<()> {
        let record = self
            .meshes
            .release(mesh.0)
            .inspect_err(|e| log::warn!("destroy_mesh: {e}"))?;
        if let Ok(material) = self.materials.get_mut(record.material.0) {
            material.meshes.retain(|m| *m != mesh);
        }
        log::debug!("destroyed {mesh}");
        Ok(())
    }

    /// Frees the material, every mesh under it, and unlinks it from its pipeline.
    pub fn destroy_material(&mut self, material: MaterialId) -> Result<()> {
        let record = self
            .materials
            .release(material.0)
            .inspect_err(|e| log::warn!("destroy_material: {e}"))?;
        for mesh in &record.meshes {
            // Meshes listed by a live material are always live.
            self.meshes.release(mesh.0)?;
        }
        if let Ok(pipeline) = self.pipelines.get_mut(record.pipeline.0) {
            pipeline.materials.retain(|m| *m != material);
        }
        log::debug!("destroyed {material} and {} meshes", record.meshes.len());
        Ok(())
    }

    // ── introspection ─────────────────────────────────────────────────────

    pub fn pipeline(&self, id: PipelineId) -> Result<&Pipeline<B>> {
        self.pipelines.get(id.0)
    }

    pub fn material(&self, id: MaterialId) -> Result<&Material<B>> {
        self.materials.get(id.0)
    }

    pub fn mesh(&self, id: MeshId) -> Result<&Mesh<B>> {
        self.meshes.get(id.0)
    }

    pub fn pipeline_materials(&self, id: PipelineId) -> Result<&[MaterialId]> {
        Ok(self.pipeline(id)?.materials())
    }

    pub fn material_meshes(&self, id: MaterialId) -> Result<&[MeshId]> {
        Ok(self.material(id)?.meshes())
    }

    pub fn texture_count(&self, id: MaterialId) -> Result<usize> {
        Ok(self.material(id)?.textures().len())
    }

    pub fn mesh_counts(&self, id: MeshId) -> Result<MeshCounts> {
        Ok(self.mesh(id)?.counts())
    }

    pub fn free_pipelines(&self) -> usize {
        self.pipelines.free_count()
    }

    pub fn free_materials(&self) -> usize {
        self.materials.free_count()
    }

    pub fn free_meshes(&self) -> usize {
        self.meshes.free_count()
    }

    // ── frame ─────────────────────────────────────────────────────────────

    /// Draws every live mesh once. See [`FrameDrawScheduler`].
    pub fn draw_frame(&self) -> Result<FrameReport> {
        FrameDrawScheduler::new(self).draw_frame()
    }
}
