use crate::backend::{Backend, BufferDesc, BufferKind};
use crate::error::{Error, Result};
use crate::layout;
use crate::limits::INSTANCE_STRIDE;
use crate::pool::MaterialId;

/// Element counts of a mesh.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MeshCounts {
    pub vertices: u32,
    pub indices: u32,
    pub instances: u32,
}

/// Geometry buffers plus the CPU instance mirror uploaded every frame.
pub struct Mesh<B: Backend> {
    pub(crate) material: MaterialId,
    pub(crate) vertex_buffer: B::Buffer,
    pub(crate) index_buffer: B::Buffer,
    pub(crate) instance_buffer: B::Buffer,
    /// Instances the GPU buffer can hold.
    pub(crate) instance_capacity: u32,
    pub(crate) instances: Vec<u8>,
    pub(crate) counts: MeshCounts,
    label: String,
}

impl<B: Backend> Mesh<B> {
    /// Validates the host data, then creates and fills the three buffers.
    pub(crate) fn new(
        backend: &B,
        label: &str,
        material: MaterialId,
        vertices: &[u8],
        indices: &[u8],
        instances: &[u8],
    ) -> Result<Self> {
        let counts = MeshCounts {
            vertices: layout::vertex_count(vertices.len())?,
            indices: layout::index_count(indices.len())?,
            instances: layout::instance_count(instances.len())?,
        };
        if counts.vertices == 0 || counts.indices == 0 {
            return Err(Error::invalid_data("mesh needs at least one vertex and one index"));
        }

        let vertex_buffer =
            upload(backend, &format!("{label} vertices"), BufferKind::Vertex, vertices)?;
        let index_buffer =
            upload(backend, &format!("{label} indices"), BufferKind::Index, indices)?;

        let instance_capacity = counts.instances.max(1);
        let instance_buffer = instance_buffer(backend, label, instance_capacity)?;
        if !instances.is_empty() {
            backend.write_buffer(&instance_buffer, 0, instances);
        }

        Ok(Self {
            material,
            vertex_buffer,
            index_buffer,
            instance_buffer,
            instance_capacity,
            instances: instances.to_vec(),
            counts,
            label: label.to_owned(),
        })
    }

    /// Replaces the instance mirror, regrowing the GPU buffer if needed.
    ///
    /// The mesh is unchanged when validation or the regrow fails.
    pub(crate) fn set_instances(&mut self, backend: &B, instances: &[u8]) -> Result<()> {
        let count = layout::instance_count(instances.len())?;

        if count > self.instance_capacity {
            let capacity = count.checked_next_power_of_two().unwrap_or(count);
            self.instance_buffer = instance_buffer(backend, &self.label, capacity)?;
            self.instance_capacity = capacity;
            log::debug!("{}: instance buffer regrown to {capacity}", self.label);
        }

        self.instances.clear();
        self.instances.extend_from_slice(instances);
        self.counts.instances = count;
        Ok(())
    }

    /// Owning material.
    pub fn material(&self) -> MaterialId {
        self.material
    }

    pub fn counts(&self) -> MeshCounts {
        self.counts
    }

    pub fn instance_capacity(&self) -> u32 {
        self.instance_capacity
    }

    pub fn instances(&self) -> &[u8] {
        &self.instances
    }

    pub fn vertex_buffer(&self) -> &B::Buffer {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &B::Buffer {
        &self.index_buffer
    }

    pub fn instance_buffer(&self) -> &B::Buffer {
        &self.instance_buffer
    }
}

fn upload<B: Backend>(
    backend: &B,
    label: &str,
    kind: BufferKind,
    data: &[u8],
) -> Result<B::Buffer> {
    let buffer = backend.create_buffer(&BufferDesc {
        label,
        kind,
        size: data.len() as u64,
    })?;
    backend.write_buffer(&buffer, 0, data);
    Ok(buffer)
}

fn instance_buffer<B: Backend>(backend: &B, label: &str, capacity: u32) -> Result<B::Buffer> {
    backend.create_buffer(&BufferDesc {
        label: &format!("{label} instances"),
        kind: BufferKind::Vertex,
        size: capacity as u64 * INSTANCE_STRIDE as u64,
    })
}
