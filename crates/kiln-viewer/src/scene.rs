use kiln_gpu::backend::Backend;
use kiln_gpu::layout::{Instance, Vertex};
use kiln_gpu::{MaterialId, MeshId, PipelineId, ResourceManager, Result};

const SHADER: &str = include_str!("shaders/scene.wgsl");

const CHECKER_SIZE: u32 = 64;
const CHECKER_CELL: u32 = 8;

/// Handles and uniform offsets of the demo scene.
#[derive(Debug, Copy, Clone)]
pub struct Scene {
    pub pipeline: PipelineId,
    pub material: MaterialId,
    pub mesh: MeshId,
    time: usize,
}

impl Scene {
    /// One pipeline, one checkered material, one triangle drawn three times.
    pub fn build<B: Backend>(manager: &mut ResourceManager<B>) -> Result<Self> {
        let pipeline = manager.create_pipeline(SHADER)?;
        let _brightness = manager.add_global_uniform(pipeline, &1.0f32.to_le_bytes())?;
        let time = manager.add_global_uniform(pipeline, &0.0f32.to_le_bytes())?;

        let material = manager.create_material(pipeline)?;
        let tint: [f32; 4] = [1.0, 0.85, 0.6, 1.0];
        manager.add_material_uniform(material, bytemuck::cast_slice(&tint))?;
        manager.attach_texture(
            material,
            &checker(CHECKER_SIZE, CHECKER_CELL),
            CHECKER_SIZE,
            CHECKER_SIZE,
        )?;

        // Clockwise, matching the pipeline's front face.
        let vertices = [
            Vertex { uv: [u16::MAX / 2, 0], ..Vertex::at([0.0, 0.5, 0.0]) },
            Vertex { uv: [u16::MAX, u16::MAX], ..Vertex::at([0.5, -0.5, 0.0]) },
            Vertex { uv: [0, u16::MAX], ..Vertex::at([-0.5, -0.5, 0.0]) },
        ];
        let indices: [u32; 3] = [0, 1, 2];
        let instances = [
            Instance::translated(-0.5, 0.0, 0.0),
            Instance::translated(0.0, 0.0, 0.0),
            Instance::translated(0.5, 0.0, 0.0),
        ];
        let mesh = manager.create_mesh(
            material,
            bytemuck::cast_slice(&vertices),
            bytemuck::cast_slice(&indices),
            bytemuck::cast_slice(&instances),
        )?;

        Ok(Self { pipeline, material, mesh, time })
    }

    /// Writes the animation time into the global mirror.
    pub fn update<B: Backend>(&self, manager: &mut ResourceManager<B>, elapsed: f32) -> Result<()> {
        manager.set_global_uniform(self.pipeline, self.time, &elapsed.to_le_bytes())
    }
}

/// `size`×`size` RGBA8 checkerboard with `cell`-pixel squares.
pub fn checker(size: u32, cell: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let on = ((x / cell) + (y / cell)) % 2 == 0;
            let v = if on { 230 } else { 40 };
            pixels.extend_from_slice(&[v, v, v, 255]);
        }
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_gpu::backend::recording::RecordingBackend;

    #[test]
    fn checker_alternates_cells() {
        let px = checker(4, 2);
        assert_eq!(px.len(), 4 * 4 * 4);
        assert_eq!(px[0], 230);
        // (2, 0) is the next cell over.
        assert_eq!(px[2 * 4], 40);
        // (2, 2) is back on.
        assert_eq!(px[(2 * 4 + 2) * 4], 230);
    }

    #[test]
    fn scene_builds_and_animates_headless() {
        let mut m = ResourceManager::new(RecordingBackend::new());
        let scene = Scene::build(&mut m).unwrap();

        assert_eq!(m.texture_count(scene.material).unwrap(), 1);
        assert_eq!(m.mesh_counts(scene.mesh).unwrap().instances, 3);

        scene.update(&mut m, 1.25).unwrap();
        assert_eq!(m.global_uniform(scene.pipeline, 4, 4).unwrap(), &1.25f32.to_le_bytes());

        let report = m.draw_frame().unwrap();
        assert_eq!(report.draw_calls, 1);
        assert_eq!(m.backend().frames()[0].draws().collect::<Vec<_>>(), vec![(3, 3)]);
    }
}
