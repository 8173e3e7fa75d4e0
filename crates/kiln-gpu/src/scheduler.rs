use crate::backend::{Backend, PassEncoder};
use crate::error::Result;
use crate::limits::material_uniform_offset;
use crate::manager::ResourceManager;

/// Summary of one `draw_frame` call.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct FrameReport {
    /// `false` when the surface had no image and nothing was recorded.
    pub presented: bool,
    pub pipelines: usize,
    pub materials: usize,
    /// Meshes that issued a draw.
    pub meshes: usize,
    pub draw_calls: usize,
    pub bytes_uploaded: usize,
}

/// Walks the pipeline → material → mesh tree and records one frame.
///
/// Per pipeline, in slot order: bind the pipeline, upload the whole global
/// mirror, bind group 0. Per material, in list order: upload its mirror at
/// `index * MATERIAL_UNIFORM_CAPACITY`, bind group 1 at that dynamic offset,
/// bind group 2 (textures). Per mesh, in list order: upload instances, bind
/// vertex slot 0, instance slot 1 and the `u32` index buffer, draw.
pub struct FrameDrawScheduler<'a, B: Backend> {
    manager: &'a ResourceManager<B>,
}

impl<'a, B: Backend> FrameDrawScheduler<'a, B> {
    pub fn new(manager: &'a ResourceManager<B>) -> Self {
        Self { manager }
    }

    pub fn draw_frame(&self) -> Result<FrameReport> {
        let backend = self.manager.backend();
        let report = backend.render_frame(self.manager.clear_color(), |pass| self.record(pass))?;

        Ok(report.unwrap_or_default())
    }

    fn record(&self, pass: &mut dyn PassEncoder<B>) -> FrameReport {
        let backend = self.manager.backend();
        let mut report = FrameReport {
            presented: true,
            ..FrameReport::default()
        };

        for (_, pipeline) in self.manager.pipelines.iter() {
            pass.set_pipeline(&pipeline.pipeline);

            let globals = pipeline.globals.bytes();
            backend.write_buffer(&pipeline.global_buffer, 0, globals);
            report.bytes_uploaded += globals.len();
            pass.set_bind_group(0, &pipeline.global_bind_group, &[]);
            report.pipelines += 1;

            for &material_id in &pipeline.materials {
                let Ok(material) = self.manager.materials.get(material_id.index()) else {
                    continue;
                };

                let offset = material_uniform_offset(material_id.index());
                let uniforms = material.uniforms.bytes();
                backend.write_buffer(&pipeline.material_buffer, offset as u64, uniforms);
                report.bytes_uploaded += uniforms.len();

                pass.set_bind_group(1, &pipeline.material_bind_group, &[offset]);
                pass.set_bind_group(2, material.textures.bind_group(), &[]);
                report.materials += 1;

                for &mesh_id in &material.meshes {
                    let Ok(mesh) = self.manager.meshes.get(mesh_id.index()) else {
                        continue;
                    };
                    if mesh.counts.instances == 0 {
                        continue;
                    }

                    backend.write_buffer(&mesh.instance_buffer, 0, &mesh.instances);
                    report.bytes_uploaded += mesh.instances.len();

                    pass.set_vertex_buffer(0, &mesh.vertex_buffer);
                    pass.set_vertex_buffer(1, &mesh.instance_buffer);
                    pass.set_index_buffer(&mesh.index_buffer);
                    pass.draw_indexed(mesh.counts.indices, mesh.counts.instances);
                    report.meshes += 1;
                    report.draw_calls += 1;
                }
            }
        }

        log::trace!("frame recorded: {report:?}");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{Binding, PassCommand, RecordingBackend};
    use crate::backend::ClearColor;
    use crate::layout::{Instance, Vertex};
    use crate::limits::{GLOBAL_UNIFORM_CAPACITY, MATERIAL_UNIFORM_CAPACITY, MAX_TEXTURES};
    use crate::pool::{MaterialId, MeshId, PipelineId};

    const SHADER: &str = "fn vs_main() {} fn fs_main() {}";

    fn triangle(
        m: &mut ResourceManager<RecordingBackend>,
        material: MaterialId,
        instances: usize,
    ) -> MeshId {
        let vertices = [
            Vertex::at([0.0, 0.5, 0.0]),
            Vertex::at([0.5, -0.5, 0.0]),
            Vertex::at([-0.5, -0.5, 0.0]),
        ];
        let indices: [u32; 3] = [0, 1, 2];
        let inst = vec![Instance::default(); instances];
        m.create_mesh(
            material,
            bytemuck::cast_slice(&vertices),
            bytemuck::cast_slice(&indices),
            bytemuck::cast_slice(&inst),
        )
        .unwrap()
    }

    fn setup() -> (ResourceManager<RecordingBackend>, PipelineId, MaterialId, MeshId) {
        let mut m = ResourceManager::new(RecordingBackend::new());
        let p = m.create_pipeline(SHADER).unwrap();
        let mat = m.create_material(p).unwrap();
        let mesh = triangle(&mut m, mat, 1);
        (m, p, mat, mesh)
    }

    #[test]
    fn single_mesh_frame() {
        let (m, _, mat, _) = setup();
        let report = m.draw_frame().unwrap();

        assert_eq!(
            report,
            FrameReport {
                presented: true,
                pipelines: 1,
                materials: 1,
                meshes: 1,
                draw_calls: 1,
                bytes_uploaded: GLOBAL_UNIFORM_CAPACITY + MATERIAL_UNIFORM_CAPACITY + 96,
            }
        );

        let frames = m.backend().frames();
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];

        let set_pipelines = frame
            .commands
            .iter()
            .filter(|c| matches!(c, PassCommand::SetPipeline(_)))
            .count();
        assert_eq!(set_pipelines, 1);

        let material_offsets: Vec<_> = frame
            .bind_groups()
            .filter(|(index, _, _)| *index == 1)
            .map(|(_, _, offsets)| offsets.to_vec())
            .collect();
        assert_eq!(material_offsets, vec![vec![mat.index() * MATERIAL_UNIFORM_CAPACITY as u32]]);

        let texture_groups: Vec<_> =
            frame.bind_groups().filter(|(index, _, _)| *index == 2).collect();
        assert_eq!(texture_groups.len(), 1);
        let group = m.backend().bind_group(texture_groups[0].1);
        assert_eq!(group.entries.len(), MAX_TEXTURES + 1);

        assert_eq!(frame.draws().collect::<Vec<_>>(), vec![(3, 1)]);
    }

    #[test]
    fn commands_follow_bind_order() {
        let (m, p, mat, mesh) = setup();
        m.draw_frame().unwrap();

        let pipeline = m.pipeline(p).unwrap();
        let material = m.material(mat).unwrap();
        let mesh = m.mesh(mesh).unwrap();
        let frames = m.backend().frames();

        let PassCommand::SetPipeline(pipe_ref) = frames[0].commands[0] else {
            panic!("first command must bind the pipeline");
        };
        assert_eq!(
            frames[0].commands[1..],
            [
                PassCommand::SetBindGroup {
                    index: 0,
                    group: pipeline.global_bind_group,
                    offsets: vec![],
                },
                PassCommand::SetBindGroup {
                    index: 1,
                    group: pipeline.material_bind_group,
                    offsets: vec![material_uniform_offset(mat.index())],
                },
                PassCommand::SetBindGroup {
                    index: 2,
                    group: *material.textures().bind_group(),
                    offsets: vec![],
                },
                PassCommand::SetVertexBuffer { slot: 0, buffer: *mesh.vertex_buffer() },
                PassCommand::SetVertexBuffer { slot: 1, buffer: *mesh.instance_buffer() },
                PassCommand::SetIndexBuffer(*mesh.index_buffer()),
                PassCommand::DrawIndexed { index_count: 3, instance_count: 1 },
            ]
        );
        assert_eq!(pipe_ref, pipeline.pipeline);
    }

    #[test]
    fn uniform_mirrors_reach_the_gpu_at_draw_time() {
        let (mut m, p, mat, _) = setup();
        let time = m.add_global_uniform(p, &0.0f32.to_le_bytes()).unwrap();
        let tint = m.add_material_uniform(mat, &[1, 2, 3, 4]).unwrap();
        m.set_global_uniform(p, time, &2.0f32.to_le_bytes()).unwrap();

        let global_buffer = *m.pipeline(p).unwrap().global_buffer();
        let material_buffer = *m.pipeline(p).unwrap().material_buffer();
        let writes_before = m.backend().write_count();

        // Nothing is uploaded until the frame runs.
        assert_eq!(m.backend().buffer(global_buffer).data[..4], [0; 4]);

        m.draw_frame().unwrap();
        assert_eq!(m.backend().buffer(global_buffer).data[time..time + 4], 2.0f32.to_le_bytes());

        let base = material_uniform_offset(mat.index()) as usize + tint;
        assert_eq!(m.backend().buffer(material_buffer).data[base..base + 4], [1, 2, 3, 4]);
        assert_eq!(m.backend().write_count() - writes_before, 3);
    }

    #[test]
    fn material_offsets_use_pool_index() {
        let mut m = ResourceManager::new(RecordingBackend::new());
        let p0 = m.create_pipeline(SHADER).unwrap();
        let p1 = m.create_pipeline(SHADER).unwrap();
        let a = m.create_material(p0).unwrap();
        let b = m.create_material(p1).unwrap();
        triangle(&mut m, a, 1);
        triangle(&mut m, b, 2);

        let report = m.draw_frame().unwrap();
        assert_eq!(report.pipelines, 2);
        assert_eq!(report.draw_calls, 2);

        let frames = m.backend().frames();
        let offsets: Vec<_> = frames[0]
            .bind_groups()
            .filter(|(index, _, _)| *index == 1)
            .map(|(_, _, o)| o[0])
            .collect();
        assert_eq!(offsets, vec![0, 256]);
        assert_eq!(frames[0].draws().collect::<Vec<_>>(), vec![(3, 1), (3, 2)]);
    }

    #[test]
    fn zero_instance_mesh_is_not_drawn() {
        let (mut m, _, mat, mesh) = setup();
        triangle(&mut m, mat, 0);
        m.set_instances(mesh, &[]).unwrap();

        let report = m.draw_frame().unwrap();
        assert_eq!(report.materials, 1);
        assert_eq!(report.draw_calls, 0);
        assert_eq!(m.backend().frames()[0].draws().count(), 0);
    }

    #[test]
    fn destroyed_resources_are_not_drawn() {
        let (mut m, p, mat, mesh) = setup();
        let other = m.create_material(p).unwrap();
        triangle(&mut m, other, 1);

        m.destroy_mesh(mesh).unwrap();
        let report = m.draw_frame().unwrap();
        assert_eq!(report.materials, 2);
        assert_eq!(report.draw_calls, 1);

        m.destroy_material(mat).unwrap();
        let report = m.draw_frame().unwrap();
        assert_eq!(report.materials, 1);
        assert_eq!(report.draw_calls, 1);
    }

    #[test]
    fn attached_textures_are_bound_at_draw() {
        let (mut m, _, mat, _) = setup();
        m.attach_texture(mat, &[200; 4], 1, 1).unwrap();
        m.draw_frame().unwrap();

        let frames = m.backend().frames();
        let (_, group, _) = frames[0]
            .bind_groups()
            .find(|(index, _, _)| *index == 2)
            .unwrap();
        let group = m.backend().bind_group(group);
        let Binding::View(first) = group.entries[1] else {
            panic!("binding 1 must be a view");
        };
        assert_eq!(m.backend().texture(first).pixels, vec![200; 4]);
        assert_eq!(group.entries[2], Binding::View(*m.backend().default_texture_view()));
    }

    #[test]
    fn unavailable_surface_skips_frame() {
        let (m, _, _, _) = setup();
        m.backend().set_surface_available(false);

        let report = m.draw_frame().unwrap();
        assert_eq!(report, FrameReport::default());
        assert!(!report.presented);
        assert!(m.backend().frames().is_empty());
    }

    #[test]
    fn empty_manager_still_clears() {
        let mut m = ResourceManager::new(RecordingBackend::new());
        let color = ClearColor { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
        m.set_clear_color(color);

        let report = m.draw_frame().unwrap();
        assert!(report.presented);
        assert_eq!(report.draw_calls, 0);
        assert_eq!(m.backend().frames()[0].clear, color);
    }
}
