//! Single-window demo driving the resource manager on a real surface.

mod clock;
mod scene;

use anyhow::{Context, Result};
use ouroboros::self_referencing;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use kiln_gpu::backend::gpu::{GpuInit, WgpuBackend};
use kiln_gpu::logging::{init_logging, LoggingConfig};
use kiln_gpu::ResourceManager;

use clock::{FrameClock, FrameTime};
use scene::Scene;

/// Window configuration.
#[derive(Debug, Clone)]
struct ViewerConfig {
    title: String,
    initial_size: LogicalSize<f64>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "kiln viewer".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
        }
    }
}

struct Viewer<'w> {
    manager: ResourceManager<WgpuBackend<'w>>,
    scene: Scene,
}

impl<'w> Viewer<'w> {
    fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let backend = pollster::block_on(WgpuBackend::new(window, init))
            .context("GPU initialization failed")?;
        let mut manager = ResourceManager::new(backend);
        let scene = Scene::build(&mut manager).context("failed to build demo scene")?;
        log::info!(
            "scene ready: {} / {} / {} on {}",
            scene.pipeline,
            scene.material,
            scene.mesh,
            manager.backend().adapter_info().name
        );
        Ok(Self { manager, scene })
    }

    fn render(&mut self, time: FrameTime) -> Result<()> {
        self.scene.update(&mut self.manager, time.elapsed)?;
        let report = self.manager.draw_frame()?;
        log::trace!("frame {} dt {:.4}s: {report:?}", time.frame_index, time.dt);
        if !report.presented {
            log::debug!("frame {} skipped", time.frame_index);
        }
        Ok(())
    }
}

#[self_referencing]
struct WindowEntry {
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[not_covariant]
    viewer: Viewer<'this>,
}

struct App {
    config: ViewerConfig,
    gpu_init: GpuInit,
    entry: Option<WindowEntry>,
}

impl App {
    fn new(config: ViewerConfig, gpu_init: GpuInit) -> Self {
        Self {
            config,
            gpu_init,
            entry: None,
        }
    }

    fn create_entry(&self, event_loop: &ActiveEventLoop) -> Result<WindowEntry> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);
        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        WindowEntryTryBuilder {
            clock: FrameClock::default(),
            window,
            viewer_builder: |w| Viewer::new(w, gpu_init),
        }
        .try_build()
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }

        match self.create_entry(event_loop) {
            Ok(entry) => {
                entry.with_window(|w| w.request_redraw());
                self.entry = Some(entry);
            }
            Err(e) => {
                log::error!("failed to start viewer: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);
        if let Some(entry) = &self.entry {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(entry) = self.entry.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                self.entry = None;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                entry.with_viewer_mut(|viewer| viewer.manager.backend_mut().resize(size));
            }
            WindowEvent::RedrawRequested => {
                let result = entry.with_mut(|fields| {
                    let time = fields.clock.tick();
                    fields.viewer.render(time)
                });
                if let Err(e) = result {
                    log::error!("render failed: {e:#}");
                    self.entry = None;
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    let mut app = App::new(ViewerConfig::default(), GpuInit::default());
    event_loop
        .run_app(&mut app)
        .context("winit event loop terminated with error")?;
    Ok(())
}
