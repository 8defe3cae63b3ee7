use std::path::PathBuf;

use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use imdraw_backend::device::DeviceError;
use imdraw_backend::gpu::{GpuInit, PresentOutcome, WgpuDevice};
use imdraw_backend::gui::{FontdueAtlas, Io};
use imdraw_backend::platform::WinitHost;
use imdraw_backend::store::DirBlobStore;
use imdraw_backend::{Backend, BackendConfig, FrameAction};

use crate::scene::Scene;

/// Window and settings configuration.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// Where F2/F3 save and load the clear color.
    pub settings_dir: PathBuf,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            title: "imdraw demo".to_string(),
            initial_size: LogicalSize::new(960.0, 640.0),
            settings_dir: std::env::temp_dir().join("imdraw-demo"),
        }
    }
}

type UiBackend<'w> = Backend<WgpuDevice<'w>, WinitHost<'w>>;

#[self_referencing]
struct BoundWindow {
    window: Window,

    #[borrows(window)]
    #[not_covariant]
    backend: UiBackend<'this>,
}

struct WindowEntry {
    bound: BoundWindow,
    io: Io,
}

struct DemoApp {
    config: DemoConfig,
    fonts: FontdueAtlas,
    store: DirBlobStore,
    scene: Scene,

    window: Option<WindowEntry>,
    error: Option<anyhow::Error>,
}

/// Opens the demo window and runs until it is closed.
pub fn run(config: DemoConfig, fonts: FontdueAtlas) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    let mut app = DemoApp {
        store: DirBlobStore::new(config.settings_dir.clone()),
        config,
        fonts,
        scene: Scene::new(),
        window: None,
        error: None,
    };

    event_loop
        .run_app(&mut app)
        .context("winit event loop terminated with error")?;

    app.error.map_or(Ok(()), Err)
}

impl DemoApp {
    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let mut io = Io::new();
        let backend_config = BackendConfig {
            // wgpu rasterizes at pixel centers already.
            pixel_offset: 0.0,
            ..BackendConfig::default()
        };

        let bound = BoundWindowTryBuilder {
            window,
            backend_builder: |w| {
                WgpuDevice::new_blocking(w, GpuInit::default())
                    .map(|device| Backend::init(device, WinitHost::new(w), backend_config, &mut io))
            },
        }
        .try_build()?;

        bound.with_window(|w| w.request_redraw());
        self.window = Some(WindowEntry { bound, io });
        Ok(())
    }

    fn close_window(&mut self) {
        if let Some(mut entry) = self.window.take() {
            let fonts = &mut self.fonts;
            entry
                .bound
                .with_backend_mut(|backend| backend.invalidate_device_objects(fonts));
        }
    }
}

fn draw_frame(bound: &mut BoundWindow, io: &mut Io, fonts: &mut FontdueAtlas, scene: &mut Scene) {
    bound.with_backend_mut(|backend| {
        backend.new_frame(io, fonts);
        let data = scene.build(io, fonts);
        io.end_frame();

        match backend.render_draw_data(io, &data) {
            Ok(stats) => scene.record_stats(stats),
            Err(e) if e.action() == FrameAction::ResetDevice => {
                recover(backend, fonts, scene);
                return;
            }
            Err(e) => log::warn!("frame dropped: {e}"),
        }

        match backend.device_mut().present(scene.clear_color()) {
            Ok(PresentOutcome::Presented) => {}
            Ok(PresentOutcome::Skipped) => log::trace!("present skipped"),
            Err(DeviceError::DeviceLost) => recover(backend, fonts, scene),
            Err(e) => log::error!("present failed: {e}"),
        }
    });
}

fn recover(backend: &mut UiBackend<'_>, fonts: &mut FontdueAtlas, scene: &mut Scene) {
    match backend.recover_device_loss(fonts) {
        Ok(()) => scene.set_status("device lost and recovered"),
        Err(e) => log::warn!("device recovery failed, retrying next frame: {e}"),
    }
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(e) = self.create_window(event_loop) {
            log::error!("failed to create window: {e:#}");
            self.error = Some(e);
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        if let Some(entry) = &self.window {
            entry.bound.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if matches!(event, WindowEvent::CloseRequested) {
            self.close_window();
            event_loop.exit();
            return;
        }

        // Split borrows to avoid capturing `self` inside `ouroboros` closures.
        let (fonts, scene, store) = (&mut self.fonts, &mut self.scene, &mut self.store);
        let Some(WindowEntry { bound, io }) = self.window.as_mut() else {
            return;
        };
        if bound.with_window(|w| w.id()) != window_id {
            return;
        }

        bound.with_backend_mut(|backend| backend.handle_window_event(io, &event));

        match &event {
            WindowEvent::KeyboardInput { event: key, .. } if key.state == ElementState::Pressed && !key.repeat => {
                match key.physical_key {
                    PhysicalKey::Code(KeyCode::F1) => scene.cycle_clear_color(),
                    PhysicalKey::Code(KeyCode::F2) => scene.save(store),
                    PhysicalKey::Code(KeyCode::F3) => scene.load(&*store),
                    PhysicalKey::Code(KeyCode::F5) => {
                        bound.with_backend_mut(|backend| backend.device_mut().mark_lost());
                    }
                    _ => {}
                }
            }

            WindowEvent::Resized(new_size) => {
                bound.with_backend_mut(|backend| backend.device_mut().resize(*new_size));
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let new_size = bound.with_window(|w| w.inner_size());
                bound.with_backend_mut(|backend| backend.device_mut().resize(new_size));
            }

            WindowEvent::RedrawRequested => draw_frame(bound, io, fonts, scene),

            _ => {}
        }
    }
}
