use crate::config::BackendConfig;
use crate::device::Device;
use crate::error::RenderError;
use crate::gui::{DrawData, FontAtlas, Io, TextureId};
use crate::platform::{self, FrameBridge, HostEvent, HostWindow, WinitHost};

use super::buffers::BufferManager;
use super::dispatch::{self, DispatchStats};
use super::font_atlas::FontAtlasManager;
use super::pipeline::{StateGuard, UiState, setup_ui_state};

/// The render-backend adapter bound to one device and one window.
///
/// Owns every GPU resource it creates. Lifecycle:
///
/// ```ignore
/// let mut backend = Backend::init(device, host, BackendConfig::default(), &mut io);
/// loop {
///     backend.new_frame(&mut io, &mut fonts);
///     let draw_data = gui.build(&mut io);
///     if let Err(e) = backend.render_draw_data(&io, &draw_data) {
///         if e.action() == FrameAction::ResetDevice {
///             backend.recover_device_loss(&mut fonts)?;
///         }
///     }
///     io.end_frame();
/// }
/// let (device, host) = backend.shutdown(&mut fonts);
/// ```
pub struct Backend<D: Device, H: HostWindow> {
    device: D,
    host: H,
    config: BackendConfig,
    buffers: BufferManager,
    atlas: FontAtlasManager,
    bridge: FrameBridge,
}

impl<D: Device, H: HostWindow> Backend<D, H> {
    /// Binds the adapter to `device` and `host` and installs the key map.
    pub fn init(device: D, host: H, config: BackendConfig, io: &mut Io) -> Self {
        io.key_map = platform::vk::default_key_map();

        let (w, h) = host.client_size();
        log::info!("render backend bound to a {w}x{h} window");

        Self {
            buffers: BufferManager::new(&config),
            atlas: FontAtlasManager::new(),
            bridge: FrameBridge::new(&config),
            device,
            host,
            config,
        }
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    #[inline]
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    #[inline]
    pub fn host(&self) -> &H {
        &self.host
    }

    #[inline]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    #[inline]
    pub fn buffers(&self) -> &BufferManager {
        &self.buffers
    }

    #[inline]
    pub fn atlas_texture(&self) -> Option<TextureId> {
        self.atlas.texture()
    }

    /// Prepares `io` for the GUI library's next frame.
    ///
    /// Recreates the font atlas first if it is missing. A failure there is
    /// logged and text stays invisible until a later frame succeeds.
    pub fn new_frame(&mut self, io: &mut Io, fonts: &mut dyn FontAtlas) {
        if !self.atlas.is_ready() {
            if let Err(e) = self.create_device_objects(fonts) {
                log::warn!("font atlas unavailable: {e}");
            }
        }
        self.bridge.new_frame(&mut self.host, io);
    }

    /// Draws one frame of GUI output and leaves the device state as found.
    ///
    /// A non-positive display size (e.g. a minimized window) skips the frame
    /// without touching the device.
    pub fn render_draw_data(&mut self, io: &Io, data: &DrawData) -> Result<DispatchStats, RenderError> {
        let [w, h] = io.display_size;
        if w <= 0.0 || h <= 0.0 {
            log::trace!("display size {w}x{h}; frame skipped");
            return Ok(DispatchStats::default());
        }
        data.validate()?;

        self.buffers
            .ensure_capacity(&mut self.device, data.total_vtx_count(), data.total_idx_count())?;
        let (Some(vertex_buffer), Some(index_buffer)) = (self.buffers.vertex_buffer(), self.buffers.index_buffer())
        else {
            return Err(RenderError::DeviceLost);
        };

        let mut guard = StateGuard::begin(&mut self.device)?;
        self.buffers.upload(&mut *guard, data, self.config.color_order)?;
        setup_ui_state(
            &mut *guard,
            &UiState {
                display_size: io.display_size,
                vertex_buffer,
                index_buffer,
                pixel_offset: self.config.pixel_offset,
                filter: self.config.texture_filter,
            },
        );
        let stats = dispatch::dispatch(&mut *guard, data)?;

        if let Err(e) = guard.end() {
            log::warn!("restoring device state failed: {e}");
        }

        log::trace!(
            "frame: {} draws, {} callbacks, {} triangles",
            stats.draw_calls,
            stats.callbacks,
            stats.triangles
        );
        Ok(stats)
    }

    /// Forwards one raw input event. Returns whether it was consumed.
    pub fn handle_event(&mut self, io: &mut Io, event: &HostEvent) -> bool {
        platform::apply_event(io, event)
    }

    /// Creates the font atlas texture.
    pub fn create_device_objects(&mut self, fonts: &mut dyn FontAtlas) -> Result<(), RenderError> {
        self.atlas.build(&mut self.device, fonts).map(|_| ())
    }

    /// Releases the buffers and the font atlas and clears the published
    /// atlas handle. Everything is recreated lazily by later frames.
    pub fn invalidate_device_objects(&mut self, fonts: &mut dyn FontAtlas) {
        self.buffers.release(&mut self.device);
        self.atlas.invalidate(&mut self.device, fonts);
    }

    /// Invalidates every device object, then resets the device. Rendering
    /// resumes with the next [`new_frame`](Self::new_frame).
    pub fn recover_device_loss(&mut self, fonts: &mut dyn FontAtlas) -> Result<(), RenderError> {
        log::info!("recovering from device loss");
        self.invalidate_device_objects(fonts);
        self.device
            .reset()
            .map_err(|e| RenderError::from_device(e, RenderError::Reset))?;
        self.bridge.reset_clock();
        Ok(())
    }

    /// Releases every owned GPU resource and hands the device and host back.
    pub fn shutdown(mut self, fonts: &mut dyn FontAtlas) -> (D, H) {
        self.invalidate_device_objects(fonts);
        log::info!("render backend shut down");
        (self.device, self.host)
    }
}

impl<D: Device> Backend<D, WinitHost<'_>> {
    /// Forwards a winit window event. Returns whether any part was consumed.
    pub fn handle_window_event(&mut self, io: &mut Io, event: &winit::event::WindowEvent) -> bool {
        self.host.observe(event);
        platform::translate_window_event(event)
            .iter()
            .fold(false, |consumed, ev| platform::apply_event(io, ev) || consumed)
    }
}
