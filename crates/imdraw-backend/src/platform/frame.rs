use crate::config::BackendConfig;
use crate::gui::Io;
use crate::time::{FrameClock, FrameTime};

use super::HostWindow;

/// Per-frame sampling of the host into [`Io`].
#[derive(Debug)]
pub struct FrameBridge {
    clock: FrameClock,
    cursor_hidden: bool,
}

impl FrameBridge {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            clock: FrameClock::with_clamps(config.min_frame_time, config.max_frame_time),
            cursor_hidden: false,
        }
    }

    /// Publishes display size, delta time and modifiers, and hides the OS
    /// cursor while the library draws its own.
    pub fn new_frame<H: HostWindow + ?Sized>(&mut self, host: &mut H, io: &mut Io) -> FrameTime {
        let (w, h) = host.client_size();
        io.display_size = [w as f32, h as f32];

        let time = self.clock.tick();
        io.delta_time = time.dt;

        let m = host.modifiers();
        io.key_ctrl = m.ctrl;
        io.key_shift = m.shift;
        io.key_alt = m.alt;
        io.key_super = m.meta;

        if io.mouse_draw_cursor != self.cursor_hidden {
            host.set_cursor_visible(!io.mouse_draw_cursor);
            self.cursor_hidden = io.mouse_draw_cursor;
        }

        time
    }

    /// Restarts the delta baseline.
    pub fn reset_clock(&mut self) {
        self.clock.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{HeadlessHost, Modifiers};

    #[test]
    fn samples_size_time_and_modifiers() {
        let mut bridge = FrameBridge::new(&BackendConfig::default());
        let mut host = HeadlessHost::new(1280, 720);
        host.modifiers = Modifiers { ctrl: true, alt: true, ..Modifiers::default() };
        let mut io = Io::new();

        bridge.new_frame(&mut host, &mut io);

        assert_eq!(io.display_size, [1280.0, 720.0]);
        assert!(io.delta_time > 0.0);
        assert!(io.key_ctrl && io.key_alt && !io.key_shift && !io.key_super);
    }

    #[test]
    fn cursor_follows_draw_cursor_flag() {
        let mut bridge = FrameBridge::new(&BackendConfig::default());
        let mut host = HeadlessHost::new(10, 10);
        let mut io = Io::new();

        io.mouse_draw_cursor = true;
        bridge.new_frame(&mut host, &mut io);
        assert!(!host.cursor_visible);

        io.mouse_draw_cursor = false;
        bridge.new_frame(&mut host, &mut io);
        assert!(host.cursor_visible);
    }
}
