use crate::gui::{Io, KEYS_DOWN_LEN};

/// Mouse button, in `Io::mouse_down` order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    X1,
    X2,
}

impl MouseButton {
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Raw input from the host event loop.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum HostEvent {
    MouseDown(MouseButton),
    MouseUp(MouseButton),
    /// Vertical wheel delta; only its sign is used.
    MouseWheel(f32),
    /// Pointer position in client-area pixels.
    MouseMove { x: f32, y: f32 },
    /// Virtual-key code, see [`vk`](super::vk).
    KeyDown(u32),
    KeyUp(u32),
    /// UTF-16 code unit.
    Char(u32),
    FocusLost,
}

/// Writes one event into `io`. Returns whether the event was consumed.
///
/// Writes are level-triggered (buttons, keys, position) or accumulating
/// (wheel, characters); nothing is queued.
pub fn apply_event(io: &mut Io, event: &HostEvent) -> bool {
    match *event {
        HostEvent::MouseDown(button) => {
            io.mouse_down[button.index()] = true;
            true
        }
        HostEvent::MouseUp(button) => {
            io.mouse_down[button.index()] = false;
            true
        }
        HostEvent::MouseWheel(delta) => {
            if !delta.is_finite() || delta == 0.0 {
                return false;
            }
            io.mouse_wheel += delta.signum();
            true
        }
        HostEvent::MouseMove { x, y } => {
            io.mouse_pos = [x, y];
            true
        }
        HostEvent::KeyDown(code) => set_key(io, code, true),
        HostEvent::KeyUp(code) => set_key(io, code, false),
        HostEvent::Char(code) => {
            io.add_input_character(code);
            true
        }
        HostEvent::FocusLost => {
            io.clear_held_input();
            false
        }
    }
}

fn set_key(io: &mut Io, code: u32, down: bool) -> bool {
    if (code as usize) < KEYS_DOWN_LEN {
        io.keys_down[code as usize] = down;
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buttons_are_level_triggered() {
        let mut io = Io::new();
        assert!(apply_event(&mut io, &HostEvent::MouseDown(MouseButton::Middle)));
        assert!(io.mouse_down[2]);
        apply_event(&mut io, &HostEvent::MouseDown(MouseButton::Middle));
        apply_event(&mut io, &HostEvent::MouseUp(MouseButton::Middle));
        assert!(!io.mouse_down[2]);
    }

    #[test]
    fn wheel_accumulates_notches() {
        let mut io = Io::new();
        assert!(apply_event(&mut io, &HostEvent::MouseWheel(120.0)));
        assert!(apply_event(&mut io, &HostEvent::MouseWheel(0.25)));
        assert!(apply_event(&mut io, &HostEvent::MouseWheel(-3.0)));
        assert!(apply_event(&mut io, &HostEvent::MouseWheel(2.0)));
        assert!(!apply_event(&mut io, &HostEvent::MouseWheel(0.0)));
        assert_eq!(io.mouse_wheel, 2.0);
    }

    #[test]
    fn non_finite_wheel_is_ignored() {
        let mut io = Io::new();
        apply_event(&mut io, &HostEvent::MouseWheel(1.0));
        assert!(!apply_event(&mut io, &HostEvent::MouseWheel(f32::NAN)));
        assert!(!apply_event(&mut io, &HostEvent::MouseWheel(f32::INFINITY)));
        assert_eq!(io.mouse_wheel, 1.0);
    }

    #[test]
    fn out_of_range_key_is_not_consumed() {
        let mut io = Io::new();
        assert!(apply_event(&mut io, &HostEvent::KeyDown(511)));
        assert!(!apply_event(&mut io, &HostEvent::KeyDown(512)));
        assert!(io.key_down(511));
        assert!(apply_event(&mut io, &HostEvent::KeyUp(511)));
        assert!(!io.key_down(511));
    }

    #[test]
    fn last_move_wins() {
        let mut io = Io::new();
        apply_event(&mut io, &HostEvent::MouseMove { x: 1.0, y: 2.0 });
        apply_event(&mut io, &HostEvent::MouseMove { x: -5.0, y: 7.0 });
        assert_eq!(io.mouse_pos, [-5.0, 7.0]);
    }

    #[test]
    fn chars_outside_range_are_dropped() {
        let mut io = Io::new();
        apply_event(&mut io, &HostEvent::Char(0));
        apply_event(&mut io, &HostEvent::Char('é' as u32));
        apply_event(&mut io, &HostEvent::Char(0x1_0000));
        assert_eq!(io.input_characters, vec!['é']);
    }

    #[test]
    fn focus_loss_releases_everything() {
        let mut io = Io::new();
        apply_event(&mut io, &HostEvent::KeyDown(0x41));
        apply_event(&mut io, &HostEvent::MouseDown(MouseButton::Left));
        apply_event(&mut io, &HostEvent::FocusLost);
        assert!(!io.key_down(0x41));
        assert!(!io.mouse_down[0]);
    }
}
