use winit::event::{ElementState, Ime, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};
use winit::window::Window;

use super::vk;
use super::{HostEvent, HostWindow, Modifiers, MouseButton};

/// [`HostWindow`] over a winit window.
///
/// winit 0.30 has no modifier query; the state is tracked from
/// `ModifiersChanged` through [`observe`](Self::observe).
#[derive(Debug)]
pub struct WinitHost<'w> {
    window: &'w Window,
    modifiers: Modifiers,
}

impl<'w> WinitHost<'w> {
    pub fn new(window: &'w Window) -> Self {
        Self {
            window,
            modifiers: Modifiers::default(),
        }
    }

    #[inline]
    pub fn window(&self) -> &'w Window {
        self.window
    }

    /// Updates tracked state from a window event.
    pub fn observe(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::ModifiersChanged(m) => self.modifiers = map_modifiers(m.state()),
            WindowEvent::Focused(false) => self.modifiers = Modifiers::default(),
            _ => {}
        }
    }
}

impl HostWindow for WinitHost<'_> {
    fn client_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        self.window.set_cursor_visible(visible);
    }
}

/// Translates a winit `WindowEvent` into zero or more [`HostEvent`]s.
///
/// Positions stay in physical pixels to match the client size. A key press
/// also yields the text it commits as characters.
pub fn translate_window_event(event: &WindowEvent) -> Vec<HostEvent> {
    match event {
        WindowEvent::CursorMoved { position, .. } => vec![HostEvent::MouseMove {
            x: position.x as f32,
            y: position.y as f32,
        }],

        WindowEvent::MouseInput { state, button, .. } => {
            let Some(button) = map_mouse_button(*button) else {
                return Vec::new();
            };
            match state {
                ElementState::Pressed => vec![HostEvent::MouseDown(button)],
                ElementState::Released => vec![HostEvent::MouseUp(button)],
            }
        }

        WindowEvent::MouseWheel { delta, .. } => {
            let dy = match delta {
                MouseScrollDelta::LineDelta(_, y) => *y,
                MouseScrollDelta::PixelDelta(p) => p.y as f32,
            };
            vec![HostEvent::MouseWheel(dy)]
        }

        WindowEvent::KeyboardInput { event, .. } => {
            let mut out = Vec::new();
            if let PhysicalKey::Code(code) = event.physical_key {
                if let Some(key) = map_key(code) {
                    out.push(match event.state {
                        ElementState::Pressed => HostEvent::KeyDown(key),
                        ElementState::Released => HostEvent::KeyUp(key),
                    });
                }
            }
            if event.state == ElementState::Pressed {
                if let Some(text) = &event.text {
                    out.extend(text_events(text));
                }
            }
            out
        }

        WindowEvent::Ime(Ime::Commit(text)) => text_events(text).collect(),

        WindowEvent::Focused(false) => vec![HostEvent::FocusLost],

        _ => Vec::new(),
    }
}

/// One `Char` per UTF-16 code unit, as a window-message loop would deliver.
fn text_events(text: &str) -> impl Iterator<Item = HostEvent> + '_ {
    text.encode_utf16().map(|unit| HostEvent::Char(u32::from(unit)))
}

fn map_modifiers(m: ModifiersState) -> Modifiers {
    Modifiers {
        shift: m.shift_key(),
        ctrl: m.control_key(),
        alt: m.alt_key(),
        meta: m.super_key(),
    }
}

fn map_mouse_button(b: WinitMouseButton) -> Option<MouseButton> {
    match b {
        WinitMouseButton::Left => Some(MouseButton::Left),
        WinitMouseButton::Right => Some(MouseButton::Right),
        WinitMouseButton::Middle => Some(MouseButton::Middle),
        WinitMouseButton::Back => Some(MouseButton::X1),
        WinitMouseButton::Forward => Some(MouseButton::X2),
        WinitMouseButton::Other(_) => None,
    }
}

/// Virtual-key code for a physical key, where one exists.
pub fn map_key(code: KeyCode) -> Option<u32> {
    let letter = |i: u32| Some(vk::KEY_A + i);
    let digit = |i: u32| Some(vk::KEY_0 + i);
    let function = |i: u32| Some(vk::F1 + i);

    match code {
        KeyCode::Backspace => Some(vk::BACK),
        KeyCode::Tab => Some(vk::TAB),
        KeyCode::Enter | KeyCode::NumpadEnter => Some(vk::RETURN),
        KeyCode::Pause => Some(vk::PAUSE),
        KeyCode::CapsLock => Some(vk::CAPITAL),
        KeyCode::Escape => Some(vk::ESCAPE),
        KeyCode::Space => Some(vk::SPACE),
        KeyCode::PageUp => Some(vk::PRIOR),
        KeyCode::PageDown => Some(vk::NEXT),
        KeyCode::End => Some(vk::END),
        KeyCode::Home => Some(vk::HOME),
        KeyCode::ArrowLeft => Some(vk::LEFT),
        KeyCode::ArrowUp => Some(vk::UP),
        KeyCode::ArrowRight => Some(vk::RIGHT),
        KeyCode::ArrowDown => Some(vk::DOWN),
        KeyCode::PrintScreen => Some(vk::SNAPSHOT),
        KeyCode::Insert => Some(vk::INSERT),
        KeyCode::Delete => Some(vk::DELETE),

        KeyCode::Digit0 => digit(0),
        KeyCode::Digit1 => digit(1),
        KeyCode::Digit2 => digit(2),
        KeyCode::Digit3 => digit(3),
        KeyCode::Digit4 => digit(4),
        KeyCode::Digit5 => digit(5),
        KeyCode::Digit6 => digit(6),
        KeyCode::Digit7 => digit(7),
        KeyCode::Digit8 => digit(8),
        KeyCode::Digit9 => digit(9),

        KeyCode::KeyA => letter(0),
        KeyCode::KeyB => letter(1),
        KeyCode::KeyC => letter(2),
        KeyCode::KeyD => letter(3),
        KeyCode::KeyE => letter(4),
        KeyCode::KeyF => letter(5),
        KeyCode::KeyG => letter(6),
        KeyCode::KeyH => letter(7),
        KeyCode::KeyI => letter(8),
        KeyCode::KeyJ => letter(9),
        KeyCode::KeyK => letter(10),
        KeyCode::KeyL => letter(11),
        KeyCode::KeyM => letter(12),
        KeyCode::KeyN => letter(13),
        KeyCode::KeyO => letter(14),
        KeyCode::KeyP => letter(15),
        KeyCode::KeyQ => letter(16),
        KeyCode::KeyR => letter(17),
        KeyCode::KeyS => letter(18),
        KeyCode::KeyT => letter(19),
        KeyCode::KeyU => letter(20),
        KeyCode::KeyV => letter(21),
        KeyCode::KeyW => letter(22),
        KeyCode::KeyX => letter(23),
        KeyCode::KeyY => letter(24),
        KeyCode::KeyZ => letter(25),

        KeyCode::SuperLeft => Some(vk::LWIN),
        KeyCode::SuperRight => Some(vk::RWIN),
        KeyCode::ContextMenu => Some(vk::APPS),

        KeyCode::Numpad0 => Some(vk::NUMPAD0),
        KeyCode::Numpad1 => Some(vk::NUMPAD0 + 1),
        KeyCode::Numpad2 => Some(vk::NUMPAD0 + 2),
        KeyCode::Numpad3 => Some(vk::NUMPAD0 + 3),
        KeyCode::Numpad4 => Some(vk::NUMPAD0 + 4),
        KeyCode::Numpad5 => Some(vk::NUMPAD0 + 5),
        KeyCode::Numpad6 => Some(vk::NUMPAD0 + 6),
        KeyCode::Numpad7 => Some(vk::NUMPAD0 + 7),
        KeyCode::Numpad8 => Some(vk::NUMPAD0 + 8),
        KeyCode::Numpad9 => Some(vk::NUMPAD0 + 9),
        KeyCode::NumpadMultiply => Some(vk::MULTIPLY),
        KeyCode::NumpadAdd => Some(vk::ADD),
        KeyCode::NumpadSubtract => Some(vk::SUBTRACT),
        KeyCode::NumpadDecimal => Some(vk::DECIMAL),
        KeyCode::NumpadDivide => Some(vk::DIVIDE),

        KeyCode::F1 => function(0),
        KeyCode::F2 => function(1),
        KeyCode::F3 => function(2),
        KeyCode::F4 => function(3),
        KeyCode::F5 => function(4),
        KeyCode::F6 => function(5),
        KeyCode::F7 => function(6),
        KeyCode::F8 => function(7),
        KeyCode::F9 => function(8),
        KeyCode::F10 => function(9),
        KeyCode::F11 => function(10),
        KeyCode::F12 => function(11),

        KeyCode::NumLock => Some(vk::NUMLOCK),
        KeyCode::ScrollLock => Some(vk::SCROLL),

        KeyCode::ShiftLeft => Some(vk::LSHIFT),
        KeyCode::ShiftRight => Some(vk::RSHIFT),
        KeyCode::ControlLeft => Some(vk::LCONTROL),
        KeyCode::ControlRight => Some(vk::RCONTROL),
        KeyCode::AltLeft => Some(vk::LMENU),
        KeyCode::AltRight => Some(vk::RMENU),

        KeyCode::Semicolon => Some(vk::OEM_1),
        KeyCode::Equal => Some(vk::OEM_PLUS),
        KeyCode::Comma => Some(vk::OEM_COMMA),
        KeyCode::Minus => Some(vk::OEM_MINUS),
        KeyCode::Period => Some(vk::OEM_PERIOD),
        KeyCode::Slash => Some(vk::OEM_2),
        KeyCode::Backquote => Some(vk::OEM_3),
        KeyCode::BracketLeft => Some(vk::OEM_4),
        KeyCode::Backslash => Some(vk::OEM_5),
        KeyCode::BracketRight => Some(vk::OEM_6),
        KeyCode::Quote => Some(vk::OEM_7),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_keys_match_key_map() {
        let map = vk::default_key_map();
        assert!(map.contains(&map_key(KeyCode::Tab).unwrap()));
        assert!(map.contains(&map_key(KeyCode::ArrowLeft).unwrap()));
        assert!(map.contains(&map_key(KeyCode::KeyZ).unwrap()));
        assert_eq!(map_key(KeyCode::KeyZ), Some(vk::KEY_Z));
        assert_eq!(map_key(KeyCode::F12), Some(vk::F1 + 11));
    }

    #[test]
    fn ime_commit_yields_utf16_units() {
        let event = WindowEvent::Ime(Ime::Commit("a€".to_string()));
        assert_eq!(
            translate_window_event(&event),
            vec![HostEvent::Char('a' as u32), HostEvent::Char(0x20AC)]
        );
    }

    #[test]
    fn unfocus_is_forwarded() {
        assert_eq!(translate_window_event(&WindowEvent::Focused(false)), vec![HostEvent::FocusLost]);
        assert!(translate_window_event(&WindowEvent::Focused(true)).is_empty());
    }
}
