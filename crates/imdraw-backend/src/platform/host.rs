/// Modifier keys state.
///
/// Stored as booleans rather than bitflags to keep it explicit and stable.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

/// The window the adapter is bound to, as seen once per frame.
pub trait HostWindow {
    /// Client-area size in physical pixels.
    fn client_size(&self) -> (u32, u32);

    /// Modifier keys held right now.
    fn modifiers(&self) -> Modifiers;

    fn set_cursor_visible(&mut self, visible: bool);
}

/// Host with no window behind it; every value is set by the caller.
#[derive(Debug, Clone)]
pub struct HeadlessHost {
    pub size: (u32, u32),
    pub modifiers: Modifiers,
    pub cursor_visible: bool,
}

impl HeadlessHost {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            modifiers: Modifiers::default(),
            cursor_visible: true,
        }
    }
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl HostWindow for HeadlessHost {
    fn client_size(&self) -> (u32, u32) {
        self.size
    }

    fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        self.cursor_visible = visible;
    }
}
