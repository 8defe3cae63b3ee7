/// Size of the `keys_down` table. Key codes at or above this are dropped.
pub const KEYS_DOWN_LEN: usize = 512;

/// Number of tracked mouse buttons (left, right, middle, X1, X2).
pub const MOUSE_BUTTON_COUNT: usize = 5;

/// Characters kept between two `end_frame` calls; later ones are dropped.
pub const INPUT_CHARACTERS_CAPACITY: usize = 16;

/// Keys the GUI library navigates with. Each maps to a host virtual-key code
/// through [`Io::key_map`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum NavKey {
    Tab,
    LeftArrow,
    RightArrow,
    UpArrow,
    DownArrow,
    PageUp,
    PageDown,
    Home,
    End,
    Delete,
    Backspace,
    Enter,
    Escape,
    A,
    C,
    V,
    X,
    Y,
    Z,
}

impl NavKey {
    pub const COUNT: usize = 19;

    pub const ALL: [NavKey; Self::COUNT] = [
        NavKey::Tab,
        NavKey::LeftArrow,
        NavKey::RightArrow,
        NavKey::UpArrow,
        NavKey::DownArrow,
        NavKey::PageUp,
        NavKey::PageDown,
        NavKey::Home,
        NavKey::End,
        NavKey::Delete,
        NavKey::Backspace,
        NavKey::Enter,
        NavKey::Escape,
        NavKey::A,
        NavKey::C,
        NavKey::V,
        NavKey::X,
        NavKey::Y,
        NavKey::Z,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Input/output state shared with the GUI library.
///
/// The backend writes display size, timing, modifiers and raw input here; the
/// library reads it when it builds the next frame. Writes are level-triggered
/// (keys, buttons, position) or accumulating (wheel, characters).
#[derive(Debug, Clone, PartialEq)]
pub struct Io {
    /// Client-area size in pixels.
    pub display_size: [f32; 2],
    /// Seconds since the previous frame. Always positive once a frame started.
    pub delta_time: f32,

    pub mouse_pos: [f32; 2],
    pub mouse_down: [bool; MOUSE_BUTTON_COUNT],
    /// Wheel notches accumulated since the library last consumed input.
    pub mouse_wheel: f32,

    /// Indexed by host virtual-key code.
    pub keys_down: [bool; KEYS_DOWN_LEN],
    pub key_ctrl: bool,
    pub key_shift: bool,
    pub key_alt: bool,
    pub key_super: bool,

    /// Virtual-key code for each [`NavKey`].
    pub key_map: [u32; NavKey::COUNT],

    /// Set by the library when it renders its own cursor.
    pub mouse_draw_cursor: bool,

    /// Characters typed since the library last consumed input.
    pub input_characters: Vec<char>,
}

impl Default for Io {
    fn default() -> Self {
        Self {
            display_size: [0.0, 0.0],
            delta_time: 1.0 / 60.0,
            mouse_pos: [-1.0, -1.0],
            mouse_down: [false; MOUSE_BUTTON_COUNT],
            mouse_wheel: 0.0,
            keys_down: [false; KEYS_DOWN_LEN],
            key_ctrl: false,
            key_shift: false,
            key_alt: false,
            key_super: false,
            key_map: [0; NavKey::COUNT],
            mouse_draw_cursor: false,
            input_characters: Vec::new(),
        }
    }
}

impl Io {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a UTF-16 code unit range character.
    ///
    /// Returns `false` (and queues nothing) for `0`, values outside the basic
    /// multilingual plane, surrogate halves, and once
    /// [`INPUT_CHARACTERS_CAPACITY`] characters are pending.
    pub fn add_input_character(&mut self, code: u32) -> bool {
        if code == 0 || code >= 0x1_0000 || self.input_characters.len() >= INPUT_CHARACTERS_CAPACITY {
            return false;
        }
        match char::from_u32(code) {
            Some(c) => {
                self.input_characters.push(c);
                true
            }
            None => false,
        }
    }

    /// Level of a host key; out-of-range codes read as released.
    #[inline]
    pub fn key_down(&self, code: u32) -> bool {
        self.keys_down.get(code as usize).copied().unwrap_or(false)
    }

    #[inline]
    pub fn nav_key_down(&self, key: NavKey) -> bool {
        self.key_down(self.key_map[key.index()])
    }

    /// Releases every held key and mouse button.
    pub fn clear_held_input(&mut self) {
        self.keys_down = [false; KEYS_DOWN_LEN];
        self.mouse_down = [false; MOUSE_BUTTON_COUNT];
    }

    /// Drops the per-frame accumulators once the library has consumed them.
    pub fn end_frame(&mut self) {
        self.mouse_wheel = 0.0;
        self.input_characters.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nav_key_indices_are_dense() {
        for (i, key) in NavKey::ALL.iter().enumerate() {
            assert_eq!(key.index(), i);
        }
    }

    #[test]
    fn characters_outside_bmp_are_dropped() {
        let mut io = Io::new();
        assert!(io.add_input_character('a' as u32));
        assert!(!io.add_input_character(0));
        assert!(!io.add_input_character(0x1_F600));
        assert!(!io.add_input_character(0xD800));
        assert_eq!(io.input_characters, vec!['a']);
    }

    #[test]
    fn pending_characters_are_capped_until_end_frame() {
        let mut io = Io::new();
        for _ in 0..INPUT_CHARACTERS_CAPACITY {
            assert!(io.add_input_character('z' as u32));
        }
        assert!(!io.add_input_character('z' as u32));
        assert_eq!(io.input_characters.len(), INPUT_CHARACTERS_CAPACITY);

        io.end_frame();
        assert!(io.add_input_character('z' as u32));
    }

    #[test]
    fn end_frame_resets_accumulators_only() {
        let mut io = Io::new();
        io.mouse_wheel = 3.0;
        io.keys_down[65] = true;
        io.add_input_character('x' as u32);

        io.end_frame();

        assert_eq!(io.mouse_wheel, 0.0);
        assert!(io.input_characters.is_empty());
        assert!(io.key_down(65));
    }

    #[test]
    fn out_of_range_key_reads_released() {
        let io = Io::new();
        assert!(!io.key_down(10_000));
    }
}
