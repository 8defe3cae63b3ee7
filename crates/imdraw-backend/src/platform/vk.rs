//! Virtual-key codes.
//!
//! `Io::keys_down` is indexed by these. They follow the common desktop
//! virtual-key numbering so host key maps can be shared between backends.

use crate::gui::NavKey;

pub const BACK: u32 = 0x08;
pub const TAB: u32 = 0x09;
pub const RETURN: u32 = 0x0D;
pub const SHIFT: u32 = 0x10;
pub const CONTROL: u32 = 0x11;
pub const MENU: u32 = 0x12;
pub const PAUSE: u32 = 0x13;
pub const CAPITAL: u32 = 0x14;
pub const ESCAPE: u32 = 0x1B;
pub const SPACE: u32 = 0x20;
pub const PRIOR: u32 = 0x21;
pub const NEXT: u32 = 0x22;
pub const END: u32 = 0x23;
pub const HOME: u32 = 0x24;
pub const LEFT: u32 = 0x25;
pub const UP: u32 = 0x26;
pub const RIGHT: u32 = 0x27;
pub const DOWN: u32 = 0x28;
pub const SNAPSHOT: u32 = 0x2C;
pub const INSERT: u32 = 0x2D;
pub const DELETE: u32 = 0x2E;

/// `'0'..='9'` map to `0x30..=0x39`.
pub const KEY_0: u32 = 0x30;
/// `'A'..='Z'` map to `0x41..=0x5A`.
pub const KEY_A: u32 = 0x41;
pub const KEY_C: u32 = 0x43;
pub const KEY_V: u32 = 0x56;
pub const KEY_X: u32 = 0x58;
pub const KEY_Y: u32 = 0x59;
pub const KEY_Z: u32 = 0x5A;

pub const LWIN: u32 = 0x5B;
pub const RWIN: u32 = 0x5C;
pub const APPS: u32 = 0x5D;

pub const NUMPAD0: u32 = 0x60;
pub const MULTIPLY: u32 = 0x6A;
pub const ADD: u32 = 0x6B;
pub const SUBTRACT: u32 = 0x6D;
pub const DECIMAL: u32 = 0x6E;
pub const DIVIDE: u32 = 0x6F;

/// `F1..=F24` map to `0x70..=0x87`.
pub const F1: u32 = 0x70;

pub const NUMLOCK: u32 = 0x90;
pub const SCROLL: u32 = 0x91;

pub const LSHIFT: u32 = 0xA0;
pub const RSHIFT: u32 = 0xA1;
pub const LCONTROL: u32 = 0xA2;
pub const RCONTROL: u32 = 0xA3;
pub const LMENU: u32 = 0xA4;
pub const RMENU: u32 = 0xA5;

pub const OEM_1: u32 = 0xBA;
pub const OEM_PLUS: u32 = 0xBB;
pub const OEM_COMMA: u32 = 0xBC;
pub const OEM_MINUS: u32 = 0xBD;
pub const OEM_PERIOD: u32 = 0xBE;
pub const OEM_2: u32 = 0xBF;
pub const OEM_3: u32 = 0xC0;
pub const OEM_4: u32 = 0xDB;
pub const OEM_5: u32 = 0xDC;
pub const OEM_6: u32 = 0xDD;
pub const OEM_7: u32 = 0xDE;

/// Virtual-key code for each navigation key, in [`NavKey`] order.
pub fn default_key_map() -> [u32; NavKey::COUNT] {
    NavKey::ALL.map(|key| match key {
        NavKey::Tab => TAB,
        NavKey::LeftArrow => LEFT,
        NavKey::RightArrow => RIGHT,
        NavKey::UpArrow => UP,
        NavKey::DownArrow => DOWN,
        NavKey::PageUp => PRIOR,
        NavKey::PageDown => NEXT,
        NavKey::Home => HOME,
        NavKey::End => END,
        NavKey::Delete => DELETE,
        NavKey::Backspace => BACK,
        NavKey::Enter => RETURN,
        NavKey::Escape => ESCAPE,
        NavKey::A => KEY_A,
        NavKey::C => KEY_C,
        NavKey::V => KEY_V,
        NavKey::X => KEY_X,
        NavKey::Y => KEY_Y,
        NavKey::Z => KEY_Z,
    })
}
