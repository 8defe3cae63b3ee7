//! GUI-library side of the bridge.
//!
//! The immediate-mode library is external. These types describe what it hands
//! the backend each frame (draw data, font atlas bitmap) and what the backend
//! writes back (input state, texture handles).

mod builder;
mod draw;
mod font;
mod io;
mod texture;

pub use builder::DrawListBuilder;
pub use draw::{
    pack_rgba,
    ClipRect,
    DrawCallback,
    DrawCmd,
    DrawCmdKind,
    DrawData,
    DrawDataError,
    DrawIdx,
    DrawList,
    DrawVert,
};
pub use font::{AtlasPixels, FontAtlas, FontLoadError, FontdueAtlas, Glyph};
pub use io::{Io, NavKey, INPUT_CHARACTERS_CAPACITY, KEYS_DOWN_LEN, MOUSE_BUTTON_COUNT};
pub use texture::TextureId;
