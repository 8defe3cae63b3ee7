//! Frame/input bridge between the host window and the GUI library.
//!
//! Public API is platform-agnostic ([`HostWindow`], [`HostEvent`]); the
//! `winit` submodule translates winit windows and events into it.

mod events;
mod frame;
mod host;
pub mod vk;
mod winit;

pub use events::{HostEvent, MouseButton, apply_event};
pub use frame::FrameBridge;
pub use host::{HeadlessHost, HostWindow, Modifiers};
pub use self::winit::{WinitHost, map_key, translate_window_event};
