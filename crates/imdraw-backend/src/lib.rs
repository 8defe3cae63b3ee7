//! Render backend for an immediate-mode GUI.
//!
//! The GUI library produces [`gui::DrawData`] each frame; this crate turns it
//! into calls on a stateful graphics [`device::Device`] and feeds host input
//! back into [`gui::Io`].
//!
//! Layers:
//! - [`gui`]: the data contract shared with the GUI library
//! - [`device`]: the device interface, its state model and a headless device
//! - [`gpu`]: the wgpu device
//! - [`render`]: buffers, vertex translation, pipeline state, dispatch, font atlas
//! - [`platform`]: host window and event translation, frame timing
//! - [`store`]: name-keyed blob storage for host settings

pub mod config;
pub mod device;
pub mod error;
pub mod gpu;
pub mod gui;
pub mod logging;
pub mod platform;
pub mod render;
pub mod store;
pub mod time;

pub use config::BackendConfig;
pub use error::{FrameAction, RenderError};
pub use render::Backend;
