//! Render-backend adapter.
//!
//! Turns a frame of [`DrawData`](crate::gui::DrawData) into device calls:
//! buffers are grown and filled, the UI pipeline state is applied under a
//! state-block guard, commands are dispatched in order, and the host's state
//! is restored.
//!
//! Convention:
//! - screen space is in pixels (top-left origin, +Y down).
//! - projection and vertex colors are adjusted per device through
//!   [`BackendConfig`](crate::config::BackendConfig).

mod backend;
mod buffers;
mod dispatch;
mod font_atlas;
mod pipeline;
mod vertex;

pub use backend::Backend;
pub use buffers::BufferManager;
pub use dispatch::{DispatchStats, dispatch, scissor_for};
pub use font_atlas::FontAtlasManager;
pub use pipeline::{StateGuard, UiState, ortho_projection, setup_ui_state};
pub use vertex::{
    ColorOrder, DEVICE_VERTEX_SIZE, DeviceVertex, swap_red_blue, translate_vertex, write_indices, write_vertices,
};
