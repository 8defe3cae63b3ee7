//! Graphics device capability interface.
//!
//! This module is responsible for:
//! - the [`Device`] trait the adapter renders through
//! - the state model every device carries ([`PipelineState`])
//! - scoped buffer/texture mappings ([`BufferLock`], [`TextureLock`])
//! - an in-memory device for tests and headless hosts ([`HeadlessDevice`])

mod error;
mod guard;
mod headless;
mod state;

pub use error::DeviceError;
pub use guard::{BufferLock, TextureLock};
pub use headless::{HeadlessDevice, HeadlessFaults, RecordedDraw};
pub use state::{
    Blend, BlendOp, CullMode, Filter, IDENTITY, IndexFormat, MAX_TEXTURE_STAGES, Matrix, PipelineState,
    RenderState, RenderStates, Sampler, SamplerState, ScissorRect, StreamSource, TextureArg, TextureOp,
    TextureStage, TextureStageState, TransformKind, VertexLayout, Viewport, mul, transform_point,
};

use crate::gui::TextureId;

/// Handle of a device vertex or index buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

/// Handle of a captured state block.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct StateBlockId(pub u64);

/// Handle of a programmable shader. `None` in the binding means fixed function.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ShaderId(pub u64);

/// Texel layout of a device texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureFormat {
    /// Four bytes per texel in R, G, B, A memory order.
    Rgba8,
}

impl TextureFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Rgba8 => 4,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PrimitiveType {
    TriangleList,
}

/// Parameters of one indexed draw.
///
/// Vertex `base_vertex + idx` is fetched for every index `idx` read from
/// `start_index` onward.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct IndexedDraw {
    pub primitive: PrimitiveType,
    pub base_vertex: i32,
    pub min_index: u32,
    /// Number of vertices addressable from `base_vertex + min_index`.
    pub num_vertices: u32,
    pub start_index: u32,
    pub primitive_count: u32,
}

impl IndexedDraw {
    /// Indices consumed by the draw.
    pub fn index_count(&self) -> u32 {
        match self.primitive {
            PrimitiveType::TriangleList => self.primitive_count * 3,
        }
    }
}

/// Stateful, buffer-oriented graphics device.
///
/// The interface follows a fixed-function device: state setters mutate the
/// current [`PipelineState`], draws run under whatever state is current, and
/// state blocks capture/restore that state wholesale. Setters cannot fail;
/// calls that allocate, map or draw can.
///
/// Resources created here live in the device pool: they must all be released
/// before [`reset`](Device::reset) can succeed.
pub trait Device {
    // ── buffers ────────────────────────────────────────────────────────────

    fn create_vertex_buffer(&mut self, size_bytes: usize, layout: VertexLayout) -> Result<BufferId, DeviceError>;

    /// Creates an index buffer; `format` is fixed for the buffer's lifetime.
    fn create_index_buffer(&mut self, size_bytes: usize, format: IndexFormat) -> Result<BufferId, DeviceError>;

    /// Maps `len` bytes starting at `offset` for writing.
    fn lock_buffer(&mut self, id: BufferId, offset: usize, len: usize) -> Result<(), DeviceError>;

    /// The currently mapped region of `id`, if locked.
    fn locked_buffer_mut(&mut self, id: BufferId) -> Option<&mut [u8]>;

    fn unlock_buffer(&mut self, id: BufferId) -> Result<(), DeviceError>;

    /// Destroys the buffer and unbinds it. Unknown handles are ignored.
    fn release_buffer(&mut self, id: BufferId);

    // ── textures ───────────────────────────────────────────────────────────

    fn create_texture(&mut self, width: u32, height: u32, format: TextureFormat) -> Result<TextureId, DeviceError>;

    /// Maps the whole texture for writing and returns its row pitch in bytes.
    fn lock_texture(&mut self, id: TextureId) -> Result<usize, DeviceError>;

    fn locked_texture_mut(&mut self, id: TextureId) -> Option<&mut [u8]>;

    fn unlock_texture(&mut self, id: TextureId) -> Result<(), DeviceError>;

    fn release_texture(&mut self, id: TextureId);

    // ── state blocks ───────────────────────────────────────────────────────

    /// Snapshots the complete current state.
    fn capture_state(&mut self) -> Result<StateBlockId, DeviceError>;

    fn apply_state(&mut self, id: StateBlockId) -> Result<(), DeviceError>;

    fn release_state(&mut self, id: StateBlockId);

    /// The state subsequent draws run under.
    fn pipeline_state(&self) -> &PipelineState;

    // ── state setters ──────────────────────────────────────────────────────

    fn set_render_state(&mut self, state: RenderState);

    fn set_texture_stage_state(&mut self, stage: u32, state: TextureStageState);

    fn set_sampler_state(&mut self, sampler: u32, state: SamplerState);

    fn set_transform(&mut self, kind: TransformKind, matrix: &Matrix);

    fn set_viewport(&mut self, viewport: Viewport);

    fn set_scissor_rect(&mut self, rect: ScissorRect);

    fn set_vertex_shader(&mut self, shader: Option<ShaderId>);

    fn set_pixel_shader(&mut self, shader: Option<ShaderId>);

    fn set_texture(&mut self, stage: u32, texture: Option<TextureId>);

    fn set_stream_source(&mut self, stream: u32, buffer: Option<BufferId>, stride: u32);

    fn set_indices(&mut self, buffer: Option<BufferId>);

    fn set_vertex_layout(&mut self, layout: VertexLayout);

    // ── drawing ────────────────────────────────────────────────────────────

    fn draw_indexed_primitive(&mut self, draw: IndexedDraw) -> Result<(), DeviceError>;

    /// Restores the device after context loss. Fails with
    /// [`DeviceError::InvalidCall`] while any device-pool resource is alive.
    fn reset(&mut self) -> Result<(), DeviceError>;
}
