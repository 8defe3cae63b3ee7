use std::collections::HashMap;
use std::ops::Range;

use crate::gui::TextureId;

use super::{
    BufferId, Device, DeviceError, IndexFormat, IndexedDraw, Matrix, PipelineState, RenderState, SamplerState,
    ScissorRect, ShaderId, StateBlockId, StreamSource, TextureFormat, TextureStageState, TransformKind,
    VertexLayout, Viewport,
};

/// Calls a [`HeadlessDevice`] should refuse.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct HeadlessFaults {
    pub refuse_buffer_creation: bool,
    pub refuse_texture_creation: bool,
    pub refuse_texture_lock: bool,
    pub refuse_state_capture: bool,
    /// Every fallible call reports [`DeviceError::DeviceLost`] until
    /// [`Device::reset`] succeeds.
    pub device_lost: bool,
}

/// One indexed draw together with the state it ran under.
#[derive(Debug, Clone)]
pub struct RecordedDraw {
    pub call: IndexedDraw,
    pub state: PipelineState,
}

#[derive(Debug)]
enum BufferKind {
    Vertex(VertexLayout),
    Index(IndexFormat),
}

#[derive(Debug)]
struct Buffer {
    kind: BufferKind,
    bytes: Vec<u8>,
    locked: Option<Range<usize>>,
}

#[derive(Debug)]
struct Texture {
    width: u32,
    height: u32,
    pitch: usize,
    bytes: Vec<u8>,
    locked: bool,
}

/// In-memory [`Device`].
///
/// Buffers and textures hold real bytes, so what the adapter uploads can be
/// read back. Every draw is recorded with a copy of the pipeline state.
#[derive(Debug)]
pub struct HeadlessDevice {
    state: PipelineState,
    next_handle: u64,

    buffers: HashMap<BufferId, Buffer>,
    textures: HashMap<TextureId, Texture>,
    state_blocks: HashMap<StateBlockId, PipelineState>,

    draws: Vec<RecordedDraw>,
    buffers_created: usize,
    resets: usize,

    /// Texture rows start on multiples of this many bytes.
    row_alignment: usize,
    faults: HeadlessFaults,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self {
            state: PipelineState::default(),
            next_handle: 1,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            state_blocks: HashMap::new(),
            draws: Vec::new(),
            buffers_created: 0,
            resets: 0,
            row_alignment: 1,
            faults: HeadlessFaults::default(),
        }
    }

    /// Pads texture rows to `align` bytes, like a device with a pitch larger
    /// than the tight stride.
    pub fn with_row_alignment(mut self, align: usize) -> Self {
        self.row_alignment = align.max(1);
        self
    }

    #[inline]
    pub fn faults_mut(&mut self) -> &mut HeadlessFaults {
        &mut self.faults
    }

    #[inline]
    pub fn draws(&self) -> &[RecordedDraw] {
        &self.draws
    }

    pub fn clear_draws(&mut self) {
        self.draws.clear();
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_state_blocks(&self) -> usize {
        self.state_blocks.len()
    }

    /// Buffers created over the device's lifetime.
    pub fn buffers_created(&self) -> usize {
        self.buffers_created
    }

    pub fn resets(&self) -> usize {
        self.resets
    }

    pub fn buffer_bytes(&self, id: BufferId) -> Option<&[u8]> {
        self.buffers.get(&id).map(|b| b.bytes.as_slice())
    }

    pub fn buffer_index_format(&self, id: BufferId) -> Option<IndexFormat> {
        match self.buffers.get(&id)?.kind {
            BufferKind::Index(f) => Some(f),
            BufferKind::Vertex(_) => None,
        }
    }

    pub fn is_buffer_locked(&self, id: BufferId) -> bool {
        self.buffers.get(&id).is_some_and(|b| b.locked.is_some())
    }

    pub fn texture_bytes(&self, id: TextureId) -> Option<&[u8]> {
        self.textures.get(&id).map(|t| t.bytes.as_slice())
    }

    pub fn texture_pitch(&self, id: TextureId) -> Option<usize> {
        self.textures.get(&id).map(|t| t.pitch)
    }

    pub fn texture_size(&self, id: TextureId) -> Option<(u32, u32)> {
        self.textures.get(&id).map(|t| (t.width, t.height))
    }

    pub fn is_texture_locked(&self, id: TextureId) -> bool {
        self.textures.get(&id).is_some_and(|t| t.locked)
    }

    fn next_handle(&mut self) -> u64 {
        let h = self.next_handle;
        self.next_handle += 1;
        h
    }

    fn check_lost(&self) -> Result<(), DeviceError> {
        if self.faults.device_lost {
            return Err(DeviceError::DeviceLost);
        }
        Ok(())
    }

    fn create_buffer(&mut self, size_bytes: usize, kind: BufferKind) -> Result<BufferId, DeviceError> {
        self.check_lost()?;
        if self.faults.refuse_buffer_creation {
            return Err(DeviceError::OutOfVideoMemory);
        }
        if size_bytes == 0 {
            return Err(DeviceError::invalid("zero-sized buffer"));
        }

        let id = BufferId(self.next_handle());
        self.buffers.insert(
            id,
            Buffer {
                kind,
                bytes: vec![0; size_bytes],
                locked: None,
            },
        );
        self.buffers_created += 1;
        Ok(id)
    }

    /// Checks that every index of `draw` reads inside the bound buffers.
    fn validate_draw(&self, draw: &IndexedDraw) -> Result<(), DeviceError> {
        let stream = self
            .state
            .stream
            .ok_or_else(|| DeviceError::invalid("no vertex stream bound"))?;
        let ib_id = self
            .state
            .indices
            .ok_or_else(|| DeviceError::invalid("no index buffer bound"))?;

        let vb = self.buffers.get(&stream.buffer).ok_or(DeviceError::UnknownResource)?;
        let ib = self.buffers.get(&ib_id).ok_or(DeviceError::UnknownResource)?;
        if vb.locked.is_some() || ib.locked.is_some() {
            return Err(DeviceError::invalid("drawing from a locked buffer"));
        }
        let BufferKind::Index(format) = ib.kind else {
            return Err(DeviceError::invalid("index slot holds a vertex buffer"));
        };

        let width = format.size();
        let first = draw.start_index as usize;
        let count = draw.index_count() as usize;
        if (first + count) * width > ib.bytes.len() {
            return Err(DeviceError::invalid("index range exceeds index buffer"));
        }

        let vertex_capacity = vb.bytes.len() / stream.stride.max(1) as usize;
        for chunk in ib.bytes[first * width..(first + count) * width].chunks_exact(width) {
            let idx = match format {
                IndexFormat::U16 => u64::from(u16::from_le_bytes([chunk[0], chunk[1]])),
                IndexFormat::U32 => u64::from(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])),
            };
            let vertex = i64::from(draw.base_vertex) + idx as i64;
            if vertex < 0 || vertex as usize >= vertex_capacity {
                return Err(DeviceError::invalid(format!("vertex {vertex} outside the bound stream")));
            }
        }
        Ok(())
    }
}

impl Device for HeadlessDevice {
    fn create_vertex_buffer(&mut self, size_bytes: usize, layout: VertexLayout) -> Result<BufferId, DeviceError> {
        self.create_buffer(size_bytes, BufferKind::Vertex(layout))
    }

    fn create_index_buffer(&mut self, size_bytes: usize, format: IndexFormat) -> Result<BufferId, DeviceError> {
        self.create_buffer(size_bytes, BufferKind::Index(format))
    }

    fn lock_buffer(&mut self, id: BufferId, offset: usize, len: usize) -> Result<(), DeviceError> {
        self.check_lost()?;
        let buf = self.buffers.get_mut(&id).ok_or(DeviceError::UnknownResource)?;
        if buf.locked.is_some() {
            return Err(DeviceError::invalid("buffer already locked"));
        }
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= buf.bytes.len())
            .ok_or_else(|| DeviceError::invalid("lock range exceeds buffer"))?;
        buf.locked = Some(offset..end);
        Ok(())
    }

    fn locked_buffer_mut(&mut self, id: BufferId) -> Option<&mut [u8]> {
        let buf = self.buffers.get_mut(&id)?;
        let range = buf.locked.clone()?;
        Some(&mut buf.bytes[range])
    }

    fn unlock_buffer(&mut self, id: BufferId) -> Result<(), DeviceError> {
        let buf = self.buffers.get_mut(&id).ok_or(DeviceError::UnknownResource)?;
        buf.locked
            .take()
            .map(|_| ())
            .ok_or_else(|| DeviceError::invalid("buffer not locked"))
    }

    fn release_buffer(&mut self, id: BufferId) {
        if self.buffers.remove(&id).is_some() {
            self.state.forget_buffer(id);
        }
    }

    fn create_texture(&mut self, width: u32, height: u32, format: TextureFormat) -> Result<TextureId, DeviceError> {
        self.check_lost()?;
        if self.faults.refuse_texture_creation {
            return Err(DeviceError::OutOfVideoMemory);
        }
        if width == 0 || height == 0 {
            return Err(DeviceError::invalid("zero-sized texture"));
        }

        let row = width as usize * format.bytes_per_pixel();
        let pitch = row.div_ceil(self.row_alignment) * self.row_alignment;
        let id = TextureId::new(self.next_handle() as usize);
        self.textures.insert(
            id,
            Texture {
                width,
                height,
                pitch,
                bytes: vec![0; pitch * height as usize],
                locked: false,
            },
        );
        Ok(id)
    }

    fn lock_texture(&mut self, id: TextureId) -> Result<usize, DeviceError> {
        self.check_lost()?;
        if self.faults.refuse_texture_lock {
            return Err(DeviceError::invalid("texture cannot be mapped"));
        }
        let tex = self.textures.get_mut(&id).ok_or(DeviceError::UnknownResource)?;
        if tex.locked {
            return Err(DeviceError::invalid("texture already locked"));
        }
        tex.locked = true;
        Ok(tex.pitch)
    }

    fn locked_texture_mut(&mut self, id: TextureId) -> Option<&mut [u8]> {
        self.textures
            .get_mut(&id)
            .filter(|t| t.locked)
            .map(|t| t.bytes.as_mut_slice())
    }

    fn unlock_texture(&mut self, id: TextureId) -> Result<(), DeviceError> {
        let tex = self.textures.get_mut(&id).ok_or(DeviceError::UnknownResource)?;
        if !tex.locked {
            return Err(DeviceError::invalid("texture not locked"));
        }
        tex.locked = false;
        Ok(())
    }

    fn release_texture(&mut self, id: TextureId) {
        if self.textures.remove(&id).is_some() {
            self.state.forget_texture(id);
        }
    }

    fn capture_state(&mut self) -> Result<StateBlockId, DeviceError> {
        self.check_lost()?;
        if self.faults.refuse_state_capture {
            return Err(DeviceError::OutOfVideoMemory);
        }
        let id = StateBlockId(self.next_handle());
        self.state_blocks.insert(id, self.state.clone());
        Ok(id)
    }

    fn apply_state(&mut self, id: StateBlockId) -> Result<(), DeviceError> {
        let block = self.state_blocks.get(&id).ok_or(DeviceError::UnknownResource)?;
        self.state = block.clone();
        Ok(())
    }

    fn release_state(&mut self, id: StateBlockId) {
        self.state_blocks.remove(&id);
    }

    fn pipeline_state(&self) -> &PipelineState {
        &self.state
    }

    fn set_render_state(&mut self, state: RenderState) {
        self.state.render.set(state);
    }

    fn set_texture_stage_state(&mut self, stage: u32, state: TextureStageState) {
        self.state.set_texture_stage(stage, state);
    }

    fn set_sampler_state(&mut self, sampler: u32, state: SamplerState) {
        self.state.set_sampler(sampler, state);
    }

    fn set_transform(&mut self, kind: TransformKind, matrix: &Matrix) {
        self.state.set_transform(kind, matrix);
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.state.viewport = viewport;
    }

    fn set_scissor_rect(&mut self, rect: ScissorRect) {
        self.state.scissor = rect;
    }

    fn set_vertex_shader(&mut self, shader: Option<ShaderId>) {
        self.state.vertex_shader = shader;
    }

    fn set_pixel_shader(&mut self, shader: Option<ShaderId>) {
        self.state.pixel_shader = shader;
    }

    fn set_texture(&mut self, stage: u32, texture: Option<TextureId>) {
        self.state.set_texture(stage, texture);
    }

    fn set_stream_source(&mut self, stream: u32, buffer: Option<BufferId>, stride: u32) {
        if stream != 0 {
            return;
        }
        self.state.stream = buffer.map(|buffer| StreamSource { buffer, stride });
    }

    fn set_indices(&mut self, buffer: Option<BufferId>) {
        self.state.indices = buffer;
    }

    fn set_vertex_layout(&mut self, layout: VertexLayout) {
        self.state.vertex_layout = Some(layout);
    }

    fn draw_indexed_primitive(&mut self, draw: IndexedDraw) -> Result<(), DeviceError> {
        self.check_lost()?;
        self.validate_draw(&draw)?;
        self.draws.push(RecordedDraw {
            call: draw,
            state: self.state.clone(),
        });
        Ok(())
    }

    fn reset(&mut self) -> Result<(), DeviceError> {
        let live = self.buffers.len() + self.textures.len() + self.state_blocks.len();
        if live > 0 {
            return Err(DeviceError::invalid(format!("{live} device resources still alive")));
        }
        self.faults.device_lost = false;
        self.state = PipelineState::default();
        self.resets += 1;
        Ok(())
    }
}
