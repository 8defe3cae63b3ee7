use std::collections::HashMap;
use std::num::NonZeroU64;
use std::ops::Range;

use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::device::{
    BufferId, Device, DeviceError, Filter, IndexFormat, IndexedDraw, Matrix, PipelineState, RenderState, Sampler,
    SamplerState, ScissorRect, ShaderId, StateBlockId, StreamSource, TextureFormat, TextureStageState, TransformKind,
    VertexLayout, Viewport,
};
use crate::gui::TextureId;

use super::GpuInit;
use super::pipelines::{DRAW_UNIFORM_SIZE, DrawUniform, PipelineKey, UiPipelines};
use super::surface::{self, SurfaceErrorAction};

/// Result of [`WgpuDevice::present`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PresentOutcome {
    Presented,
    /// No frame could be acquired; recorded draws were dropped.
    Skipped,
}

#[derive(Debug)]
enum BufferKind {
    Vertex,
    Index(IndexFormat),
}

struct GpuBuffer {
    kind: BufferKind,
    buffer: wgpu::Buffer,
    staging: Vec<u8>,
    /// Requested size; `staging` may be longer by the copy alignment.
    len: usize,
    locked: Option<Range<usize>>,
}

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
    pitch: usize,
    staging: Vec<u8>,
    locked: bool,
}

struct PendingDraw {
    call: IndexedDraw,
    state: PipelineState,
}

struct DrawUniforms {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    slots: usize,
}

type TextureKey = (Option<TextureId>, Sampler);

/// [`Device`] over a wgpu surface.
///
/// Buffer and texture locks map CPU staging memory that is uploaded on
/// unlock. Draws are recorded with the state they were issued under and
/// replayed into one render pass by [`present`](Self::present).
///
/// Vertex colors are read as `0xAARRGGBB`. Fixed-function emulation covers
/// texture stage 0, the world/view/projection transforms, alpha blending,
/// culling, viewport and scissor. Lighting, depth and alpha test have no
/// effect on pre-lit 2D geometry and are ignored.
pub struct WgpuDevice<'w> {
    surface: wgpu::Surface<'w>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,

    pipelines: UiPipelines,
    samplers: HashMap<Sampler, wgpu::Sampler>,
    white: wgpu::TextureView,
    texture_groups: HashMap<TextureKey, wgpu::BindGroup>,
    uniforms: Option<DrawUniforms>,
    min_draw_slots: usize,
    uniform_stride: u64,

    state: PipelineState,
    next_handle: u64,
    buffers: HashMap<BufferId, GpuBuffer>,
    textures: HashMap<TextureId, GpuTexture>,
    state_blocks: HashMap<StateBlockId, PipelineState>,
    pending: Vec<PendingDraw>,
    lost: bool,
}

impl<'w> WgpuDevice<'w> {
    /// Creates a device bound to a window.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let GpuInit {
            prefer_srgb,
            present_mode,
            alpha_mode,
            power_preference,
            initial_draw_slots,
            required_features,
            required_limits,
            desired_maximum_frame_latency,
        } = init;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("imdraw device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let caps = surface.get_capabilities(&adapter);
        let format =
            surface::choose_surface_format(&caps.formats, prefer_srgb).context("no supported surface formats")?;
        let alpha_mode = surface::choose_alpha_mode(&caps.alpha_modes, alpha_mode);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency,
        };
        surface.configure(&device, &config);
        log::info!("surface configured: {format:?} {}x{}", size.width, size.height);

        let pipelines = UiPipelines::new(&device, format);
        let white = create_white_texture(&device, &queue);
        let align = u64::from(device.limits().min_uniform_buffer_offset_alignment);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            pipelines,
            samplers: HashMap::new(),
            white,
            texture_groups: HashMap::new(),
            uniforms: None,
            min_draw_slots: initial_draw_slots,
            uniform_stride: DRAW_UNIFORM_SIZE.next_multiple_of(align.max(1)),
            state: PipelineState::default(),
            next_handle: 1,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            state_blocks: HashMap::new(),
            pending: Vec::new(),
            lost: false,
        })
    }

    /// Blocking variant of [`new`](Self::new).
    pub fn new_blocking(window: &'w Window, init: GpuInit) -> Result<Self> {
        pollster::block_on(Self::new(window, init))
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Current drawable size in physical pixels.
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Reconfigures the surface. A zero size is remembered but not applied.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        surface::apply_resize(&self.surface, &self.device, &mut self.config, &mut self.size, new_size);
    }

    /// Marks the device lost, as a vanished swapchain would, until the next
    /// successful [`reset`](Device::reset).
    pub fn mark_lost(&mut self) {
        log::warn!("device marked lost");
        self.lost = true;
    }

    pub fn is_lost(&self) -> bool {
        self.lost
    }

    /// Clears the surface to `clear` and replays every draw recorded since
    /// the last present.
    pub fn present(&mut self, clear: wgpu::Color) -> Result<PresentOutcome, DeviceError> {
        let draws = std::mem::take(&mut self.pending);
        self.check_lost()?;
        if self.size.width == 0 || self.size.height == 0 {
            return Ok(PresentOutcome::Skipped);
        }

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(err) => {
                log::debug!("surface acquisition failed: {err}");
                return match surface::map_surface_error(&self.surface, &self.device, &self.config, self.size, err) {
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => Ok(PresentOutcome::Skipped),
                    SurfaceErrorAction::DeviceLost => {
                        self.lost = true;
                        Err(DeviceError::DeviceLost)
                    }
                    SurfaceErrorAction::OutOfMemory => Err(DeviceError::OutOfVideoMemory),
                };
            }
        };

        self.prepare(&draws);

        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("imdraw frame encoder"),
        });

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("imdraw ui pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for (slot, draw) in draws.iter().enumerate() {
                self.record(&mut rpass, slot, draw);
            }
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(PresentOutcome::Presented)
    }

    // ── frame replay ───────────────────────────────────────────────────────

    /// Builds every pipeline, sampler and bind group the draws need and
    /// uploads their uniforms.
    fn prepare(&mut self, draws: &[PendingDraw]) {
        if draws.is_empty() {
            return;
        }

        for draw in draws {
            self.pipelines
                .prepare(&self.device, PipelineKey::from_states(&draw.state.render));
            let key = self.texture_key(&draw.state);
            self.prepare_texture_group(key);
        }

        self.ensure_uniform_slots(draws.len());
        let stride = self.uniform_stride as usize;
        let mut bytes = vec![0u8; stride * draws.len()];
        for (slot, draw) in draws.iter().enumerate() {
            let uniform = DrawUniform::from_state(&draw.state);
            bytes[slot * stride..][..DRAW_UNIFORM_SIZE as usize].copy_from_slice(bytemuck::bytes_of(&uniform));
        }
        if let Some(uniforms) = &self.uniforms {
            self.queue.write_buffer(&uniforms.buffer, 0, &bytes);
        }
    }

    fn ensure_uniform_slots(&mut self, needed: usize) {
        if self.uniforms.as_ref().is_some_and(|u| u.slots >= needed) {
            return;
        }

        let slots = ring_slots(needed, self.min_draw_slots);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("imdraw draw uniforms"),
            size: self.uniform_stride * slots as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("imdraw draw uniform bind group"),
            layout: self.pipelines.uniform_layout(),
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(DRAW_UNIFORM_SIZE),
                }),
            }],
        });
        log::debug!("draw uniform ring grown to {slots} slots");
        self.uniforms = Some(DrawUniforms {
            buffer,
            bind_group,
            slots,
        });
    }

    /// Stage-0 texture and sampler of `state`. Unknown or unbound textures
    /// sample opaque white.
    fn texture_key(&self, state: &PipelineState) -> TextureKey {
        let texture = state.textures[0].filter(|id| self.textures.contains_key(id));
        (texture, state.samplers[0])
    }

    fn prepare_texture_group(&mut self, key: TextureKey) {
        if self.texture_groups.contains_key(&key) {
            return;
        }

        let (texture, filters) = key;
        let device = &self.device;
        let sampler = self.samplers.entry(filters).or_insert_with(|| {
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("imdraw stage0 sampler"),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: filter_mode(filters.mag_filter),
                min_filter: filter_mode(filters.min_filter),
                mipmap_filter: wgpu::MipmapFilterMode::Nearest,
                ..Default::default()
            })
        });
        let view = texture
            .and_then(|id| self.textures.get(&id))
            .map_or(&self.white, |t| &t.view);

        let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("imdraw stage0 bind group"),
            layout: self.pipelines.texture_layout(),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        self.texture_groups.insert(key, group);
    }

    fn record(&self, rpass: &mut wgpu::RenderPass<'_>, slot: usize, draw: &PendingDraw) {
        let state = &draw.state;
        let target = (self.config.width, self.config.height);

        let Some(viewport) = clamp_viewport(state.viewport, target) else { return; };
        let Some(scissor) = clamp_scissor(state.scissor, state.render.scissor_test_enable, target) else { return; };

        let Some(stream) = state.stream else { return; };
        let Some(index_id) = state.indices else { return; };
        let Some(vb) = self.buffers.get(&stream.buffer) else {
            log::debug!("skipping draw: vertex buffer {:?} released", stream.buffer);
            return;
        };
        let Some(ib) = self.buffers.get(&index_id) else {
            log::debug!("skipping draw: index buffer {index_id:?} released");
            return;
        };
        let BufferKind::Index(format) = ib.kind else { return; };

        let Some(pipeline) = self.pipelines.get(PipelineKey::from_states(&state.render)) else { return; };
        let Some(group) = self.texture_groups.get(&self.texture_key(state)) else { return; };
        let Some(uniforms) = &self.uniforms else { return; };

        let (x, y, w, h, min_z, max_z) = viewport;
        let (sx, sy, sw, sh) = scissor;

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &uniforms.bind_group, &[(slot as u64 * self.uniform_stride) as u32]);
        rpass.set_bind_group(1, group, &[]);
        rpass.set_viewport(x, y, w, h, min_z, max_z);
        rpass.set_scissor_rect(sx, sy, sw, sh);
        rpass.set_vertex_buffer(0, vb.buffer.slice(..));
        rpass.set_index_buffer(ib.buffer.slice(..), index_format(format));

        let first = draw.call.start_index;
        rpass.draw_indexed(first..first + draw.call.index_count(), draw.call.base_vertex, 0..1);
    }

    // ── bookkeeping ────────────────────────────────────────────────────────

    fn next_handle(&mut self) -> u64 {
        let h = self.next_handle;
        self.next_handle += 1;
        h
    }

    fn check_lost(&self) -> Result<(), DeviceError> {
        if self.lost {
            return Err(DeviceError::DeviceLost);
        }
        Ok(())
    }

    fn create_buffer(&mut self, size_bytes: usize, kind: BufferKind) -> Result<BufferId, DeviceError> {
        self.check_lost()?;
        if size_bytes == 0 {
            return Err(DeviceError::invalid("zero-sized buffer"));
        }
        let padded = size_bytes.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT as usize);
        if padded as u64 > self.device.limits().max_buffer_size {
            return Err(DeviceError::OutOfVideoMemory);
        }

        let (label, usage) = match kind {
            BufferKind::Vertex => ("imdraw vertex buffer", wgpu::BufferUsages::VERTEX),
            BufferKind::Index(_) => ("imdraw index buffer", wgpu::BufferUsages::INDEX),
        };
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: padded as u64,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let id = BufferId(self.next_handle());
        self.buffers.insert(
            id,
            GpuBuffer {
                kind,
                buffer,
                staging: vec![0; padded],
                len: size_bytes,
                locked: None,
            },
        );
        Ok(id)
    }
}

impl Device for WgpuDevice<'_> {
    fn create_vertex_buffer(&mut self, size_bytes: usize, _layout: VertexLayout) -> Result<BufferId, DeviceError> {
        self.create_buffer(size_bytes, BufferKind::Vertex)
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
            .filter(|&end| end <= buf.len)
            .ok_or_else(|| DeviceError::invalid("lock range exceeds buffer"))?;
        buf.locked = Some(offset..end);
        Ok(())
    }

    fn locked_buffer_mut(&mut self, id: BufferId) -> Option<&mut [u8]> {
        let buf = self.buffers.get_mut(&id)?;
        let range = buf.locked.clone()?;
        Some(&mut buf.staging[range])
    }

    fn unlock_buffer(&mut self, id: BufferId) -> Result<(), DeviceError> {
        let buf = self.buffers.get_mut(&id).ok_or(DeviceError::UnknownResource)?;
        let range = buf
            .locked
            .take()
            .ok_or_else(|| DeviceError::invalid("buffer not locked"))?;
        if range.is_empty() {
            return Ok(());
        }

        let upload = copy_aligned(range, buf.staging.len());
        self.queue
            .write_buffer(&buf.buffer, upload.start as u64, &buf.staging[upload]);
        Ok(())
    }

    fn release_buffer(&mut self, id: BufferId) {
        if let Some(buf) = self.buffers.remove(&id) {
            buf.buffer.destroy();
            self.state.forget_buffer(id);
        }
    }

    fn create_texture(&mut self, width: u32, height: u32, format: TextureFormat) -> Result<TextureId, DeviceError> {
        self.check_lost()?;
        if width == 0 || height == 0 {
            return Err(DeviceError::invalid("zero-sized texture"));
        }
        let max = self.device.limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(DeviceError::OutOfVideoMemory);
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("imdraw texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let pitch = row_pitch(width, format);

        let id = TextureId::new(self.next_handle() as usize);
        self.textures.insert(
            id,
            GpuTexture {
                texture,
                view,
                width,
                height,
                pitch,
                staging: vec![0; pitch * height as usize],
                locked: false,
            },
        );
        Ok(id)
    }

    fn lock_texture(&mut self, id: TextureId) -> Result<usize, DeviceError> {
        self.check_lost()?;
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
            .map(|t| t.staging.as_mut_slice())
    }

    fn unlock_texture(&mut self, id: TextureId) -> Result<(), DeviceError> {
        let tex = self.textures.get_mut(&id).ok_or(DeviceError::UnknownResource)?;
        if !tex.locked {
            return Err(DeviceError::invalid("texture not locked"));
        }
        tex.locked = false;

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &tex.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &tex.staging,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(tex.pitch as u32),
                rows_per_image: Some(tex.height),
            },
            wgpu::Extent3d {
                width: tex.width,
                height: tex.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn release_texture(&mut self, id: TextureId) {
        if let Some(tex) = self.textures.remove(&id) {
            tex.texture.destroy();
            self.texture_groups.retain(|(t, _), _| *t != Some(id));
            self.state.forget_texture(id);
        }
    }

    fn capture_state(&mut self) -> Result<StateBlockId, DeviceError> {
        self.check_lost()?;
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

        // No shader objects are ever created here.
        if self.state.vertex_shader.is_some() || self.state.pixel_shader.is_some() {
            return Err(DeviceError::UnknownResource);
        }
        let Some(layout) = self.state.vertex_layout else {
            return Err(DeviceError::invalid("no vertex layout set"));
        };
        let stream = self
            .state
            .stream
            .ok_or_else(|| DeviceError::invalid("no vertex stream bound"))?;
        if stream.stride != layout.stride() {
            return Err(DeviceError::invalid("stream stride does not match the vertex layout"));
        }
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
        let end = (draw.start_index as usize + draw.index_count() as usize) * format.size();
        if end > ib.len {
            return Err(DeviceError::invalid("index range exceeds index buffer"));
        }

        self.pending.push(PendingDraw {
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

        if self.size.width > 0 && self.size.height > 0 {
            self.surface.configure(&self.device, &self.config);
        }
        self.lost = false;
        self.pending.clear();
        self.texture_groups.clear();
        self.state = PipelineState::default();
        log::info!("device reset");
        Ok(())
    }
}

fn create_white_texture(device: &wgpu::Device, queue: &wgpu::Queue) -> wgpu::TextureView {
    let size = wgpu::Extent3d {
        width: 1,
        height: 1,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("imdraw white texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &[0xff; 4],
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4),
            rows_per_image: Some(1),
        },
        size,
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// Uniform ring size for `needed` draws, never below `minimum`.
fn ring_slots(needed: usize, minimum: usize) -> usize {
    needed.max(minimum).max(1).next_power_of_two()
}

fn filter_mode(filter: Filter) -> wgpu::FilterMode {
    match filter {
        Filter::Point => wgpu::FilterMode::Nearest,
        Filter::Linear => wgpu::FilterMode::Linear,
    }
}

fn index_format(format: IndexFormat) -> wgpu::IndexFormat {
    match format {
        IndexFormat::U16 => wgpu::IndexFormat::Uint16,
        IndexFormat::U32 => wgpu::IndexFormat::Uint32,
    }
}

/// Texture rows start on wgpu's copy alignment.
fn row_pitch(width: u32, format: TextureFormat) -> usize {
    let row = width as usize * format.bytes_per_pixel();
    row.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize)
}

/// Widens `range` to copy-aligned bounds inside a buffer of `len` bytes.
/// `len` is itself a multiple of the alignment.
fn copy_aligned(range: Range<usize>, len: usize) -> Range<usize> {
    let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
    let start = range.start / align * align;
    let end = range.end.next_multiple_of(align).min(len);
    start..end
}

/// Viewport as `(x, y, w, h, min_z, max_z)` clipped to the render target,
/// or `None` when nothing of it is visible.
fn clamp_viewport(vp: Viewport, (tw, th): (u32, u32)) -> Option<(f32, f32, f32, f32, f32, f32)> {
    if vp.x >= tw || vp.y >= th {
        return None;
    }
    let w = vp.width.min(tw - vp.x);
    let h = vp.height.min(th - vp.y);
    if w == 0 || h == 0 {
        return None;
    }
    let (min_z, max_z) = (vp.min_z.clamp(0.0, 1.0), vp.max_z.clamp(0.0, 1.0));
    Some((vp.x as f32, vp.y as f32, w as f32, h as f32, min_z, max_z.max(min_z)))
}

/// Scissor as `(x, y, w, h)`. A disabled test covers the whole target; an
/// enabled one is clipped to it and yields `None` when empty.
fn clamp_scissor(rect: ScissorRect, enabled: bool, (tw, th): (u32, u32)) -> Option<(u32, u32, u32, u32)> {
    if !enabled {
        return Some((0, 0, tw, th));
    }
    let left = rect.left.clamp(0, tw as i32) as u32;
    let top = rect.top.clamp(0, th as i32) as u32;
    let right = rect.right.clamp(0, tw as i32) as u32;
    let bottom = rect.bottom.clamp(0, th as i32) as u32;
    if right <= left || bottom <= top {
        return None;
    }
    Some((left, top, right - left, bottom - top))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_ring_starts_at_configured_size() {
        assert_eq!(ring_slots(3, 64), 64);
        assert_eq!(ring_slots(65, 64), 128);
        assert_eq!(ring_slots(5, 0), 8);
        assert_eq!(ring_slots(0, 0), 1);
    }

    #[test]
    fn pitch_is_copy_aligned() {
        assert_eq!(row_pitch(1, TextureFormat::Rgba8), 256);
        assert_eq!(row_pitch(64, TextureFormat::Rgba8), 256);
        assert_eq!(row_pitch(65, TextureFormat::Rgba8), 512);
    }

    #[test]
    fn upload_ranges_widen_to_four_bytes() {
        assert_eq!(copy_aligned(0..24, 24), 0..24);
        assert_eq!(copy_aligned(2..6, 12), 0..8);
        assert_eq!(copy_aligned(6..10, 12), 4..12);
    }

    #[test]
    fn viewport_is_clipped_to_target() {
        let vp = Viewport {
            x: 100,
            y: 0,
            width: 800,
            height: 600,
            min_z: 0.0,
            max_z: 1.0,
        };
        assert_eq!(clamp_viewport(vp, (640, 480)), Some((100.0, 0.0, 540.0, 480.0, 0.0, 1.0)));
        assert_eq!(clamp_viewport(Viewport { x: 640, ..vp }, (640, 480)), None);
    }

    #[test]
    fn disabled_scissor_covers_target() {
        let rect = ScissorRect::new(10, 10, 20, 20);
        assert_eq!(clamp_scissor(rect, false, (640, 480)), Some((0, 0, 640, 480)));
    }

    #[test]
    fn scissor_is_clipped_and_empty_rects_skip() {
        assert_eq!(
            clamp_scissor(ScissorRect::new(-5, 10, 700, 20), true, (640, 480)),
            Some((0, 10, 640, 10))
        );
        assert_eq!(clamp_scissor(ScissorRect::new(30, 30, 30, 40), true, (640, 480)), None);
        assert_eq!(clamp_scissor(ScissorRect::new(700, 0, 800, 10), true, (640, 480)), None);
    }
}
