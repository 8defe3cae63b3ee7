use std::collections::HashMap;
use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};

use crate::device::{Blend, BlendOp, CullMode, Matrix, PipelineState, RenderStates, TextureArg, TextureOp};

/// Per-draw uniform block, one dynamic-offset slot per recorded draw.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(crate) struct DrawUniform {
    pub mvp: Matrix,
    pub ops: [u32; 4],
}

pub(crate) const DRAW_UNIFORM_SIZE: u64 = std::mem::size_of::<DrawUniform>() as u64;

impl DrawUniform {
    pub fn from_state(state: &PipelineState) -> Self {
        let stage = &state.stages[0];
        Self {
            mvp: state.world_view_projection(),
            ops: [
                stage_op(stage.color_op, stage.color_arg1, stage.color_arg2),
                stage_op(stage.alpha_op, stage.alpha_arg1, stage.alpha_arg2),
                0,
                0,
            ],
        }
    }
}

const OP_MODULATE: u32 = 0;
const OP_TEXTURE: u32 = 1;
const OP_DIFFUSE: u32 = 2;
const OP_ADD: u32 = 3;

/// Encodes a stage-0 operation for the shader.
///
/// Stage 0 has no previous stage, so `Current` reads the diffuse color.
pub(crate) fn stage_op(op: TextureOp, arg1: TextureArg, arg2: TextureArg) -> u32 {
    let select = |arg| match arg {
        TextureArg::Texture => OP_TEXTURE,
        TextureArg::Diffuse | TextureArg::Current => OP_DIFFUSE,
    };
    match op {
        TextureOp::Modulate => OP_MODULATE,
        TextureOp::Add => OP_ADD,
        TextureOp::SelectArg1 => select(arg1),
        TextureOp::SelectArg2 => select(arg2),
        TextureOp::Disable => OP_DIFFUSE,
    }
}

/// Render-state subset baked into a wgpu pipeline.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub(crate) struct PipelineKey {
    pub blend: Option<(Blend, Blend, BlendOp)>,
    pub cull: CullMode,
}

impl PipelineKey {
    pub fn from_states(render: &RenderStates) -> Self {
        Self {
            blend: render
                .alpha_blend_enable
                .then_some((render.src_blend, render.dest_blend, render.blend_op)),
            cull: render.cull_mode,
        }
    }
}

pub(crate) fn blend_factor(blend: Blend) -> wgpu::BlendFactor {
    match blend {
        Blend::Zero => wgpu::BlendFactor::Zero,
        Blend::One => wgpu::BlendFactor::One,
        Blend::SrcColor => wgpu::BlendFactor::Src,
        Blend::InvSrcColor => wgpu::BlendFactor::OneMinusSrc,
        Blend::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
        Blend::InvSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
        Blend::DestAlpha => wgpu::BlendFactor::DstAlpha,
        Blend::InvDestAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
        Blend::DestColor => wgpu::BlendFactor::Dst,
        Blend::InvDestColor => wgpu::BlendFactor::OneMinusDst,
    }
}

/// Same equation on color and alpha. Min/max ignore the factors, and wgpu
/// requires them to be `One`.
pub(crate) fn blend_state(key: PipelineKey) -> Option<wgpu::BlendState> {
    let (src, dst, op) = key.blend?;
    let (src, dst, operation) = match op {
        BlendOp::Add => (blend_factor(src), blend_factor(dst), wgpu::BlendOperation::Add),
        BlendOp::Subtract => (blend_factor(src), blend_factor(dst), wgpu::BlendOperation::Subtract),
        BlendOp::RevSubtract => (blend_factor(src), blend_factor(dst), wgpu::BlendOperation::ReverseSubtract),
        BlendOp::Min => (wgpu::BlendFactor::One, wgpu::BlendFactor::One, wgpu::BlendOperation::Min),
        BlendOp::Max => (wgpu::BlendFactor::One, wgpu::BlendFactor::One, wgpu::BlendOperation::Max),
    };
    let component = wgpu::BlendComponent {
        src_factor: src,
        dst_factor: dst,
        operation,
    };
    Some(wgpu::BlendState {
        color: component,
        alpha: component,
    })
}

/// Front faces wind clockwise.
pub(crate) fn cull_face(cull: CullMode) -> Option<wgpu::Face> {
    match cull {
        CullMode::None => None,
        CullMode::Cw => Some(wgpu::Face::Front),
        CullMode::Ccw => Some(wgpu::Face::Back),
    }
}

fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Unorm8x4,
        2 => Float32x2,
    ];
    wgpu::VertexBufferLayout {
        array_stride: crate::render::DEVICE_VERTEX_SIZE as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRS,
    }
}

/// Shader, layouts and one lazily built pipeline per [`PipelineKey`].
pub(crate) struct UiPipelines {
    format: wgpu::TextureFormat,
    shader: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    cache: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl UiPipelines {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("imdraw ui shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/ui.wgsl").into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("imdraw draw uniform bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(DRAW_UNIFORM_SIZE),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("imdraw stage0 bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("imdraw ui pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            immediate_size: 0,
        });

        Self {
            format,
            shader,
            layout,
            uniform_layout,
            texture_layout,
            cache: HashMap::new(),
        }
    }

    #[inline]
    pub fn uniform_layout(&self) -> &wgpu::BindGroupLayout {
        &self.uniform_layout
    }

    #[inline]
    pub fn texture_layout(&self) -> &wgpu::BindGroupLayout {
        &self.texture_layout
    }

    /// Builds the pipeline for `key` if it does not exist yet.
    pub fn prepare(&mut self, device: &wgpu::Device, key: PipelineKey) {
        if self.cache.contains_key(&key) {
            return;
        }

        log::debug!("building ui pipeline for {key:?}");
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("imdraw ui pipeline"),
            layout: Some(&self.layout),
            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[vertex_layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.format,
                    blend: blend_state(key),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Cw,
                cull_mode: cull_face(key.cull),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });
        self.cache.insert(key, pipeline);
    }

    pub fn get(&self, key: PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.cache.get(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::TextureStage;

    #[test]
    fn default_stage_zero_modulates_color_and_selects_texture_alpha() {
        let state = PipelineState::default();
        let u = DrawUniform::from_state(&state);
        assert_eq!(u.ops[0], OP_MODULATE);
        assert_eq!(u.ops[1], OP_TEXTURE);
    }

    #[test]
    fn select_ops_follow_their_argument() {
        assert_eq!(stage_op(TextureOp::SelectArg1, TextureArg::Diffuse, TextureArg::Texture), OP_DIFFUSE);
        assert_eq!(stage_op(TextureOp::SelectArg2, TextureArg::Diffuse, TextureArg::Texture), OP_TEXTURE);
        assert_eq!(stage_op(TextureOp::SelectArg1, TextureArg::Current, TextureArg::Texture), OP_DIFFUSE);
        assert_eq!(stage_op(TextureOp::Disable, TextureArg::Texture, TextureArg::Texture), OP_DIFFUSE);
    }

    #[test]
    fn later_stages_do_not_reach_the_shader() {
        let mut state = PipelineState::default();
        state.stages[1] = TextureStage::default_for(0);
        state.stages[0].color_op = TextureOp::Add;
        assert_eq!(DrawUniform::from_state(&state).ops[0], OP_ADD);
    }

    #[test]
    fn blending_off_has_no_blend_state() {
        let mut render = RenderStates::default();
        render.alpha_blend_enable = false;
        let key = PipelineKey::from_states(&render);
        assert_eq!(key.blend, None);
        assert!(blend_state(key).is_none());
    }

    #[test]
    fn ui_blend_maps_to_straight_alpha() {
        let render = RenderStates {
            alpha_blend_enable: true,
            src_blend: Blend::SrcAlpha,
            dest_blend: Blend::InvSrcAlpha,
            blend_op: BlendOp::Add,
            ..RenderStates::default()
        };
        let state = blend_state(PipelineKey::from_states(&render)).unwrap();
        assert_eq!(state.color.src_factor, wgpu::BlendFactor::SrcAlpha);
        assert_eq!(state.color.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
        assert_eq!(state.alpha, state.color);
    }

    #[test]
    fn min_max_force_unit_factors() {
        let key = PipelineKey {
            blend: Some((Blend::SrcAlpha, Blend::Zero, BlendOp::Max)),
            cull: CullMode::None,
        };
        let state = blend_state(key).unwrap();
        assert_eq!(state.color.operation, wgpu::BlendOperation::Max);
        assert_eq!(state.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(state.color.dst_factor, wgpu::BlendFactor::One);
    }

    #[test]
    fn cull_modes_map_against_clockwise_front() {
        assert_eq!(cull_face(CullMode::None), None);
        assert_eq!(cull_face(CullMode::Ccw), Some(wgpu::Face::Back));
        assert_eq!(cull_face(CullMode::Cw), Some(wgpu::Face::Front));
    }

    #[test]
    fn uniform_is_tightly_packed() {
        assert_eq!(DRAW_UNIFORM_SIZE, 80);
    }
}
