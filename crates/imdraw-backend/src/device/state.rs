//! Mutable device state, modelled after a fixed-function pipeline.
//!
//! Every device keeps one [`PipelineState`]; state blocks are copies of it.

use crate::gui::TextureId;

use super::{BufferId, ShaderId};

/// Number of texture stages / samplers a device tracks.
pub const MAX_TEXTURE_STAGES: usize = 8;

/// 4×4 matrix, row-major, applied to row vectors (`v' = v · M`).
pub type Matrix = [[f32; 4]; 4];

pub const IDENTITY: Matrix = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// `a · b`.
pub fn mul(a: &Matrix, b: &Matrix) -> Matrix {
    let mut out = [[0.0f32; 4]; 4];
    for (r, row) in out.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            *cell = (0..4).map(|k| a[r][k] * b[k][c]).sum();
        }
    }
    out
}

/// Transforms the row vector `[x, y, z, 1]`; returns the homogeneous result.
pub fn transform_point(m: &Matrix, p: [f32; 3]) -> [f32; 4] {
    let v = [p[0], p[1], p[2], 1.0];
    let mut out = [0.0f32; 4];
    for (c, cell) in out.iter_mut().enumerate() {
        *cell = (0..4).map(|k| v[k] * m[k][c]).sum();
    }
    out
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CullMode {
    None,
    /// Cull clockwise faces.
    Cw,
    /// Cull counter-clockwise faces.
    Ccw,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Blend {
    Zero,
    One,
    SrcColor,
    InvSrcColor,
    SrcAlpha,
    InvSrcAlpha,
    DestAlpha,
    InvDestAlpha,
    DestColor,
    InvDestColor,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BlendOp {
    Add,
    Subtract,
    RevSubtract,
    Min,
    Max,
}

/// One render-state assignment.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RenderState {
    CullMode(CullMode),
    Lighting(bool),
    ZEnable(bool),
    ZWriteEnable(bool),
    AlphaBlendEnable(bool),
    AlphaTestEnable(bool),
    BlendOp(BlendOp),
    SrcBlend(Blend),
    DestBlend(Blend),
    ScissorTestEnable(bool),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RenderStates {
    pub cull_mode: CullMode,
    pub lighting: bool,
    pub z_enable: bool,
    pub z_write_enable: bool,
    pub alpha_blend_enable: bool,
    pub alpha_test_enable: bool,
    pub blend_op: BlendOp,
    pub src_blend: Blend,
    pub dest_blend: Blend,
    pub scissor_test_enable: bool,
}

impl Default for RenderStates {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Ccw,
            lighting: true,
            z_enable: true,
            z_write_enable: true,
            alpha_blend_enable: false,
            alpha_test_enable: false,
            blend_op: BlendOp::Add,
            src_blend: Blend::One,
            dest_blend: Blend::Zero,
            scissor_test_enable: false,
        }
    }
}

impl RenderStates {
    pub fn set(&mut self, state: RenderState) {
        match state {
            RenderState::CullMode(v) => self.cull_mode = v,
            RenderState::Lighting(v) => self.lighting = v,
            RenderState::ZEnable(v) => self.z_enable = v,
            RenderState::ZWriteEnable(v) => self.z_write_enable = v,
            RenderState::AlphaBlendEnable(v) => self.alpha_blend_enable = v,
            RenderState::AlphaTestEnable(v) => self.alpha_test_enable = v,
            RenderState::BlendOp(v) => self.blend_op = v,
            RenderState::SrcBlend(v) => self.src_blend = v,
            RenderState::DestBlend(v) => self.dest_blend = v,
            RenderState::ScissorTestEnable(v) => self.scissor_test_enable = v,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureOp {
    Disable,
    SelectArg1,
    SelectArg2,
    Modulate,
    Add,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureArg {
    Texture,
    Diffuse,
    Current,
}

/// One texture-stage assignment.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TextureStageState {
    ColorOp(TextureOp),
    ColorArg1(TextureArg),
    ColorArg2(TextureArg),
    AlphaOp(TextureOp),
    AlphaArg1(TextureArg),
    AlphaArg2(TextureArg),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureStage {
    pub color_op: TextureOp,
    pub color_arg1: TextureArg,
    pub color_arg2: TextureArg,
    pub alpha_op: TextureOp,
    pub alpha_arg1: TextureArg,
    pub alpha_arg2: TextureArg,
}

impl TextureStage {
    /// Defaults: stage 0 modulates, later stages are disabled.
    pub const fn default_for(stage: usize) -> Self {
        let (color_op, alpha_op) = if stage == 0 {
            (TextureOp::Modulate, TextureOp::SelectArg1)
        } else {
            (TextureOp::Disable, TextureOp::Disable)
        };
        Self {
            color_op,
            color_arg1: TextureArg::Texture,
            color_arg2: TextureArg::Current,
            alpha_op,
            alpha_arg1: TextureArg::Texture,
            alpha_arg2: TextureArg::Current,
        }
    }

    pub fn set(&mut self, state: TextureStageState) {
        match state {
            TextureStageState::ColorOp(v) => self.color_op = v,
            TextureStageState::ColorArg1(v) => self.color_arg1 = v,
            TextureStageState::ColorArg2(v) => self.color_arg2 = v,
            TextureStageState::AlphaOp(v) => self.alpha_op = v,
            TextureStageState::AlphaArg1(v) => self.alpha_arg1 = v,
            TextureStageState::AlphaArg2(v) => self.alpha_arg2 = v,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Filter {
    Point,
    Linear,
}

/// One sampler assignment.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SamplerState {
    MinFilter(Filter),
    MagFilter(Filter),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Sampler {
    pub min_filter: Filter,
    pub mag_filter: Filter,
}

impl Default for Sampler {
    fn default() -> Self {
        Self {
            min_filter: Filter::Point,
            mag_filter: Filter::Point,
        }
    }
}

impl Sampler {
    pub fn set(&mut self, state: SamplerState) {
        match state {
            SamplerState::MinFilter(v) => self.min_filter = v,
            SamplerState::MagFilter(v) => self.mag_filter = v,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TransformKind {
    World,
    View,
    Projection,
}

/// Rasterization viewport in pixels plus depth range.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub min_z: f32,
    pub max_z: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            min_z: 0.0,
            max_z: 1.0,
        }
    }
}

/// Scissor rectangle, `left/top` inclusive, `right/bottom` exclusive.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct ScissorRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ScissorRect {
    #[inline]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }
}

/// Layout of the bound vertex stream.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VertexLayout {
    /// `[f32; 3]` position, `u32` ARGB diffuse, `[f32; 2]` texcoord (24 bytes).
    PositionColorTex,
}

impl VertexLayout {
    pub const fn stride(self) -> u32 {
        match self {
            VertexLayout::PositionColorTex => 24,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    pub const fn size(self) -> usize {
        match self {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }

    /// Format matching an index type by width.
    pub const fn for_width(bytes: usize) -> Self {
        if bytes == 2 { IndexFormat::U16 } else { IndexFormat::U32 }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct StreamSource {
    pub buffer: BufferId,
    pub stride: u32,
}

/// Complete mutable device state.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineState {
    pub render: RenderStates,
    pub stages: [TextureStage; MAX_TEXTURE_STAGES],
    pub samplers: [Sampler; MAX_TEXTURE_STAGES],
    pub textures: [Option<TextureId>; MAX_TEXTURE_STAGES],

    pub world: Matrix,
    pub view: Matrix,
    pub projection: Matrix,

    pub viewport: Viewport,
    pub scissor: ScissorRect,

    pub stream: Option<StreamSource>,
    pub indices: Option<BufferId>,
    pub vertex_layout: Option<VertexLayout>,

    pub vertex_shader: Option<ShaderId>,
    pub pixel_shader: Option<ShaderId>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            render: RenderStates::default(),
            stages: std::array::from_fn(TextureStage::default_for),
            samplers: [Sampler::default(); MAX_TEXTURE_STAGES],
            textures: [None; MAX_TEXTURE_STAGES],
            world: IDENTITY,
            view: IDENTITY,
            projection: IDENTITY,
            viewport: Viewport::default(),
            scissor: ScissorRect::default(),
            stream: None,
            indices: None,
            vertex_layout: None,
            vertex_shader: None,
            pixel_shader: None,
        }
    }
}

impl PipelineState {
    pub fn set_transform(&mut self, kind: TransformKind, m: &Matrix) {
        match kind {
            TransformKind::World => self.world = *m,
            TransformKind::View => self.view = *m,
            TransformKind::Projection => self.projection = *m,
        }
    }

    /// `world · view · projection`.
    pub fn world_view_projection(&self) -> Matrix {
        mul(&mul(&self.world, &self.view), &self.projection)
    }

    /// Applies a texture-stage assignment; out-of-range stages are ignored.
    pub fn set_texture_stage(&mut self, stage: u32, state: TextureStageState) {
        if let Some(s) = self.stages.get_mut(stage as usize) {
            s.set(state);
        }
    }

    pub fn set_sampler(&mut self, sampler: u32, state: SamplerState) {
        if let Some(s) = self.samplers.get_mut(sampler as usize) {
            s.set(state);
        }
    }

    pub fn set_texture(&mut self, stage: u32, texture: Option<TextureId>) {
        if let Some(t) = self.textures.get_mut(stage as usize) {
            *t = texture;
        }
    }

    /// Drops references to a released texture from every stage.
    pub fn forget_texture(&mut self, texture: TextureId) {
        for t in self.textures.iter_mut().filter(|t| **t == Some(texture)) {
            *t = None;
        }
    }

    /// Drops references to a released buffer.
    pub fn forget_buffer(&mut self, buffer: BufferId) {
        if self.stream.is_some_and(|s| s.buffer == buffer) {
            self.stream = None;
        }
        if self.indices == Some(buffer) {
            self.indices = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_neutral() {
        let m = [
            [1.0, 2.0, 3.0, 4.0],
            [5.0, 6.0, 7.0, 8.0],
            [9.0, 10.0, 11.0, 12.0],
            [13.0, 14.0, 15.0, 16.0],
        ];
        assert_eq!(mul(&m, &IDENTITY), m);
        assert_eq!(mul(&IDENTITY, &m), m);
    }

    #[test]
    fn row_vector_picks_up_translation_row() {
        let mut m = IDENTITY;
        m[3] = [10.0, 20.0, 0.0, 1.0];
        assert_eq!(transform_point(&m, [1.0, 2.0, 0.0]), [11.0, 22.0, 0.0, 1.0]);
    }

    #[test]
    fn render_state_assignment_targets_one_field() {
        let mut rs = RenderStates::default();
        rs.set(RenderState::SrcBlend(Blend::SrcAlpha));
        assert_eq!(rs.src_blend, Blend::SrcAlpha);
        assert_eq!(rs.dest_blend, Blend::Zero);
    }

    #[test]
    fn out_of_range_stage_is_ignored() {
        let mut st = PipelineState::default();
        let before = st.clone();
        st.set_texture(MAX_TEXTURE_STAGES as u32, Some(TextureId::new(1)));
        st.set_sampler(99, SamplerState::MinFilter(Filter::Linear));
        assert_eq!(st, before);
    }

    #[test]
    fn forgetting_a_buffer_unbinds_it() {
        let mut st = PipelineState::default();
        st.stream = Some(StreamSource { buffer: BufferId(4), stride: 24 });
        st.indices = Some(BufferId(4));
        st.forget_buffer(BufferId(4));
        assert_eq!(st.stream, None);
        assert_eq!(st.indices, None);
    }
}
