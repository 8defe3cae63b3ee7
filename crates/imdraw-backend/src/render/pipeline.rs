use std::ops::{Deref, DerefMut};

use crate::device::{
    Blend, BlendOp, BufferId, CullMode, Device, DeviceError, Filter, IDENTITY, Matrix, RenderState, SamplerState,
    StateBlockId, TextureArg, TextureOp, TextureStageState, TransformKind, VertexLayout, Viewport,
};
use crate::error::RenderError;

/// Holds a captured state block and puts it back when dropped.
///
/// Derefs to the device, so everything done between [`begin`](Self::begin)
/// and the drop goes through the guard.
pub struct StateGuard<'d, D: Device + ?Sized> {
    device: &'d mut D,
    block: StateBlockId,
    restored: bool,
}

impl<'d, D: Device + ?Sized> StateGuard<'d, D> {
    /// Captures the device's complete current state.
    pub fn begin(device: &'d mut D) -> Result<Self, RenderError> {
        let block = device
            .capture_state()
            .map_err(|e| RenderError::from_device(e, RenderError::StateCapture))?;
        Ok(Self { device, block, restored: false })
    }

    /// Restores the captured state now and reports whether the device took it.
    /// The block is released either way.
    pub fn end(mut self) -> Result<(), DeviceError> {
        self.restore()
    }

    fn restore(&mut self) -> Result<(), DeviceError> {
        self.restored = true;
        let applied = self.device.apply_state(self.block);
        self.device.release_state(self.block);
        applied
    }
}

impl<D: Device + ?Sized> Deref for StateGuard<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        self.device
    }
}

impl<D: Device + ?Sized> DerefMut for StateGuard<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        self.device
    }
}

impl<D: Device + ?Sized> Drop for StateGuard<'_, D> {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(e) = self.restore() {
            log::warn!("restoring device state failed: {e}");
        }
    }
}

/// Orthographic projection for a `width × height` pixel viewport, row-major
/// for row vectors.
///
/// Screen edges sit at `offset` and `size + offset`, so pixel `(offset,
/// offset)` maps to clip `(-1, 1)` and depth is a constant `0.5`.
pub fn ortho_projection(width: f32, height: f32, offset: f32) -> Matrix {
    let (l, r) = (offset, width + offset);
    let (t, b) = (offset, height + offset);
    [
        [2.0 / (r - l), 0.0, 0.0, 0.0],
        [0.0, 2.0 / (t - b), 0.0, 0.0],
        [0.0, 0.0, 0.5, 0.0],
        [(l + r) / (l - r), (t + b) / (b - t), 0.5, 1.0],
    ]
}

/// Fixed state the UI is drawn under.
#[derive(Debug, Copy, Clone)]
pub struct UiState {
    pub display_size: [f32; 2],
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
    pub pixel_offset: f32,
    pub filter: Filter,
}

/// Binds the UI buffers and applies the alpha-blended, scissored, unlit,
/// depthless pipeline with an orthographic projection.
pub fn setup_ui_state<D: Device + ?Sized>(device: &mut D, ui: &UiState) {
    let [w, h] = ui.display_size;
    let layout = VertexLayout::PositionColorTex;

    device.set_stream_source(0, Some(ui.vertex_buffer), layout.stride());
    device.set_indices(Some(ui.index_buffer));
    device.set_vertex_layout(layout);
    device.set_viewport(Viewport {
        x: 0,
        y: 0,
        width: w as u32,
        height: h as u32,
        min_z: 0.0,
        max_z: 1.0,
    });

    device.set_pixel_shader(None);
    device.set_vertex_shader(None);

    for state in [
        RenderState::CullMode(CullMode::None),
        RenderState::Lighting(false),
        RenderState::ZEnable(false),
        RenderState::ZWriteEnable(false),
        RenderState::AlphaBlendEnable(true),
        RenderState::AlphaTestEnable(false),
        RenderState::BlendOp(BlendOp::Add),
        RenderState::SrcBlend(Blend::SrcAlpha),
        RenderState::DestBlend(Blend::InvSrcAlpha),
        RenderState::ScissorTestEnable(true),
    ] {
        device.set_render_state(state);
    }

    for state in [
        TextureStageState::ColorOp(TextureOp::Modulate),
        TextureStageState::ColorArg1(TextureArg::Texture),
        TextureStageState::ColorArg2(TextureArg::Diffuse),
        TextureStageState::AlphaOp(TextureOp::Modulate),
        TextureStageState::AlphaArg1(TextureArg::Texture),
        TextureStageState::AlphaArg2(TextureArg::Diffuse),
    ] {
        device.set_texture_stage_state(0, state);
    }

    device.set_sampler_state(0, SamplerState::MinFilter(ui.filter));
    device.set_sampler_state(0, SamplerState::MagFilter(ui.filter));

    device.set_transform(TransformKind::World, &IDENTITY);
    device.set_transform(TransformKind::View, &IDENTITY);
    device.set_transform(TransformKind::Projection, &ortho_projection(w, h, ui.pixel_offset));
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::device::{HeadlessDevice, ScissorRect, transform_point};

    fn assert_matrix_eq(a: &Matrix, b: &Matrix) {
        for r in 0..4 {
            for c in 0..4 {
                assert_relative_eq!(a[r][c], b[r][c], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn projection_coefficients_for_800x600() {
        let m = ortho_projection(800.0, 600.0, 0.5);
        // L = 0.5, R = 800.5, T = 0.5, B = 600.5
        let expected = [
            [2.0 / 800.0, 0.0, 0.0, 0.0],
            [0.0, 2.0 / -600.0, 0.0, 0.0],
            [0.0, 0.0, 0.5, 0.0],
            [801.0 / -800.0, 601.0 / 600.0, 0.5, 1.0],
        ];
        assert_matrix_eq(&m, &expected);
    }

    #[test]
    fn projection_maps_screen_corners() {
        let m = ortho_projection(800.0, 600.0, 0.5);

        let top_left = transform_point(&m, [0.0, 0.0, 0.0]);
        assert_relative_eq!(top_left[0], -1.0 - 1.0 / 800.0, epsilon = 1e-6);
        assert_relative_eq!(top_left[1], 1.0 + 1.0 / 600.0, epsilon = 1e-6);
        assert_relative_eq!(top_left[2], 0.5);
        assert_relative_eq!(top_left[3], 1.0);

        let bottom_right = transform_point(&m, [800.0, 600.0, 0.0]);
        assert_relative_eq!(bottom_right[0], 1.0 - 1.0 / 800.0, epsilon = 1e-6);
        assert_relative_eq!(bottom_right[1], -1.0 + 1.0 / 600.0, epsilon = 1e-6);

        let aligned = transform_point(&m, [0.5, 0.5, 0.0]);
        assert_relative_eq!(aligned[0], -1.0, epsilon = 1e-6);
        assert_relative_eq!(aligned[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn zero_offset_maps_edges_exactly() {
        let m = ortho_projection(640.0, 480.0, 0.0);
        let p = transform_point(&m, [640.0, 480.0, 0.0]);
        assert_relative_eq!(p[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(p[1], -1.0, epsilon = 1e-6);
    }

    #[test]
    fn state_is_bit_identical_after_end() {
        let mut dev = HeadlessDevice::new();
        dev.set_render_state(RenderState::SrcBlend(Blend::DestColor));
        dev.set_scissor_rect(ScissorRect::new(5, 5, 50, 50));
        let before = dev.pipeline_state().clone();

        let mut guard = StateGuard::begin(&mut dev).unwrap();
        setup_ui_state(
            &mut *guard,
            &UiState {
                display_size: [800.0, 600.0],
                vertex_buffer: BufferId(1),
                index_buffer: BufferId(2),
                pixel_offset: 0.5,
                filter: Filter::Linear,
            },
        );
        guard.set_render_state(RenderState::CullMode(CullMode::Cw));
        guard.set_texture(3, None);
        assert_ne!(guard.pipeline_state(), &before);
        guard.end().unwrap();

        assert_eq!(dev.pipeline_state(), &before);
        assert_eq!(dev.live_state_blocks(), 0);
    }

    #[test]
    fn dropping_the_guard_restores() {
        let mut dev = HeadlessDevice::new();
        let before = dev.pipeline_state().clone();
        {
            let mut guard = StateGuard::begin(&mut dev).unwrap();
            guard.set_render_state(RenderState::ZEnable(false));
        }
        assert_eq!(dev.pipeline_state(), &before);
    }

    #[test]
    fn refused_capture_touches_nothing() {
        let mut dev = HeadlessDevice::new();
        dev.faults_mut().refuse_state_capture = true;
        let before = dev.pipeline_state().clone();

        assert!(matches!(StateGuard::begin(&mut dev), Err(RenderError::StateCapture(_))));
        assert_eq!(dev.pipeline_state(), &before);
    }

    #[test]
    fn ui_state_values() {
        let mut dev = HeadlessDevice::new();
        setup_ui_state(
            &mut dev,
            &UiState {
                display_size: [800.0, 600.0],
                vertex_buffer: BufferId(1),
                index_buffer: BufferId(2),
                pixel_offset: 0.5,
                filter: Filter::Linear,
            },
        );
        let st = dev.pipeline_state();

        assert_eq!(st.render.cull_mode, CullMode::None);
        assert!(!st.render.lighting && !st.render.z_enable && !st.render.z_write_enable);
        assert!(st.render.alpha_blend_enable && st.render.scissor_test_enable);
        assert_eq!(
            (st.render.src_blend, st.render.dest_blend, st.render.blend_op),
            (Blend::SrcAlpha, Blend::InvSrcAlpha, BlendOp::Add)
        );
        assert_eq!(st.stages[0].alpha_op, TextureOp::Modulate);
        assert_eq!(st.samplers[0].min_filter, Filter::Linear);
        assert_eq!((st.viewport.width, st.viewport.height), (800, 600));
        assert_eq!(st.vertex_shader, None);
        assert_eq!(st.world, IDENTITY);
    }
}
