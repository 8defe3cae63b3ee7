use crate::device::{Device, IndexedDraw, PrimitiveType, ScissorRect};
use crate::error::RenderError;
use crate::gui::{ClipRect, DrawCmdKind, DrawData};

/// Counters for one dispatched frame.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct DispatchStats {
    pub draw_calls: u32,
    pub callbacks: u32,
    pub triangles: u32,
}

/// Scissor rectangle covering `clip`, truncated toward zero.
#[inline]
pub fn scissor_for(clip: ClipRect) -> ScissorRect {
    ScissorRect::new(clip.x1 as i32, clip.y1 as i32, clip.x2 as i32, clip.y2 as i32)
}

/// Issues every command of `data` in order.
///
/// Vertices and indices of all lists must already sit back to back in the
/// bound buffers. Callback commands run in place of a draw and may leave the
/// device in any state.
pub fn dispatch(device: &mut dyn Device, data: &DrawData) -> Result<DispatchStats, RenderError> {
    let mut stats = DispatchStats::default();
    let mut vtx_offset: usize = 0;
    let mut idx_offset: usize = 0;

    for list in &data.lists {
        for cmd in &list.cmd_buffer {
            match &cmd.kind {
                DrawCmdKind::Callback(callback) => {
                    callback.invoke(device, list, cmd);
                    stats.callbacks += 1;
                }
                DrawCmdKind::Elements if cmd.elem_count > 0 => {
                    device.set_texture(0, cmd.texture_id);
                    device.set_scissor_rect(scissor_for(cmd.clip_rect));

                    let draw = IndexedDraw {
                        primitive: PrimitiveType::TriangleList,
                        base_vertex: vtx_offset as i32,
                        min_index: 0,
                        num_vertices: list.vtx_buffer.len() as u32,
                        start_index: idx_offset as u32,
                        primitive_count: cmd.elem_count / 3,
                    };
                    device
                        .draw_indexed_primitive(draw)
                        .map_err(|e| RenderError::from_device(e, RenderError::Draw))?;

                    stats.draw_calls += 1;
                    stats.triangles += draw.primitive_count;
                }
                DrawCmdKind::Elements => {}
            }
            idx_offset += cmd.elem_count as usize;
        }
        vtx_offset += list.vtx_buffer.len();
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::config::BackendConfig;
    use crate::device::{HeadlessDevice, RenderState, CullMode};
    use crate::gui::{DrawCmd, DrawList, DrawVert, TextureId};
    use crate::render::buffers::BufferManager;
    use crate::render::pipeline::{UiState, setup_ui_state};
    use crate::render::ColorOrder;

    fn quad(cmds: Vec<DrawCmd>) -> DrawList {
        DrawList {
            vtx_buffer: vec![DrawVert::default(); 4],
            idx_buffer: vec![0, 1, 2, 0, 2, 3],
            cmd_buffer: cmds,
        }
    }

    fn prepared(data: &DrawData) -> HeadlessDevice {
        let mut dev = HeadlessDevice::new();
        let mut bufs = BufferManager::new(&BackendConfig::default());
        bufs.ensure_capacity(&mut dev, data.total_vtx_count(), data.total_idx_count())
            .unwrap();
        bufs.upload(&mut dev, data, ColorOrder::Argb).unwrap();
        setup_ui_state(
            &mut dev,
            &UiState {
                display_size: [800.0, 600.0],
                vertex_buffer: bufs.vertex_buffer().unwrap(),
                index_buffer: bufs.index_buffer().unwrap(),
                pixel_offset: 0.5,
                filter: crate::device::Filter::Linear,
            },
        );
        dev
    }

    #[test]
    fn offsets_advance_per_command_and_list() {
        let clip = ClipRect::new(0.0, 0.0, 10.0, 10.0);
        let data = DrawData::new(vec![
            quad(vec![DrawCmd::elements(3, clip, None), DrawCmd::elements(3, clip, None)]),
            quad(vec![DrawCmd::elements(6, clip, Some(TextureId::new(9)))]),
        ]);
        let mut dev = prepared(&data);

        let stats = dispatch(&mut dev, &data).unwrap();

        assert_eq!(stats, DispatchStats { draw_calls: 3, callbacks: 0, triangles: 4 });
        let calls: Vec<_> = dev.draws().iter().map(|d| (d.call.base_vertex, d.call.start_index)).collect();
        assert_eq!(calls, vec![(0, 0), (0, 3), (4, 6)]);
        assert_eq!(dev.draws()[2].state.textures[0], Some(TextureId::new(9)));
        assert_eq!(dev.draws()[2].call.num_vertices, 4);
    }

    #[test]
    fn scissor_truncates_clip() {
        assert_eq!(
            scissor_for(ClipRect::new(1.9, 2.5, 100.7, 50.2)),
            ScissorRect::new(1, 2, 100, 50)
        );
    }

    #[test]
    fn callback_replaces_draw_and_may_change_state() {
        let clip = ClipRect::new(0.0, 0.0, 10.0, 10.0);
        let seen = Rc::new(Cell::new(0));
        let seen_in_cb = Rc::clone(&seen);
        let cb = Rc::new(move |dev: &mut dyn Device, list: &DrawList, _: &DrawCmd| {
            seen_in_cb.set(list.vtx_buffer.len());
            dev.set_render_state(RenderState::CullMode(CullMode::Cw));
        });
        let data = DrawData::new(vec![quad(vec![
            DrawCmd::elements(3, clip, None),
            DrawCmd::callback(clip, cb),
            DrawCmd::elements(3, clip, None),
        ])]);
        let mut dev = prepared(&data);

        let stats = dispatch(&mut dev, &data).unwrap();

        assert_eq!(stats.callbacks, 1);
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(seen.get(), 4);
        assert_eq!(dev.draws()[1].call.start_index, 3);
        assert_eq!(dev.draws()[1].state.render.cull_mode, CullMode::Cw);
    }

    #[test]
    fn draw_failure_stops_dispatch() {
        let clip = ClipRect::new(0.0, 0.0, 10.0, 10.0);
        let data = DrawData::new(vec![quad(vec![
            DrawCmd::elements(3, clip, None),
            DrawCmd::elements(3, clip, None),
        ])]);
        let mut dev = prepared(&data);
        dev.faults_mut().device_lost = true;

        assert!(matches!(dispatch(&mut dev, &data), Err(RenderError::DeviceLost)));
        assert!(dev.draws().is_empty());
    }
}
