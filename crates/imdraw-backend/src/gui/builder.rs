use std::rc::Rc;

use super::draw::{ClipRect, DrawCallback, DrawCmd, DrawCmdKind, DrawIdx, DrawList, DrawVert};
use super::font::FontdueAtlas;
use super::TextureId;

/// Records primitives into a [`DrawList`] the way the GUI library does.
///
/// Consecutive primitives sharing a clip rect and texture extend the same
/// command; changing either starts a new one. Callbacks always get their own
/// command.
///
/// ```ignore
/// let mut b = DrawListBuilder::new(viewport_clip, atlas.white_uv());
/// b.push_texture(atlas_id);
/// b.push_clip_rect(panel);
/// b.add_rect_filled(panel, 0xFF20_2020);
/// b.pop_clip_rect();
/// let list = b.finish();
/// ```
#[derive(Debug)]
pub struct DrawListBuilder {
    list: DrawList,
    white_uv: [f32; 2],

    /// Top is the effective clip, already intersected with its parents.
    clip_stack: Vec<ClipRect>,
    texture_stack: Vec<Option<TextureId>>,
}

impl DrawListBuilder {
    /// `viewport` is the outermost clip; `white_uv` addresses an opaque texel
    /// used for solid fills.
    pub fn new(viewport: ClipRect, white_uv: [f32; 2]) -> Self {
        Self {
            list: DrawList::new(),
            white_uv,
            clip_stack: vec![viewport],
            texture_stack: vec![None],
        }
    }

    #[inline]
    fn current_clip(&self) -> ClipRect {
        self.clip_stack.last().copied().unwrap_or_default()
    }

    #[inline]
    fn current_texture(&self) -> Option<TextureId> {
        self.texture_stack.last().copied().flatten()
    }

    /// Clips everything recorded until [`pop_clip_rect`](Self::pop_clip_rect)
    /// to `rect`, intersected with the current clip.
    pub fn push_clip_rect(&mut self, rect: ClipRect) {
        let effective = self.current_clip().intersect(rect);
        self.clip_stack.push(effective);
    }

    pub fn pop_clip_rect(&mut self) {
        debug_assert!(self.clip_stack.len() > 1, "pop_clip_rect without matching push");
        if self.clip_stack.len() > 1 {
            self.clip_stack.pop();
        }
    }

    pub fn push_texture(&mut self, texture: Option<TextureId>) {
        self.texture_stack.push(texture);
    }

    pub fn pop_texture(&mut self) {
        debug_assert!(self.texture_stack.len() > 1, "pop_texture without matching push");
        if self.texture_stack.len() > 1 {
            self.texture_stack.pop();
        }
    }

    /// Returns the command new elements should be appended to, opening one if
    /// the clip or texture changed.
    fn open_cmd(&mut self) -> &mut DrawCmd {
        let clip = self.current_clip();
        let texture = self.current_texture();

        let reuse = matches!(
            self.list.cmd_buffer.last(),
            Some(last) if !last.is_callback() && last.clip_rect == clip && last.texture_id == texture
        );
        if !reuse {
            self.list.cmd_buffer.push(DrawCmd::elements(0, clip, texture));
        }

        let last = self.list.cmd_buffer.len() - 1;
        &mut self.list.cmd_buffer[last]
    }

    /// Appends one quad. Returns `false` when the list is out of 16-bit indices.
    fn prim_quad(&mut self, min: [f32; 2], max: [f32; 2], uv_min: [f32; 2], uv_max: [f32; 2], col: u32) -> bool {
        let base = self.list.vtx_buffer.len();
        if base + 4 > usize::from(DrawIdx::MAX) + 1 {
            log::warn!("draw list exceeded {} vertices; dropping primitive", DrawIdx::MAX);
            return false;
        }
        let base = base as DrawIdx;

        self.list.vtx_buffer.extend_from_slice(&[
            DrawVert::new([min[0], min[1]], [uv_min[0], uv_min[1]], col),
            DrawVert::new([max[0], min[1]], [uv_max[0], uv_min[1]], col),
            DrawVert::new([max[0], max[1]], [uv_max[0], uv_max[1]], col),
            DrawVert::new([min[0], max[1]], [uv_min[0], uv_max[1]], col),
        ]);
        self.list
            .idx_buffer
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);

        self.open_cmd().elem_count += 6;
        true
    }

    pub fn add_rect_filled(&mut self, rect: ClipRect, col: u32) {
        let uv = self.white_uv;
        self.prim_quad([rect.x1, rect.y1], [rect.x2, rect.y2], uv, uv, col);
    }

    pub fn add_rect_filled_uv(&mut self, rect: ClipRect, uv_min: [f32; 2], uv_max: [f32; 2], col: u32) {
        self.prim_quad([rect.x1, rect.y1], [rect.x2, rect.y2], uv_min, uv_max, col);
    }

    /// Lays out `text` on one line starting at `pos` (top-left of the line).
    ///
    /// Returns the pen advance in pixels. Characters missing from the atlas
    /// are skipped.
    pub fn add_text(&mut self, atlas: &FontdueAtlas, pos: [f32; 2], col: u32, text: &str) -> f32 {
        let baseline = pos[1] + atlas.ascent();
        let mut pen = pos[0];

        for ch in text.chars() {
            let Some(glyph) = atlas.glyph(ch) else { continue; };

            if glyph.size[0] > 0.0 && glyph.size[1] > 0.0 {
                let x0 = (pen + glyph.offset[0]).round();
                let y0 = (baseline + glyph.offset[1]).round();
                let max = [x0 + glyph.size[0], y0 + glyph.size[1]];
                if !self.prim_quad([x0, y0], max, glyph.uv_min, glyph.uv_max, col) {
                    break;
                }
            }
            pen += glyph.advance;
        }

        pen - pos[0]
    }

    /// Inserts a callback command at the current position in the stream.
    pub fn add_callback(&mut self, callback: Rc<dyn DrawCallback>) {
        let clip = self.current_clip();
        self.list.cmd_buffer.push(DrawCmd::callback(clip, callback));
    }

    /// Finishes recording. Empty trailing commands are dropped.
    pub fn finish(mut self) -> DrawList {
        self.list
            .cmd_buffer
            .retain(|c| c.elem_count > 0 || matches!(c.kind, DrawCmdKind::Callback(_)));
        self.list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Device;

    fn viewport() -> ClipRect {
        ClipRect::new(0.0, 0.0, 800.0, 600.0)
    }

    #[test]
    fn same_state_merges_into_one_command() {
        let mut b = DrawListBuilder::new(viewport(), [0.0, 0.0]);
        b.add_rect_filled(ClipRect::new(0.0, 0.0, 10.0, 10.0), !0);
        b.add_rect_filled(ClipRect::new(10.0, 0.0, 20.0, 10.0), !0);
        let list = b.finish();

        assert_eq!(list.cmd_buffer.len(), 1);
        assert_eq!(list.cmd_buffer[0].elem_count, 12);
        assert_eq!(list.vtx_buffer.len(), 8);
        assert!(list.validate(0).is_ok());
    }

    #[test]
    fn clip_change_splits_commands_and_intersects_parent() {
        let mut b = DrawListBuilder::new(viewport(), [0.0, 0.0]);
        b.add_rect_filled(ClipRect::new(0.0, 0.0, 10.0, 10.0), !0);
        b.push_clip_rect(ClipRect::new(700.0, 500.0, 900.0, 700.0));
        b.add_rect_filled(ClipRect::new(710.0, 510.0, 720.0, 520.0), !0);
        b.pop_clip_rect();
        let list = b.finish();

        assert_eq!(list.cmd_buffer.len(), 2);
        assert_eq!(list.cmd_buffer[1].clip_rect, ClipRect::new(700.0, 500.0, 800.0, 600.0));
    }

    #[test]
    fn texture_change_splits_commands() {
        let mut b = DrawListBuilder::new(viewport(), [0.0, 0.0]);
        b.add_rect_filled(ClipRect::new(0.0, 0.0, 10.0, 10.0), !0);
        b.push_texture(Some(TextureId::new(5)));
        b.add_rect_filled(ClipRect::new(0.0, 0.0, 10.0, 10.0), !0);
        b.pop_texture();
        let list = b.finish();

        assert_eq!(list.cmd_buffer[0].texture_id, None);
        assert_eq!(list.cmd_buffer[1].texture_id, Some(TextureId::new(5)));
    }

    #[test]
    fn callback_gets_its_own_command() {
        let mut b = DrawListBuilder::new(viewport(), [0.0, 0.0]);
        b.add_rect_filled(ClipRect::new(0.0, 0.0, 10.0, 10.0), !0);
        b.add_callback(Rc::new(|_: &mut dyn Device, _: &DrawList, _: &DrawCmd| {}));
        b.add_rect_filled(ClipRect::new(0.0, 0.0, 10.0, 10.0), !0);
        let list = b.finish();

        assert_eq!(list.cmd_buffer.len(), 3);
        assert!(list.cmd_buffer[1].is_callback());
        assert_eq!(list.cmd_buffer[2].elem_count, 6);
        assert!(list.validate(0).is_ok());
    }

    #[test]
    fn text_without_glyphs_adds_nothing() {
        let atlas = FontdueAtlas::white_only();
        let mut b = DrawListBuilder::new(viewport(), atlas.white_uv());
        let advance = b.add_text(&atlas, [0.0, 0.0], !0, "hello");
        let list = b.finish();

        assert_eq!(advance, 0.0);
        assert!(list.cmd_buffer.is_empty());
    }
}
