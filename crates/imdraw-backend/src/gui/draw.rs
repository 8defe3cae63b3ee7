use std::fmt;
use std::rc::Rc;

use bytemuck::{Pod, Zeroable};

use crate::device::Device;

use super::TextureId;

/// Index type emitted by the GUI library.
///
/// The device index buffer is created with the matching width once and keeps it
/// for its whole lifetime.
pub type DrawIdx = u16;

/// Vertex as emitted by the GUI library (20 bytes).
///
/// `col` is packed RGBA with red in the lowest byte.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct DrawVert {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
    pub col: u32,
}

impl DrawVert {
    #[inline]
    pub const fn new(pos: [f32; 2], uv: [f32; 2], col: u32) -> Self {
        Self { pos, uv, col }
    }
}

/// Packs straight RGBA bytes into the library's vertex color layout.
#[inline]
pub const fn pack_rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (r as u32) | ((g as u32) << 8) | ((b as u32) << 16) | ((a as u32) << 24)
}

/// Clip rectangle in screen space: `(x1, y1)` top-left, `(x2, y2)` bottom-right.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ClipRect {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl ClipRect {
    #[inline]
    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    #[inline]
    pub fn width(self) -> f32 {
        self.x2 - self.x1
    }

    #[inline]
    pub fn height(self) -> f32 {
        self.y2 - self.y1
    }

    /// Intersection with `other`; collapses to a zero-area rect when disjoint.
    pub fn intersect(self, other: ClipRect) -> ClipRect {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2).max(x1);
        let y2 = self.y2.min(other.y2).max(y1);
        ClipRect { x1, y1, x2, y2 }
    }
}

/// Host code run in place of a draw call.
///
/// The callback may change any device state; the dispatcher assumes nothing
/// about the device afterwards.
pub trait DrawCallback {
    fn invoke(&self, device: &mut dyn Device, list: &DrawList, cmd: &DrawCmd);
}

impl<F> DrawCallback for F
where
    F: Fn(&mut dyn Device, &DrawList, &DrawCmd),
{
    fn invoke(&self, device: &mut dyn Device, list: &DrawList, cmd: &DrawCmd) {
        self(device, list, cmd)
    }
}

/// What a draw command asks the dispatcher to do.
#[derive(Clone)]
pub enum DrawCmdKind {
    /// Draw `elem_count` indices as a triangle list.
    Elements,
    /// Invoke the callback instead of drawing.
    Callback(Rc<dyn DrawCallback>),
}

impl fmt::Debug for DrawCmdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawCmdKind::Elements => f.write_str("Elements"),
            DrawCmdKind::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// One clipped, textured sub-draw within a [`DrawList`].
#[derive(Debug, Clone)]
pub struct DrawCmd {
    /// Number of indices covered by this command.
    pub elem_count: u32,
    pub clip_rect: ClipRect,
    /// `None` draws untextured.
    pub texture_id: Option<TextureId>,
    pub kind: DrawCmdKind,
}

impl DrawCmd {
    pub fn elements(elem_count: u32, clip_rect: ClipRect, texture_id: Option<TextureId>) -> Self {
        Self {
            elem_count,
            clip_rect,
            texture_id,
            kind: DrawCmdKind::Elements,
        }
    }

    pub fn callback(clip_rect: ClipRect, callback: Rc<dyn DrawCallback>) -> Self {
        Self {
            elem_count: 0,
            clip_rect,
            texture_id: None,
            kind: DrawCmdKind::Callback(callback),
        }
    }

    #[inline]
    pub fn is_callback(&self) -> bool {
        matches!(self.kind, DrawCmdKind::Callback(_))
    }
}

/// Malformed draw data, detected before any device work is done.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DrawDataError {
    #[error("draw list {list}: commands cover {covered} indices but the list has {indices}")]
    ElementCountMismatch { list: usize, covered: u64, indices: usize },

    #[error("draw list {list}: index {value} at position {position} exceeds vertex count {vertices}")]
    IndexOutOfRange {
        list: usize,
        position: usize,
        value: DrawIdx,
        vertices: usize,
    },

    #[error("draw list {list}: command {command} has element count {elem_count}, not a multiple of 3")]
    PartialTriangle { list: usize, command: usize, elem_count: u32 },
}

/// One batch of vertices, indices and commands for a region of UI.
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    pub vtx_buffer: Vec<DrawVert>,
    pub idx_buffer: Vec<DrawIdx>,
    pub cmd_buffer: Vec<DrawCmd>,
}

impl DrawList {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of element counts across all commands.
    pub fn covered_elements(&self) -> u64 {
        self.cmd_buffer.iter().map(|c| u64::from(c.elem_count)).sum()
    }

    /// Checks the structural invariants of the list. `list` is only used for reporting.
    pub fn validate(&self, list: usize) -> Result<(), DrawDataError> {
        let covered = self.covered_elements();
        if covered != self.idx_buffer.len() as u64 {
            return Err(DrawDataError::ElementCountMismatch {
                list,
                covered,
                indices: self.idx_buffer.len(),
            });
        }

        for (command, cmd) in self.cmd_buffer.iter().enumerate() {
            if cmd.elem_count % 3 != 0 {
                return Err(DrawDataError::PartialTriangle {
                    list,
                    command,
                    elem_count: cmd.elem_count,
                });
            }
        }

        let vertices = self.vtx_buffer.len();
        if let Some((position, &value)) = self
            .idx_buffer
            .iter()
            .enumerate()
            .find(|&(_, &i)| usize::from(i) >= vertices)
        {
            return Err(DrawDataError::IndexOutOfRange {
                list,
                position,
                value,
                vertices,
            });
        }

        Ok(())
    }
}

/// Everything the GUI library produced for one frame.
///
/// Consumed once by the backend and not retained.
#[derive(Debug, Clone, Default)]
pub struct DrawData {
    pub lists: Vec<DrawList>,
}

impl DrawData {
    #[inline]
    pub fn new(lists: Vec<DrawList>) -> Self {
        Self { lists }
    }

    pub fn total_vtx_count(&self) -> usize {
        self.lists.iter().map(|l| l.vtx_buffer.len()).sum()
    }

    pub fn total_idx_count(&self) -> usize {
        self.lists.iter().map(|l| l.idx_buffer.len()).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lists.iter().all(|l| l.cmd_buffer.is_empty())
    }

    pub fn validate(&self) -> Result<(), DrawDataError> {
        self.lists
            .iter()
            .enumerate()
            .try_for_each(|(i, list)| list.validate(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_list(cmds: Vec<DrawCmd>) -> DrawList {
        DrawList {
            vtx_buffer: vec![DrawVert::default(); 4],
            idx_buffer: vec![0, 1, 2, 0, 2, 3],
            cmd_buffer: cmds,
        }
    }

    fn full() -> ClipRect {
        ClipRect::new(0.0, 0.0, 100.0, 100.0)
    }

    #[test]
    fn element_counts_cover_index_buffer() {
        let list = quad_list(vec![
            DrawCmd::elements(3, full(), None),
            DrawCmd::elements(3, full(), None),
        ]);
        assert_eq!(list.covered_elements(), list.idx_buffer.len() as u64);
        assert!(list.validate(0).is_ok());
    }

    #[test]
    fn mismatched_element_count_is_rejected() {
        let list = quad_list(vec![DrawCmd::elements(3, full(), None)]);
        assert_eq!(
            list.validate(2),
            Err(DrawDataError::ElementCountMismatch { list: 2, covered: 3, indices: 6 })
        );
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut list = quad_list(vec![DrawCmd::elements(6, full(), None)]);
        list.idx_buffer[4] = 9;
        assert!(matches!(
            list.validate(0),
            Err(DrawDataError::IndexOutOfRange { position: 4, value: 9, .. })
        ));
    }

    #[test]
    fn callbacks_cover_no_elements() {
        let cb: Rc<dyn DrawCallback> = Rc::new(|_: &mut dyn Device, _: &DrawList, _: &DrawCmd| {});
        let list = quad_list(vec![
            DrawCmd::elements(6, full(), None),
            DrawCmd::callback(full(), cb),
        ]);
        assert!(list.cmd_buffer[1].is_callback());
        assert!(list.validate(0).is_ok());
    }

    #[test]
    fn totals_span_all_lists() {
        let data = DrawData::new(vec![
            quad_list(vec![DrawCmd::elements(6, full(), None)]),
            quad_list(vec![DrawCmd::elements(6, full(), None)]),
        ]);
        assert_eq!(data.total_vtx_count(), 8);
        assert_eq!(data.total_idx_count(), 12);
        assert!(data.validate().is_ok());
    }

    #[test]
    fn pack_rgba_puts_red_in_low_byte() {
        assert_eq!(pack_rgba(0x11, 0x22, 0x33, 0x44), 0x4433_2211);
    }

    #[test]
    fn clip_intersection_collapses_when_disjoint() {
        let a = ClipRect::new(0.0, 0.0, 10.0, 10.0);
        let b = ClipRect::new(20.0, 20.0, 30.0, 30.0);
        let i = a.intersect(b);
        assert_eq!(i.width(), 0.0);
        assert_eq!(i.height(), 0.0);
    }
}
