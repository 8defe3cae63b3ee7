use bytemuck::{Pod, Zeroable};

use crate::device::VertexLayout;
use crate::gui::{DrawIdx, DrawVert};

/// Vertex in the device's native layout ([`VertexLayout::PositionColorTex`]).
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct DeviceVertex {
    pub pos: [f32; 3],
    pub col: u32,
    pub uv: [f32; 2],
}

pub const DEVICE_VERTEX_SIZE: usize = std::mem::size_of::<DeviceVertex>();

const _: () = assert!(DEVICE_VERTEX_SIZE == VertexLayout::PositionColorTex.stride() as usize);

/// How the device interprets a packed 32-bit vertex color.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum ColorOrder {
    /// `0xAARRGGBB`: red and blue swap places relative to the GUI library.
    #[default]
    Argb,
    /// `0xAABBGGRR`: same as the GUI library, copied unchanged.
    Abgr,
}

impl ColorOrder {
    /// Converts a GUI-library color into this order.
    #[inline]
    pub const fn convert(self, col: u32) -> u32 {
        match self {
            ColorOrder::Argb => swap_red_blue(col),
            ColorOrder::Abgr => col,
        }
    }
}

/// Exchanges the low and third bytes, keeping alpha and green in place.
#[inline]
pub const fn swap_red_blue(col: u32) -> u32 {
    (col & 0xFF00_FF00) | ((col & 0x00FF_0000) >> 16) | ((col & 0x0000_00FF) << 16)
}

#[inline]
pub fn translate_vertex(v: &DrawVert, order: ColorOrder) -> DeviceVertex {
    DeviceVertex {
        pos: [v.pos[0], v.pos[1], 0.0],
        col: order.convert(v.col),
        uv: v.uv,
    }
}

/// Translates `src` into `dst`, which must hold at least
/// `src.len() * DEVICE_VERTEX_SIZE` bytes. Returns the bytes written.
///
/// `dst` may be unaligned; every vertex is written through its byte view.
pub fn write_vertices(dst: &mut [u8], src: &[DrawVert], order: ColorOrder) -> usize {
    let len = src.len() * DEVICE_VERTEX_SIZE;
    for (out, v) in dst[..len].chunks_exact_mut(DEVICE_VERTEX_SIZE).zip(src) {
        out.copy_from_slice(bytemuck::bytes_of(&translate_vertex(v, order)));
    }
    len
}

/// Copies indices verbatim. Returns the bytes written.
pub fn write_indices(dst: &mut [u8], src: &[DrawIdx]) -> usize {
    let bytes: &[u8] = bytemuck::cast_slice(src);
    dst[..bytes.len()].copy_from_slice(bytes);
    bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gui::pack_rgba;

    #[test]
    fn swap_twice_is_identity() {
        for col in [0u32, 0xFFFF_FFFF, 0x8040_2010, 0x1234_5678, 0xFF00_00FF] {
            assert_eq!(swap_red_blue(swap_red_blue(col)), col);
        }
    }

    #[test]
    fn swap_keeps_alpha_and_green() {
        let rgba = pack_rgba(0x11, 0x22, 0x33, 0x44);
        assert_eq!(swap_red_blue(rgba), 0x4411_2233);
    }

    #[test]
    fn abgr_order_copies_color() {
        assert_eq!(ColorOrder::Abgr.convert(0x4433_2211), 0x4433_2211);
    }

    #[test]
    fn translated_vertex_sits_on_zero_plane() {
        let v = DrawVert::new([3.5, -2.0], [0.25, 0.75], pack_rgba(255, 0, 0, 255));
        let d = translate_vertex(&v, ColorOrder::Argb);
        assert_eq!(d.pos, [3.5, -2.0, 0.0]);
        assert_eq!(d.uv, [0.25, 0.75]);
        assert_eq!(d.col, 0xFFFF_0000);
    }

    #[test]
    fn unaligned_destination_is_fine() {
        let src = [DrawVert::new([1.0, 2.0], [0.0, 0.0], 0xFF00_00FF); 2];
        let mut dst = vec![0u8; 1 + 2 * DEVICE_VERTEX_SIZE];

        let written = write_vertices(&mut dst[1..], &src, ColorOrder::Argb);

        assert_eq!(written, 2 * DEVICE_VERTEX_SIZE);
        let back: DeviceVertex = bytemuck::pod_read_unaligned(&dst[1 + DEVICE_VERTEX_SIZE..]);
        assert_eq!(back.pos, [1.0, 2.0, 0.0]);
        assert_eq!(back.col, 0xFFFF_0000);
    }

    #[test]
    fn indices_copy_byte_for_byte() {
        let src: [DrawIdx; 3] = [0, 0x0102, 0xFFFF];
        let mut dst = [0u8; 8];
        assert_eq!(write_indices(&mut dst, &src), 6);
        assert_eq!(&dst[..6], bytemuck::cast_slice::<DrawIdx, u8>(&src));
    }
}
