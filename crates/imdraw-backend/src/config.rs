use std::time::Duration;

use crate::device::Filter;
use crate::render::ColorOrder;

/// Tuning parameters for [`Backend`](crate::render::Backend).
///
/// Defaults match a fixed-function device that samples texel centers at
/// integer coordinates and reads vertex colors as `0xAARRGGBB`.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Extra vertices allocated beyond the frame's requirement when the
    /// vertex buffer grows.
    pub vertex_slack: usize,

    /// Extra indices allocated beyond the frame's requirement when the index
    /// buffer grows.
    pub index_slack: usize,

    /// Capacity floor for the first vertex buffer allocation, in vertices.
    pub initial_vertex_capacity: usize,

    /// Capacity floor for the first index buffer allocation, in indices.
    pub initial_index_capacity: usize,

    /// Offset added to every edge of the orthographic projection so texel
    /// centers land on pixel centers. Zero for devices that already sample
    /// at half-integer coordinates.
    pub pixel_offset: f32,

    /// Channel order the device expects in the packed vertex color.
    pub color_order: ColorOrder,

    /// Min/mag filter for texture stage 0.
    pub texture_filter: Filter,

    /// Smallest delta time reported to the GUI library. Must be non-zero.
    pub min_frame_time: Duration,

    /// Largest delta time reported; `None` reports stalls as they are.
    pub max_frame_time: Option<Duration>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            vertex_slack: 5000,
            index_slack: 10000,
            initial_vertex_capacity: 5000,
            initial_index_capacity: 10000,
            pixel_offset: 0.5,
            color_order: ColorOrder::Argb,
            texture_filter: Filter::Linear,
            min_frame_time: Duration::from_micros(100),
            max_frame_time: None,
        }
    }
}
