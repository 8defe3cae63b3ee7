/// Creation parameters for [`WgpuDevice`](super::WgpuDevice).
///
/// Everything here is fixed for the life of the device; resizing is the only
/// surface change made afterwards.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Pick an sRGB swapchain format when the surface offers one.
    ///
    /// Off by default. UI vertex colors and atlas texels are authored in
    /// display space and blended there, as on a fixed-function device.
    pub prefer_srgb: bool,

    pub present_mode: wgpu::PresentMode,

    /// Falls back to a supported mode when the surface lacks this one.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Adapter selection. UI-only hosts may prefer `LowPower`.
    pub power_preference: wgpu::PowerPreference,

    /// Draw calls the per-draw uniform ring holds before its first growth.
    /// The ring grows to the next power of two when a frame needs more.
    pub initial_draw_slots: usize,

    pub required_features: wgpu::Features,
    pub required_limits: wgpu::Limits,

    /// Swapchain depth hint passed to the surface.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: false,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            power_preference: wgpu::PowerPreference::HighPerformance,
            initial_draw_slots: 64,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}
