//! wgpu implementation of the [`Device`](crate::device::Device) interface.
//!
//! This module is responsible for:
//! - surface/adapter/device setup ([`GpuInit`], [`WgpuDevice::new`])
//! - fixed-function emulation for UI draws (one pipeline per blend/cull mix)
//! - replaying recorded draws into the swapchain ([`WgpuDevice::present`])

mod device;
mod init;
mod pipelines;
mod surface;

pub use device::{PresentOutcome, WgpuDevice};
pub use init::GpuInit;
