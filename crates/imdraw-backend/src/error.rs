use std::fmt;

use crate::device::DeviceError;
use crate::gui::DrawDataError;

/// Which device buffer an operation concerned.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BufferKind {
    Vertex,
    Index,
}

impl fmt::Display for BufferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferKind::Vertex => f.write_str("vertex buffer"),
            BufferKind::Index => f.write_str("index buffer"),
        }
    }
}

/// Failure of one adapter entry point.
///
/// None of these are fatal: the frame is dropped (or the device recovered)
/// and the next frame tries again. See [`RenderError::action`].
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("device refused to allocate the {resource}")]
    Allocation {
        resource: BufferKind,
        #[source]
        source: DeviceError,
    },

    #[error("device refused to capture a state block")]
    StateCapture(#[source] DeviceError),

    #[error("font atlas texture creation failed")]
    TextureCreate(#[source] DeviceError),

    #[error("font atlas texture could not be mapped")]
    TextureLock(#[source] DeviceError),

    #[error("{resource} could not be mapped")]
    BufferLock {
        resource: BufferKind,
        #[source]
        source: DeviceError,
    },

    #[error("indexed draw failed")]
    Draw(#[source] DeviceError),

    #[error("device reset failed")]
    Reset(#[source] DeviceError),

    #[error("device lost")]
    DeviceLost,

    #[error(transparent)]
    InvalidDrawData(#[from] DrawDataError),
}

/// What the host should do after a failed frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameAction {
    /// Transient failure; drop this frame and carry on.
    SkipFrame,
    /// The device context is gone; run
    /// [`recover_device_loss`](crate::render::Backend::recover_device_loss).
    ResetDevice,
}

impl RenderError {
    /// Wraps a device error, promoting device loss to [`RenderError::DeviceLost`].
    pub(crate) fn from_device(err: DeviceError, wrap: impl FnOnce(DeviceError) -> RenderError) -> RenderError {
        match err {
            DeviceError::DeviceLost => RenderError::DeviceLost,
            other => wrap(other),
        }
    }

    pub fn action(&self) -> FrameAction {
        match self {
            RenderError::DeviceLost => FrameAction::ResetDevice,
            _ => FrameAction::SkipFrame,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_loss_is_promoted_whatever_the_call() {
        let err = RenderError::from_device(DeviceError::DeviceLost, RenderError::Draw);
        assert!(matches!(err, RenderError::DeviceLost));
        assert_eq!(err.action(), FrameAction::ResetDevice);
    }

    #[test]
    fn other_failures_skip_the_frame() {
        let err = RenderError::from_device(DeviceError::OutOfVideoMemory, |source| RenderError::Allocation {
            resource: BufferKind::Index,
            source,
        });
        assert_eq!(err.action(), FrameAction::SkipFrame);
        assert_eq!(err.to_string(), "device refused to allocate the index buffer");
    }
}
