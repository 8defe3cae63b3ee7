/// Failure reported by a [`Device`](super::Device) call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// The device refused to allocate the resource.
    #[error("out of video memory")]
    OutOfVideoMemory,

    /// The call was malformed or not allowed in the current device state.
    #[error("invalid call: {0}")]
    InvalidCall(String),

    /// The device context is gone; every device-pool resource must be
    /// released and the device reset before rendering resumes.
    #[error("device lost")]
    DeviceLost,

    /// The handle does not name a live resource.
    #[error("unknown resource handle")]
    UnknownResource,
}

impl DeviceError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        DeviceError::InvalidCall(msg.into())
    }
}
