use thiserror::Error;

use super::surface::SurfaceState;

/// Failure reported by a presentation backend primitive.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphicsError {
    #[error("device creation failed: {0}")]
    DeviceCreation(String),

    #[error("swap chain creation failed: {0}")]
    SwapChainCreation(String),

    #[error("every swap chain technique failed")]
    LadderExhausted,

    #[error("render target creation failed: {0}")]
    RenderTarget(String),

    #[error("swap chain resize failed: {0}")]
    Resize(String),

    #[error("present failed: {0}")]
    Present(String),

    #[error("not supported by this backend: {0}")]
    Unsupported(&'static str),

    /// Frame could not be acquired this time; retry next frame.
    #[error("frame skipped: {0}")]
    Transient(String),

    #[error("out of GPU memory")]
    OutOfMemory,

    #[error("graphics device lost: {reason}")]
    DeviceLost { reason: String },
}

/// Failure of a `PresentationSurface` operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SurfaceError {
    /// The operation is not valid in the current state (e.g. present after teardown).
    #[error("surface not ready (state: {0:?})")]
    NotReady(SurfaceState),

    #[error("graphics device lost: {reason}")]
    DeviceLost { reason: String },

    #[error(transparent)]
    Graphics(#[from] GraphicsError),
}

/// High-level response after a backend frame-acquisition error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}

impl GraphicsError {
    pub fn is_device_lost(&self) -> bool {
        matches!(self, GraphicsError::DeviceLost { .. })
    }
}
