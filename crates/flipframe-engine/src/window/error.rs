use thiserror::Error;

/// Failure of a window-system operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("failed to create event loop: {0}")]
    EventLoop(String),

    #[error("failed to create window: {0}")]
    WindowCreation(String),

    #[error("no primary monitor available")]
    NoPrimaryMonitor,

    #[error("window handle unavailable: {0}")]
    WindowHandle(String),

    #[error("not supported on this platform: {0}")]
    NotSupported(&'static str),

    #[error("window no longer exists")]
    WindowGone,
}
