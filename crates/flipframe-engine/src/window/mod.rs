//! Window lifecycle.
//!
//! Owns the `winit` event loop and the application window, and routes window
//! messages through an ordered chain of handlers before default processing.

mod display_mode;
mod error;
mod host;
mod message;
mod native;
mod resize;

pub use display_mode::{AltEnterToggle, DisplayMode, DisplayModeController};
pub use error::PlatformError;
pub use host::{HostEvent, WindowHost, centered_origin};
pub use message::{HandlerId, ImeNotification, MessageChain, MessageHandler, WindowMessage};
pub use native::{NativeWindow, WindowRect, WindowStyle};
pub use resize::PendingResize;
pub use winit::window::CursorIcon;

#[cfg(test)]
pub(crate) use native::mock::MockWindow;
