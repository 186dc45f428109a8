use std::time::Duration;

use super::caps::{FeatureLevel, SwapChainDesc};
use super::error::GraphicsError;

/// Result of waiting on the frame-latency object.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WaitOutcome {
    /// The swap chain is ready for the next frame.
    Signaled,
    /// The wait hit its timeout; the frame proceeds anyway.
    TimedOut,
    /// No waitable object exists.
    Unavailable,
}

/// Primitive graphics operations a presentation backend provides.
///
/// Backends execute single steps and report success or failure. Ordering,
/// fallback decisions and state tracking belong to `PresentationSurface`.
pub trait PresentBackend {
    /// Device handles exposed to the UI renderer.
    type Device;

    /// Bound render target handed to the render callback.
    type Target<'a>
    where
        Self: 'a;

    /// Creates the device at the highest level in `levels` and returns the level reached.
    fn create_device(&mut self, levels: &[FeatureLevel], debug: bool) -> Result<FeatureLevel, GraphicsError>;

    /// Capability query: can presents tear when vsync is off.
    fn supports_tearing(&mut self) -> bool;

    /// Whether the created device/factory pair can build flip-model swap chains.
    fn supports_flip_model(&self) -> bool;

    /// One swap-chain creation attempt. Must leave no swap chain behind on failure.
    fn create_swap_chain(&mut self, desc: &SwapChainDesc) -> Result<(), GraphicsError>;

    /// Caps queued frames on the swap chain's waitable object and keeps the handle.
    fn enable_frame_latency_waitable(&mut self, max_latency: u32) -> Result<(), GraphicsError>;

    /// Caps queued frames through the device-level setting.
    fn set_device_frame_latency(&mut self, max_latency: u32) -> Result<(), GraphicsError>;

    /// Stops the platform from toggling exclusive fullscreen on its own.
    fn disable_fullscreen_toggle(&mut self) -> Result<(), GraphicsError>;

    fn create_render_target(&mut self) -> Result<(), GraphicsError>;

    /// Unbinds and drops the render-target view. Idempotent.
    fn release_render_target(&mut self);

    fn resize_buffers(&mut self, width: u32, height: u32, desc: &SwapChainDesc) -> Result<(), GraphicsError>;

    fn wait_frame_latency(&mut self, timeout: Duration) -> WaitOutcome;

    /// Binds the render target and clears it to `clear`.
    fn bind_render_target(&mut self, clear: [f32; 4]) -> Result<(), GraphicsError>;

    /// Render target bound by the last `bind_render_target`.
    fn target(&mut self) -> Option<Self::Target<'_>>;

    fn present(&mut self, sync_interval: u32, allow_tearing: bool) -> Result<(), GraphicsError>;

    /// Device-removal query. `Some(reason)` once the device is gone.
    fn device_removed(&self) -> Option<String>;

    fn device(&self) -> Option<&Self::Device>;

    /// Releases every graphics object: render target, swap chain, device.
    fn release(&mut self);
}
