use std::time::Duration;

/// Initialization parameters for the presentation surface.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct SurfaceInit {
    /// Number of back buffers in the swap chain.
    pub buffer_count: u32,

    /// Maximum number of frames queued ahead of the display.
    ///
    /// Applied through the frame-latency waitable object when one was
    /// negotiated, otherwise through the device-level latency setting.
    pub max_frame_latency: u32,

    /// Request the tearing flag when the platform supports it.
    pub prefer_tearing: bool,

    /// Enable the graphics debug layer.
    pub debug_layer: bool,

    /// Upper bound for a single vblank wait.
    pub vblank_timeout: Duration,
}

impl Default for SurfaceInit {
    fn default() -> Self {
        Self {
            buffer_count: 2,
            max_frame_latency: 1,
            prefer_tearing: true,
            debug_layer: cfg!(debug_assertions),
            vblank_timeout: Duration::from_millis(1000),
        }
    }
}
