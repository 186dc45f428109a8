use crate::device::SurfaceInit;

/// Where the frame loop runs relative to the message pump.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum LoopMode {
    /// Pump and render on the main thread.
    #[default]
    SingleThread,
    /// Main thread pumps in blocking mode; a render thread owns the surface.
    WorkerThread,
}

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title:       String,
    /// Client width in physical pixels.
    pub width:       u32,
    /// Client height in physical pixels.
    pub height:      u32,
    pub mode:        LoopMode,
    pub vsync:       bool,
    /// Straight RGBA.
    pub clear_color: [f32; 4],
    pub surface:     SurfaceInit,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "flipframe".to_string(),
            width: 1280,
            height: 800,
            mode: LoopMode::SingleThread,
            vsync: false,
            clear_color: [0.45, 0.55, 0.60, 1.00],
            surface: SurfaceInit::default(),
        }
    }
}
