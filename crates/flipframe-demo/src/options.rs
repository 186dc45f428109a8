use flipframe_engine::runtime::{LoopMode, RuntimeConfig};

/// Presentation backend picked at startup.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BackendChoice {
    /// DXGI swap chain with the Direct3D 11 painter (Windows only).
    Dxgi,
    /// wgpu surface with the egui-wgpu painter.
    Wgpu,
}

impl Default for BackendChoice {
    fn default() -> Self {
        if cfg!(windows) { Self::Dxgi } else { Self::Wgpu }
    }
}

/// Demo overrides on top of `RuntimeConfig::default()`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DemoOptions {
    pub backend: BackendChoice,
    pub threaded: bool,
    pub vsync: bool,
}

impl DemoOptions {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads `FLIPFRAME_BACKEND`, `FLIPFRAME_THREADED` and `FLIPFRAME_VSYNC`.
    ///
    /// Unrecognized values are logged and the default is kept.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Self::default();

        if let Some(value) = lookup("FLIPFRAME_BACKEND") {
            match value.trim().to_ascii_lowercase().as_str() {
                "dxgi" | "d3d11" => options.backend = BackendChoice::Dxgi,
                "wgpu" | "portable" => options.backend = BackendChoice::Wgpu,
                other => log::warn!("unknown FLIPFRAME_BACKEND {other:?}, using {:?}", options.backend),
            }
        }
        if !cfg!(windows) && options.backend == BackendChoice::Dxgi {
            log::warn!("DXGI backend is Windows-only, falling back to wgpu");
            options.backend = BackendChoice::Wgpu;
        }

        options.threaded = flag(&lookup, "FLIPFRAME_THREADED", options.threaded);
        options.vsync = flag(&lookup, "FLIPFRAME_VSYNC", options.vsync);
        options
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            title: "flipframe demo".to_string(),
            mode: if self.threaded {
                LoopMode::WorkerThread
            } else {
                LoopMode::SingleThread
            },
            vsync: self.vsync,
            ..RuntimeConfig::default()
        }
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    let Some(value) = lookup(key) else { return default };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        other => {
            log::warn!("ignoring {key}={other:?}");
            default
        }
    }
}
