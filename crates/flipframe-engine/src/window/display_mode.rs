use super::error::PlatformError;
use super::native::{NativeWindow, WindowRect, WindowStyle};

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum DisplayMode {
    #[default]
    Windowed,
    /// Borderless, topmost, covering the primary monitor. Never exclusive.
    Fullscreen,
}

/// Window-side display-mode transitions.
///
/// Runs on the thread that owns the event loop. The saved rectangle is the
/// windowed placement captured when entering fullscreen.
#[derive(Debug, Default)]
pub struct DisplayModeController {
    mode: DisplayMode,
    saved: Option<WindowRect>,
}

impl DisplayModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn saved_rect(&self) -> Option<WindowRect> {
        self.saved
    }

    /// Switches `window` to `mode`. Re-applying the current mode is a no-op.
    pub fn apply(&mut self, window: &dyn NativeWindow, mode: DisplayMode) -> Result<(), PlatformError> {
        if mode == self.mode {
            return Ok(());
        }

        match mode {
            DisplayMode::Fullscreen => {
                let monitor = window.primary_monitor_rect().ok_or(PlatformError::NoPrimaryMonitor)?;
                self.saved = Some(window.outer_rect()?);

                window.set_style(WindowStyle::Popup);
                window.set_topmost(true);
                window.set_outer_rect(monitor);
            }
            DisplayMode::Windowed => {
                window.set_style(WindowStyle::Overlapped);
                window.set_topmost(false);
                if let Some(rect) = self.saved.take() {
                    window.set_outer_rect(rect);
                }
            }
        }

        log::info!("display mode: {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        Ok(())
    }
}

/// Edge detector for the alt+enter chord.
///
/// Fires once per press; holding the chord does not repeat.
#[derive(Debug, Default)]
pub struct AltEnterToggle {
    latched: bool,
    fullscreen: bool,
}

impl AltEnterToggle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Feeds the current key state; returns the mode to switch to on a rising edge.
    pub fn update(&mut self, alt_down: bool, enter_down: bool) -> Option<DisplayMode> {
        let chord = alt_down && enter_down;
        let edge = chord && !self.latched;
        self.latched = chord;

        if !edge {
            return None;
        }

        self.fullscreen = !self.fullscreen;
        Some(if self.fullscreen {
            DisplayMode::Fullscreen
        } else {
            DisplayMode::Windowed
        })
    }
}
