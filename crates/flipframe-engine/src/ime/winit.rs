//! Portable input-method backend over `winit`'s IME toggle.
//!
//! `winit` exposes only allow/deny; conversion modes have no equivalent, so
//! non-converting input is approximated by disallowing the IME.

use std::collections::HashMap;

use winit::window::WindowId;

use crate::window::NativeWindow;

use super::adapter::ImeBackend;

#[derive(Debug, Default)]
pub struct WinitImeBackend {
    allowed: HashMap<WindowId, bool>,
}

impl WinitImeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply(&mut self, window: &dyn NativeWindow, allowed: bool) {
        window.set_ime_allowed(allowed);
        self.allowed.insert(window.id(), allowed);
    }
}

impl ImeBackend for WinitImeBackend {
    fn set_open(&mut self, window: &dyn NativeWindow, open: bool) -> bool {
        self.apply(window, open);
        true
    }

    fn open_status(&self, window: &dyn NativeWindow) -> bool {
        self.allowed.get(&window.id()).copied().unwrap_or(false)
    }

    fn set_non_converting(&mut self, window: &dyn NativeWindow) -> bool {
        self.apply(window, false);
        true
    }

    fn toggle_association(&mut self, window: &dyn NativeWindow) -> bool {
        let allowed = !self.open_status(window);
        self.apply(window, allowed);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::MockWindow;

    #[test]
    fn open_toggles_window_ime() {
        let window = MockWindow::new();
        let mut ime = WinitImeBackend::new();

        ime.set_open(&window, false);
        assert!(!window.ime_allowed.get());
        assert!(!ime.open_status(&window));

        ime.toggle_association(&window);
        assert!(window.ime_allowed.get());
    }
}
