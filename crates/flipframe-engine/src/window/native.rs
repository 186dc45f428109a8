use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::window::{CursorIcon, Window, WindowId, WindowLevel};

use super::error::PlatformError;

/// Outer position plus client size, in physical pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct WindowRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Window frame style.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WindowStyle {
    /// Title bar and borders.
    Overlapped,
    /// Borderless.
    Popup,
}

/// Window operations the engine relies on.
///
/// Implemented for `winit::window::Window`; tests provide a recording mock.
pub trait NativeWindow {
    fn id(&self) -> WindowId;

    /// Client size in physical pixels.
    fn inner_size(&self) -> (u32, u32);

    fn scale_factor(&self) -> f64;

    fn is_minimized(&self) -> bool;

    fn outer_rect(&self) -> Result<WindowRect, PlatformError>;

    /// Rectangle of the primary monitor, `None` when it cannot be queried.
    fn primary_monitor_rect(&self) -> Option<WindowRect>;

    fn set_style(&self, style: WindowStyle);

    fn set_topmost(&self, topmost: bool);

    fn set_outer_rect(&self, rect: WindowRect);

    fn set_visible(&self, visible: bool);

    fn set_ime_allowed(&self, allowed: bool);

    fn set_cursor(&self, cursor: CursorIcon);

    fn raw_handle(&self) -> Option<RawWindowHandle>;
}

impl NativeWindow for Window {
    fn id(&self) -> WindowId {
        Window::id(self)
    }

    fn inner_size(&self) -> (u32, u32) {
        let size = Window::inner_size(self);
        (size.width, size.height)
    }

    fn scale_factor(&self) -> f64 {
        Window::scale_factor(self)
    }

    fn is_minimized(&self) -> bool {
        Window::is_minimized(self).unwrap_or(false)
    }

    fn outer_rect(&self) -> Result<WindowRect, PlatformError> {
        let pos = self
            .outer_position()
            .map_err(|_| PlatformError::NotSupported("outer window position"))?;
        let size = Window::inner_size(self);
        Ok(WindowRect {
            x: pos.x,
            y: pos.y,
            width: size.width,
            height: size.height,
        })
    }

    fn primary_monitor_rect(&self) -> Option<WindowRect> {
        let monitor = self.primary_monitor().or_else(|| self.current_monitor())?;
        let pos = monitor.position();
        let size = monitor.size();
        Some(WindowRect {
            x: pos.x,
            y: pos.y,
            width: size.width,
            height: size.height,
        })
    }

    fn set_style(&self, style: WindowStyle) {
        self.set_decorations(matches!(style, WindowStyle::Overlapped));
    }

    fn set_topmost(&self, topmost: bool) {
        let level = if topmost { WindowLevel::AlwaysOnTop } else { WindowLevel::Normal };
        self.set_window_level(level);
    }

    fn set_outer_rect(&self, rect: WindowRect) {
        self.set_outer_position(PhysicalPosition::new(rect.x, rect.y));
        let _ = self.request_inner_size(PhysicalSize::new(rect.width, rect.height));
    }

    fn set_visible(&self, visible: bool) {
        Window::set_visible(self, visible);
    }

    fn set_ime_allowed(&self, allowed: bool) {
        Window::set_ime_allowed(self, allowed);
    }

    fn set_cursor(&self, cursor: CursorIcon) {
        Window::set_cursor(self, cursor);
    }

    fn raw_handle(&self) -> Option<RawWindowHandle> {
        self.window_handle().ok().map(|h| h.as_raw())
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::cell::{Cell, RefCell};

    use super::*;

    /// In-memory window recording style and placement changes.
    pub(crate) struct MockWindow {
        pub id: WindowId,
        pub rect: Cell<WindowRect>,
        pub monitor: Option<WindowRect>,
        pub style: Cell<WindowStyle>,
        pub topmost: Cell<bool>,
        pub visible: Cell<bool>,
        pub minimized: Cell<bool>,
        pub ime_allowed: Cell<bool>,
        pub placements: RefCell<Vec<WindowRect>>,
    }

    impl MockWindow {
        pub fn new() -> Self {
            Self {
                id: WindowId::from(1u64),
                rect: Cell::new(WindowRect {
                    x: 100,
                    y: 80,
                    width: 1280,
                    height: 800,
                }),
                monitor: Some(WindowRect {
                    x: 0,
                    y: 0,
                    width: 1920,
                    height: 1080,
                }),
                style: Cell::new(WindowStyle::Overlapped),
                topmost: Cell::new(false),
                visible: Cell::new(false),
                minimized: Cell::new(false),
                ime_allowed: Cell::new(true),
                placements: RefCell::new(Vec::new()),
            }
        }

        pub fn with_id(mut self, id: u64) -> Self {
            self.id = WindowId::from(id);
            self
        }

        pub fn without_monitor(mut self) -> Self {
            self.monitor = None;
            self
        }
    }

    impl NativeWindow for MockWindow {
        fn id(&self) -> WindowId {
            self.id
        }

        fn inner_size(&self) -> (u32, u32) {
            let r = self.rect.get();
            (r.width, r.height)
        }

        fn scale_factor(&self) -> f64 {
            1.0
        }

        fn is_minimized(&self) -> bool {
            self.minimized.get()
        }

        fn outer_rect(&self) -> Result<WindowRect, PlatformError> {
            Ok(self.rect.get())
        }

        fn primary_monitor_rect(&self) -> Option<WindowRect> {
            self.monitor
        }

        fn set_style(&self, style: WindowStyle) {
            self.style.set(style);
        }

        fn set_topmost(&self, topmost: bool) {
            self.topmost.set(topmost);
        }

        fn set_outer_rect(&self, rect: WindowRect) {
            self.rect.set(rect);
            self.placements.borrow_mut().push(rect);
        }

        fn set_visible(&self, visible: bool) {
            self.visible.set(visible);
        }

        fn set_ime_allowed(&self, allowed: bool) {
            self.ime_allowed.set(allowed);
        }

        fn set_cursor(&self, _cursor: CursorIcon) {}

        fn raw_handle(&self) -> Option<RawWindowHandle> {
            None
        }
    }
}
