use std::time::Duration;

use winit::window::CursorIcon;

use crate::device::SurfaceCaps;
use crate::ime::SharedIme;
use crate::input::{InputFrame, InputState};
use crate::time::FrameTime;
use crate::window::NativeWindow;

/// Per-frame context passed to `core::App::on_frame`.
pub struct FrameCtx<'a> {
    pub window:       &'a dyn NativeWindow,
    pub input:        &'a InputState,
    pub input_frame:  &'a InputFrame,
    pub time:         FrameTime,
    /// Back-buffer size in physical pixels.
    pub surface_size: (u32, u32),
    /// Capabilities negotiated by the presentation surface.
    pub caps:         SurfaceCaps,
    pub runtime:      &'a mut RuntimeCtx,
    pub(crate) ime:   &'a SharedIme,
}

impl<'a> FrameCtx<'a> {
    /// Returns the logical window size as `(width, height)` in logical pixels.
    pub fn logical_size(&self) -> (f32, f32) {
        let (w, h) = self.surface_size;
        let scale = self.window.scale_factor() as f32;
        (w as f32 / scale, h as f32 / scale)
    }

    pub fn pixels_per_point(&self) -> f32 {
        self.window.scale_factor() as f32
    }

    /// Sets the mouse cursor shape for this window.
    ///
    /// Call each frame to keep the cursor updated.
    pub fn set_cursor(&self, cursor: CursorIcon) {
        self.window.set_cursor(cursor);
    }

    /// Input-method controls for this window.
    pub fn ime(&self) -> ImeCtx<'_> {
        ImeCtx {
            window: self.window,
            ime: self.ime,
        }
    }
}

/// Input-method operations bound to the frame's window.
pub struct ImeCtx<'a> {
    window: &'a dyn NativeWindow,
    ime:    &'a SharedIme,
}

impl ImeCtx<'_> {
    pub fn available(&self) -> bool {
        self.ime.lock().is_ok_and(|ime| ime.has_backend())
    }

    pub fn is_enabled(&self) -> bool {
        self.ime.lock().is_ok_and(|ime| ime.is_enabled(self.window))
    }

    pub fn set_enabled(&self, enabled: bool) -> bool {
        self.ime
            .lock()
            .is_ok_and(|mut ime| ime.set_enabled(self.window, enabled))
    }

    pub fn force_non_converting(&self) -> bool {
        self.ime
            .lock()
            .is_ok_and(|mut ime| ime.force_non_converting(self.window))
    }

    pub fn toggle_association(&self) -> bool {
        self.ime
            .lock()
            .is_ok_and(|mut ime| ime.toggle_association(self.window))
    }
}

/// Runtime context passed to the application.
///
/// Commands are buffered and applied after the current callback returns.
#[derive(Debug, Default)]
pub struct RuntimeCtx {
    commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Exit,
    SetVsync(bool),
    SetClearColor([f32; 4]),
    SetVblankTimeout(Duration),
}

impl RuntimeCtx {
    pub fn exit(&mut self) {
        self.commands.push(Command::Exit);
    }

    pub fn set_vsync(&mut self, vsync: bool) {
        self.commands.push(Command::SetVsync(vsync));
    }

    /// Clear color applied when binding the render target, straight (non-premultiplied) RGBA.
    pub fn set_clear_color(&mut self, rgba: [f32; 4]) {
        self.commands.push(Command::SetClearColor(rgba));
    }

    pub fn set_vblank_timeout(&mut self, timeout: Duration) {
        self.commands.push(Command::SetVblankTimeout(timeout));
    }

    pub(crate) fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }
}
