use std::time::Instant;

use egui::{ClippedPrimitive, Context, TexturesDelta};

use flipframe_engine::input::{InputFrame, InputState};
use flipframe_engine::window::CursorIcon;

use crate::clipboard::Clipboard;
use crate::input::{InputTranslator, ScreenInfo};

/// Tessellated UI ready for a painter.
#[derive(Default)]
pub struct UiFrame {
    pub primitives: Vec<ClippedPrimitive>,
    /// Texture uploads and frees accumulated since the last painted frame.
    pub textures: TexturesDelta,
    pub pixels_per_point: f32,
    pub size_in_pixels: [u32; 2],
}

/// Surface values for one pass.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub size_in_pixels: (u32, u32),
    pub pixels_per_point: f32,
    pub predicted_dt: f32,
    pub max_texture_side: usize,
}

/// Owns the egui context and turns one loop iteration into a `UiFrame`.
///
/// Frames whose render is skipped (resize frames) keep their texture deltas;
/// they are handed to the painter with the next frame that is drawn.
pub struct EguiLayer {
    ctx: Context,
    translator: InputTranslator,
    clipboard: Clipboard,
    start: Instant,

    primitives: Option<Vec<ClippedPrimitive>>,
    textures: TexturesDelta,
    pixels_per_point: f32,
    size_in_pixels: [u32; 2],
}

impl EguiLayer {
    pub fn new() -> Self {
        Self::with_clipboard(Clipboard::new())
    }

    pub fn with_clipboard(clipboard: Clipboard) -> Self {
        let ctx = Context::default();
        ctx.set_visuals(egui::Visuals::dark());

        Self {
            ctx,
            translator: InputTranslator::new(),
            clipboard,
            start: Instant::now(),
            primitives: None,
            textures: TexturesDelta::default(),
            pixels_per_point: 1.0,
            size_in_pixels: [0, 0],
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Runs one UI pass (plus egui's discard re-runs) and stores the result.
    ///
    /// Returns the cursor egui asks for.
    pub fn run_pass(
        &mut self,
        state: &InputState,
        frame: &InputFrame,
        viewport: Viewport,
        build: impl FnMut(&Context),
    ) -> Option<CursorIcon> {
        let Viewport {
            size_in_pixels,
            pixels_per_point,
            predicted_dt,
            max_texture_side,
        } = viewport;
        let ppp = if pixels_per_point > 0.0 { pixels_per_point } else { 1.0 };
        let screen = ScreenInfo {
            size: (size_in_pixels.0 as f32 / ppp, size_in_pixels.1 as f32 / ppp),
            pixels_per_point: ppp,
            time: self.start.elapsed().as_secs_f64(),
            predicted_dt,
            max_texture_side,
        };
        let raw = self
            .translator
            .raw_input(state, frame, screen, &mut self.clipboard);

        let output = self.ctx.run(raw, build);

        for cmd in output.platform_output.commands {
            if let egui::OutputCommand::CopyText(text) = cmd {
                self.clipboard.set(text);
            }
        }

        self.textures.append(output.textures_delta);
        self.primitives = Some(self.ctx.tessellate(output.shapes, output.pixels_per_point));
        self.pixels_per_point = output.pixels_per_point;
        self.size_in_pixels = [size_in_pixels.0, size_in_pixels.1];

        map_cursor(output.platform_output.cursor_icon)
    }

    /// Takes the latest frame for painting. `None` until a pass has run.
    pub fn take_frame(&mut self) -> Option<UiFrame> {
        let primitives = self.primitives.take()?;
        Some(UiFrame {
            primitives,
            textures: std::mem::take(&mut self.textures),
            pixels_per_point: self.pixels_per_point,
            size_in_pixels: self.size_in_pixels,
        })
    }

    /// Starts over with a fresh context after the painter lost its textures.
    ///
    /// Style and memory (window positions, collapsing state) carry over; the
    /// new context re-uploads the font atlas on its first pass.
    pub fn reset_textures(&mut self) {
        let fresh = Context::default();
        fresh.set_style(self.ctx.style());
        let memory = self.ctx.memory(|m| m.clone());
        fresh.memory_mut(|m| *m = memory);

        self.ctx = fresh;
        self.primitives = None;
        self.textures = TexturesDelta::default();
    }
}

impl Default for EguiLayer {
    fn default() -> Self {
        Self::new()
    }
}

fn map_cursor(icon: egui::CursorIcon) -> Option<CursorIcon> {
    use egui::CursorIcon as E;
    Some(match icon {
        E::None => return None,
        E::Default => CursorIcon::Default,
        E::ContextMenu => CursorIcon::ContextMenu,
        E::Help => CursorIcon::Help,
        E::PointingHand => CursorIcon::Pointer,
        E::Progress => CursorIcon::Progress,
        E::Wait => CursorIcon::Wait,
        E::Cell => CursorIcon::Cell,
        E::Crosshair => CursorIcon::Crosshair,
        E::Text => CursorIcon::Text,
        E::VerticalText => CursorIcon::VerticalText,
        E::Alias => CursorIcon::Alias,
        E::Copy => CursorIcon::Copy,
        E::Move => CursorIcon::Move,
        E::NoDrop => CursorIcon::NoDrop,
        E::NotAllowed => CursorIcon::NotAllowed,
        E::Grab => CursorIcon::Grab,
        E::Grabbing => CursorIcon::Grabbing,
        E::AllScroll => CursorIcon::AllScroll,
        E::ResizeHorizontal => CursorIcon::EwResize,
        E::ResizeNeSw => CursorIcon::NeswResize,
        E::ResizeNwSe => CursorIcon::NwseResize,
        E::ResizeVertical => CursorIcon::NsResize,
        E::ResizeEast => CursorIcon::EResize,
        E::ResizeSouthEast => CursorIcon::SeResize,
        E::ResizeSouth => CursorIcon::SResize,
        E::ResizeSouthWest => CursorIcon::SwResize,
        E::ResizeWest => CursorIcon::WResize,
        E::ResizeNorthWest => CursorIcon::NwResize,
        E::ResizeNorth => CursorIcon::NResize,
        E::ResizeNorthEast => CursorIcon::NeResize,
        E::ResizeColumn => CursorIcon::ColResize,
        E::ResizeRow => CursorIcon::RowResize,
        E::ZoomIn => CursorIcon::ZoomIn,
        E::ZoomOut => CursorIcon::ZoomOut,
    })
}
