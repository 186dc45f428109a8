//! egui integration for the flipframe engine.
//!
//! `EguiLayer` turns engine input into egui passes, a `UiPainter` draws the
//! result onto the bound render target, and `EguiApp` plugs both into the
//! frame loop.

mod app;
mod clipboard;
mod input;
mod layer;
pub mod painter;

pub use app::{EguiApp, View};
pub use clipboard::Clipboard;
pub use input::{InputTranslator, ScreenInfo, map_key, map_modifiers};
pub use layer::{EguiLayer, UiFrame, Viewport};
pub use painter::UiPainter;

pub use egui;
