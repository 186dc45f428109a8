use std::marker::PhantomData;

use anyhow::Result;

use flipframe_engine::core::{App, AppControl, FrameCtx};
use flipframe_engine::device::PresentBackend;

use crate::layer::{EguiLayer, Viewport};
use crate::painter::UiPainter;

/// Immediate-mode UI built every frame.
pub trait View {
    /// Builds the UI. `frame` gives access to timing, the runtime and the IME.
    fn ui(&mut self, egui: &egui::Context, frame: &mut FrameCtx<'_>) -> AppControl;
}

/// Adapts a `View` and a painter to the frame loop's `App` contract.
pub struct EguiApp<B, P, V> {
    layer: EguiLayer,
    painter: P,
    view: V,
    _backend: PhantomData<fn() -> B>,
}

impl<B, P, V> EguiApp<B, P, V>
where
    B: PresentBackend,
    P: UiPainter<B>,
    V: View,
{
    pub fn new(painter: P, view: V) -> Self {
        Self::with_layer(EguiLayer::new(), painter, view)
    }

    pub fn with_layer(layer: EguiLayer, painter: P, view: V) -> Self {
        Self {
            layer,
            painter,
            view,
            _backend: PhantomData,
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn egui(&self) -> &egui::Context {
        self.layer.context()
    }
}

impl<B, P, V> App<B> for EguiApp<B, P, V>
where
    B: PresentBackend,
    P: UiPainter<B>,
    V: View,
{
    fn attach(&mut self, device: &B::Device) -> Result<()> {
        self.painter.attach(device)
    }

    fn detach(&mut self) {
        if self.painter.is_attached() {
            self.painter.detach();
            // textures died with the device
            self.layer.reset_textures();
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl {
        let viewport = Viewport {
            size_in_pixels: ctx.surface_size,
            pixels_per_point: ctx.pixels_per_point(),
            predicted_dt: ctx.time.dt,
            max_texture_side: self.painter.max_texture_side(),
        };
        let (input, input_frame) = (ctx.input, ctx.input_frame);

        let mut control = AppControl::Continue;
        let view = &mut self.view;
        let cursor = self.layer.run_pass(input, input_frame, viewport, |egui| {
            if view.ui(egui, ctx) == AppControl::Exit {
                control = AppControl::Exit;
            }
        });

        if let Some(cursor) = cursor {
            ctx.set_cursor(cursor);
        }
        control
    }

    fn render(&mut self, target: &mut B::Target<'_>) {
        if let Some(frame) = self.layer.take_frame() {
            self.painter.paint(target, frame);
        }
    }
}
