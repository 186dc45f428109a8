use anyhow::Result;

use crate::device::PresentBackend;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by higher layers (the UI layer, the demo).
///
/// The frame loop calls `on_frame` once per iteration and `render` once per
/// presented frame, with the render target already bound and cleared.
pub trait App<B: PresentBackend> {
    /// Creates renderer resources for `device`. Called after every surface (re)creation.
    fn attach(&mut self, device: &B::Device) -> Result<()>;

    /// Releases renderer resources ahead of a surface teardown.
    fn detach(&mut self) {}

    /// Builds the frame: input handling, UI construction, state updates.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl;

    /// Submits the built frame to the bound render target.
    fn render(&mut self, target: &mut B::Target<'_>);
}
