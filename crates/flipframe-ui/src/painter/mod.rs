//! Per-backend UI renderers.
//!
//! A painter owns the GPU resources for drawing a `UiFrame` onto the bound
//! render target of one presentation backend. Resources are created in
//! `attach` and dropped in `detach`; the frame loop calls both around every
//! surface rebuild.

#[cfg(windows)]
mod d3d11;
mod portable;
mod textures;

#[cfg(windows)]
pub use d3d11::D3d11Painter;
pub use portable::WgpuPainter;

use flipframe_engine::device::PresentBackend;

use crate::layer::UiFrame;

pub trait UiPainter<B: PresentBackend> {
    /// Creates renderer resources for `device`.
    fn attach(&mut self, device: &B::Device) -> anyhow::Result<()>;

    /// Drops every GPU resource, textures included.
    fn detach(&mut self);

    fn is_attached(&self) -> bool;

    /// Largest texture the device accepts; egui splits its atlas accordingly.
    fn max_texture_side(&self) -> usize;

    /// Applies texture updates, draws the primitives, then frees textures.
    fn paint(&mut self, target: &mut B::Target<'_>, frame: UiFrame);
}

// ── clip rects ────────────────────────────────────────────────────────────

/// Converts a clip rect in points to a scissor rect `(x, y, w, h)` in pixels.
///
/// The result is clamped to the target; `None` when nothing remains visible.
pub(crate) fn clip_to_scissor(
    clip: egui::Rect,
    pixels_per_point: f32,
    target: [u32; 2],
) -> Option<(u32, u32, u32, u32)> {
    let [tw, th] = target;

    let x0 = ((clip.min.x * pixels_per_point).round().max(0.0) as u32).min(tw);
    let y0 = ((clip.min.y * pixels_per_point).round().max(0.0) as u32).min(th);
    let x1 = ((clip.max.x * pixels_per_point).round().max(0.0) as u32).min(tw);
    let y1 = ((clip.max.y * pixels_per_point).round().max(0.0) as u32).min(th);

    let (w, h) = (x1.saturating_sub(x0), y1.saturating_sub(y0));
    if w == 0 || h == 0 { None } else { Some((x0, y0, w, h)) }
}

#[cfg(test)]
mod tests {
    use egui::{Pos2, Rect};

    use super::*;

    #[test]
    fn scales_points_to_pixels() {
        let clip = Rect::from_min_max(Pos2::new(10.0, 20.0), Pos2::new(110.0, 70.0));
        assert_eq!(clip_to_scissor(clip, 2.0, [1000, 1000]), Some((20, 40, 200, 100)));
    }

    #[test]
    fn clamps_to_target() {
        let clip = Rect::from_min_max(Pos2::new(-50.0, -50.0), Pos2::new(5000.0, 30.0));
        assert_eq!(clip_to_scissor(clip, 1.0, [800, 600]), Some((0, 0, 800, 30)));
    }

    #[test]
    fn offscreen_or_empty_is_culled() {
        let outside = Rect::from_min_max(Pos2::new(900.0, 0.0), Pos2::new(950.0, 10.0));
        assert_eq!(clip_to_scissor(outside, 1.0, [800, 600]), None);

        let empty = Rect::from_min_max(Pos2::new(10.0, 10.0), Pos2::new(10.0, 40.0));
        assert_eq!(clip_to_scissor(empty, 1.0, [800, 600]), None);
    }
}
