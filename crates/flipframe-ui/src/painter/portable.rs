use egui_wgpu::{Renderer, RendererOptions, ScreenDescriptor};

use flipframe_engine::device::{PortableBackend, PortableDevice, PortableTarget};

use super::UiPainter;
use super::textures::TextureLedger;
use crate::layer::UiFrame;

/// egui renderer for the wgpu backend, drawn on top of the cleared target.
#[derive(Default)]
pub struct WgpuPainter {
    renderer:         Option<Renderer>,
    textures:         TextureLedger,
    max_texture_side: usize,
}

impl WgpuPainter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UiPainter<PortableBackend> for WgpuPainter {
    fn attach(&mut self, device: &PortableDevice) -> anyhow::Result<()> {
        self.textures.clear();
        self.renderer = Some(Renderer::new(&device.device, device.format, RendererOptions::default()));
        self.max_texture_side = device.device.limits().max_texture_dimension_2d as usize;
        log::debug!("egui wgpu renderer attached ({:?})", device.format);
        Ok(())
    }

    fn detach(&mut self) {
        self.textures.clear();
        if self.renderer.take().is_some() {
            log::debug!("egui wgpu renderer detached");
        }
    }

    fn is_attached(&self) -> bool {
        self.renderer.is_some()
    }

    fn max_texture_side(&self) -> usize {
        self.max_texture_side
    }

    fn paint(&mut self, target: &mut PortableTarget<'_>, frame: UiFrame) {
        let Some(renderer) = self.renderer.as_mut() else { return };

        let screen = ScreenDescriptor {
            size_in_pixels: [target.size.0, target.size.1],
            pixels_per_point: frame.pixels_per_point,
        };

        for (id, delta) in self.textures.uploads(&frame.textures.set) {
            renderer.update_texture(target.device, target.queue, id, delta);
        }

        let callbacks = renderer.update_buffers(
            target.device,
            target.queue,
            target.encoder,
            &frame.primitives,
            &screen,
        );
        if !callbacks.is_empty() {
            target.queue.submit(callbacks);
        }

        {
            let pass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("flipframe egui pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });
            // egui-wgpu wants a 'static pass
            let mut pass = pass.forget_lifetime();
            renderer.render(&mut pass, &frame.primitives, &screen);
        }

        for id in self.textures.frees(&frame.textures.free) {
            renderer.free_texture(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use egui::TextureId;
    use egui::epaint::{ColorImage, ImageDelta};

    use super::*;

    #[test]
    fn detach_forgets_uploaded_textures() {
        let mut painter = WgpuPainter::new();
        let image = ColorImage::from_rgba_unmultiplied([1, 1], &[0, 0, 0, 255]);
        painter
            .textures
            .uploads(&[(TextureId::default(), ImageDelta::full(image, egui::TextureOptions::LINEAR))]);
        assert_eq!(painter.textures.len(), 1);

        painter.detach();

        assert!(!painter.is_attached());
        assert_eq!(painter.textures.len(), 0);
    }
}
