//! Portable presentation backend over wgpu.
//!
//! This is the reduced-capability mode: wgpu exposes no frame-latency waitable
//! object, so negotiation always lands on a flip rung without one, and
//! queued frames are capped through `desired_maximum_frame_latency`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use winit::window::Window;

use super::backend::{PresentBackend, WaitOutcome};
use super::caps::{FeatureLevel, SwapChainDesc};
use super::error::{GraphicsError, SurfaceErrorAction};

/// Device handles exposed to UI renderers.
pub struct PortableDevice {
    pub device: wgpu::Device,
    pub queue:  wgpu::Queue,
    pub format: wgpu::TextureFormat,
}

/// Render target for one frame: encoder + view of the acquired surface texture.
pub struct PortableTarget<'a> {
    pub device:  &'a wgpu::Device,
    pub queue:   &'a wgpu::Queue,
    pub format:  wgpu::TextureFormat,
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub view:    &'a wgpu::TextureView,
    pub size:    (u32, u32),
}

/// Represents a single acquired frame.
///
/// Holding the surface texture prevents acquisition of subsequent frames, so
/// the frame lives only between `bind_render_target` and `present`.
struct GpuFrame {
    surface_texture: wgpu::SurfaceTexture,
    view:            wgpu::TextureView,
    encoder:         wgpu::CommandEncoder,
}

struct SurfaceSlot {
    surface: wgpu::Surface<'static>,
    config:  Option<wgpu::SurfaceConfiguration>,
}

/// wgpu-backed `PresentBackend`.
pub struct PortableBackend {
    window:       Arc<Window>,
    instance:     wgpu::Instance,
    slot:         Option<SurfaceSlot>,
    adapter:      Option<wgpu::Adapter>,
    gpu:          Option<PortableDevice>,
    frame:        Option<GpuFrame>,
    present_mode: wgpu::PresentMode,
    lost:         Arc<AtomicBool>,
    lost_reason:  Arc<Mutex<Option<String>>>,
}

impl PortableBackend {
    pub fn new(window: Arc<Window>) -> Self {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        Self {
            window,
            instance,
            slot: None,
            adapter: None,
            gpu: None,
            frame: None,
            present_mode: wgpu::PresentMode::Fifo,
            lost: Arc::new(AtomicBool::new(false)),
            lost_reason: Arc::new(Mutex::new(None)),
        }
    }

    fn parts(&self) -> Result<(&wgpu::Surface<'static>, &wgpu::Adapter, &PortableDevice), GraphicsError> {
        match (&self.slot, &self.adapter, &self.gpu) {
            (Some(slot), Some(adapter), Some(gpu)) => Ok((&slot.surface, adapter, gpu)),
            _ => Err(GraphicsError::SwapChainCreation("no device".into())),
        }
    }

    fn configure(&mut self) {
        if let (Some(slot), Some(gpu)) = (&mut self.slot, &self.gpu) {
            if let Some(config) = &mut slot.config {
                config.present_mode = self.present_mode;
                slot.surface.configure(&gpu.device, config);
            }
        }
    }

    fn check_lost(&self) -> Result<(), GraphicsError> {
        match self.device_removed() {
            Some(reason) => Err(GraphicsError::DeviceLost { reason }),
            None => Ok(()),
        }
    }

    fn supports_present_mode(&self, mode: wgpu::PresentMode) -> bool {
        match (&self.slot, &self.adapter) {
            (Some(slot), Some(adapter)) => slot.surface.get_capabilities(adapter).present_modes.contains(&mode),
            _ => false,
        }
    }
}

fn limits_for(level: FeatureLevel) -> wgpu::Limits {
    match level {
        FeatureLevel::L11_1 | FeatureLevel::L11_0 => wgpu::Limits::default(),
        FeatureLevel::L10_1 | FeatureLevel::L10_0 => wgpu::Limits::downlevel_defaults(),
    }
}

pub(crate) fn choose_surface_format(caps: &wgpu::SurfaceCapabilities) -> Option<wgpu::TextureFormat> {
    let preferred = [wgpu::TextureFormat::Bgra8Unorm, wgpu::TextureFormat::Rgba8Unorm];
    preferred
        .into_iter()
        .find(|f| caps.formats.contains(f))
        .or_else(|| caps.formats.first().copied())
}

pub(crate) fn choose_alpha_mode(caps: &wgpu::SurfaceCapabilities) -> wgpu::CompositeAlphaMode {
    [wgpu::CompositeAlphaMode::Opaque]
        .into_iter()
        .find(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

pub(crate) fn map_surface_error(err: &wgpu::SurfaceError) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceErrorAction::Reconfigured,
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}

/// Present mode for a sync interval / tearing pair.
pub(crate) fn present_mode_for(sync_interval: u32, allow_tearing: bool, mailbox: bool) -> wgpu::PresentMode {
    if sync_interval > 0 {
        wgpu::PresentMode::Fifo
    } else if allow_tearing {
        wgpu::PresentMode::Immediate
    } else if mailbox {
        wgpu::PresentMode::Mailbox
    } else {
        wgpu::PresentMode::Fifo
    }
}

impl PresentBackend for PortableBackend {
    type Device = PortableDevice;
    type Target<'a> = PortableTarget<'a>;

    fn create_device(&mut self, levels: &[FeatureLevel], _debug: bool) -> Result<FeatureLevel, GraphicsError> {
        if self.slot.is_none() {
            let surface = self
                .instance
                .create_surface(self.window.clone())
                .map_err(|e| GraphicsError::DeviceCreation(format!("surface: {e}")))?;
            self.slot = Some(SurfaceSlot { surface, config: None });
        }
        let surface = self.slot.as_ref().map(|s| &s.surface);

        let adapter = pollster::block_on(self.instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: surface,
            force_fallback_adapter: false,
        }))
        .map_err(|e| GraphicsError::DeviceCreation(format!("adapter: {e}")))?;

        // Walk the tiers highest first; each tier maps to a limits set.
        let mut last_error = String::from("empty feature level list");
        let mut created = None;
        for &level in levels {
            let request = adapter.request_device(&wgpu::DeviceDescriptor {
                label: Some("flipframe device"),
                required_features: wgpu::Features::empty(),
                required_limits: limits_for(level),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            });
            match pollster::block_on(request) {
                Ok(pair) => {
                    created = Some((level, pair));
                    break;
                }
                Err(e) => {
                    log::debug!("device request at {level} failed: {e}");
                    last_error = format!("device at {level}: {e}");
                }
            }
        }
        let (level, (device, queue)) = created.ok_or(GraphicsError::DeviceCreation(last_error))?;

        self.lost.store(false, Ordering::Release);
        let lost = Arc::clone(&self.lost);
        let lost_reason = Arc::clone(&self.lost_reason);
        device.set_device_lost_callback(move |reason, message| {
            if let Ok(mut slot) = lost_reason.lock() {
                *slot = Some(format!("{reason:?}: {message}"));
            }
            lost.store(true, Ordering::Release);
        });

        log::info!("wgpu adapter: {:?}", adapter.get_info());

        self.adapter = Some(adapter);
        self.gpu = Some(PortableDevice {
            device,
            queue,
            format: wgpu::TextureFormat::Bgra8Unorm,
        });
        Ok(level)
    }

    fn supports_tearing(&mut self) -> bool {
        self.supports_present_mode(wgpu::PresentMode::Immediate)
    }

    fn supports_flip_model(&self) -> bool {
        // wgpu surfaces always present through the compositor's flip path.
        self.gpu.is_some()
    }

    fn create_swap_chain(&mut self, desc: &SwapChainDesc) -> Result<(), GraphicsError> {
        if desc.flags.frame_latency_waitable {
            return Err(GraphicsError::Unsupported("frame latency waitable object"));
        }

        let (surface, adapter, gpu) = self.parts()?;
        let caps = surface.get_capabilities(adapter);
        let format = choose_surface_format(&caps)
            .ok_or_else(|| GraphicsError::SwapChainCreation("no supported surface formats".into()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: desc.width.max(1),
            height: desc.height.max(1),
            present_mode: self.present_mode,
            alpha_mode: choose_alpha_mode(&caps),
            view_formats: vec![],
            desired_maximum_frame_latency: desc.buffer_count,
        };
        surface.configure(&gpu.device, &config);

        if let Some(gpu) = &mut self.gpu {
            gpu.format = format;
        }
        if let Some(slot) = &mut self.slot {
            slot.config = Some(config);
        }
        Ok(())
    }

    fn enable_frame_latency_waitable(&mut self, _max_latency: u32) -> Result<(), GraphicsError> {
        Err(GraphicsError::Unsupported("frame latency waitable object"))
    }

    fn set_device_frame_latency(&mut self, max_latency: u32) -> Result<(), GraphicsError> {
        let config = self
            .slot
            .as_mut()
            .and_then(|s| s.config.as_mut())
            .ok_or(GraphicsError::Unsupported("no surface configuration"))?;
        config.desired_maximum_frame_latency = max_latency.max(1);
        self.configure();
        Ok(())
    }

    fn disable_fullscreen_toggle(&mut self) -> Result<(), GraphicsError> {
        // wgpu never enters exclusive fullscreen on its own.
        Ok(())
    }

    fn create_render_target(&mut self) -> Result<(), GraphicsError> {
        // Views are created per acquired frame; only the configuration must exist.
        match self.slot.as_ref().and_then(|s| s.config.as_ref()) {
            Some(_) => Ok(()),
            None => Err(GraphicsError::RenderTarget("surface not configured".into())),
        }
    }

    fn release_render_target(&mut self) {
        self.frame = None;
    }

    fn resize_buffers(&mut self, width: u32, height: u32, _desc: &SwapChainDesc) -> Result<(), GraphicsError> {
        self.check_lost()?;
        let config = self
            .slot
            .as_mut()
            .and_then(|s| s.config.as_mut())
            .ok_or_else(|| GraphicsError::Resize("surface not configured".into()))?;
        config.width = width;
        config.height = height;
        self.configure();
        Ok(())
    }

    fn wait_frame_latency(&mut self, _timeout: Duration) -> WaitOutcome {
        WaitOutcome::Unavailable
    }

    fn bind_render_target(&mut self, clear: [f32; 4]) -> Result<(), GraphicsError> {
        self.check_lost()?;
        self.frame = None;

        let (Some(slot), Some(gpu)) = (&self.slot, &self.gpu) else {
            return Err(GraphicsError::RenderTarget("no surface".into()));
        };

        let surface_texture = match slot.surface.get_current_texture() {
            Ok(t) => t,
            Err(err) => {
                return match map_surface_error(&err) {
                    SurfaceErrorAction::Reconfigured => {
                        self.configure();
                        Err(GraphicsError::Transient(err.to_string()))
                    }
                    SurfaceErrorAction::SkipFrame => Err(GraphicsError::Transient(err.to_string())),
                    SurfaceErrorAction::Fatal => Err(GraphicsError::OutOfMemory),
                };
            }
        };

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("flipframe frame encoder"),
            });

        // Clear pass, dropped before the render callback records into the encoder.
        {
            let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("flipframe clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear[0] as f64,
                            g: clear[1] as f64,
                            b: clear[2] as f64,
                            a: clear[3] as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });
        }

        self.frame = Some(GpuFrame {
            surface_texture,
            view,
            encoder,
        });
        Ok(())
    }

    fn target(&mut self) -> Option<PortableTarget<'_>> {
        let gpu = self.gpu.as_ref()?;
        let frame = self.frame.as_mut()?;
        let size = frame.surface_texture.texture.size();
        Some(PortableTarget {
            device: &gpu.device,
            queue: &gpu.queue,
            format: gpu.format,
            encoder: &mut frame.encoder,
            view: &frame.view,
            size: (size.width, size.height),
        })
    }

    fn present(&mut self, sync_interval: u32, allow_tearing: bool) -> Result<(), GraphicsError> {
        self.check_lost()?;
        let frame = self
            .frame
            .take()
            .ok_or_else(|| GraphicsError::Present("no frame bound".into()))?;
        let gpu = self
            .gpu
            .as_ref()
            .ok_or_else(|| GraphicsError::Present("no device".into()))?;

        gpu.queue.submit(std::iter::once(frame.encoder.finish()));
        self.window.pre_present_notify();
        drop(frame.view);
        frame.surface_texture.present();

        // wgpu picks the present mode at configure time; a change applies from the next frame.
        let mailbox = self.supports_present_mode(wgpu::PresentMode::Mailbox);
        let wanted = present_mode_for(sync_interval, allow_tearing, mailbox);
        if wanted != self.present_mode {
            log::debug!("present mode {:?} -> {:?}", self.present_mode, wanted);
            self.present_mode = wanted;
            self.configure();
        }
        Ok(())
    }

    fn device_removed(&self) -> Option<String> {
        if !self.lost.load(Ordering::Acquire) {
            return None;
        }
        let reason = self
            .lost_reason
            .lock()
            .ok()
            .and_then(|r| r.clone())
            .unwrap_or_else(|| "device lost".to_string());
        Some(reason)
    }

    fn device(&self) -> Option<&PortableDevice> {
        self.gpu.as_ref()
    }

    fn release(&mut self) {
        self.frame = None;
        self.gpu = None;
        self.adapter = None;
        self.slot = None;
        if let Ok(mut r) = self.lost_reason.lock() {
            *r = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vsync_always_fifo() {
        assert_eq!(present_mode_for(1, true, true), wgpu::PresentMode::Fifo);
    }

    #[test]
    fn tearing_prefers_immediate() {
        assert_eq!(present_mode_for(0, true, true), wgpu::PresentMode::Immediate);
    }

    #[test]
    fn no_vsync_without_tearing_uses_mailbox_when_available() {
        assert_eq!(present_mode_for(0, false, true), wgpu::PresentMode::Mailbox);
        assert_eq!(present_mode_for(0, false, false), wgpu::PresentMode::Fifo);
    }

    #[test]
    fn lower_tiers_request_downlevel_limits() {
        assert_eq!(limits_for(FeatureLevel::L10_0), wgpu::Limits::downlevel_defaults());
        assert_eq!(limits_for(FeatureLevel::L11_1), wgpu::Limits::default());
    }

    #[test]
    fn surface_error_actions() {
        assert_eq!(map_surface_error(&wgpu::SurfaceError::Outdated), SurfaceErrorAction::Reconfigured);
        assert_eq!(map_surface_error(&wgpu::SurfaceError::Timeout), SurfaceErrorAction::SkipFrame);
        assert_eq!(map_surface_error(&wgpu::SurfaceError::OutOfMemory), SurfaceErrorAction::Fatal);
    }
}
