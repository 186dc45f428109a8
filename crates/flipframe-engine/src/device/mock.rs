//! Scriptable in-memory backend for surface and frame-loop tests.

use std::time::Duration;

use super::backend::{PresentBackend, WaitOutcome};
use super::caps::{FeatureLevel, SwapChainDesc, SwapChainFlags};
use super::error::GraphicsError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    CreateDevice(Vec<FeatureLevel>),
    CreateSwapChain(SwapChainDesc),
    EnableWaitable(u32),
    DeviceLatency(u32),
    DisableFullscreenToggle,
    CreateRenderTarget,
    ReleaseRenderTarget,
    ResizeBuffers(u32, u32, SwapChainFlags),
    Wait(Duration),
    Bind([f32; 4]),
    Present { sync_interval: u32, allow_tearing: bool },
    Release,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MockDevice {
    pub generation: u32,
}

pub(crate) struct MockTarget<'a> {
    pub clear_color: [f32; 4],
    draws:           &'a mut u32,
}

impl MockTarget<'_> {
    pub fn draw(&mut self) {
        *self.draws += 1;
    }
}

pub(crate) struct MockBackend {
    pub calls: Vec<Call>,

    pub max_level:           FeatureLevel,
    pub reject_top_tier:     bool,
    pub no_device:           bool,
    pub tearing:             bool,
    pub flip:                bool,
    pub swap_chain_failures: usize,
    pub fail_waitable:       bool,
    pub fail_render_target:  bool,
    pub removed:             Option<String>,
    pub bind_error:          Option<GraphicsError>,
    pub present_error:       Option<GraphicsError>,

    pub has_device:        bool,
    pub has_swap_chain:    bool,
    pub has_render_target: bool,
    pub bound:             Option<[f32; 4]>,
    pub draws:             u32,
    pub presents:          u32,
    device:                Option<MockDevice>,
    generation:            u32,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            max_level: FeatureLevel::L11_1,
            reject_top_tier: false,
            no_device: false,
            tearing: false,
            flip: true,
            swap_chain_failures: 0,
            fail_waitable: false,
            fail_render_target: false,
            removed: None,
            bind_error: None,
            present_error: None,
            has_device: false,
            has_swap_chain: false,
            has_render_target: false,
            bound: None,
            draws: 0,
            presents: 0,
            device: None,
            generation: 0,
        }
    }

    pub fn with_tearing(mut self, tearing: bool) -> Self {
        self.tearing = tearing;
        self
    }

    pub fn with_max_level(mut self, level: FeatureLevel) -> Self {
        self.max_level = level;
        self
    }

    pub fn failing_swap_chains(mut self, count: usize) -> Self {
        self.swap_chain_failures = count;
        self
    }

    pub fn rejecting_top_tier(mut self) -> Self {
        self.reject_top_tier = true;
        self
    }

    pub fn without_device(mut self) -> Self {
        self.no_device = true;
        self
    }

    pub fn failing_waitable(mut self) -> Self {
        self.fail_waitable = true;
        self
    }

    pub fn swap_chain_attempts(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, Call::CreateSwapChain(_))).count()
    }

    pub fn last_resize(&self) -> Option<(u32, u32)> {
        self.calls.iter().rev().find_map(|c| match c {
            Call::ResizeBuffers(w, h, _) => Some((*w, *h)),
            _ => None,
        })
    }

    fn lost(&self) -> Result<(), GraphicsError> {
        match &self.removed {
            Some(reason) => Err(GraphicsError::DeviceLost { reason: reason.clone() }),
            None => Ok(()),
        }
    }
}

impl PresentBackend for MockBackend {
    type Device = MockDevice;
    type Target<'a> = MockTarget<'a>;

    fn create_device(&mut self, levels: &[FeatureLevel], _debug: bool) -> Result<FeatureLevel, GraphicsError> {
        self.calls.push(Call::CreateDevice(levels.to_vec()));
        if self.no_device {
            return Err(GraphicsError::DeviceCreation("no adapter".into()));
        }
        if self.reject_top_tier && levels.contains(&FeatureLevel::L11_1) {
            return Err(GraphicsError::DeviceCreation("invalid argument".into()));
        }
        let level = levels
            .iter()
            .copied()
            .find(|l| *l <= self.max_level)
            .ok_or_else(|| GraphicsError::DeviceCreation("unsupported feature levels".into()))?;

        self.generation += 1;
        self.has_device = true;
        self.device = Some(MockDevice { generation: self.generation });
        Ok(level)
    }

    fn supports_tearing(&mut self) -> bool {
        self.tearing
    }

    fn supports_flip_model(&self) -> bool {
        self.flip
    }

    fn create_swap_chain(&mut self, desc: &SwapChainDesc) -> Result<(), GraphicsError> {
        self.calls.push(Call::CreateSwapChain(*desc));
        if !self.has_device {
            return Err(GraphicsError::SwapChainCreation("no device".into()));
        }
        if self.swap_chain_failures > 0 {
            self.swap_chain_failures -= 1;
            return Err(GraphicsError::SwapChainCreation("simulated".into()));
        }
        self.has_swap_chain = true;
        Ok(())
    }

    fn enable_frame_latency_waitable(&mut self, max_latency: u32) -> Result<(), GraphicsError> {
        self.calls.push(Call::EnableWaitable(max_latency));
        if self.fail_waitable {
            return Err(GraphicsError::Unsupported("waitable object"));
        }
        Ok(())
    }

    fn set_device_frame_latency(&mut self, max_latency: u32) -> Result<(), GraphicsError> {
        self.calls.push(Call::DeviceLatency(max_latency));
        Ok(())
    }

    fn disable_fullscreen_toggle(&mut self) -> Result<(), GraphicsError> {
        self.calls.push(Call::DisableFullscreenToggle);
        Ok(())
    }

    fn create_render_target(&mut self) -> Result<(), GraphicsError> {
        self.calls.push(Call::CreateRenderTarget);
        if !self.has_swap_chain || self.fail_render_target {
            return Err(GraphicsError::RenderTarget("simulated".into()));
        }
        self.has_render_target = true;
        Ok(())
    }

    fn release_render_target(&mut self) {
        self.calls.push(Call::ReleaseRenderTarget);
        self.has_render_target = false;
        self.bound = None;
    }

    fn resize_buffers(&mut self, width: u32, height: u32, desc: &SwapChainDesc) -> Result<(), GraphicsError> {
        self.calls.push(Call::ResizeBuffers(width, height, desc.flags));
        self.lost()?;
        if self.has_render_target {
            return Err(GraphicsError::Resize("render target still alive".into()));
        }
        if width == 0 || height == 0 {
            return Err(GraphicsError::Resize("zero-sized buffer".into()));
        }
        Ok(())
    }

    fn wait_frame_latency(&mut self, timeout: Duration) -> WaitOutcome {
        self.calls.push(Call::Wait(timeout));
        WaitOutcome::Signaled
    }

    fn bind_render_target(&mut self, clear: [f32; 4]) -> Result<(), GraphicsError> {
        self.calls.push(Call::Bind(clear));
        if let Some(err) = self.bind_error.clone() {
            return Err(err);
        }
        if !self.has_render_target {
            return Err(GraphicsError::RenderTarget("not created".into()));
        }
        self.bound = Some(clear);
        Ok(())
    }

    fn target(&mut self) -> Option<MockTarget<'_>> {
        let clear_color = self.bound?;
        Some(MockTarget {
            clear_color,
            draws: &mut self.draws,
        })
    }

    fn present(&mut self, sync_interval: u32, allow_tearing: bool) -> Result<(), GraphicsError> {
        self.calls.push(Call::Present { sync_interval, allow_tearing });
        self.lost()?;
        if let Some(err) = self.present_error.clone() {
            self.bound = None;
            return Err(err);
        }
        if self.bound.take().is_none() {
            return Err(GraphicsError::Present("nothing bound".into()));
        }
        self.presents += 1;
        Ok(())
    }

    fn device_removed(&self) -> Option<String> {
        self.removed.clone()
    }

    fn device(&self) -> Option<&MockDevice> {
        self.device.as_ref()
    }

    fn release(&mut self) {
        self.calls.push(Call::Release);
        self.has_device = false;
        self.has_swap_chain = false;
        self.has_render_target = false;
        self.bound = None;
        self.device = None;
        // the next device comes up healthy
        self.removed = None;
    }
}
