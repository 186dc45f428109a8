//! Direct3D 11 / DXGI presentation backend.
//!
//! Every call here is a single primitive; `PresentationSurface` owns the
//! negotiation order. COM objects release on drop, so "release" is always a
//! matter of clearing the owning `Option`.

use std::ffi::c_void;
use std::sync::Arc;
use std::time::Duration;

use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use windows::Win32::Foundation::{CloseHandle, E_OUTOFMEMORY, HANDLE, HMODULE, HWND, WAIT_OBJECT_0, WAIT_TIMEOUT};
use windows::Win32::Graphics::Direct3D::{
    D3D_DRIVER_TYPE_UNKNOWN, D3D_FEATURE_LEVEL, D3D_FEATURE_LEVEL_10_0, D3D_FEATURE_LEVEL_10_1, D3D_FEATURE_LEVEL_11_0,
    D3D_FEATURE_LEVEL_11_1,
};
use windows::Win32::Graphics::Direct3D11::{
    D3D11_CREATE_DEVICE_BGRA_SUPPORT, D3D11_CREATE_DEVICE_DEBUG, D3D11_CREATE_DEVICE_FLAG, D3D11_SDK_VERSION,
    D3D11_VIEWPORT, D3D11CreateDevice, ID3D11Device, ID3D11DeviceContext, ID3D11RenderTargetView, ID3D11Texture2D,
};
use windows::Win32::Graphics::Dxgi::Common::{
    DXGI_ALPHA_MODE_IGNORE, DXGI_FORMAT_B8G8R8A8_UNORM, DXGI_MODE_DESC, DXGI_SAMPLE_DESC,
};
use windows::Win32::Graphics::Dxgi::{
    CreateDXGIFactory1, DXGI_ERROR_DEVICE_REMOVED, DXGI_ERROR_DEVICE_RESET, DXGI_FEATURE_PRESENT_ALLOW_TEARING,
    DXGI_MWA_NO_ALT_ENTER, DXGI_MWA_NO_WINDOW_CHANGES, DXGI_PRESENT, DXGI_PRESENT_ALLOW_TEARING, DXGI_SCALING_NONE,
    DXGI_SWAP_CHAIN_DESC, DXGI_SWAP_CHAIN_DESC1, DXGI_SWAP_CHAIN_FLAG, DXGI_SWAP_CHAIN_FLAG_ALLOW_MODE_SWITCH,
    DXGI_SWAP_CHAIN_FLAG_ALLOW_TEARING, DXGI_SWAP_CHAIN_FLAG_FRAME_LATENCY_WAITABLE_OBJECT, DXGI_SWAP_EFFECT,
    DXGI_SWAP_EFFECT_DISCARD, DXGI_SWAP_EFFECT_FLIP_DISCARD, DXGI_SWAP_EFFECT_FLIP_SEQUENTIAL,
    DXGI_USAGE_RENDER_TARGET_OUTPUT, IDXGIAdapter1, IDXGIDevice1, IDXGIFactory1, IDXGIFactory2, IDXGIFactory5,
    IDXGISwapChain, IDXGISwapChain1, IDXGISwapChain2,
};
use windows::Win32::System::Threading::WaitForSingleObjectEx;
use windows::core::{BOOL, Interface};
use winit::window::Window;

use super::backend::{PresentBackend, WaitOutcome};
use super::caps::{FeatureLevel, SwapChainDesc, SwapChainFlags, SwapEffect};
use super::error::GraphicsError;

/// Device handles exposed to UI renderers.
pub struct DxgiDevice {
    pub device:  ID3D11Device,
    pub context: ID3D11DeviceContext,
}

/// Render target bound for the current frame.
pub struct DxgiTarget<'a> {
    pub device:  &'a ID3D11Device,
    pub context: &'a ID3D11DeviceContext,
    pub rtv:     &'a ID3D11RenderTargetView,
    pub size:    (u32, u32),
}

/// D3D11 + DXGI `PresentBackend` for a winit window.
pub struct DxgiBackend {
    window:     Arc<Window>,
    factory:    Option<IDXGIFactory1>,
    gpu:        Option<DxgiDevice>,
    swap_chain: Option<IDXGISwapChain>,
    rtv:        Option<ID3D11RenderTargetView>,
    waitable:   Option<HANDLE>,
    size:       (u32, u32),
    tearing:    Option<bool>,
    bound:      bool,
}

impl DxgiBackend {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            factory: None,
            gpu: None,
            swap_chain: None,
            rtv: None,
            waitable: None,
            size: (0, 0),
            tearing: None,
            bound: false,
        }
    }

    fn hwnd(&self) -> Result<HWND, GraphicsError> {
        let handle = self
            .window
            .window_handle()
            .map_err(|e| GraphicsError::SwapChainCreation(format!("window handle: {e}")))?;
        match handle.as_raw() {
            RawWindowHandle::Win32(h) => Ok(HWND(h.hwnd.get() as *mut c_void)),
            _ => Err(GraphicsError::SwapChainCreation("window handle is not Win32".into())),
        }
    }

    fn gpu(&self) -> Result<&DxgiDevice, GraphicsError> {
        self.gpu
            .as_ref()
            .ok_or_else(|| GraphicsError::SwapChainCreation("no device".into()))
    }

    fn close_waitable(&mut self) {
        if let Some(handle) = self.waitable.take() {
            if let Err(e) = unsafe { CloseHandle(handle) } {
                log::warn!("CloseHandle(waitable) failed: {e}");
            }
        }
    }

    fn check_removed(&self, hr: windows::core::HRESULT) -> Option<GraphicsError> {
        if hr == DXGI_ERROR_DEVICE_REMOVED || hr == DXGI_ERROR_DEVICE_RESET {
            let reason = self
                .device_removed()
                .unwrap_or_else(|| format!("{hr:?}"));
            return Some(GraphicsError::DeviceLost { reason });
        }
        None
    }
}

impl Drop for DxgiBackend {
    fn drop(&mut self) {
        self.release();
    }
}

fn to_d3d(level: FeatureLevel) -> D3D_FEATURE_LEVEL {
    match level {
        FeatureLevel::L10_0 => D3D_FEATURE_LEVEL_10_0,
        FeatureLevel::L10_1 => D3D_FEATURE_LEVEL_10_1,
        FeatureLevel::L11_0 => D3D_FEATURE_LEVEL_11_0,
        FeatureLevel::L11_1 => D3D_FEATURE_LEVEL_11_1,
    }
}

fn from_d3d(level: D3D_FEATURE_LEVEL) -> Option<FeatureLevel> {
    match level {
        D3D_FEATURE_LEVEL_10_0 => Some(FeatureLevel::L10_0),
        D3D_FEATURE_LEVEL_10_1 => Some(FeatureLevel::L10_1),
        D3D_FEATURE_LEVEL_11_0 => Some(FeatureLevel::L11_0),
        D3D_FEATURE_LEVEL_11_1 => Some(FeatureLevel::L11_1),
        _ => None,
    }
}

fn swap_effect(effect: SwapEffect) -> DXGI_SWAP_EFFECT {
    match effect {
        SwapEffect::FlipDiscard => DXGI_SWAP_EFFECT_FLIP_DISCARD,
        SwapEffect::FlipSequential => DXGI_SWAP_EFFECT_FLIP_SEQUENTIAL,
        SwapEffect::Discard => DXGI_SWAP_EFFECT_DISCARD,
    }
}

fn swap_chain_flags(flags: SwapChainFlags) -> u32 {
    let mut bits = 0i32;
    if flags.allow_mode_switch {
        bits |= DXGI_SWAP_CHAIN_FLAG_ALLOW_MODE_SWITCH.0;
    }
    if flags.frame_latency_waitable {
        bits |= DXGI_SWAP_CHAIN_FLAG_FRAME_LATENCY_WAITABLE_OBJECT.0;
    }
    if flags.allow_tearing {
        bits |= DXGI_SWAP_CHAIN_FLAG_ALLOW_TEARING.0;
    }
    bits as u32
}

impl PresentBackend for DxgiBackend {
    type Device = DxgiDevice;
    type Target<'a> = DxgiTarget<'a>;

    fn create_device(&mut self, levels: &[FeatureLevel], debug: bool) -> Result<FeatureLevel, GraphicsError> {
        let factory: IDXGIFactory1 = unsafe { CreateDXGIFactory1() }
            .map_err(|e| GraphicsError::DeviceCreation(format!("CreateDXGIFactory1: {e}")))?;
        let adapter: IDXGIAdapter1 = unsafe { factory.EnumAdapters1(0) }
            .map_err(|e| GraphicsError::DeviceCreation(format!("EnumAdapters1: {e}")))?;

        let requested: Vec<D3D_FEATURE_LEVEL> = levels.iter().copied().map(to_d3d).collect();
        let mut flags: D3D11_CREATE_DEVICE_FLAG = D3D11_CREATE_DEVICE_BGRA_SUPPORT;
        if debug {
            flags |= D3D11_CREATE_DEVICE_DEBUG;
        }

        let mut device = None;
        let mut context = None;
        let mut achieved = D3D_FEATURE_LEVEL::default();
        unsafe {
            D3D11CreateDevice(
                &adapter,
                D3D_DRIVER_TYPE_UNKNOWN,
                HMODULE::default(),
                flags,
                Some(&requested),
                D3D11_SDK_VERSION,
                Some(&mut device),
                Some(&mut achieved),
                Some(&mut context),
            )
        }
        .map_err(|e| GraphicsError::DeviceCreation(format!("D3D11CreateDevice: {e}")))?;

        let (Some(device), Some(context)) = (device, context) else {
            return Err(GraphicsError::DeviceCreation("D3D11CreateDevice returned no device".into()));
        };
        let level = from_d3d(achieved)
            .ok_or_else(|| GraphicsError::DeviceCreation(format!("unexpected feature level {achieved:?}")))?;

        self.factory = Some(factory);
        self.gpu = Some(DxgiDevice { device, context });
        self.tearing = None;
        Ok(level)
    }

    fn supports_tearing(&mut self) -> bool {
        if let Some(cached) = self.tearing {
            return cached;
        }
        let supported = self
            .factory
            .as_ref()
            .and_then(|f| f.cast::<IDXGIFactory5>().ok())
            .map(|f5| {
                let mut allow = BOOL(0);
                let queried = unsafe {
                    f5.CheckFeatureSupport(
                        DXGI_FEATURE_PRESENT_ALLOW_TEARING,
                        &mut allow as *mut BOOL as *mut c_void,
                        std::mem::size_of::<BOOL>() as u32,
                    )
                };
                queried.is_ok() && allow.as_bool()
            })
            .unwrap_or(false);
        self.tearing = Some(supported);
        supported
    }

    fn supports_flip_model(&self) -> bool {
        self.factory
            .as_ref()
            .is_some_and(|f| f.cast::<IDXGIFactory2>().is_ok())
    }

    fn create_swap_chain(&mut self, desc: &SwapChainDesc) -> Result<(), GraphicsError> {
        let hwnd = self.hwnd()?;
        let gpu = self.gpu()?;
        let factory = self
            .factory
            .as_ref()
            .ok_or_else(|| GraphicsError::SwapChainCreation("no factory".into()))?;
        let flags = swap_chain_flags(desc.flags);

        let swap_chain: IDXGISwapChain = if desc.effect.is_flip() {
            let factory2: IDXGIFactory2 = factory
                .cast()
                .map_err(|e| GraphicsError::SwapChainCreation(format!("IDXGIFactory2: {e}")))?;
            let desc1 = DXGI_SWAP_CHAIN_DESC1 {
                Width: desc.width,
                Height: desc.height,
                Format: DXGI_FORMAT_B8G8R8A8_UNORM,
                Stereo: false.into(),
                SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
                BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
                BufferCount: desc.buffer_count,
                Scaling: DXGI_SCALING_NONE,
                SwapEffect: swap_effect(desc.effect),
                AlphaMode: DXGI_ALPHA_MODE_IGNORE,
                Flags: flags,
            };
            let sc1: IDXGISwapChain1 = unsafe { factory2.CreateSwapChainForHwnd(&gpu.device, hwnd, &desc1, None, None) }
                .map_err(|e| GraphicsError::SwapChainCreation(format!("CreateSwapChainForHwnd: {e}")))?;
            sc1.cast()
                .map_err(|e| GraphicsError::SwapChainCreation(format!("IDXGISwapChain: {e}")))?
        } else {
            let legacy = DXGI_SWAP_CHAIN_DESC {
                BufferDesc: DXGI_MODE_DESC {
                    Width: desc.width,
                    Height: desc.height,
                    Format: DXGI_FORMAT_B8G8R8A8_UNORM,
                    ..Default::default()
                },
                SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
                BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
                BufferCount: desc.buffer_count,
                OutputWindow: hwnd,
                Windowed: true.into(),
                SwapEffect: swap_effect(desc.effect),
                Flags: flags,
            };
            let mut sc = None;
            unsafe { factory.CreateSwapChain(&gpu.device, &legacy, &mut sc) }
                .ok()
                .map_err(|e| GraphicsError::SwapChainCreation(format!("CreateSwapChain: {e}")))?;
            sc.ok_or_else(|| GraphicsError::SwapChainCreation("CreateSwapChain returned nothing".into()))?
        };

        self.swap_chain = Some(swap_chain);
        self.size = (desc.width, desc.height);
        Ok(())
    }

    fn enable_frame_latency_waitable(&mut self, max_latency: u32) -> Result<(), GraphicsError> {
        let sc2: IDXGISwapChain2 = self
            .swap_chain
            .as_ref()
            .ok_or(GraphicsError::Unsupported("no swap chain"))?
            .cast()
            .map_err(|_| GraphicsError::Unsupported("IDXGISwapChain2"))?;
        unsafe { sc2.SetMaximumFrameLatency(max_latency) }
            .map_err(|e| GraphicsError::SwapChainCreation(format!("SetMaximumFrameLatency: {e}")))?;
        let handle = unsafe { sc2.GetFrameLatencyWaitableObject() };
        if handle.is_invalid() {
            return Err(GraphicsError::Unsupported("frame latency waitable object"));
        }
        self.close_waitable();
        self.waitable = Some(handle);
        Ok(())
    }

    fn set_device_frame_latency(&mut self, max_latency: u32) -> Result<(), GraphicsError> {
        let dxgi_device: IDXGIDevice1 = self
            .gpu()?
            .device
            .cast()
            .map_err(|_| GraphicsError::Unsupported("IDXGIDevice1"))?;
        unsafe { dxgi_device.SetMaximumFrameLatency(max_latency) }
            .map_err(|e| GraphicsError::SwapChainCreation(format!("IDXGIDevice1::SetMaximumFrameLatency: {e}")))
    }

    fn disable_fullscreen_toggle(&mut self) -> Result<(), GraphicsError> {
        let hwnd = self.hwnd()?;
        let factory = self
            .factory
            .as_ref()
            .ok_or(GraphicsError::Unsupported("no factory"))?;
        unsafe { factory.MakeWindowAssociation(hwnd, DXGI_MWA_NO_ALT_ENTER | DXGI_MWA_NO_WINDOW_CHANGES) }
            .map_err(|e| GraphicsError::SwapChainCreation(format!("MakeWindowAssociation: {e}")))
    }

    fn create_render_target(&mut self) -> Result<(), GraphicsError> {
        let gpu = self
            .gpu
            .as_ref()
            .ok_or_else(|| GraphicsError::RenderTarget("no device".into()))?;
        let swap_chain = self
            .swap_chain
            .as_ref()
            .ok_or_else(|| GraphicsError::RenderTarget("no swap chain".into()))?;

        let back_buffer: ID3D11Texture2D = unsafe { swap_chain.GetBuffer(0) }
            .map_err(|e| GraphicsError::RenderTarget(format!("GetBuffer: {e}")))?;
        let mut rtv = None;
        unsafe { gpu.device.CreateRenderTargetView(&back_buffer, None, Some(&mut rtv)) }
            .map_err(|e| GraphicsError::RenderTarget(format!("CreateRenderTargetView: {e}")))?;

        self.rtv = Some(rtv.ok_or_else(|| GraphicsError::RenderTarget("no view returned".into()))?);
        Ok(())
    }

    fn release_render_target(&mut self) {
        if let Some(gpu) = &self.gpu {
            unsafe {
                gpu.context.OMSetRenderTargets(None, None);
                gpu.context.Flush();
            }
        }
        self.rtv = None;
        self.bound = false;
    }

    fn resize_buffers(&mut self, width: u32, height: u32, desc: &SwapChainDesc) -> Result<(), GraphicsError> {
        let swap_chain = self
            .swap_chain
            .as_ref()
            .ok_or_else(|| GraphicsError::Resize("no swap chain".into()))?;
        let flags = DXGI_SWAP_CHAIN_FLAG(swap_chain_flags(desc.flags) as i32);
        if let Err(e) = unsafe { swap_chain.ResizeBuffers(desc.buffer_count, width, height, DXGI_FORMAT_B8G8R8A8_UNORM, flags) } {
            return Err(self
                .check_removed(e.code())
                .unwrap_or_else(|| GraphicsError::Resize(format!("ResizeBuffers: {e}"))));
        }
        self.size = (width, height);
        Ok(())
    }

    fn wait_frame_latency(&mut self, timeout: Duration) -> WaitOutcome {
        let Some(handle) = self.waitable else {
            return WaitOutcome::Unavailable;
        };
        let ms = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        let result = unsafe { WaitForSingleObjectEx(handle, ms, true) };
        if result == WAIT_OBJECT_0 {
            WaitOutcome::Signaled
        } else if result == WAIT_TIMEOUT {
            WaitOutcome::TimedOut
        } else {
            log::debug!("frame latency wait returned {result:?}");
            WaitOutcome::TimedOut
        }
    }

    fn bind_render_target(&mut self, clear: [f32; 4]) -> Result<(), GraphicsError> {
        if let Some(reason) = self.device_removed() {
            return Err(GraphicsError::DeviceLost { reason });
        }
        let (Some(gpu), Some(rtv)) = (&self.gpu, &self.rtv) else {
            return Err(GraphicsError::RenderTarget("no render target".into()));
        };
        let viewport = D3D11_VIEWPORT {
            TopLeftX: 0.0,
            TopLeftY: 0.0,
            Width: self.size.0 as f32,
            Height: self.size.1 as f32,
            MinDepth: 0.0,
            MaxDepth: 1.0,
        };
        unsafe {
            gpu.context.OMSetRenderTargets(Some(&[Some(rtv.clone())]), None);
            gpu.context.RSSetViewports(Some(&[viewport]));
            gpu.context.ClearRenderTargetView(rtv, &clear);
        }
        self.bound = true;
        Ok(())
    }

    fn target(&mut self) -> Option<DxgiTarget<'_>> {
        if !self.bound {
            return None;
        }
        let gpu = self.gpu.as_ref()?;
        Some(DxgiTarget {
            device: &gpu.device,
            context: &gpu.context,
            rtv: self.rtv.as_ref()?,
            size: self.size,
        })
    }

    fn present(&mut self, sync_interval: u32, allow_tearing: bool) -> Result<(), GraphicsError> {
        let swap_chain = self
            .swap_chain
            .as_ref()
            .ok_or_else(|| GraphicsError::Present("no swap chain".into()))?;
        let flags = if allow_tearing { DXGI_PRESENT_ALLOW_TEARING } else { DXGI_PRESENT(0) };
        let hr = unsafe { swap_chain.Present(sync_interval, flags) };
        self.bound = false;
        if let Some(lost) = self.check_removed(hr) {
            return Err(lost);
        }
        if hr == E_OUTOFMEMORY {
            return Err(GraphicsError::OutOfMemory);
        }
        hr.ok().map_err(|e| GraphicsError::Present(format!("Present: {e}")))
    }

    fn device_removed(&self) -> Option<String> {
        let gpu = self.gpu.as_ref()?;
        match unsafe { gpu.device.GetDeviceRemovedReason() } {
            Ok(()) => None,
            Err(e) => Some(format!("device removed: {e}")),
        }
    }

    fn device(&self) -> Option<&DxgiDevice> {
        self.gpu.as_ref()
    }

    fn release(&mut self) {
        self.release_render_target();
        self.close_waitable();
        self.swap_chain = None;
        if let Some(gpu) = &self.gpu {
            unsafe { gpu.context.ClearState() };
        }
        self.gpu = None;
        self.factory = None;
        self.tearing = None;
    }
}
