use std::time::Duration;

use super::backend::{PresentBackend, WaitOutcome};
use super::caps::{FEATURE_LEVELS, FEATURE_LEVELS_FALLBACK, FeatureLevel, SurfaceCaps, SwapChainDesc};
use super::error::{GraphicsError, SurfaceError};
use super::init::SurfaceInit;
use super::ladder::SWAP_CHAIN_LADDER;

/// Lifecycle state of a `PresentationSurface`.
///
/// ```text
/// Uninitialized -> DeviceCreated -> SurfaceCreated -> RenderTargetBound
///                                       ^                  |
///                                       +---- resize ------+
/// any live state -> Lost (device removed) -> recreate() -> ...
/// any state -> Destroyed
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceState {
    Uninitialized,
    DeviceCreated,
    SurfaceCreated,
    RenderTargetBound,
    /// Device removed. Only `recreate` or `destroy` leave this state.
    Lost,
    Destroyed,
}

/// Clamps a requested back-buffer extent to at least 1x1.
pub fn clamp_extent(width: u32, height: u32) -> (u32, u32) {
    (width.max(1), height.max(1))
}

/// Owns the device, swap chain and render target of one window.
///
/// This type is responsible for:
/// - negotiating the presentation technique through the fallback ladder
/// - tracking the lifecycle state and refusing out-of-order operations
/// - recreating the render target on resize and everything on device loss
pub struct PresentationSurface<B: PresentBackend> {
    backend:     B,
    init:        SurfaceInit,
    state:       SurfaceState,
    caps:        SurfaceCaps,
    desc:        Option<SwapChainDesc>,
    size:        (u32, u32),
    lost_reason: Option<String>,
}

impl<B: PresentBackend> PresentationSurface<B> {
    pub fn new(backend: B, init: SurfaceInit) -> Self {
        Self {
            backend,
            init,
            state: SurfaceState::Uninitialized,
            caps: SurfaceCaps::default(),
            desc: None,
            size: (0, 0),
            lost_reason: None,
        }
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn caps(&self) -> SurfaceCaps {
        self.caps
    }

    /// Current back-buffer size in physical pixels.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Negotiated swap-chain description, if a swap chain exists.
    pub fn swap_chain_desc(&self) -> Option<&SwapChainDesc> {
        self.desc.as_ref()
    }

    pub fn device(&self) -> Option<&B::Device> {
        match self.state {
            SurfaceState::Uninitialized | SurfaceState::Destroyed | SurfaceState::Lost => None,
            _ => self.backend.device(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Negotiates device + swap chain and creates the render target at `width` x `height`.
    ///
    /// Any failure tears down what was built so far and leaves the surface
    /// `Uninitialized`.
    pub fn create(&mut self, width: u32, height: u32) -> Result<SurfaceCaps, SurfaceError> {
        match self.state {
            SurfaceState::Uninitialized | SurfaceState::Destroyed => {}
            other => return Err(SurfaceError::NotReady(other)),
        }

        match self.negotiate(width, height) {
            Ok(caps) => {
                log::info!(
                    "presentation surface ready: level={} flip={} waitable={} tearing={} size={}x{}",
                    caps.feature_level.map(|l| l.to_string()).unwrap_or_default(),
                    caps.swap_effect_flip,
                    caps.frame_latency_waitable,
                    caps.allow_tearing,
                    self.size.0,
                    self.size.1,
                );
                Ok(caps)
            }
            Err(e) => {
                self.backend.release();
                self.reset_state(SurfaceState::Uninitialized);
                Err(e)
            }
        }
    }

    fn negotiate(&mut self, width: u32, height: u32) -> Result<SurfaceCaps, SurfaceError> {
        let debug = self.init.debug_layer;

        // 1. device, with one retry at the lower tier list
        let level = match self.backend.create_device(&FEATURE_LEVELS, debug) {
            Ok(level) => level,
            Err(e) => {
                log::warn!("top-tier device request failed ({e}); retrying without 11_1");
                self.backend.create_device(&FEATURE_LEVELS_FALLBACK, debug)?
            }
        };
        self.state = SurfaceState::DeviceCreated;

        let mut caps = SurfaceCaps {
            feature_level: Some(level),
            feature_level_11_1: level == FeatureLevel::L11_1,
            ..SurfaceCaps::default()
        };

        // 2. tearing
        caps.allow_tearing = self.init.prefer_tearing && self.backend.supports_tearing();

        // 3. swap chain ladder
        let flip_capable = caps.feature_level_11_1 && self.backend.supports_flip_model();
        let mut chosen = None;
        for attempt in SWAP_CHAIN_LADDER.iter().filter(|a| a.applicable(flip_capable)) {
            let desc = attempt.desc(1, 1, self.init.buffer_count, caps.allow_tearing);
            match self.backend.create_swap_chain(&desc) {
                Ok(()) => {
                    log::debug!("swap chain created: {}", attempt.name);
                    chosen = Some(desc);
                    break;
                }
                Err(e) => log::debug!("swap chain attempt '{}' failed: {e}", attempt.name),
            }
        }
        let desc = chosen.ok_or(GraphicsError::LadderExhausted)?;
        self.state = SurfaceState::SurfaceCreated;

        caps.swap_effect_flip = desc.effect.is_flip();
        caps.allow_tearing = caps.allow_tearing && desc.flags.allow_tearing;

        // 4. frame latency; `desc.flags` keeps the creation flags because
        // ResizeBuffers must pass them unchanged
        let max_latency = self.init.max_frame_latency;
        if desc.flags.frame_latency_waitable {
            match self.backend.enable_frame_latency_waitable(max_latency) {
                Ok(()) => caps.frame_latency_waitable = true,
                Err(e) => log::warn!("frame latency waitable object unavailable: {e}"),
            }
        }
        if !caps.frame_latency_waitable {
            if let Err(e) = self.backend.set_device_frame_latency(max_latency) {
                log::warn!("failed to cap device frame latency: {e}");
            }
        }

        // 5. the application owns fullscreen transitions
        if let Err(e) = self.backend.disable_fullscreen_toggle() {
            log::warn!("failed to disable fullscreen toggle: {e}");
        }

        self.caps = caps;
        self.desc = Some(desc);

        // 6. render target at the window size
        self.resize(width, height)?;
        Ok(caps)
    }

    /// Resizes the swap-chain buffers and recreates the render target.
    ///
    /// Both dimensions are clamped to at least 1. When the buffers resize but
    /// the render target cannot be recreated, the surface stays in
    /// `SurfaceCreated` and frames are skipped until the next successful resize.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), SurfaceError> {
        match self.state {
            SurfaceState::SurfaceCreated | SurfaceState::RenderTargetBound => {}
            SurfaceState::Lost => return Err(self.lost_error()),
            other => return Err(SurfaceError::NotReady(other)),
        }
        let Some(desc) = self.desc else {
            return Err(SurfaceError::NotReady(self.state));
        };

        let (width, height) = clamp_extent(width, height);

        self.backend.release_render_target();
        self.state = SurfaceState::SurfaceCreated;

        if let Err(e) = self.backend.resize_buffers(width, height, &desc) {
            return Err(self.fail(e));
        }
        self.size = (width, height);
        self.desc = Some(SwapChainDesc { width, height, ..desc });

        self.backend.create_render_target().map_err(|e| self.fail(e))?;
        self.state = SurfaceState::RenderTargetBound;

        log::debug!("surface resized to {width}x{height}");
        Ok(())
    }

    /// Blocks until the swap chain can accept a frame, bounded by `timeout`.
    ///
    /// No-op without a frame-latency waitable object.
    pub fn wait_for_vblank(&mut self, timeout: Duration) -> WaitOutcome {
        if !self.caps.frame_latency_waitable || !self.is_live() {
            return WaitOutcome::Unavailable;
        }
        let outcome = self.backend.wait_frame_latency(timeout);
        if outcome == WaitOutcome::TimedOut {
            log::debug!("frame latency wait timed out after {timeout:?}");
        }
        outcome
    }

    /// Binds the render target and clears it.
    pub fn bind_render_target(&mut self, clear: [f32; 4]) -> Result<(), SurfaceError> {
        self.require_render_target()?;
        self.backend.bind_render_target(clear).map_err(|e| self.fail(e))
    }

    /// Runs `f` against the bound render target.
    pub fn with_target<R>(&mut self, f: impl FnOnce(&mut B::Target<'_>) -> R) -> Option<R> {
        if self.state != SurfaceState::RenderTargetBound {
            return None;
        }
        let mut target = self.backend.target()?;
        Some(f(&mut target))
    }

    /// Presents the bound frame.
    ///
    /// Sync interval 1 with vsync; otherwise 0, tearing allowed when negotiated.
    pub fn present(&mut self, vsync: bool) -> Result<(), SurfaceError> {
        self.require_render_target()?;
        let sync_interval = if vsync { 1 } else { 0 };
        let allow_tearing = !vsync && self.caps.allow_tearing;
        self.backend.present(sync_interval, allow_tearing).map_err(|e| self.fail(e))
    }

    /// Polls for device removal. Once lost, stays lost until `recreate`.
    pub fn check_device_lost(&mut self) -> bool {
        if self.state == SurfaceState::Lost {
            return true;
        }
        if !self.is_live() {
            return false;
        }
        match self.backend.device_removed() {
            Some(reason) => {
                self.mark_lost(reason);
                true
            }
            None => false,
        }
    }

    /// Tears everything down and negotiates again from scratch.
    pub fn recreate(&mut self, width: u32, height: u32) -> Result<SurfaceCaps, SurfaceError> {
        log::warn!("recreating presentation surface");
        self.backend.release();
        self.reset_state(SurfaceState::Uninitialized);
        self.create(width, height)
    }

    /// Releases every graphics object. Further operations fail with `NotReady`.
    pub fn destroy(&mut self) {
        if self.state == SurfaceState::Destroyed {
            return;
        }
        self.backend.release();
        self.reset_state(SurfaceState::Destroyed);
        log::debug!("presentation surface destroyed");
    }

    fn is_live(&self) -> bool {
        matches!(
            self.state,
            SurfaceState::DeviceCreated | SurfaceState::SurfaceCreated | SurfaceState::RenderTargetBound
        )
    }

    fn require_render_target(&self) -> Result<(), SurfaceError> {
        match self.state {
            SurfaceState::RenderTargetBound => Ok(()),
            SurfaceState::Lost => Err(self.lost_error()),
            other => Err(SurfaceError::NotReady(other)),
        }
    }

    fn fail(&mut self, err: GraphicsError) -> SurfaceError {
        match err {
            GraphicsError::DeviceLost { reason } => {
                self.mark_lost(reason);
                self.lost_error()
            }
            other => SurfaceError::Graphics(other),
        }
    }

    fn mark_lost(&mut self, reason: String) {
        log::error!("graphics device removed: {reason}");
        self.lost_reason = Some(reason);
        self.state = SurfaceState::Lost;
    }

    fn lost_error(&self) -> SurfaceError {
        SurfaceError::DeviceLost {
            reason: self.lost_reason.clone().unwrap_or_default(),
        }
    }

    fn reset_state(&mut self, state: SurfaceState) {
        self.state = state;
        self.caps = SurfaceCaps::default();
        self.desc = None;
        self.size = (0, 0);
        self.lost_reason = None;
    }
}

impl<B: PresentBackend> Drop for PresentationSurface<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::caps::SwapEffect;
    use crate::device::mock::{Call, MockBackend};
    use proptest::prelude::*;

    fn surface(backend: MockBackend) -> PresentationSurface<MockBackend> {
        PresentationSurface::new(backend, SurfaceInit::default())
    }

    fn created(backend: MockBackend) -> PresentationSurface<MockBackend> {
        let mut s = surface(backend);
        s.create(1280, 720).unwrap();
        s
    }

    // ── negotiation ───────────────────────────────────────────────────────

    #[test]
    fn full_capability_path_takes_first_rung() {
        let s = created(MockBackend::new().with_tearing(true));
        let caps = s.caps();

        assert_eq!(s.state(), SurfaceState::RenderTargetBound);
        assert!(caps.feature_level_11_1);
        assert!(caps.swap_effect_flip);
        assert!(caps.frame_latency_waitable);
        assert!(caps.allow_tearing);
        assert_eq!(s.swap_chain_desc().unwrap().effect, SwapEffect::FlipDiscard);
        assert!(s.backend().calls.contains(&Call::EnableWaitable(1)));
        assert!(!s.backend().calls.iter().any(|c| matches!(c, Call::DeviceLatency(_))));
        assert!(s.backend().calls.contains(&Call::DisableFullscreenToggle));
    }

    #[test]
    fn two_flip_failures_then_sequential() {
        let s = created(MockBackend::new().failing_swap_chains(2));
        let caps = s.caps();

        assert!(caps.swap_effect_flip);
        assert!(!caps.frame_latency_waitable);
        assert_eq!(s.swap_chain_desc().unwrap().effect, SwapEffect::FlipSequential);
        assert!(s.backend().calls.contains(&Call::DeviceLatency(1)));
    }

    #[test]
    fn ladder_exhaustion_is_an_error_and_releases_everything() {
        let mut s = surface(MockBackend::new().failing_swap_chains(4));
        let err = s.create(800, 600).unwrap_err();

        assert_eq!(err, SurfaceError::Graphics(GraphicsError::LadderExhausted));
        assert_eq!(s.state(), SurfaceState::Uninitialized);
        assert!(!s.backend().has_device);
        assert_eq!(s.backend().swap_chain_attempts(), 4);
    }

    #[test]
    fn below_11_1_goes_straight_to_blit() {
        let s = created(MockBackend::new().with_max_level(FeatureLevel::L11_0));
        let caps = s.caps();

        assert_eq!(caps.feature_level, Some(FeatureLevel::L11_0));
        assert!(!caps.swap_effect_flip);
        assert_eq!(s.backend().swap_chain_attempts(), 1);
        assert_eq!(s.swap_chain_desc().unwrap().effect, SwapEffect::Discard);
    }

    #[test]
    fn top_tier_rejection_retries_with_lower_list() {
        let s = created(MockBackend::new().rejecting_top_tier());
        let device_calls: Vec<_> = s
            .backend()
            .calls
            .iter()
            .filter(|c| matches!(c, Call::CreateDevice(_)))
            .collect();

        assert_eq!(device_calls.len(), 2);
        assert_eq!(s.caps().feature_level, Some(FeatureLevel::L11_0));
    }

    #[test]
    fn device_failure_is_terminal() {
        let mut s = surface(MockBackend::new().without_device());
        assert!(s.create(640, 480).is_err());
        assert_eq!(s.state(), SurfaceState::Uninitialized);
    }

    #[test]
    fn waitable_enable_failure_falls_back_to_device_latency() {
        let s = created(MockBackend::new().failing_waitable());
        assert!(!s.caps().frame_latency_waitable);
        assert!(s.swap_chain_desc().unwrap().flags.frame_latency_waitable);
        assert!(s.backend().calls.contains(&Call::DeviceLatency(1)));
    }

    #[test]
    fn resize_keeps_creation_flags_when_waitable_is_unusable() {
        let mut s = created(MockBackend::new().failing_waitable());
        s.resize(640, 480).unwrap();

        let resize_flags: Vec<_> = s
            .backend()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::ResizeBuffers(_, _, flags) => Some(*flags),
                _ => None,
            })
            .collect();
        assert_eq!(resize_flags.len(), 2);
        assert!(resize_flags.iter().all(|f| f.frame_latency_waitable));
        assert_eq!(s.wait_for_vblank(Duration::from_millis(10)), WaitOutcome::Unavailable);
    }

    #[test]
    fn tearing_not_requested_when_unsupported() {
        let s = created(MockBackend::new().with_tearing(false));
        assert!(!s.caps().allow_tearing);
        assert!(!s.swap_chain_desc().unwrap().flags.allow_tearing);
    }

    proptest! {
        #[test]
        fn ladder_is_deterministic(failures in 0usize..4, tearing in any::<bool>()) {
            let a = created(MockBackend::new().failing_swap_chains(failures).with_tearing(tearing));
            let b = created(MockBackend::new().failing_swap_chains(failures).with_tearing(tearing));
            prop_assert_eq!(a.caps(), b.caps());
            prop_assert_eq!(a.swap_chain_desc(), b.swap_chain_desc());
        }

        #[test]
        fn resize_never_reaches_backend_with_zero(w in 0u32..4096, h in 0u32..4096) {
            let mut s = created(MockBackend::new());
            s.resize(w, h).unwrap();
            let (rw, rh) = s.backend().last_resize().unwrap();
            prop_assert!(rw >= 1 && rh >= 1);
            prop_assert_eq!((rw, rh), (w.max(1), h.max(1)));
        }
    }

    // ── resize ────────────────────────────────────────────────────────────

    #[test]
    fn resize_zero_applies_one_by_one() {
        let mut s = created(MockBackend::new());
        s.resize(0, 0).unwrap();
        assert_eq!(s.size(), (1, 1));
        assert_eq!(s.backend().last_resize(), Some((1, 1)));
    }

    #[test]
    fn resize_releases_before_resizing_and_keeps_flags() {
        let mut s = created(MockBackend::new().with_tearing(true));
        let flags = s.swap_chain_desc().unwrap().flags;
        s.backend_mut().calls.clear();

        s.resize(1024, 768).unwrap();

        assert_eq!(
            s.backend().calls,
            vec![
                Call::ReleaseRenderTarget,
                Call::ResizeBuffers(1024, 768, flags),
                Call::CreateRenderTarget,
            ]
        );
        assert_eq!(s.state(), SurfaceState::RenderTargetBound);
    }

    #[test]
    fn failed_render_target_leaves_surface_created() {
        let mut s = created(MockBackend::new());
        s.backend_mut().fail_render_target = true;

        assert!(s.resize(300, 200).is_err());
        assert_eq!(s.state(), SurfaceState::SurfaceCreated);
        assert!(matches!(s.present(true), Err(SurfaceError::NotReady(_))));

        s.backend_mut().fail_render_target = false;
        s.resize(300, 200).unwrap();
        assert!(s.bind_render_target([0.0; 4]).is_ok());
    }

    // ── present ───────────────────────────────────────────────────────────

    #[test]
    fn present_sync_interval_and_tearing() {
        let mut s = created(MockBackend::new().with_tearing(true));

        s.bind_render_target([0.0; 4]).unwrap();
        s.present(true).unwrap();
        s.bind_render_target([0.0; 4]).unwrap();
        s.present(false).unwrap();

        let presents: Vec<_> = s
            .backend()
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Present { .. }))
            .cloned()
            .collect();
        assert_eq!(
            presents,
            vec![
                Call::Present { sync_interval: 1, allow_tearing: false },
                Call::Present { sync_interval: 0, allow_tearing: true },
            ]
        );
    }

    #[test]
    fn render_callback_sees_bound_target() {
        let mut s = created(MockBackend::new());
        s.bind_render_target([0.1, 0.2, 0.3, 1.0]).unwrap();
        let drawn = s.with_target(|t| {
            t.draw();
            t.clear_color
        });
        assert_eq!(drawn, Some([0.1, 0.2, 0.3, 1.0]));
        assert_eq!(s.backend().draws, 1);
    }

    #[test]
    fn present_after_destroy_fails_cleanly() {
        let mut s = created(MockBackend::new());
        s.destroy();
        assert_eq!(s.present(false), Err(SurfaceError::NotReady(SurfaceState::Destroyed)));
        assert!(s.with_target(|_| ()).is_none());
        assert!(s.device().is_none());
    }

    // ── device loss ───────────────────────────────────────────────────────

    #[test]
    fn present_fails_until_full_recreate() {
        let mut s = created(MockBackend::new());
        s.backend_mut().removed = Some("hung".into());

        assert!(s.check_device_lost());
        assert_eq!(s.state(), SurfaceState::Lost);
        assert!(matches!(s.present(true), Err(SurfaceError::DeviceLost { .. })));
        assert!(matches!(s.resize(10, 10), Err(SurfaceError::DeviceLost { .. })));

        s.backend_mut().removed = None;
        s.backend_mut().calls.clear();
        s.recreate(640, 480).unwrap();

        let calls = &s.backend().calls;
        let pos = |pred: fn(&Call) -> bool| calls.iter().position(pred).unwrap();
        let release = pos(|c| matches!(c, Call::Release));
        let device = pos(|c| matches!(c, Call::CreateDevice(_)));
        let chain = pos(|c| matches!(c, Call::CreateSwapChain(_)));
        let rtv = pos(|c| matches!(c, Call::CreateRenderTarget));
        assert!(release < device && device < chain && chain < rtv);

        s.bind_render_target([0.0; 4]).unwrap();
        assert!(s.present(true).is_ok());
    }

    #[test]
    fn device_lost_from_present_marks_surface_lost() {
        let mut s = created(MockBackend::new());
        s.bind_render_target([0.0; 4]).unwrap();
        s.backend_mut().removed = Some("reset".into());

        assert!(matches!(s.present(false), Err(SurfaceError::DeviceLost { .. })));
        assert!(s.check_device_lost());
        assert!(s.device().is_none());
    }

    #[test]
    fn healthy_device_is_not_lost() {
        let mut s = created(MockBackend::new());
        assert!(!s.check_device_lost());
    }

    // ── vblank ────────────────────────────────────────────────────────────

    #[test]
    fn vblank_wait_only_with_waitable() {
        let mut with = created(MockBackend::new());
        assert_eq!(with.wait_for_vblank(Duration::from_millis(1000)), WaitOutcome::Signaled);
        assert!(with.backend().calls.contains(&Call::Wait(Duration::from_millis(1000))));

        let mut without = created(MockBackend::new().failing_swap_chains(1));
        assert_eq!(without.wait_for_vblank(Duration::from_millis(1000)), WaitOutcome::Unavailable);
        assert!(!without.backend().calls.iter().any(|c| matches!(c, Call::Wait(_))));
    }

    #[test]
    fn create_twice_is_rejected() {
        let mut s = created(MockBackend::new());
        assert_eq!(
            s.create(1, 1),
            Err(SurfaceError::NotReady(SurfaceState::RenderTargetBound))
        );
    }
}
