use std::sync::Arc;
use std::time::Duration;

use winit::event_loop::EventLoopProxy;

use crate::core::{App, AppControl, Command, FrameCtx, RuntimeCtx};
use crate::device::{GraphicsError, PresentBackend, PresentationSurface, SurfaceError};
use crate::ime::SharedIme;
use crate::input::{InputFrame, InputState, Key};
use crate::time::FrameClock;
use crate::window::{AltEnterToggle, DisplayMode, HostEvent, NativeWindow, WindowHost};

use super::config::RuntimeConfig;
use super::shared::LoopShared;

/// Message side as seen from the frame loop.
pub trait MessageSource {
    /// Processes pending window messages without blocking.
    ///
    /// Returns `false` once the loop must stop.
    fn pump(&mut self) -> bool;

    /// Asks the window thread to switch display mode.
    fn post_display_mode(&self, mode: DisplayMode);
}

impl MessageSource for WindowHost {
    fn pump(&mut self) -> bool {
        self.pump_messages(false)
    }

    fn post_display_mode(&self, mode: DisplayMode) {
        if self.proxy().send_event(HostEvent::SwitchDisplayMode(mode)).is_err() {
            log::warn!("event loop closed; display mode switch dropped");
        }
    }
}

/// Message source for the render thread when the main thread owns the pump.
///
/// Input arrives through the shared exchange, so pumping only checks the exit flag.
pub struct RemotePump {
    proxy:  EventLoopProxy<HostEvent>,
    shared: Arc<LoopShared>,
}

impl RemotePump {
    pub fn new(proxy: EventLoopProxy<HostEvent>, shared: Arc<LoopShared>) -> Self {
        Self { proxy, shared }
    }

    /// Wakes the blocking pump so it observes the exit flag.
    pub fn wake(&self) {
        let _ = self.proxy.send_event(HostEvent::Wake);
    }
}

impl MessageSource for RemotePump {
    fn pump(&mut self) -> bool {
        !self.shared.exit_requested()
    }

    fn post_display_mode(&self, mode: DisplayMode) {
        if self.proxy.send_event(HostEvent::SwitchDisplayMode(mode)).is_err() {
            log::warn!("event loop closed; display mode switch dropped");
        }
    }
}

/// Result of one loop iteration.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameOutcome {
    Presented,
    /// A pending resize was applied; nothing was rendered.
    Resized,
    /// The frame could not be rendered (transient failure or no render target).
    Skipped,
    /// The device was lost and the surface rebuilt.
    Recovered,
    Exit,
}

/// Per-frame driver.
///
/// Owns the presentation surface and the application; the window is shared
/// with the message side.
pub struct FrameLoop<B: PresentBackend, A: App<B>, W: NativeWindow> {
    surface: PresentationSurface<B>,
    app:     A,
    window:  Arc<W>,
    shared:  Arc<LoopShared>,
    ime:     SharedIme,

    input_state: InputState,
    input_frame: InputFrame,
    clock:       FrameClock,
    alt_enter:   AltEnterToggle,

    vsync:          bool,
    clear_color:    [f32; 4],
    vblank_timeout: Duration,
    attached:       bool,
}

impl<B, A, W> FrameLoop<B, A, W>
where
    B: PresentBackend,
    A: App<B>,
    W: NativeWindow,
{
    /// Creates the surface at the window's client size and attaches the app.
    pub fn new(
        mut surface: PresentationSurface<B>,
        mut app: A,
        window: Arc<W>,
        shared: Arc<LoopShared>,
        ime: SharedIme,
        config: &RuntimeConfig,
    ) -> anyhow::Result<Self> {
        let (width, height) = window.inner_size();
        surface.create(width, height)?;

        let device = surface
            .device()
            .ok_or(SurfaceError::NotReady(surface.state()))?;
        app.attach(device)?;

        Ok(Self {
            surface,
            app,
            window,
            shared,
            ime,
            input_state: InputState::default(),
            input_frame: InputFrame::default(),
            clock: FrameClock::default(),
            alt_enter: AltEnterToggle::new(),
            vsync: config.vsync,
            clear_color: config.clear_color,
            vblank_timeout: config.surface.vblank_timeout,
            attached: true,
        })
    }

    pub fn surface(&self) -> &PresentationSurface<B> {
        &self.surface
    }

    pub fn app(&self) -> &A {
        &self.app
    }

    /// Runs frames until the window is gone or exit is requested.
    pub fn run(&mut self, source: &mut dyn MessageSource) {
        while self.run_frame(source) != FrameOutcome::Exit {}
    }

    /// One iteration: wait, pump, input, alt+enter, UI, resize | recover | render + present.
    pub fn run_frame(&mut self, source: &mut dyn MessageSource) -> FrameOutcome {
        if self.shared.exit_requested() {
            return FrameOutcome::Exit;
        }

        self.surface.wait_for_vblank(self.vblank_timeout);

        if !source.pump() || self.shared.exit_requested() {
            return FrameOutcome::Exit;
        }

        self.input_frame.clear();
        for ev in self.shared.input.drain() {
            self.input_state.apply_event(&mut self.input_frame, ev);
        }

        let alt = self.input_state.key_down(Key::Alt) || self.input_state.modifiers.alt;
        let enter = self.input_state.key_down(Key::Enter);
        if let Some(mode) = self.alt_enter.update(alt, enter) {
            source.post_display_mode(mode);
        }

        let mut runtime = RuntimeCtx::default();
        let control = {
            let mut ctx = FrameCtx {
                window: &*self.window,
                input: &self.input_state,
                input_frame: &self.input_frame,
                time: self.clock.tick(),
                surface_size: self.surface.size(),
                caps: self.surface.caps(),
                runtime: &mut runtime,
                ime: &self.ime,
            };
            self.app.on_frame(&mut ctx)
        };
        self.apply_commands(runtime);
        if control == AppControl::Exit {
            self.shared.request_exit();
        }
        if self.shared.exit_requested() {
            return FrameOutcome::Exit;
        }

        if let Some((width, height)) = self.shared.resize.try_take() {
            return match self.surface.resize(width, height) {
                Ok(()) => FrameOutcome::Resized,
                Err(SurfaceError::DeviceLost { .. }) => self.recover(),
                Err(e) => {
                    log::warn!("resize to {width}x{height} failed: {e}");
                    FrameOutcome::Resized
                }
            };
        }

        if self.surface.check_device_lost() {
            return self.recover();
        }

        if let Err(e) = self.surface.bind_render_target(self.clear_color) {
            return self.on_surface_error(e);
        }
        self.surface.with_target(|target| self.app.render(target));
        match self.surface.present(self.vsync) {
            Ok(()) => FrameOutcome::Presented,
            Err(e) => self.on_surface_error(e),
        }
    }

    /// Detaches the app and destroys the surface. The caller destroys the window.
    pub fn shutdown(&mut self) {
        if self.attached {
            self.app.detach();
            self.attached = false;
        }
        self.surface.destroy();
    }

    fn on_surface_error(&mut self, err: SurfaceError) -> FrameOutcome {
        match err {
            SurfaceError::DeviceLost { .. } => self.recover(),
            SurfaceError::Graphics(GraphicsError::OutOfMemory) => {
                log::error!("out of GPU memory; stopping");
                self.shared.request_exit();
                FrameOutcome::Exit
            }
            other => {
                log::debug!("frame skipped: {other}");
                FrameOutcome::Skipped
            }
        }
    }

    /// Rebuilds the surface after device loss. Failure ends the loop.
    fn recover(&mut self) -> FrameOutcome {
        if self.attached {
            self.app.detach();
            self.attached = false;
        }

        let (width, height) = self.window.inner_size();
        if let Err(e) = self.surface.recreate(width, height) {
            log::error!("failed to recreate presentation surface: {e}");
            self.shared.request_exit();
            return FrameOutcome::Exit;
        }

        let attached = match self.surface.device() {
            Some(device) => self.app.attach(device),
            None => Err(anyhow::anyhow!("surface has no device after recreate")),
        };
        if let Err(e) = attached {
            log::error!("failed to re-attach renderer: {e:#}");
            self.shared.request_exit();
            return FrameOutcome::Exit;
        }
        self.attached = true;
        self.clock.reset();

        log::info!("recovered from device loss");
        FrameOutcome::Recovered
    }

    fn apply_commands(&mut self, mut runtime: RuntimeCtx) {
        for cmd in runtime.take_commands() {
            match cmd {
                Command::Exit => self.shared.request_exit(),
                Command::SetVsync(vsync) => self.vsync = vsync,
                Command::SetClearColor(rgba) => self.clear_color = rgba,
                Command::SetVblankTimeout(timeout) => self.vblank_timeout = timeout,
            }
        }
    }
}

impl<B, A, W> Drop for FrameLoop<B, A, W>
where
    B: PresentBackend,
    A: App<B>,
    W: NativeWindow,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}
