use std::sync::Arc;
use std::time::Duration;

use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{Ime, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::input::platform::winit::translate_window_event;
use crate::input::{InputFrame, InputState};
use crate::runtime::LoopShared;

use super::display_mode::DisplayMode;
use super::error::PlatformError;
use super::message::{ImeNotification, MessageChain, WindowMessage};
use super::native::{NativeWindow, WindowRect};

/// Pump iterations allowed for the platform to deliver `resumed` and create the window.
const CREATE_ATTEMPTS: usize = 16;

/// Events posted to the window thread through the event-loop proxy.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    SwitchDisplayMode(DisplayMode),
    /// Wakes a blocking pump so it re-checks the exit flag.
    Wake,
}

/// Top-left corner placing a `size` window in the middle of `monitor`.
pub fn centered_origin(monitor: WindowRect, size: (u32, u32)) -> (i32, i32) {
    let x = monitor.x + monitor.width as i32 / 2 - size.0 as i32 / 2;
    let y = monitor.y + monitor.height as i32 / 2 - size.1 as i32 / 2;
    (x, y)
}

/// Owns the event loop and the application window.
///
/// Messages are pumped explicitly by the caller (`pump_messages`), so the host
/// fits both the single-thread loop and the worker-thread variant where the
/// main thread only pumps.
pub struct WindowHost {
    event_loop: EventLoop<HostEvent>,
    pump: MessagePump,
}

impl WindowHost {
    /// Creates the window hidden at the requested client size, centers it on
    /// the primary monitor and shows it.
    pub fn create(
        title: &str,
        width: u32,
        height: u32,
        chain: MessageChain,
        shared: Arc<LoopShared>,
    ) -> Result<Self, PlatformError> {
        let event_loop = EventLoop::<HostEvent>::with_user_event()
            .build()
            .map_err(|e| PlatformError::EventLoop(e.to_string()))?;

        let attrs = Window::default_attributes()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(width.max(1), height.max(1)))
            .with_visible(false);

        let mut host = Self {
            event_loop,
            pump: MessagePump::new(attrs, chain, shared),
        };

        for _ in 0..CREATE_ATTEMPTS {
            if host.pump.window.is_some() || host.pump.create_error.is_some() {
                break;
            }
            if let PumpStatus::Exit(code) = host
                .event_loop
                .pump_app_events(Some(Duration::ZERO), &mut host.pump)
            {
                return Err(PlatformError::EventLoop(format!("event loop exited during startup ({code})")));
            }
        }

        if let Some(err) = host.pump.create_error.take() {
            return Err(err);
        }
        let window = host
            .pump
            .window
            .clone()
            .ok_or_else(|| PlatformError::WindowCreation("platform never resumed".into()))?;

        if let Err(e) = host.center_on_primary_monitor() {
            log::warn!("could not center window: {e}");
        }
        window.set_visible(true);

        log::info!("window created: \"{title}\" {width}x{height}");
        Ok(host)
    }

    /// Places the window at `monitor.origin + monitor.size/2 - window.size/2`.
    pub fn center_on_primary_monitor(&self) -> Result<(), PlatformError> {
        let window = self.pump.window.as_ref().ok_or(PlatformError::WindowGone)?;
        let monitor = NativeWindow::primary_monitor_rect(window.as_ref()).ok_or(PlatformError::NoPrimaryMonitor)?;
        let outer = window.outer_size();
        let (x, y) = centered_origin(monitor, (outer.width, outer.height));
        window.set_outer_position(PhysicalPosition::new(x, y));
        Ok(())
    }

    /// Processes window messages.
    ///
    /// Non-blocking mode drains everything pending; blocking mode waits for at
    /// least one message. Returns `false` once the window is gone, the event
    /// loop exited, or the shared exit flag is set.
    pub fn pump_messages(&mut self, blocking: bool) -> bool {
        let timeout = if blocking { None } else { Some(Duration::ZERO) };
        if let PumpStatus::Exit(code) = self.event_loop.pump_app_events(timeout, &mut self.pump) {
            log::debug!("event loop exited with code {code}");
            self.pump.exited = true;
        }
        self.is_running()
    }

    pub fn is_running(&self) -> bool {
        !(self.pump.exited || self.pump.window.is_none() || self.pump.shared.exit_requested())
    }

    /// Drops the window and flushes the resulting messages.
    pub fn destroy(&mut self) {
        if self.pump.window.take().is_some() {
            let _ = self
                .event_loop
                .pump_app_events(Some(Duration::ZERO), &mut self.pump);
            log::info!("window destroyed");
        }
    }

    pub fn window(&self) -> Option<Arc<Window>> {
        self.pump.window.clone()
    }

    pub fn proxy(&self) -> EventLoopProxy<HostEvent> {
        self.event_loop.create_proxy()
    }

    pub fn chain_mut(&mut self) -> &mut MessageChain {
        &mut self.pump.chain
    }
}

impl Drop for WindowHost {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// `ApplicationHandler` translating winit events into `WindowMessage`s.
struct MessagePump {
    attrs: Option<WindowAttributes>,
    window: Option<Arc<Window>>,
    chain: MessageChain,
    shared: Arc<LoopShared>,

    // Translation needs tracked modifiers and pointer position.
    input_state: InputState,
    scratch: InputFrame,

    create_error: Option<PlatformError>,
    exited: bool,
}

impl MessagePump {
    fn new(attrs: WindowAttributes, chain: MessageChain, shared: Arc<LoopShared>) -> Self {
        Self {
            attrs: Some(attrs),
            window: None,
            chain,
            shared,
            input_state: InputState::default(),
            scratch: InputFrame::default(),
            create_error: None,
            exited: false,
        }
    }

    /// Offers `message` to the chain, then runs default processing if unclaimed.
    fn dispatch(&mut self, window: &Window, message: WindowMessage) {
        let claimed = self.chain.dispatch(window, &message);
        if claimed {
            return;
        }
        if message == WindowMessage::CloseRequested {
            log::info!("close requested");
            self.shared.request_exit();
        }
    }

    fn messages_for(&mut self, window: &Window, event: &WindowEvent) -> Vec<WindowMessage> {
        let mut out = Vec::with_capacity(2);

        if let Some(ev) = translate_window_event(window, &self.input_state, event) {
            self.input_state.apply_event(&mut self.scratch, ev.clone());
            self.scratch.clear();
            out.push(WindowMessage::Input(ev));
        }

        match event {
            WindowEvent::Resized(size) => out.push(WindowMessage::Resized {
                width: size.width,
                height: size.height,
                minimized: size.width == 0 || size.height == 0 || NativeWindow::is_minimized(window),
            }),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                out.push(WindowMessage::ScaleFactorChanged {
                    scale_factor: *scale_factor,
                })
            }
            WindowEvent::CloseRequested => out.push(WindowMessage::CloseRequested),
            WindowEvent::Destroyed => out.push(WindowMessage::Destroyed),
            WindowEvent::Ime(ime) => out.push(WindowMessage::Ime(match ime {
                Ime::Enabled => ImeNotification::Enabled,
                Ime::Preedit(text, _) => ImeNotification::Preedit(text.clone()),
                Ime::Commit(text) => ImeNotification::Commit(text.clone()),
                Ime::Disabled => ImeNotification::Disabled,
            })),
            _ => {}
        }

        out
    }
}

impl ApplicationHandler<HostEvent> for MessagePump {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(attrs) = self.attrs.take() else {
            return;
        };
        match event_loop.create_window(attrs) {
            Ok(window) => self.window = Some(Arc::new(window)),
            Err(e) => self.create_error = Some(PlatformError::WindowCreation(e.to_string())),
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.clone() else {
            return;
        };
        if window.id() != window_id {
            return;
        }

        let destroyed = matches!(event, WindowEvent::Destroyed);
        for message in self.messages_for(&window, &event) {
            self.dispatch(&window, message);
        }
        if destroyed {
            self.window = None;
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: HostEvent) {
        let Some(window) = self.window.clone() else {
            return;
        };
        match event {
            HostEvent::SwitchDisplayMode(mode) => self.dispatch(&window, WindowMessage::SwitchDisplayMode(mode)),
            HostEvent::Wake => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);
    }
}
