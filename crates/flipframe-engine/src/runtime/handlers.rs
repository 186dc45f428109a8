//! Message handlers the runtime registers on the window chain.

use std::sync::Arc;

use crate::ime::{ImeGuard, SharedIme};
use crate::window::{DisplayModeController, HandlerId, MessageChain, MessageHandler, NativeWindow, WindowMessage};

use super::shared::LoopShared;

pub const INPUT_CAPTURE: HandlerId = HandlerId("input-capture");
pub const IME_GUARD: HandlerId = HandlerId("ime-guard");
pub const LOOP_HANDLER: HandlerId = HandlerId("loop");

/// Forwards translated input to the frame loop. Never claims.
pub struct InputCapture {
    shared: Arc<LoopShared>,
}

impl InputCapture {
    pub fn new(shared: Arc<LoopShared>) -> Self {
        Self { shared }
    }
}

impl MessageHandler for InputCapture {
    fn handle_message(&mut self, _window: &dyn NativeWindow, message: &WindowMessage) -> bool {
        if let WindowMessage::Input(ev) = message {
            self.shared.input.push(ev.clone());
        }
        false
    }
}

/// Application handler: records resizes and performs display-mode switches.
pub struct LoopHandler {
    shared:  Arc<LoopShared>,
    display: DisplayModeController,
}

impl LoopHandler {
    pub fn new(shared: Arc<LoopShared>) -> Self {
        Self {
            shared,
            display: DisplayModeController::new(),
        }
    }
}

impl MessageHandler for LoopHandler {
    fn handle_message(&mut self, window: &dyn NativeWindow, message: &WindowMessage) -> bool {
        match message {
            WindowMessage::Resized { width, height, minimized } => {
                if !*minimized {
                    self.shared.resize.request(*width, *height);
                }
                false
            }
            WindowMessage::ScaleFactorChanged { .. } => {
                let (width, height) = window.inner_size();
                self.shared.resize.request(width, height);
                false
            }
            WindowMessage::SwitchDisplayMode(mode) => {
                if let Err(e) = self.display.apply(window, *mode) {
                    log::warn!("display mode switch to {mode:?} failed: {e}");
                }
                true
            }
            _ => false,
        }
    }
}

/// Handler chain in dispatch order: input capture, IME guard, application handler.
pub fn default_chain(shared: &Arc<LoopShared>, ime: &SharedIme) -> MessageChain {
    let mut chain = MessageChain::new();
    chain.register(INPUT_CAPTURE, Box::new(InputCapture::new(Arc::clone(shared))));
    chain.register(IME_GUARD, Box::new(ImeGuard::new(Arc::clone(ime))));
    chain.register(LOOP_HANDLER, Box::new(LoopHandler::new(Arc::clone(shared))));
    chain
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::ime::InputMethodAdapter;
    use crate::input::InputEvent;
    use crate::window::{DisplayMode, MockWindow, WindowStyle};

    fn chain() -> (MessageChain, Arc<LoopShared>) {
        let shared = Arc::new(LoopShared::new());
        let ime: SharedIme = Arc::new(Mutex::new(InputMethodAdapter::new(None)));
        (default_chain(&shared, &ime), shared)
    }

    #[test]
    fn chain_order() {
        let (chain, _) = chain();
        assert_eq!(chain.ids().collect::<Vec<_>>(), vec![INPUT_CAPTURE, IME_GUARD, LOOP_HANDLER]);
    }

    #[test]
    fn resizes_are_recorded_unless_minimized() {
        let (mut chain, shared) = chain();
        let window = MockWindow::new();

        chain.dispatch(&window, &WindowMessage::Resized { width: 800, height: 600, minimized: false });
        chain.dispatch(&window, &WindowMessage::Resized { width: 0, height: 0, minimized: true });

        assert_eq!(shared.resize.try_take(), Some((800, 600)));
    }

    #[test]
    fn input_is_forwarded_without_claiming() {
        let (mut chain, shared) = chain();
        let window = MockWindow::new();

        let claimed = chain.dispatch(&window, &WindowMessage::Input(InputEvent::Focused(true)));

        assert!(!claimed);
        assert_eq!(shared.input.drain(), vec![InputEvent::Focused(true)]);
    }

    #[test]
    fn close_request_is_left_to_default_processing() {
        let (mut chain, _) = chain();
        assert!(!chain.dispatch(&MockWindow::new(), &WindowMessage::CloseRequested));
    }

    #[test]
    fn display_mode_switch_is_claimed_and_applied() {
        let (mut chain, _) = chain();
        let window = MockWindow::new();

        assert!(chain.dispatch(&window, &WindowMessage::SwitchDisplayMode(DisplayMode::Fullscreen)));
        assert_eq!(window.style.get(), WindowStyle::Popup);
    }
}
