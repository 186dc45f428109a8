use crate::input::InputEvent;

use super::display_mode::DisplayMode;
use super::native::NativeWindow;

/// Input-method notifications forwarded from the window system.
#[derive(Debug, Clone, PartialEq)]
pub enum ImeNotification {
    Enabled,
    Preedit(String),
    Commit(String),
    Disabled,
}

/// Window messages offered to the handler chain, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowMessage {
    /// New client size in physical pixels.
    Resized { width: u32, height: u32, minimized: bool },
    ScaleFactorChanged { scale_factor: f64 },
    CloseRequested,
    Destroyed,
    Input(InputEvent),
    Ime(ImeNotification),
    /// Posted by the frame loop through the event-loop proxy.
    SwitchDisplayMode(DisplayMode),
}

/// A participant in window-message dispatch.
///
/// Returning `true` claims the message; default processing is then skipped.
/// Every registered handler still sees every message.
pub trait MessageHandler {
    fn handle_message(&mut self, window: &dyn NativeWindow, message: &WindowMessage) -> bool;
}

/// Stable identity of a registered handler.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct HandlerId(pub &'static str);

/// Ordered list of message handlers.
#[derive(Default)]
pub struct MessageChain {
    handlers: Vec<(HandlerId, Box<dyn MessageHandler>)>,
}

impl MessageChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `handler`. An existing entry with the same id is removed first.
    pub fn register(&mut self, id: HandlerId, handler: Box<dyn MessageHandler>) {
        self.remove(id);
        self.handlers.push((id, handler));
    }

    /// Returns whether a handler was removed.
    pub fn remove(&mut self, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(h, _)| *h != id);
        self.handlers.len() != before
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = HandlerId> + '_ {
        self.handlers.iter().map(|(id, _)| *id)
    }

    /// Offers `message` to every handler in registration order.
    ///
    /// Returns `true` when at least one handler claimed it.
    pub fn dispatch(&mut self, window: &dyn NativeWindow, message: &WindowMessage) -> bool {
        let mut claimed = false;
        for (_, handler) in &mut self.handlers {
            claimed |= handler.handle_message(window, message);
        }
        claimed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::window::native::mock::MockWindow;

    struct Recorder {
        name: &'static str,
        claims: bool,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl MessageHandler for Recorder {
        fn handle_message(&mut self, _window: &dyn NativeWindow, _message: &WindowMessage) -> bool {
            self.log.lock().unwrap().push(self.name);
            self.claims
        }
    }

    fn recorder(name: &'static str, claims: bool, log: &Arc<Mutex<Vec<&'static str>>>) -> Box<dyn MessageHandler> {
        Box::new(Recorder {
            name,
            claims,
            log: Arc::clone(log),
        })
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = MessageChain::new();
        chain.register(HandlerId("a"), recorder("a", false, &log));
        chain.register(HandlerId("b"), recorder("b", false, &log));

        let claimed = chain.dispatch(&MockWindow::new(), &WindowMessage::CloseRequested);

        assert!(!claimed);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn any_claim_suppresses_default_but_all_handlers_see_message() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = MessageChain::new();
        chain.register(HandlerId("a"), recorder("a", true, &log));
        chain.register(HandlerId("b"), recorder("b", false, &log));

        assert!(chain.dispatch(&MockWindow::new(), &WindowMessage::CloseRequested));
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn registering_twice_keeps_one_entry_at_the_end() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = MessageChain::new();
        chain.register(HandlerId("a"), recorder("a", false, &log));
        chain.register(HandlerId("b"), recorder("b", false, &log));
        chain.register(HandlerId("a"), recorder("a2", false, &log));

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.ids().collect::<Vec<_>>(), vec![HandlerId("b"), HandlerId("a")]);

        chain.dispatch(&MockWindow::new(), &WindowMessage::Destroyed);
        assert_eq!(*log.lock().unwrap(), vec!["b", "a2"]);
    }

    #[test]
    fn remove_reports_presence() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = MessageChain::new();
        chain.register(HandlerId("a"), recorder("a", false, &log));

        assert!(chain.remove(HandlerId("a")));
        assert!(!chain.remove(HandlerId("a")));
        assert!(chain.is_empty());
    }
}
