use std::collections::HashMap;
use std::sync::{Arc, Mutex, TryLockError};

use winit::window::WindowId;

use crate::input::InputEvent;
use crate::window::{MessageHandler, NativeWindow, WindowMessage};

/// Platform text-input facility.
///
/// Each call reports whether the platform accepted it.
pub trait ImeBackend {
    fn set_open(&mut self, window: &dyn NativeWindow, open: bool) -> bool;

    fn open_status(&self, window: &dyn NativeWindow) -> bool;

    /// Switches the conversion mode to fixed / non-converting.
    fn set_non_converting(&mut self, window: &dyn NativeWindow) -> bool;

    /// Detaches the window's input context, or reattaches the detached one.
    fn toggle_association(&mut self, window: &dyn NativeWindow) -> bool;
}

pub type BoxedImeBackend = Box<dyn ImeBackend + Send>;

impl<T: ImeBackend + ?Sized> ImeBackend for Box<T> {
    fn set_open(&mut self, window: &dyn NativeWindow, open: bool) -> bool {
        (**self).set_open(window, open)
    }

    fn open_status(&self, window: &dyn NativeWindow) -> bool {
        (**self).open_status(window)
    }

    fn set_non_converting(&mut self, window: &dyn NativeWindow) -> bool {
        (**self).set_non_converting(window)
    }

    fn toggle_association(&mut self, window: &dyn NativeWindow) -> bool {
        (**self).toggle_association(window)
    }
}

/// Per-window input-method policy on top of an optional platform backend.
///
/// Without a backend (the facility failed to load) every operation returns `false`.
pub struct InputMethodAdapter<I: ImeBackend = BoxedImeBackend> {
    backend: Option<I>,
    overrides: HashMap<WindowId, bool>,
}

impl<I: ImeBackend> InputMethodAdapter<I> {
    pub fn new(backend: Option<I>) -> Self {
        Self {
            backend,
            overrides: HashMap::new(),
        }
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Records the override for `window` and applies it.
    ///
    /// Disabling switches to non-converting mode before closing.
    pub fn set_enabled(&mut self, window: &dyn NativeWindow, enabled: bool) -> bool {
        self.overrides.insert(window.id(), enabled);
        let Some(backend) = self.backend.as_mut() else {
            return false;
        };
        if !enabled {
            backend.set_non_converting(window);
        }
        backend.set_open(window, enabled)
    }

    /// Closes the composition and forces non-converting (direct ASCII) input.
    pub fn force_non_converting(&mut self, window: &dyn NativeWindow) -> bool {
        let Some(backend) = self.backend.as_mut() else {
            return false;
        };
        backend.set_open(window, false);
        backend.set_non_converting(window)
    }

    /// Override for `window` if one was recorded, else the platform's open status.
    pub fn is_enabled(&self, window: &dyn NativeWindow) -> bool {
        if let Some(enabled) = self.overrides.get(&window.id()) {
            return *enabled;
        }
        self.backend
            .as_ref()
            .is_some_and(|b| b.open_status(window))
    }

    pub fn toggle_association(&mut self, window: &dyn NativeWindow) -> bool {
        self.backend
            .as_mut()
            .is_some_and(|b| b.toggle_association(window))
    }

    /// Re-applies the disabled policy when `window` carries a "disabled" override.
    pub fn reapply_policy(&mut self, window: &dyn NativeWindow) {
        if self.overrides.get(&window.id()) != Some(&false) {
            return;
        }
        if let Some(backend) = self.backend.as_mut() {
            backend.set_non_converting(window);
            backend.set_open(window, false);
        }
    }
}

impl InputMethodAdapter {
    /// Adapter over the platform's native facility.
    ///
    /// Falls back to `winit`'s IME toggle where no native facility exists.
    pub fn platform_default() -> Self {
        #[cfg(windows)]
        {
            match super::imm32::Imm32Backend::load() {
                Some(imm) => return Self::new(Some(Box::new(imm))),
                None => log::warn!("imm32.dll unavailable; input-method control disabled"),
            }
            Self::new(None)
        }
        #[cfg(not(windows))]
        {
            Self::new(Some(Box::new(super::winit::WinitImeBackend::new())))
        }
    }
}

/// Adapter shared between the message handler and the frame loop.
pub type SharedIme = Arc<Mutex<InputMethodAdapter>>;

/// Message handler keeping disabled windows disabled.
///
/// The platform may reopen composition on focus or input-language changes.
/// Never claims a message.
///
/// In worker mode the render thread may hold the adapter while the
/// platform sends messages back to this thread, so the guard never waits
/// for the lock. A contended reapply is retried on the next message.
pub struct ImeGuard {
    ime:      SharedIme,
    deferred: bool,
}

impl ImeGuard {
    pub fn new(ime: SharedIme) -> Self {
        Self { ime, deferred: false }
    }
}

impl MessageHandler for ImeGuard {
    fn handle_message(&mut self, window: &dyn NativeWindow, message: &WindowMessage) -> bool {
        let relevant = matches!(
            message,
            WindowMessage::Ime(_) | WindowMessage::Input(InputEvent::Focused(true))
        );
        if !relevant && !self.deferred {
            return false;
        }
        match self.ime.try_lock() {
            Ok(mut ime) => {
                ime.reapply_policy(window);
                self.deferred = false;
            }
            Err(TryLockError::WouldBlock) => {
                log::debug!("input-method adapter busy; policy reapply deferred");
                self.deferred = true;
            }
            Err(TryLockError::Poisoned(_)) => self.deferred = false,
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::{ImeNotification, MockWindow};

    #[derive(Debug, Clone, PartialEq)]
    enum ImeCall {
        SetOpen(bool),
        NonConverting,
        Toggle,
    }

    #[derive(Default)]
    struct MockIme {
        calls: Arc<Mutex<Vec<ImeCall>>>,
        open: bool,
    }

    impl ImeBackend for MockIme {
        fn set_open(&mut self, _window: &dyn NativeWindow, open: bool) -> bool {
            self.calls.lock().unwrap().push(ImeCall::SetOpen(open));
            self.open = open;
            true
        }

        fn open_status(&self, _window: &dyn NativeWindow) -> bool {
            self.open
        }

        fn set_non_converting(&mut self, _window: &dyn NativeWindow) -> bool {
            self.calls.lock().unwrap().push(ImeCall::NonConverting);
            true
        }

        fn toggle_association(&mut self, _window: &dyn NativeWindow) -> bool {
            self.calls.lock().unwrap().push(ImeCall::Toggle);
            true
        }
    }

    fn adapter() -> (InputMethodAdapter<MockIme>, Arc<Mutex<Vec<ImeCall>>>) {
        let ime = MockIme {
            open: true,
            ..Default::default()
        };
        let calls = Arc::clone(&ime.calls);
        (InputMethodAdapter::new(Some(ime)), calls)
    }

    #[test]
    fn disabling_switches_mode_before_closing() {
        let (mut ime, calls) = adapter();
        let window = MockWindow::new();

        assert!(ime.set_enabled(&window, false));
        assert_eq!(*calls.lock().unwrap(), vec![ImeCall::NonConverting, ImeCall::SetOpen(false)]);
        assert!(!ime.is_enabled(&window));
    }

    #[test]
    fn enabling_only_opens() {
        let (mut ime, calls) = adapter();
        let window = MockWindow::new();

        assert!(ime.set_enabled(&window, true));
        assert_eq!(*calls.lock().unwrap(), vec![ImeCall::SetOpen(true)]);
    }

    #[test]
    fn force_non_converting_closes_first() {
        let (mut ime, calls) = adapter();
        let window = MockWindow::new();

        assert!(ime.force_non_converting(&window));
        assert_eq!(*calls.lock().unwrap(), vec![ImeCall::SetOpen(false), ImeCall::NonConverting]);
    }

    #[test]
    fn status_falls_back_to_platform_without_override() {
        let (ime, _) = adapter();
        assert!(ime.is_enabled(&MockWindow::new()));
    }

    #[test]
    fn overrides_are_per_window() {
        let (mut ime, _) = adapter();
        let a = MockWindow::new().with_id(1);
        let b = MockWindow::new().with_id(2);

        ime.set_enabled(&a, false);
        ime.set_enabled(&b, true);

        assert!(!ime.is_enabled(&a));
        assert!(ime.is_enabled(&b));
    }

    #[test]
    fn without_backend_everything_reports_false() {
        let mut ime: InputMethodAdapter<MockIme> = InputMethodAdapter::new(None);
        let window = MockWindow::new();

        assert!(!ime.set_enabled(&window, true));
        assert!(!ime.force_non_converting(&window));
        assert!(!ime.toggle_association(&window));
        assert!(!ime.has_backend());
    }

    #[test]
    fn guard_reapplies_disabled_policy_and_never_claims() {
        let ime = MockIme::default();
        let calls = Arc::clone(&ime.calls);
        let shared: SharedIme = Arc::new(Mutex::new(InputMethodAdapter::new(Some(Box::new(ime) as BoxedImeBackend))));
        let window = MockWindow::new();
        shared.lock().unwrap().set_enabled(&window, false);
        calls.lock().unwrap().clear();

        let mut guard = ImeGuard::new(Arc::clone(&shared));
        let claimed = guard.handle_message(&window, &WindowMessage::Ime(ImeNotification::Enabled));

        assert!(!claimed);
        assert_eq!(*calls.lock().unwrap(), vec![ImeCall::NonConverting, ImeCall::SetOpen(false)]);
    }

    #[test]
    fn guard_ignores_enabled_windows() {
        let ime = MockIme::default();
        let calls = Arc::clone(&ime.calls);
        let shared: SharedIme = Arc::new(Mutex::new(InputMethodAdapter::new(Some(Box::new(ime) as BoxedImeBackend))));
        let window = MockWindow::new();

        let mut guard = ImeGuard::new(shared);
        guard.handle_message(&window, &WindowMessage::Input(InputEvent::Focused(true)));

        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn guard_does_not_wait_for_a_held_adapter() {
        let ime = MockIme::default();
        let calls = Arc::clone(&ime.calls);
        let shared: SharedIme = Arc::new(Mutex::new(InputMethodAdapter::new(Some(Box::new(ime) as BoxedImeBackend))));
        let window = MockWindow::new();
        shared.lock().unwrap().set_enabled(&window, false);
        calls.lock().unwrap().clear();

        let mut guard = ImeGuard::new(Arc::clone(&shared));
        {
            // the render thread is inside an adapter call
            let _held = shared.lock().unwrap();
            let claimed = guard.handle_message(&window, &WindowMessage::Ime(ImeNotification::Enabled));
            assert!(!claimed);
        }
        assert!(calls.lock().unwrap().is_empty());

        // retried on the next message once the adapter is free
        guard.handle_message(&window, &WindowMessage::Input(InputEvent::PointerLeft));
        assert_eq!(*calls.lock().unwrap(), vec![ImeCall::NonConverting, ImeCall::SetOpen(false)]);

        calls.lock().unwrap().clear();
        guard.handle_message(&window, &WindowMessage::Input(InputEvent::PointerLeft));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn guard_returns_while_another_thread_holds_the_adapter() {
        let shared: SharedIme = Arc::new(Mutex::new(InputMethodAdapter::new(Some(
            Box::new(MockIme::default()) as BoxedImeBackend,
        ))));
        let held = shared.lock().unwrap();

        let worker_shared = Arc::clone(&shared);
        let handle = std::thread::spawn(move || {
            let window = MockWindow::new();
            let mut guard = ImeGuard::new(worker_shared);
            guard.handle_message(&window, &WindowMessage::Input(InputEvent::Focused(true)))
        });

        // joins while the lock is still held
        assert!(!handle.join().unwrap());
        drop(held);
    }
}
