use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, Ime, KeyEvent as WinitKeyEvent, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};

use crate::input::{
    InputEvent, InputState, Key, KeyEvent, KeyState, Modifiers, MouseButton, MouseButtonState, MouseWheelDelta,
    PointerButtonEvent, PointerMoveEvent, TextEvent,
};
use crate::window::NativeWindow;

/// Translates a winit `WindowEvent` into an engine `InputEvent`.
///
/// `state` supplies what winit 0.30 does not attach to every event: the
/// current modifiers and the last pointer position. Events the input
/// subsystem does not model return `None`.
pub fn translate_window_event(
    window: &dyn NativeWindow,
    state: &InputState,
    event: &WindowEvent,
) -> Option<InputEvent> {
    let ev = match event {
        WindowEvent::ModifiersChanged(m) => InputEvent::ModifiersChanged(map_modifiers(m.state())),
        WindowEvent::Focused(focused) => InputEvent::Focused(*focused),
        WindowEvent::CursorLeft { .. } => InputEvent::PointerLeft,

        WindowEvent::CursorMoved { position, .. } => {
            let (x, y) = to_logical(window, *position);
            InputEvent::PointerMoved(PointerMoveEvent { x, y })
        }

        WindowEvent::MouseInput { state: st, button, .. } => {
            let (x, y) = state.pointer_pos.unwrap_or_default();
            InputEvent::PointerButton(PointerButtonEvent {
                button: map_mouse_button(*button),
                state: match st {
                    ElementState::Pressed => MouseButtonState::Pressed,
                    ElementState::Released => MouseButtonState::Released,
                },
                x,
                y,
                modifiers: state.modifiers,
            })
        }

        WindowEvent::MouseWheel { delta, .. } => InputEvent::MouseWheel {
            delta: match delta {
                MouseScrollDelta::LineDelta(x, y) => MouseWheelDelta::Line { x: *x, y: *y },
                MouseScrollDelta::PixelDelta(p) => {
                    let (x, y) = to_logical(window, *p);
                    MouseWheelDelta::Pixel { x, y }
                }
            },
            modifiers: state.modifiers,
        },

        WindowEvent::KeyboardInput { event, .. } => InputEvent::Key(key_event(event, state.modifiers)),

        WindowEvent::Ime(ime) => return ime_event(ime),

        _ => return None,
    };
    Some(ev)
}

fn key_event(event: &WinitKeyEvent, modifiers: Modifiers) -> KeyEvent {
    let (key, code) = match event.physical_key {
        PhysicalKey::Code(code) => (map_key_code(code), code as u32),
        PhysicalKey::Unidentified(_) => (Key::Other(0), 0),
    };
    KeyEvent {
        key,
        state: match event.state {
            ElementState::Pressed => KeyState::Pressed,
            ElementState::Released => KeyState::Released,
        },
        modifiers,
        code,
        repeat: event.repeat,
    }
}

/// Commits become text; composition updates and the IME switching off
/// become preedit, the latter as an empty string so an open composition ends.
fn ime_event(ime: &Ime) -> Option<InputEvent> {
    let text = match ime {
        Ime::Commit(text) if !text.is_empty() => return Some(InputEvent::Text(TextEvent { text: text.clone() })),
        Ime::Preedit(text, _) => text.clone(),
        Ime::Disabled => String::new(),
        Ime::Commit(_) | Ime::Enabled => return None,
    };
    Some(InputEvent::Preedit(TextEvent { text }))
}

fn to_logical(window: &dyn NativeWindow, pos: PhysicalPosition<f64>) -> (f32, f32) {
    let logical = pos.to_logical::<f64>(window.scale_factor());
    (logical.x as f32, logical.y as f32)
}

fn map_modifiers(m: ModifiersState) -> Modifiers {
    Modifiers {
        shift: m.shift_key(),
        ctrl: m.control_key(),
        alt: m.alt_key(),
        meta: m.super_key(),
    }
}

fn map_mouse_button(b: WinitMouseButton) -> MouseButton {
    match b {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Back,
        WinitMouseButton::Forward => MouseButton::Forward,
        WinitMouseButton::Other(v) => MouseButton::Other(v),
    }
}

macro_rules! key_table {
    ($code:expr; $($($from:ident)|+ => $to:ident),* $(,)?) => {
        match $code {
            $($(KeyCode::$from)|+ => Key::$to,)*
            other => Key::Other(other as u32),
        }
    };
}

fn map_key_code(code: KeyCode) -> Key {
    key_table! { code;
        Escape => Escape, Enter | NumpadEnter => Enter, Tab => Tab,
        Backspace => Backspace, Space => Space,
        Insert => Insert, Delete => Delete, Home => Home, End => End,
        PageUp => PageUp, PageDown => PageDown,
        ArrowUp => ArrowUp, ArrowDown => ArrowDown, ArrowLeft => ArrowLeft, ArrowRight => ArrowRight,

        ShiftLeft | ShiftRight => Shift,
        ControlLeft | ControlRight => Control,
        AltLeft | AltRight => Alt,
        SuperLeft | SuperRight => Meta,

        KeyA => A, KeyB => B, KeyC => C, KeyD => D, KeyE => E, KeyF => F, KeyG => G,
        KeyH => H, KeyI => I, KeyJ => J, KeyK => K, KeyL => L, KeyM => M, KeyN => N,
        KeyO => O, KeyP => P, KeyQ => Q, KeyR => R, KeyS => S, KeyT => T, KeyU => U,
        KeyV => V, KeyW => W, KeyX => X, KeyY => Y, KeyZ => Z,

        Digit0 => Digit0, Digit1 => Digit1, Digit2 => Digit2, Digit3 => Digit3, Digit4 => Digit4,
        Digit5 => Digit5, Digit6 => Digit6, Digit7 => Digit7, Digit8 => Digit8, Digit9 => Digit9,

        F1 => F1, F2 => F2, F3 => F3, F4 => F4, F5 => F5, F6 => F6,
        F7 => F7, F8 => F8, F9 => F9, F10 => F10, F11 => F11, F12 => F12,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_enters_and_alts_map_for_fullscreen_toggle() {
        assert_eq!(map_key_code(KeyCode::Enter), Key::Enter);
        assert_eq!(map_key_code(KeyCode::NumpadEnter), Key::Enter);
        assert_eq!(map_key_code(KeyCode::AltRight), Key::Alt);
        assert_eq!(map_key_code(KeyCode::AltLeft), Key::Alt);
    }

    #[test]
    fn unnamed_keys_keep_their_code() {
        assert_eq!(map_key_code(KeyCode::CapsLock), Key::Other(KeyCode::CapsLock as u32));
    }

    #[test]
    fn maps_modifier_state() {
        let m = map_modifiers(ModifiersState::ALT | ModifiersState::SHIFT);
        assert!(m.alt && m.shift);
        assert!(!m.ctrl && !m.meta);
    }

    #[test]
    fn ime_disable_closes_composition() {
        assert_eq!(
            ime_event(&Ime::Disabled),
            Some(InputEvent::Preedit(TextEvent { text: String::new() }))
        );
        assert_eq!(ime_event(&Ime::Enabled), None);
        assert_eq!(ime_event(&Ime::Commit(String::new())), None);
        assert_eq!(
            ime_event(&Ime::Commit("你".into())),
            Some(InputEvent::Text(TextEvent { text: "你".into() }))
        );
    }
}
