use std::collections::HashSet;
use std::hash::Hash;

use super::frame::InputFrame;
use super::types::{InputEvent, Key, KeyEvent, Modifiers, MouseButton, PointerButtonEvent, PointerMoveEvent};

/// Input state carried across frames for one window.
///
/// `apply_event` updates the held sets and records transitions into the
/// frame's `InputFrame`.
#[derive(Debug, Default)]
pub struct InputState {
    pub modifiers: Modifiers,
    pub focused: bool,
    /// Logical pixels; `None` while the pointer is outside the window.
    pub pointer_pos: Option<(f32, f32)>,
    pub keys_down: HashSet<Key>,
    pub buttons_down: HashSet<MouseButton>,
}

impl InputState {
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match &ev {
            InputEvent::ModifiersChanged(m) => self.modifiers = *m,

            InputEvent::Focused(focused) => {
                self.focused = *focused;
                if !focused {
                    // releases that happen while unfocused never arrive
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }

            InputEvent::PointerMoved(PointerMoveEvent { x, y }) => self.pointer_pos = Some((*x, *y)),
            InputEvent::PointerLeft => self.pointer_pos = None,

            InputEvent::Key(KeyEvent {
                key, state, modifiers, ..
            }) => {
                self.modifiers = *modifiers;
                track(
                    &mut self.keys_down,
                    &mut frame.keys_pressed,
                    &mut frame.keys_released,
                    *key,
                    state.is_pressed(),
                );
            }

            InputEvent::PointerButton(PointerButtonEvent {
                button,
                state,
                x,
                y,
                modifiers,
            }) => {
                self.pointer_pos = Some((*x, *y));
                self.modifiers = *modifiers;
                track(
                    &mut self.buttons_down,
                    &mut frame.buttons_pressed,
                    &mut frame.buttons_released,
                    *button,
                    state.is_pressed(),
                );
            }

            InputEvent::MouseWheel { modifiers, .. } => self.modifiers = *modifiers,

            InputEvent::Text(t) => frame.text.push(t.clone()),
            InputEvent::Preedit(t) => frame.preedit = Some(t.text.clone()),
        }

        frame.push_event(ev);
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn button_down(&self, btn: MouseButton) -> bool {
        self.buttons_down.contains(&btn)
    }
}

/// Records an edge only when the held set actually changes, so key repeat
/// does not produce extra presses.
fn track<T: Copy + Eq + Hash>(
    down: &mut HashSet<T>,
    pressed: &mut HashSet<T>,
    released: &mut HashSet<T>,
    item: T,
    is_pressed: bool,
) {
    if is_pressed {
        if down.insert(item) {
            pressed.insert(item);
        }
    } else if down.remove(&item) {
        released.insert(item);
    }
}
