use std::collections::HashSet;

use super::types::{InputEvent, Key, MouseButton, TextEvent};

/// Input collected during one frame loop iteration.
///
/// `InputState` holds what is currently down; `InputFrame` holds what changed
/// since the previous iteration. The frame loop clears it before draining the
/// input exchange.
#[derive(Debug, Default)]
pub struct InputFrame {
    /// Events in arrival order.
    pub events: Vec<InputEvent>,

    pub keys_pressed: HashSet<Key>,
    pub keys_released: HashSet<Key>,

    pub buttons_pressed: HashSet<MouseButton>,
    pub buttons_released: HashSet<MouseButton>,

    /// Committed text, including input-method commits.
    pub text: Vec<TextEvent>,

    /// Latest composition string seen this frame. `Some("")` ends a composition.
    pub preedit: Option<String>,
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.events.clear();
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.buttons_pressed.clear();
        self.buttons_released.clear();
        self.text.clear();
        self.preedit = None;
    }

    pub fn push_event(&mut self, ev: InputEvent) {
        self.events.push(ev);
    }

    pub fn was_pressed(&self, key: Key) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
