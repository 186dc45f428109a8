//! Engine input to `egui::RawInput`.

use egui::{Event, ImeEvent, MouseWheelUnit, PointerButton, Pos2, Rect, Vec2, ViewportId};

use flipframe_engine::input::{
    InputEvent, InputFrame, InputState, Key, KeyEvent, Modifiers, MouseButton, MouseWheelDelta,
};

use crate::clipboard::Clipboard;

/// Per-frame values `RawInput` needs besides the events.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScreenInfo {
    /// Logical size in points.
    pub size: (f32, f32),
    pub pixels_per_point: f32,
    /// Seconds since the layer started.
    pub time: f64,
    pub predicted_dt: f32,
    pub max_texture_side: usize,
}

/// Stateful translator: tracks whether an input-method composition is open so
/// that the closing commit is delivered as `ImeEvent::Commit`.
#[derive(Debug, Default)]
pub struct InputTranslator {
    composing: bool,
}

impl InputTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the raw input for one egui pass from the frame's events.
    pub fn raw_input(
        &mut self,
        state: &InputState,
        frame: &InputFrame,
        screen: ScreenInfo,
        clipboard: &mut Clipboard,
    ) -> egui::RawInput {
        let mut raw = egui::RawInput {
            screen_rect: Some(Rect::from_min_size(Pos2::ZERO, Vec2::new(screen.size.0, screen.size.1))),
            max_texture_side: Some(screen.max_texture_side),
            time: Some(screen.time),
            predicted_dt: screen.predicted_dt,
            modifiers: map_modifiers(state.modifiers),
            focused: state.focused,
            ..Default::default()
        };
        raw.viewports
            .entry(ViewportId::ROOT)
            .or_default()
            .native_pixels_per_point = Some(screen.pixels_per_point);

        for ev in &frame.events {
            self.translate(ev, clipboard, &mut raw.events);
        }
        raw
    }

    fn translate(&mut self, ev: &InputEvent, clipboard: &mut Clipboard, out: &mut Vec<Event>) {
        match ev {
            InputEvent::ModifiersChanged(_) => {}

            InputEvent::Key(KeyEvent {
                key,
                state,
                modifiers,
                repeat,
                ..
            }) => {
                let pressed = state.is_pressed();
                let modifiers = map_modifiers(*modifiers);

                if pressed && modifiers.command {
                    match key {
                        Key::C => out.push(Event::Copy),
                        Key::X => out.push(Event::Cut),
                        Key::V => {
                            if let Some(text) = clipboard.get() {
                                out.push(Event::Paste(text));
                            }
                        }
                        _ => {}
                    }
                }

                if let Some(key) = map_key(*key) {
                    out.push(Event::Key {
                        key,
                        physical_key: None,
                        pressed,
                        repeat: *repeat,
                        modifiers,
                    });
                }
            }

            InputEvent::PointerMoved(p) => out.push(Event::PointerMoved(Pos2::new(p.x, p.y))),

            InputEvent::PointerButton(b) => {
                if let Some(button) = map_button(b.button) {
                    out.push(Event::PointerButton {
                        pos: Pos2::new(b.x, b.y),
                        button,
                        pressed: b.state.is_pressed(),
                        modifiers: map_modifiers(b.modifiers),
                    });
                }
            }

            InputEvent::MouseWheel { delta, modifiers } => {
                let (unit, delta) = match *delta {
                    MouseWheelDelta::Line { x, y } => (MouseWheelUnit::Line, Vec2::new(x, y)),
                    MouseWheelDelta::Pixel { x, y } => (MouseWheelUnit::Point, Vec2::new(x, y)),
                };
                out.push(Event::MouseWheel {
                    unit,
                    delta,
                    modifiers: map_modifiers(*modifiers),
                });
            }

            InputEvent::Text(t) => {
                if self.composing {
                    self.composing = false;
                    out.push(Event::Ime(ImeEvent::Commit(t.text.clone())));
                } else if t.text.chars().all(is_printable) && !t.text.is_empty() {
                    out.push(Event::Text(t.text.clone()));
                }
            }

            InputEvent::Preedit(t) => {
                if t.text.is_empty() {
                    if self.composing {
                        self.composing = false;
                        out.push(Event::Ime(ImeEvent::Preedit(String::new())));
                    }
                } else {
                    if !self.composing {
                        self.composing = true;
                        out.push(Event::Ime(ImeEvent::Enabled));
                    }
                    out.push(Event::Ime(ImeEvent::Preedit(t.text.clone())));
                }
            }

            InputEvent::PointerLeft => out.push(Event::PointerGone),

            InputEvent::Focused(focused) => out.push(Event::WindowFocused(*focused)),
        }
    }
}

/// Private-use and control characters never reach text fields.
fn is_printable(c: char) -> bool {
    let private_use = ('\u{e000}'..='\u{f8ff}').contains(&c)
        || ('\u{f0000}'..='\u{ffffd}').contains(&c)
        || ('\u{100000}'..='\u{10fffd}').contains(&c);
    !private_use && !c.is_ascii_control()
}

pub fn map_modifiers(m: Modifiers) -> egui::Modifiers {
    let mac = cfg!(target_os = "macos");
    egui::Modifiers {
        alt: m.alt,
        ctrl: m.ctrl,
        shift: m.shift,
        mac_cmd: mac && m.meta,
        command: if mac { m.meta } else { m.ctrl },
    }
}

fn map_button(b: MouseButton) -> Option<PointerButton> {
    Some(match b {
        MouseButton::Left => PointerButton::Primary,
        MouseButton::Right => PointerButton::Secondary,
        MouseButton::Middle => PointerButton::Middle,
        MouseButton::Back => PointerButton::Extra1,
        MouseButton::Forward => PointerButton::Extra2,
        MouseButton::Other(_) => return None,
    })
}

pub fn map_key(key: Key) -> Option<egui::Key> {
    use egui::Key as E;
    Some(match key {
        Key::Escape => E::Escape,
        Key::Enter => E::Enter,
        Key::Tab => E::Tab,
        Key::Backspace => E::Backspace,
        Key::Space => E::Space,
        Key::Insert => E::Insert,
        Key::Delete => E::Delete,
        Key::Home => E::Home,
        Key::End => E::End,
        Key::PageUp => E::PageUp,
        Key::PageDown => E::PageDown,
        Key::ArrowUp => E::ArrowUp,
        Key::ArrowDown => E::ArrowDown,
        Key::ArrowLeft => E::ArrowLeft,
        Key::ArrowRight => E::ArrowRight,

        Key::A => E::A,
        Key::B => E::B,
        Key::C => E::C,
        Key::D => E::D,
        Key::E => E::E,
        Key::F => E::F,
        Key::G => E::G,
        Key::H => E::H,
        Key::I => E::I,
        Key::J => E::J,
        Key::K => E::K,
        Key::L => E::L,
        Key::M => E::M,
        Key::N => E::N,
        Key::O => E::O,
        Key::P => E::P,
        Key::Q => E::Q,
        Key::R => E::R,
        Key::S => E::S,
        Key::T => E::T,
        Key::U => E::U,
        Key::V => E::V,
        Key::W => E::W,
        Key::X => E::X,
        Key::Y => E::Y,
        Key::Z => E::Z,

        Key::Digit0 => E::Num0,
        Key::Digit1 => E::Num1,
        Key::Digit2 => E::Num2,
        Key::Digit3 => E::Num3,
        Key::Digit4 => E::Num4,
        Key::Digit5 => E::Num5,
        Key::Digit6 => E::Num6,
        Key::Digit7 => E::Num7,
        Key::Digit8 => E::Num8,
        Key::Digit9 => E::Num9,

        Key::F1 => E::F1,
        Key::F2 => E::F2,
        Key::F3 => E::F3,
        Key::F4 => E::F4,
        Key::F5 => E::F5,
        Key::F6 => E::F6,
        Key::F7 => E::F7,
        Key::F8 => E::F8,
        Key::F9 => E::F9,
        Key::F10 => E::F10,
        Key::F11 => E::F11,
        Key::F12 => E::F12,

        // modifiers travel in `Modifiers`
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use flipframe_engine::input::{MouseButtonState, PointerButtonEvent, TextEvent};

    use super::*;

    fn screen() -> ScreenInfo {
        ScreenInfo {
            size: (640.0, 400.0),
            pixels_per_point: 2.0,
            time: 1.5,
            predicted_dt: 1.0 / 60.0,
            max_texture_side: 4096,
        }
    }

    fn run(events: Vec<InputEvent>) -> egui::RawInput {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        for ev in events {
            state.apply_event(&mut frame, ev);
        }
        InputTranslator::new().raw_input(&state, &frame, screen(), &mut Clipboard::detached())
    }

    #[test]
    fn screen_values_are_carried() {
        let raw = run(Vec::new());
        assert_eq!(raw.screen_rect, Some(Rect::from_min_size(Pos2::ZERO, Vec2::new(640.0, 400.0))));
        assert_eq!(raw.time, Some(1.5));
        assert_eq!(raw.max_texture_side, Some(4096));
        assert_eq!(
            raw.viewports.get(&ViewportId::ROOT).and_then(|v| v.native_pixels_per_point),
            Some(2.0)
        );
    }

    #[test]
    fn pointer_click_becomes_primary_button() {
        let raw = run(vec![InputEvent::PointerButton(PointerButtonEvent {
            button: MouseButton::Left,
            state: MouseButtonState::Pressed,
            x: 10.0,
            y: 20.0,
            modifiers: Modifiers::default(),
        })]);
        assert_eq!(
            raw.events,
            vec![Event::PointerButton {
                pos: Pos2::new(10.0, 20.0),
                button: PointerButton::Primary,
                pressed: true,
                modifiers: egui::Modifiers::default(),
            }]
        );
    }

    #[test]
    fn control_characters_are_not_text() {
        let raw = run(vec![
            InputEvent::Text(TextEvent { text: "\r".into() }),
            InputEvent::Text(TextEvent { text: "a".into() }),
        ]);
        assert_eq!(raw.events, vec![Event::Text("a".into())]);
    }

    #[test]
    fn composition_ends_with_commit() {
        let raw = run(vec![
            InputEvent::Preedit(TextEvent { text: "ni".into() }),
            InputEvent::Text(TextEvent { text: "你".into() }),
            InputEvent::Text(TextEvent { text: "!".into() }),
        ]);
        assert_eq!(
            raw.events,
            vec![
                Event::Ime(ImeEvent::Enabled),
                Event::Ime(ImeEvent::Preedit("ni".into())),
                Event::Ime(ImeEvent::Commit("你".into())),
                Event::Text("!".into()),
            ]
        );
    }

    #[test]
    fn modifier_keys_are_not_forwarded_as_keys() {
        assert_eq!(map_key(Key::Shift), None);
        assert_eq!(map_key(Key::Alt), None);
        assert_eq!(map_key(Key::Enter), Some(egui::Key::Enter));
    }

    #[test]
    fn command_maps_to_ctrl_off_mac() {
        let m = map_modifiers(Modifiers {
            ctrl: true,
            ..Modifiers::default()
        });
        assert_eq!(m.command, !cfg!(target_os = "macos"));
    }
}
