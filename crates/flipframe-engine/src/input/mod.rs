//! Input subsystem.
//!
//! Public API is platform-agnostic and does not expose winit types.
//! `platform::winit` translates window events into `InputEvent`s; the
//! `InputExchange` carries them from the message pump to the frame loop.

mod exchange;
mod frame;
mod state;
mod types;

pub mod platform;

pub use exchange::{INPUT_EXCHANGE_CAPACITY, InputExchange};
pub use frame::InputFrame;
pub use state::InputState;
pub use types::{
    InputEvent, Key, KeyEvent, KeyState, Modifiers, MouseButton, MouseButtonState, MouseWheelDelta,
    PointerButtonEvent, PointerMoveEvent, TextEvent,
};
