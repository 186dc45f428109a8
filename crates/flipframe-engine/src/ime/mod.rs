//! Input-method adapter.
//!
//! Per-window control of the platform's text composition (IME) state, plus a
//! message handler that keeps disabled windows disabled.

mod adapter;
#[cfg(windows)]
mod imm32;
mod winit;

pub use adapter::{BoxedImeBackend, ImeBackend, ImeGuard, InputMethodAdapter, SharedIme};
#[cfg(windows)]
pub use imm32::Imm32Backend;
pub use self::winit::WinitImeBackend;
