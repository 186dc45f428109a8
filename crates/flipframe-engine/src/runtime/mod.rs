//! Frame loop and process runner.
//!
//! `Runtime::run` wires a `WindowHost`, a `PresentationSurface` and an `App`
//! together, either on the main thread or with a dedicated render thread.

mod config;
mod frame_loop;
mod handlers;
mod runner;
mod shared;

pub use config::{LoopMode, RuntimeConfig};
pub use frame_loop::{FrameLoop, FrameOutcome, MessageSource, RemotePump};
pub use handlers::{IME_GUARD, INPUT_CAPTURE, InputCapture, LOOP_HANDLER, LoopHandler, default_chain};
pub use runner::Runtime;
pub use shared::LoopShared;
