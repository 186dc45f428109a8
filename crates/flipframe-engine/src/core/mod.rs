//! Core engine-facing contracts.
//!
//! This module defines the stable interface between the frame loop and higher
//! layers (UI, demo). It avoids leaking runtime internals into user code and
//! provides a consistent per-frame context.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub(crate) use ctx::Command;
pub use ctx::{FrameCtx, ImeCtx, RuntimeCtx};
