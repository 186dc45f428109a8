//! Frame timing.
//!
//! The frame loop owns one `FrameClock` and ticks it once per iteration; the
//! resulting `FrameTime` is handed to the application through `FrameCtx`.

mod frame_clock;

pub use frame_clock::{AVERAGE_WINDOW, FrameClock, FrameTime};
