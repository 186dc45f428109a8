use std::sync::atomic::{AtomicBool, Ordering};

use crate::input::InputExchange;
use crate::window::PendingResize;

/// State shared between the message pump and the frame loop.
#[derive(Debug, Default)]
pub struct LoopShared {
    exit:       AtomicBool,
    pub resize: PendingResize,
    pub input:  InputExchange,
}

impl LoopShared {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_exit(&self) {
        self.exit.store(true, Ordering::Release);
    }

    pub fn exit_requested(&self) -> bool {
        self.exit.load(Ordering::Acquire)
    }
}
