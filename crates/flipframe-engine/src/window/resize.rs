use std::sync::{Mutex, TryLockError};

use crate::device::clamp_extent;

#[derive(Debug, Default)]
struct ResizeRequest {
    width: u32,
    height: u32,
    dirty: bool,
}

/// Coalescing resize record shared by the message side and the render side.
///
/// At most one request is stored; a newer request overwrites an older
/// unconsumed one.
#[derive(Debug, Default)]
pub struct PendingResize {
    inner: Mutex<ResizeRequest>,
}

impl PendingResize {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a client size. Blocks briefly if the render side holds the lock.
    pub fn request(&self, width: u32, height: u32) {
        let mut req = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        req.width = width;
        req.height = height;
        req.dirty = true;
    }

    /// Takes the pending size, clamped to at least 1x1.
    ///
    /// Never blocks: returns `None` when nothing is pending or the lock is contended.
    pub fn try_take(&self) -> Option<(u32, u32)> {
        let mut req = match self.inner.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return None,
        };
        if !req.dirty {
            return None;
        }
        req.dirty = false;
        Some(clamp_extent(req.width, req.height))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn nothing_pending_by_default() {
        assert_eq!(PendingResize::new().try_take(), None);
    }

    #[test]
    fn latest_request_wins() {
        let pending = PendingResize::new();
        pending.request(800, 600);
        pending.request(1024, 768);

        assert_eq!(pending.try_take(), Some((1024, 768)));
        assert_eq!(pending.try_take(), None);
    }

    #[test]
    fn zero_extent_is_clamped() {
        let pending = PendingResize::new();
        pending.request(0, 0);
        assert_eq!(pending.try_take(), Some((1, 1)));
    }

    #[test]
    fn contended_lock_skips() {
        let pending = PendingResize::new();
        pending.request(640, 480);

        let guard = pending.inner.lock().unwrap();
        assert_eq!(pending.try_take(), None);
        drop(guard);

        assert_eq!(pending.try_take(), Some((640, 480)));
    }

    proptest! {
        #[test]
        fn only_last_of_many_requests_is_taken(sizes in prop::collection::vec((0u32..4096, 0u32..4096), 1..32)) {
            let pending = PendingResize::new();
            for (w, h) in &sizes {
                pending.request(*w, *h);
            }
            let (w, h) = *sizes.last().unwrap();
            prop_assert_eq!(pending.try_take(), Some((w.max(1), h.max(1))));
            prop_assert_eq!(pending.try_take(), None);
        }
    }
}
