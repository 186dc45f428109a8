use std::collections::VecDeque;
use std::sync::Mutex;

use super::types::InputEvent;

/// Default number of events held before the oldest is dropped.
pub const INPUT_EXCHANGE_CAPACITY: usize = 64;

/// Bounded FIFO handing translated input from the message side to the render side.
#[derive(Debug)]
pub struct InputExchange {
    queue: Mutex<VecDeque<InputEvent>>,
    capacity: usize,
}

impl InputExchange {
    pub fn new() -> Self {
        Self::with_capacity(INPUT_EXCHANGE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Appends `event`, dropping the oldest queued event when full.
    pub fn push(&self, event: InputEvent) {
        let mut queue = match self.queue.lock() {
            Ok(q) => q,
            Err(poisoned) => poisoned.into_inner(),
        };
        if queue.len() == self.capacity {
            queue.pop_front();
            log::trace!("input exchange full; dropped oldest event");
        }
        queue.push_back(event);
    }

    /// Removes and returns every queued event in arrival order.
    pub fn drain(&self) -> Vec<InputEvent> {
        let mut queue = match self.queue.lock() {
            Ok(q) => q,
            Err(poisoned) => poisoned.into_inner(),
        };
        queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InputExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::PointerMoveEvent;

    fn moved(x: f32) -> InputEvent {
        InputEvent::PointerMoved(PointerMoveEvent { x, y: 0.0 })
    }

    #[test]
    fn drains_in_arrival_order() {
        let ex = InputExchange::new();
        ex.push(moved(1.0));
        ex.push(InputEvent::Focused(true));

        assert_eq!(ex.drain(), vec![moved(1.0), InputEvent::Focused(true)]);
        assert!(ex.is_empty());
    }

    #[test]
    fn full_queue_drops_oldest() {
        let ex = InputExchange::with_capacity(3);
        for i in 0..5 {
            ex.push(moved(i as f32));
        }

        assert_eq!(ex.drain(), vec![moved(2.0), moved(3.0), moved(4.0)]);
    }

    #[test]
    fn default_capacity_is_64() {
        let ex = InputExchange::new();
        for i in 0..100 {
            ex.push(moved(i as f32));
        }
        let events = ex.drain();
        assert_eq!(events.len(), INPUT_EXCHANGE_CAPACITY);
        assert_eq!(events[0], moved(36.0));
    }
}
