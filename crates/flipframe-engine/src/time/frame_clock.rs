use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Frames averaged for `FrameTime::average_dt`.
pub const AVERAGE_WINDOW: usize = 60;

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous frame tick, in seconds.
    pub dt: f32,

    /// Mean of the last `AVERAGE_WINDOW` deltas, in seconds.
    pub average_dt: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

impl FrameTime {
    /// Frames per second derived from the averaged delta.
    pub fn fps(&self) -> f32 {
        if self.average_dt > 0.0 { 1.0 / self.average_dt } else { 0.0 }
    }
}

/// Frame clock producing `FrameTime` snapshots.
///
/// One clock per frame loop. Delta time is clamped so that a debugger pause,
/// a minimized window or a device rebuild does not produce a huge step.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
    history: VecDeque<f32>,
    history_sum: f32,
}

impl FrameClock {
    /// Creates a new clock clamping deltas to 100 µs ..= 250 ms.
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Creates a clock with custom delta-time clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            frame_index: 0,
            dt_min,
            dt_max,
            history: VecDeque::with_capacity(AVERAGE_WINDOW),
            history_sum: 0.0,
        }
    }

    /// Resets the baseline so the next delta does not include a stall.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Advances the clock and returns a new `FrameTime`.
    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max)
            .as_secs_f32();
        self.last = now;

        if self.history.len() == AVERAGE_WINDOW {
            if let Some(oldest) = self.history.pop_front() {
                self.history_sum -= oldest;
            }
        }
        self.history.push_back(dt);
        self.history_sum += dt;

        let ft = FrameTime {
            dt,
            average_dt: self.history_sum / self.history.len() as f32,
            now,
            frame_index: self.frame_index,
        };

        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_index_counts_from_zero() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick().frame_index, 0);
        assert_eq!(clock.tick().frame_index, 1);
    }

    #[test]
    fn deltas_are_clamped() {
        let mut clock = FrameClock::with_clamps(Duration::from_millis(1), Duration::from_millis(50));
        let start = clock.last;

        let short = clock.tick_at(start);
        assert!((short.dt - 0.001).abs() < 1e-6);

        let long = clock.tick_at(start + Duration::from_secs(5));
        assert!((long.dt - 0.05).abs() < 1e-6);
    }

    #[test]
    fn average_tracks_recent_frames() {
        let mut clock = FrameClock::new();
        let mut t = clock.last;
        let mut last = None;
        for _ in 0..AVERAGE_WINDOW * 2 {
            t += Duration::from_millis(10);
            last = Some(clock.tick_at(t));
        }
        let ft = last.unwrap();
        assert!((ft.average_dt - 0.010).abs() < 1e-4);
        assert!((ft.fps() - 100.0).abs() < 1.0);
    }
}
