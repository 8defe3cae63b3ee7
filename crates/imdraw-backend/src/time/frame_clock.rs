use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous tick, in seconds. Never zero.
    pub dt: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Monotonic clock producing one [`FrameTime`] per frame.
///
/// The GUI library divides by the delta, so it is clamped to a positive
/// minimum. A maximum is optional: without one, a stall is reported in full.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Option<Duration>,
}

impl FrameClock {
    /// Clock with a 100µs minimum and no maximum.
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), None)
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Option<Duration>) -> Self {
        let dt_min = dt_min.max(Duration::from_nanos(1));
        debug_assert!(dt_max.is_none_or(|max| dt_min <= max));
        Self {
            last: Instant::now(),
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Resets the baseline, e.g. after the device was recovered.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let mut dt = now.saturating_duration_since(self.last).max(self.dt_min);
        if let Some(max) = self.dt_max {
            dt = dt.min(max);
        }
        self.last = now;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
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
