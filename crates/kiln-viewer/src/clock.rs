use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,

    /// Seconds of accumulated (clamped) frame time since the clock started.
    pub elapsed: f32,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Per-window frame clock.
///
/// Delta time is clamped so a stall (debugger, minimized window) does not jump
/// the animation.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    elapsed: f32,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            elapsed: 0.0,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        self.advance(now.saturating_duration_since(self.last), now)
    }

    fn advance(&mut self, raw: Duration, now: Instant) -> FrameTime {
        let dt = raw.clamp(self.dt_min, self.dt_max).as_secs_f32();
        self.last = now;
        self.elapsed += dt;

        let ft = FrameTime {
            dt,
            elapsed: self.elapsed,
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
