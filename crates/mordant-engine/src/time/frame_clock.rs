use std::time::{Duration, Instant};

/// Frame duration the simulations are tuned for (60 Hz).
pub const TARGET_FRAME_DURATION: Duration = Duration::from_nanos(16_666_667);

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Clamped time since the previous tick, in seconds.
    pub dt: f32,

    /// Wall time since the clock was created, in seconds.
    pub elapsed: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Number of ticks before this one.
    pub frame_index: u64,

    /// `elapsed` expressed in target frame durations.
    pub frame: f32,
}

impl FrameTime {
    /// Delta time in target frame durations (1.0 at exactly 60 Hz).
    #[inline]
    pub fn dt_frames(&self) -> f32 {
        self.dt / TARGET_FRAME_DURATION.as_secs_f32()
    }

    #[inline]
    pub fn dt_ms(&self) -> f32 {
        self.dt * 1000.0
    }

    #[inline]
    pub fn elapsed_ms(&self) -> f32 {
        self.elapsed * 1000.0
    }
}

/// Produces `FrameTime` snapshots.
///
/// Delta time is clamped: the lower bound keeps tight loops from producing a
/// zero dt, the upper bound keeps the simulations stable after the window was
/// hidden or the process was suspended.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(100))
    }

    /// Creates a clock with custom delta-time clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Resets the delta baseline without touching elapsed time or the frame index.
    ///
    /// Called after a device re-initialization so the first frame does not see
    /// the whole recovery as one delta.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Number of ticks so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Advances the clock and returns a new `FrameTime`.
    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    /// Advances the clock to `now`.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);

        self.last = now;

        let elapsed = now.saturating_duration_since(self.start).as_secs_f32();
        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            elapsed,
            now,
            frame_index: self.frame_index,
            frame: elapsed / TARGET_FRAME_DURATION.as_secs_f32(),
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
