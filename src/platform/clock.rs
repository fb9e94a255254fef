/// Frame clock producing per-frame deltas.
///
/// Fed with a monotonic reading in seconds (time since start). The first tick
/// measures from the clock origin, zero.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last_frame: f64,
    frame_index: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock to `now` and returns the elapsed seconds.
    ///
    /// A reading earlier than the previous one yields zero.
    pub fn tick(&mut self, now: f64) -> f32 {
        let dt = (now - self.last_frame).max(0.0);
        self.last_frame = self.last_frame.max(now);
        self.frame_index = self.frame_index.wrapping_add(1);
        dt as f32
    }

    /// Timestamp of the most recent tick
    pub fn last_frame(&self) -> f64 {
        self.last_frame
    }

    /// Number of ticks so far
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }
}
