use std::time::{Duration, Instant};

/// Wall time between consecutive frames.
#[derive(Debug, Default, Clone)]
pub struct FrameClock {
    last: Option<Instant>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delta(&mut self) -> Duration {
        self.delta_at(Instant::now())
    }

    /// Time since the previous call. Zero on the first call, and zero if
    /// `now` is earlier than a time already seen.
    pub fn delta_at(&mut self, now: Instant) -> Duration {
        let dt = self
            .last
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        self.last = Some(self.last.map_or(now, |last| last.max(now)));
        dt
    }
}
