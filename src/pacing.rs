use std::time::{Duration, Instant};

/// Late frames dropped in a row before one is shown anyway.
pub const MAX_CONSECUTIVE_DROPS: u32 = 5;

/// What to do with a freshly decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// Show it after waiting this long.
    Present(Duration),
    /// It is more than one frame interval late.
    Drop,
}

/// Maps media timestamps onto wall-clock deadlines.
#[derive(Debug, Clone)]
pub struct FrameClock {
    anchor_instant: Instant,
    anchor_timestamp: Duration,
    interval: Duration,
    consecutive_drops: u32,
}

impl FrameClock {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            anchor_instant: now,
            anchor_timestamp: Duration::ZERO,
            interval,
            consecutive_drops: 0,
        }
    }

    /// Pins `timestamp` to `now`; called on resume and after seeks.
    pub fn reanchor(&mut self, timestamp: Duration, now: Instant) {
        self.anchor_instant = now;
        self.anchor_timestamp = timestamp;
        self.consecutive_drops = 0;
    }

    pub fn deadline(&self, timestamp: Duration) -> Instant {
        self.anchor_instant + timestamp.saturating_sub(self.anchor_timestamp)
    }

    pub fn pace(&mut self, timestamp: Duration, now: Instant) -> Pace {
        let deadline = self.deadline(timestamp);

        if now > deadline + self.interval {
            if self.consecutive_drops < MAX_CONSECUTIVE_DROPS {
                self.consecutive_drops += 1;
                return Pace::Drop;
            }
            // Decoding cannot keep up; show this one and restart the schedule from it.
            self.reanchor(timestamp, now);
            return Pace::Present(Duration::ZERO);
        }

        self.consecutive_drops = 0;
        Pace::Present(deadline.saturating_duration_since(now))
    }
}

/// Reports whole-second boundaries crossed by the playback position.
#[derive(Debug, Clone, Default)]
pub struct SecondTracker {
    current: u64,
}

impl SecondTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the new second when `timestamp` moves past the last reported one.
    pub fn advance(&mut self, timestamp: Duration) -> Option<u64> {
        let second = timestamp.as_secs();
        if second > self.current {
            self.current = second;
            Some(second)
        } else {
            None
        }
    }

    /// Jumps without reporting, e.g. after a seek.
    pub fn reset(&mut self, timestamp: Duration) {
        self.current = timestamp.as_secs();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_millis(40);

    fn ts(frame: u64) -> Duration {
        FRAME * frame as u32
    }

    #[test]
    fn on_time_frames_wait_for_their_deadline() {
        let start = Instant::now();
        let mut clock = FrameClock::new(FRAME, start);

        assert_eq!(clock.pace(ts(0), start), Pace::Present(Duration::ZERO));
        assert_eq!(clock.pace(ts(1), start), Pace::Present(FRAME));
        assert_eq!(
            clock.pace(ts(3), start + Duration::from_millis(100)),
            Pace::Present(Duration::from_millis(20))
        );
    }

    #[test]
    fn slightly_late_frames_are_still_shown() {
        let start = Instant::now();
        let mut clock = FrameClock::new(FRAME, start);
        let now = start + ts(2) + Duration::from_millis(30);
        assert_eq!(clock.pace(ts(2), now), Pace::Present(Duration::ZERO));
    }

    #[test]
    fn frames_later_than_one_interval_are_dropped() {
        let start = Instant::now();
        let mut clock = FrameClock::new(FRAME, start);
        let now = start + Duration::from_secs(1);
        assert_eq!(clock.pace(ts(1), now), Pace::Drop);
        assert_eq!(clock.pace(ts(2), now), Pace::Drop);
        // Catching up resets the drop streak.
        assert_eq!(clock.pace(ts(25), now), Pace::Present(Duration::ZERO));
        assert_eq!(clock.pace(ts(3), now), Pace::Drop);
    }

    #[test]
    fn persistent_lag_still_shows_a_frame_every_few_drops() {
        let start = Instant::now();
        let mut clock = FrameClock::new(FRAME, start);
        let now = start + Duration::from_secs(10);

        for n in 0..MAX_CONSECUTIVE_DROPS {
            assert_eq!(clock.pace(ts(n as u64), now), Pace::Drop);
        }
        let shown = ts(MAX_CONSECUTIVE_DROPS as u64);
        assert_eq!(clock.pace(shown, now), Pace::Present(Duration::ZERO));
        // Re-anchored: the following frame is one interval out.
        assert_eq!(clock.pace(shown + FRAME, now), Pace::Present(FRAME));
    }

    #[test]
    fn reanchor_moves_the_schedule() {
        let start = Instant::now();
        let mut clock = FrameClock::new(FRAME, start);
        let later = start + Duration::from_secs(5);
        clock.reanchor(ts(100), later);
        assert_eq!(clock.deadline(ts(101)), later + FRAME);
        assert_eq!(clock.deadline(ts(50)), later);
    }

    #[test]
    fn ten_second_clip_crosses_nine_boundaries() {
        let mut tracker = SecondTracker::new();
        let reported: Vec<u64> = (0..300u64)
            .filter_map(|n| tracker.advance(Duration::from_secs_f64(n as f64 / 30.0)))
            .collect();
        assert_eq!(reported, (1..=9).collect::<Vec<_>>());
    }

    #[test]
    fn each_boundary_is_reported_once() {
        let mut tracker = SecondTracker::new();
        assert_eq!(tracker.advance(Duration::from_millis(1000)), Some(1));
        assert_eq!(tracker.advance(Duration::from_millis(1000)), None);
        assert_eq!(tracker.advance(Duration::from_millis(1500)), None);
        assert_eq!(tracker.advance(Duration::from_millis(3200)), Some(3));
    }

    #[test]
    fn reset_is_silent() {
        let mut tracker = SecondTracker::new();
        tracker.reset(Duration::from_secs(7));
        assert_eq!(tracker.advance(Duration::from_millis(7900)), None);
        assert_eq!(tracker.advance(Duration::from_secs(8)), Some(8));

        tracker.reset(Duration::from_secs(2));
        assert_eq!(tracker.advance(Duration::from_secs(3)), Some(3));
    }
}
