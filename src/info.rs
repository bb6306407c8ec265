use std::collections::BTreeMap;
use std::time::Duration;

/// Container tags such as `title` or `encoder`.
pub type Metadata = BTreeMap<String, String>;

/// Stream properties, fixed once a source has been opened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub framerate: f64,
    /// `(width, height)` of decoded frames.
    pub frame_size: (u32, u32),
    /// `Duration::ZERO` when the container does not report one.
    pub duration: Duration,
}

impl VideoInfo {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.framerate)
    }

    pub fn frame_number_at(&self, timestamp: Duration) -> u64 {
        (timestamp.as_secs_f64() * self.framerate + 1e-9).floor() as u64
    }

    /// Clamps a seek target into `[0, duration]`. An unknown duration only bounds below.
    pub fn clamp(&self, target: Duration) -> Duration {
        if self.duration.is_zero() {
            target
        } else {
            target.min(self.duration)
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        let (w, h) = self.frame_size;
        if w == 0 || h == 0 {
            return 1.0;
        }
        w as f32 / h as f32
    }
}
