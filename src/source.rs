use crate::{Error, Frame, Metadata, VideoInfo};
use std::time::Duration;

/// Something the playback worker can pull frames from.
///
/// Sources are opened on the playback worker and never leave it, so they need not be `Send`.
pub trait FrameSource {
    fn info(&self) -> VideoInfo;

    fn metadata(&self) -> Metadata {
        Metadata::new()
    }

    /// Decodes the next frame in presentation order. `Ok(None)` marks end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>, Error>;

    /// Repositions to the first frame at or after `target` and returns it.
    ///
    /// A target past the last frame yields the last frame of the stream.
    fn seek(&mut self, target: Duration) -> Result<Option<Frame>, Error>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn info(&self) -> VideoInfo {
        (**self).info()
    }

    fn metadata(&self) -> Metadata {
        (**self).metadata()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Error> {
        (**self).next_frame()
    }

    fn seek(&mut self, target: Duration) -> Result<Option<Frame>, Error> {
        (**self).seek(target)
    }
}

#[cfg(test)]
pub(crate) mod synthetic {
    //! In-memory source used by the player tests.

    use super::*;

    pub struct SyntheticSource {
        info: VideoInfo,
        total: u64,
        next: u64,
        fail_at: Option<u64>,
        decode_delay: Duration,
    }

    impl SyntheticSource {
        pub fn new(framerate: f64, seconds: f64) -> Self {
            let total = (framerate * seconds).round() as u64;
            Self {
                info: VideoInfo {
                    framerate,
                    frame_size: (8, 4),
                    duration: Duration::from_secs_f64(seconds),
                },
                total,
                next: 0,
                fail_at: None,
                decode_delay: Duration::ZERO,
            }
        }

        pub fn failing_at(mut self, frame: u64) -> Self {
            self.fail_at = Some(frame);
            self
        }

        pub fn with_decode_delay(mut self, delay: Duration) -> Self {
            self.decode_delay = delay;
            self
        }

        fn frame(&self, number: u64) -> Frame {
            let (w, h) = self.info.frame_size;
            let shade = (number % 256) as u8;
            Frame::new(
                vec![shade; (w * h * 4) as usize],
                w,
                h,
                Duration::from_secs_f64(number as f64 / self.info.framerate),
                number,
            )
        }
    }

    impl FrameSource for SyntheticSource {
        fn info(&self) -> VideoInfo {
            self.info
        }

        fn metadata(&self) -> Metadata {
            Metadata::from([("title".to_string(), "synthetic".to_string())])
        }

        fn next_frame(&mut self) -> Result<Option<Frame>, Error> {
            if self.fail_at == Some(self.next) {
                return Err(Error::Decode(format!("corrupt packet at frame {}", self.next)));
            }
            if self.next >= self.total {
                return Ok(None);
            }
            if !self.decode_delay.is_zero() {
                std::thread::sleep(self.decode_delay);
            }
            let frame = self.frame(self.next);
            self.next += 1;
            Ok(Some(frame))
        }

        fn seek(&mut self, target: Duration) -> Result<Option<Frame>, Error> {
            if self.total == 0 {
                return Ok(None);
            }
            let wanted = (target.as_secs_f64() * self.info.framerate - 1e-9).ceil().max(0.0) as u64;
            let number = wanted.min(self.total - 1);
            self.next = number + 1;
            Ok(Some(self.frame(number)))
        }
    }
}
