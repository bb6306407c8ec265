use crate::frame::nv12_to_bgra;
use crate::{Error, Frame, FrameSource, Metadata, VideoInfo};
use ffmpeg_next as ffmpeg;
use ffmpeg_next::format::{input, Pixel};
use ffmpeg_next::media::Type;
use ffmpeg_next::software::scaling::{context::Context as ScaleContext, flag::Flags};
use ffmpeg_next::util::frame::video::Video as FFmpegFrame;
use std::sync::Once;
use std::time::Duration;

const FALLBACK_FRAMERATE: f64 = 25.0;

/// Decoded frames whose timestamp is this close below a seek target still satisfy it.
const SEEK_TOLERANCE: Duration = Duration::from_millis(1);

pub(crate) fn init() -> Result<(), Error> {
    ffmpeg::init().map_err(|e| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("failed to initialize FFmpeg: {e}"),
        ))
    })?;

    static QUIET: Once = Once::new();
    QUIET.call_once(|| ffmpeg::util::log::set_level(ffmpeg::util::log::Level::Error));
    Ok(())
}

/// Turns a URL into something `avformat_open_input` understands.
pub(crate) fn resolve_location(uri: &url::Url) -> Result<String, Error> {
    if uri.scheme() == "file" {
        Ok(uri
            .to_file_path()
            .map_err(|_| Error::Uri)?
            .to_string_lossy()
            .into_owned())
    } else {
        Ok(uri.as_str().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    /// Even dimensions: NV12 from swscale, BGRA via `yuv`.
    Nv12,
    /// Odd dimensions cannot be packed as NV12 without padding.
    Bgra,
}

/// [`FrameSource`] backed by FFmpeg.
pub struct FfmpegSource {
    ictx: ffmpeg::format::context::Input,
    decoder: ffmpeg::decoder::Video,
    scaler: ScaleContext,
    output: Output,
    stream_index: usize,
    time_base: ffmpeg::Rational,
    info: VideoInfo,
    metadata: Metadata,
    eof_sent: bool,
}

impl FfmpegSource {
    pub fn open(uri: &url::Url) -> Result<Self, Error> {
        init()?;
        let path = resolve_location(uri)?;

        let ictx = input(&path).map_err(|e| {
            log::error!("Failed to open {}: {}", path, e);
            Error::Uri
        })?;

        let (stream_index, time_base, avg_frame_rate, stream_duration, params) = {
            let stream = ictx.streams().best(Type::Video).ok_or(Error::Caps)?;
            (
                stream.index(),
                stream.time_base(),
                stream.avg_frame_rate(),
                stream.duration(),
                stream.parameters(),
            )
        };

        let mut decoder = ffmpeg::codec::context::Context::from_parameters(params)
            .map_err(|_| Error::Caps)?
            .decoder()
            .video()
            .map_err(|_| Error::Cast)?;

        decoder.set_threading(ffmpeg::threading::Config {
            kind: ffmpeg::threading::Type::Frame,
            count: 0,
        });

        let width = decoder.width();
        let height = decoder.height();
        if width == 0 || height == 0 {
            return Err(Error::Caps);
        }

        let framerate = if avg_frame_rate.numerator() > 0 && avg_frame_rate.denominator() > 0 {
            avg_frame_rate.numerator() as f64 / avg_frame_rate.denominator() as f64
        } else {
            FALLBACK_FRAMERATE
        };

        if framerate.is_nan() || framerate.is_infinite() || framerate <= 0.0 {
            return Err(Error::Framerate(framerate));
        }

        let duration = if stream_duration > 0 && time_base.denominator() > 0 {
            Duration::from_secs_f64(
                stream_duration as f64 * time_base.numerator() as f64
                    / time_base.denominator() as f64,
            )
        } else if ictx.duration() > 0 {
            Duration::from_micros(ictx.duration() as u64)
        } else {
            Duration::ZERO
        };

        let output = if width % 2 == 0 && height % 2 == 0 {
            Output::Nv12
        } else {
            Output::Bgra
        };
        let target_format = match output {
            Output::Nv12 => Pixel::NV12,
            Output::Bgra => Pixel::BGRA,
        };

        let scaler = ScaleContext::get(
            decoder.format(),
            width,
            height,
            target_format,
            width,
            height,
            Flags::BILINEAR,
        )
        .map_err(|_| Error::Caps)?;

        let metadata = ictx
            .metadata()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        log::info!(
            "Opened {}: {}x{} @ {:.2}fps, {:.2}s",
            path,
            width,
            height,
            framerate,
            duration.as_secs_f64()
        );

        Ok(Self {
            ictx,
            decoder,
            scaler,
            output,
            stream_index,
            time_base,
            info: VideoInfo {
                framerate,
                frame_size: (width, height),
                duration,
            },
            metadata,
            eof_sent: false,
        })
    }

    fn next_packet(&mut self) -> Option<ffmpeg::Packet> {
        let index = self.stream_index;
        self.ictx
            .packets()
            .find_map(|(stream, packet)| (stream.index() == index).then_some(packet))
    }

    fn timestamp_of(&self, decoded: &FFmpegFrame) -> Duration {
        let pts = decoded.timestamp().or(decoded.pts()).unwrap_or(0);
        let secs = pts as f64 * self.time_base.numerator() as f64
            / self.time_base.denominator().max(1) as f64;
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// Pulls the next raw picture out of the decoder, feeding packets as needed.
    fn receive(&mut self) -> Result<Option<(FFmpegFrame, Duration)>, Error> {
        loop {
            let mut decoded = FFmpegFrame::empty();
            match self.decoder.receive_frame(&mut decoded) {
                Ok(()) => {
                    let timestamp = self.timestamp_of(&decoded);
                    return Ok(Some((decoded, timestamp)));
                }
                Err(ffmpeg::Error::Eof) => return Ok(None),
                Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => {}
                Err(e) => return Err(Error::Decode(e.to_string())),
            }

            if self.eof_sent {
                return Ok(None);
            }

            match self.next_packet() {
                Some(packet) => {
                    if let Err(e) = self.decoder.send_packet(&packet) {
                        log::warn!("Dropping corrupt video packet: {:?}", e);
                    }
                }
                None => {
                    self.decoder
                        .send_eof()
                        .map_err(|e| Error::Decode(e.to_string()))?;
                    self.eof_sent = true;
                }
            }
        }
    }

    fn convert(&mut self, decoded: &FFmpegFrame, timestamp: Duration) -> Result<Frame, Error> {
        let mut scaled = FFmpegFrame::empty();
        self.scaler
            .run(decoded, &mut scaled)
            .map_err(|e| Error::Decode(format!("scaling failed: {e}")))?;

        let width = scaled.width();
        let height = scaled.height();

        let pixels = match self.output {
            Output::Nv12 => {
                let y_plane = scaled.data(0);
                let uv_plane = scaled.data(1);
                let y_stride = scaled.stride(0);
                let uv_stride = scaled.stride(1);

                let mut data = Vec::with_capacity((width * height * 3 / 2) as usize);
                for row in 0..height as usize {
                    let start = row * y_stride;
                    data.extend_from_slice(&y_plane[start..start + width as usize]);
                }
                for row in 0..(height / 2) as usize {
                    let start = row * uv_stride;
                    data.extend_from_slice(&uv_plane[start..start + width as usize]);
                }

                nv12_to_bgra(&data, width, height)
                    .ok_or_else(|| Error::Decode("colour conversion failed".to_string()))?
            }
            Output::Bgra => {
                let plane = scaled.data(0);
                let stride = scaled.stride(0);
                let row_len = width as usize * 4;
                let mut data = Vec::with_capacity(row_len * height as usize);
                for row in 0..height as usize {
                    let start = row * stride;
                    data.extend_from_slice(&plane[start..start + row_len]);
                }
                data
            }
        };

        Ok(Frame::new(
            pixels,
            width,
            height,
            timestamp,
            self.info.frame_number_at(timestamp),
        ))
    }
}

impl FrameSource for FfmpegSource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn metadata(&self) -> Metadata {
        self.metadata.clone()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Error> {
        match self.receive()? {
            Some((decoded, timestamp)) => self.convert(&decoded, timestamp).map(Some),
            None => Ok(None),
        }
    }

    fn seek(&mut self, target: Duration) -> Result<Option<Frame>, Error> {
        let micros = target.as_micros().min(i64::MAX as u128) as i64;
        log::info!("Seeking to {:.3}s", target.as_secs_f64());

        // Lands on the keyframe at or before the target; decode forward from there.
        self.ictx
            .seek(micros, ..micros)
            .map_err(|e| Error::Decode(format!("seek failed: {e}")))?;
        self.decoder.flush();
        self.eof_sent = false;

        let mut last = None;
        while let Some((decoded, timestamp)) = self.receive()? {
            if timestamp + SEEK_TOLERANCE >= target {
                return self.convert(&decoded, timestamp).map(Some);
            }
            last = Some((decoded, timestamp));
        }

        match last {
            Some((decoded, timestamp)) => self.convert(&decoded, timestamp).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_urls_resolve_to_paths() {
        let uri = url::Url::parse("file:///tmp/clip.mp4").unwrap();
        assert_eq!(resolve_location(&uri).unwrap(), "/tmp/clip.mp4");
    }

    #[test]
    fn network_urls_pass_through() {
        let uri = url::Url::parse("https://example.com/clip.mp4").unwrap();
        assert_eq!(
            resolve_location(&uri).unwrap(),
            "https://example.com/clip.mp4"
        );
    }
}
