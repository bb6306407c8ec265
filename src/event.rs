use crate::{Error, VideoInfo};
use std::sync::Arc;
use std::time::Duration;

/// Notifications raised by a [`Player`](crate::Player) and re-emitted by
/// [`VideoView`](crate::VideoView) through gpui's `EventEmitter`.
#[derive(Debug, Clone)]
pub enum VideoEvent {
    /// The source was opened and its stream properties are known.
    Loaded(VideoInfo),
    /// Sent right after `Loaded` when the container reports a duration.
    DurationKnown(Duration),
    /// Playback crossed into this whole second.
    SecondChanged(u64),
    FrameGenerated { number: u64, timestamp: Duration },
    /// End of stream. The decoder has been released.
    Ended,
    LoadFailed(Arc<Error>),
    /// Decoding failed during playback; playback has stopped.
    Failed(Arc<Error>),
}
