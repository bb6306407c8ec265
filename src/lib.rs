//! A video label widget for [gpui](https://github.com/zed-industries/zed/tree/main/crates/gpui)
//! applications, built on top of FFmpeg.
//!
//! Frames are decoded on a dedicated worker thread and handed to the UI through a
//! single last-write-wins slot, so a slow UI never makes the decoder queue frames.
//! With `consistent_frame_rate` enabled the worker paces frames to the source frame
//! rate and drops the ones that arrive late.
//!
//! # Prerequisites
//!
//! FFmpeg 4.0+ libraries must be installed on your system:
//! - **macOS**: `brew install ffmpeg`
//! - **Ubuntu/Debian**: `apt-get install libavcodec-dev libavformat-dev libavutil-dev libswscale-dev`
//! - **Windows**: Download FFmpeg shared libraries from [ffmpeg.org](https://ffmpeg.org/download.html)
//!
//! # Example
//!
//! ```no_run
//! use gpui::{App, Application, Entity, Context, Render, Window, WindowOptions, div, prelude::*};
//! use gpui_video_label::{VideoOptions, VideoView};
//!
//! struct Root {
//!     video: Entity<VideoView>,
//! }
//!
//! impl Render for Root {
//!     fn render(&mut self, _window: &mut Window, _cx: &mut Context<Self>) -> impl IntoElement {
//!         div().size_full().child(self.video.clone())
//!     }
//! }
//!
//! fn main() {
//!     Application::new().run(|cx: &mut App| {
//!         cx.open_window(WindowOptions::default(), |_, cx| {
//!             let video = cx.new(|cx| VideoView::new(VideoOptions::default(), cx));
//!             video.update(cx, |view, _| {
//!                 view.player().load_file("./video.mp4").ok();
//!                 view.player().play().ok();
//!             });
//!             cx.new(|_| Root { video })
//!         })
//!         .unwrap();
//!     });
//! }
//! ```
//!
//! # Playback control
//!
//! ```no_run
//! # use gpui_video_label::Player;
//! use std::time::Duration;
//!
//! let player = Player::default();
//! player.load_file("./video.mp4").ok();
//! player.play().ok();
//! player.pause().ok();
//! player.seek(Duration::from_secs(30)).ok(); // clamped to the duration
//! player.stop();                             // releases the decoder
//! ```

mod decoder;
mod element;
mod error;
mod event;
mod frame;
mod info;
mod pacing;
mod player;
mod present;
mod source;
mod state;
mod view;

pub use decoder::FfmpegSource;
pub use element::{video, VideoElement};
pub use error::Error;
pub use event::VideoEvent;
pub use frame::{nv12_to_bgra, Frame, FrameSlot};
pub use info::{Metadata, VideoInfo};
pub use pacing::{FrameClock, Pace, SecondTracker, MAX_CONSECUTIVE_DROPS};
pub use player::{Player, SourceOpener, VideoOptions};
pub use present::{layout, DisplayMode, Placement, PresentKey, Presented, Presenter, Resampling};
pub use source::FrameSource;
pub use state::PlayerState;
pub use view::VideoView;

// Re-export commonly used types
pub use url::Url;
