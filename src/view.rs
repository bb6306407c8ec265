use crate::element::video;
use crate::present::{DisplayMode, Presenter, Resampling};
use crate::{Error, Player, VideoEvent, VideoOptions};
use gpui::{AsyncApp, Context, EventEmitter, IntoElement, Render, Task, WeakEntity, Window};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(8);

/// A label-like gpui view that plays video.
///
/// Player notifications are re-emitted as [`VideoEvent`]s; subscribe with
/// `cx.subscribe(&view, ...)`. Only one view should drive a given [`Player`],
/// since views consume the player's event queue.
pub struct VideoView {
    player: Player,
    presenter: Arc<Mutex<Presenter>>,
    _event_pump: Task<()>,
}

impl EventEmitter<VideoEvent> for VideoView {}

impl VideoView {
    pub fn new(options: VideoOptions, cx: &mut Context<Self>) -> Self {
        let presenter = Presenter::new(
            options.display_mode.unwrap_or_default(),
            options.resampling.unwrap_or_default(),
        );
        Self::with_player(Player::new(options), presenter, cx)
    }

    pub fn with_player(player: Player, presenter: Presenter, cx: &mut Context<Self>) -> Self {
        let events = player.events();
        let event_pump = cx.spawn(async move |this: WeakEntity<Self>, cx: &mut AsyncApp| {
            loop {
                cx.background_executor().timer(EVENT_POLL_INTERVAL).await;

                let pending: Vec<VideoEvent> = events.try_iter().collect();
                if pending.is_empty() {
                    if this.upgrade().is_none() {
                        break;
                    }
                    continue;
                }

                if this
                    .update(cx, |view, cx| view.dispatch(pending, cx))
                    .is_err()
                {
                    break;
                }
            }
        });

        Self {
            player,
            presenter: Arc::new(Mutex::new(presenter)),
            _event_pump: event_pump,
        }
    }

    fn dispatch(&mut self, events: Vec<VideoEvent>, cx: &mut Context<Self>) {
        let repaint = events.iter().any(changes_picture);
        for event in events {
            if let VideoEvent::LoadFailed(e) | VideoEvent::Failed(e) = &event {
                log::warn!("Video playback error: {}", e);
            }
            cx.emit(event);
        }
        if repaint {
            cx.notify();
        }
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn load(&mut self, uri: &url::Url, cx: &mut Context<Self>) -> Result<(), Error> {
        self.player.load(uri)?;
        cx.notify();
        Ok(())
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.presenter.lock().mode()
    }

    pub fn set_display_mode(&mut self, mode: DisplayMode, cx: &mut Context<Self>) {
        self.presenter.lock().set_mode(mode);
        cx.notify();
    }

    /// Paints at exactly `width`x`height`, ignoring the frame's aspect ratio.
    pub fn set_size(&mut self, width: u32, height: u32, cx: &mut Context<Self>) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidSize { width, height });
        }
        self.set_display_mode(DisplayMode::Fixed { width, height }, cx);
        Ok(())
    }

    /// Follows the element bounds when `scaled`, otherwise paints at the source resolution.
    pub fn set_scaled(&mut self, scaled: bool, keep_aspect: bool, cx: &mut Context<Self>) {
        let mode = if scaled {
            DisplayMode::Scaled { keep_aspect }
        } else {
            DisplayMode::Native
        };
        self.set_display_mode(mode, cx);
    }

    /// Only affects scaled mode; fixed sizes always ignore the aspect ratio.
    pub fn keep_aspect(&mut self, keep_aspect: bool, cx: &mut Context<Self>) {
        let mut presenter = self.presenter.lock();
        if let DisplayMode::Scaled { .. } = presenter.mode() {
            presenter.set_mode(DisplayMode::Scaled { keep_aspect });
        }
        drop(presenter);
        cx.notify();
    }

    pub fn resampling(&self) -> Resampling {
        self.presenter.lock().resampling()
    }

    pub fn set_resampling(&mut self, resampling: Resampling, cx: &mut Context<Self>) {
        self.presenter.lock().set_resampling(resampling);
        cx.notify();
    }
}

/// Whether `event` can change what the view paints.
fn changes_picture(event: &VideoEvent) -> bool {
    match event {
        VideoEvent::FrameGenerated { .. }
        | VideoEvent::Loaded(_)
        | VideoEvent::Ended
        | VideoEvent::LoadFailed(_)
        | VideoEvent::Failed(_) => true,
        VideoEvent::DurationKnown(_) | VideoEvent::SecondChanged(_) => false,
    }
}

impl Render for VideoView {
    fn render(&mut self, _window: &mut Window, _cx: &mut Context<Self>) -> impl IntoElement {
        video(self.player.clone(), Arc::clone(&self.presenter))
    }
}
