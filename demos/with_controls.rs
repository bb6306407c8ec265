use gpui::{
    div, prelude::*, rgb, App, Application, Context, Entity, Render, SharedString, Subscription,
    Window, WindowOptions,
};
use gpui_video_label::{VideoEvent, VideoOptions, VideoView};
use std::path::PathBuf;
use std::time::{Duration, Instant};

struct WithControlsExample {
    video: Entity<VideoView>,
    elapsed: u64,
    duration: Duration,
    status: SharedString,
    last_click: Option<Instant>,
    _subscription: Subscription,
}

impl WithControlsExample {
    fn new(video: Entity<VideoView>, cx: &mut Context<Self>) -> Self {
        let subscription = cx.subscribe(&video, |this, _video, event: &VideoEvent, cx| {
            match event {
                VideoEvent::Loaded(info) => {
                    this.status = format!(
                        "{}x{} @ {:.2} fps",
                        info.frame_size.0, info.frame_size.1, info.framerate
                    )
                    .into();
                }
                VideoEvent::DurationKnown(duration) => this.duration = *duration,
                VideoEvent::SecondChanged(second) => this.elapsed = *second,
                VideoEvent::Ended => this.status = "ended".into(),
                VideoEvent::LoadFailed(e) | VideoEvent::Failed(e) => {
                    this.status = format!("error: {e}").into()
                }
                VideoEvent::FrameGenerated { .. } => return,
            }
            cx.notify();
        });

        Self {
            video,
            elapsed: 0,
            duration: Duration::ZERO,
            status: "loading".into(),
            last_click: None,
            _subscription: subscription,
        }
    }

    fn click_allowed(&mut self) -> bool {
        let now = Instant::now();
        if let Some(prev) = self.last_click {
            if now.saturating_duration_since(prev) < Duration::from_millis(100) {
                return false;
            }
        }
        self.last_click = Some(now);
        true
    }

    fn seek_by(&mut self, forward: bool, cx: &mut Context<Self>) {
        if !self.click_allowed() {
            return;
        }
        let player = self.video.read(cx).player().clone();
        let position = player.position();
        let step = Duration::from_secs(5);
        let target = if forward {
            position.saturating_add(step)
        } else {
            position.saturating_sub(step)
        };
        self.elapsed = target.as_secs();
        if let Err(e) = player.seek(target) {
            log::warn!("Seek failed: {}", e);
        }
        cx.notify();
    }
}

fn button(id: &'static str, label: &'static str) -> gpui::Stateful<gpui::Div> {
    div()
        .id(id)
        .px_3()
        .py_1()
        .rounded_md()
        .bg(rgb(0x2a2a2a))
        .hover(|style| style.bg(rgb(0x3a3a3a)))
        .cursor_pointer()
        .text_color(rgb(0xe0e0e0))
        .child(label)
}

impl Render for WithControlsExample {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let is_paused = self.video.read(cx).player().is_paused();
        let play_label = if is_paused { "Play" } else { "Pause" };

        let back_5s = button("back-5s", "-5s").on_click(cx.listener(
            |this: &mut Self, _event, _window, cx| this.seek_by(false, cx),
        ));

        let play_pause = button("play-pause", play_label).on_click(cx.listener(
            |this: &mut Self, _event, _window, cx| {
                if !this.click_allowed() {
                    return;
                }
                if let Err(e) = this.video.read(cx).player().toggle_pause() {
                    log::warn!("Toggle failed: {}", e);
                }
                cx.notify();
            },
        ));

        let stop = button("stop", "Stop").on_click(cx.listener(
            |this: &mut Self, _event, _window, cx| {
                this.video.read(cx).player().stop();
                this.elapsed = 0;
                cx.notify();
            },
        ));

        let forward_5s = button("forward-5s", "+5s").on_click(cx.listener(
            |this: &mut Self, _event, _window, cx| this.seek_by(true, cx),
        ));

        let clock: SharedString = format!(
            "{}s / {}s  {}",
            self.elapsed,
            self.duration.as_secs(),
            self.status
        )
        .into();

        div()
            .size_full()
            .bg(rgb(0x151515))
            .flex()
            .flex_col()
            .child(div().flex_1().child(self.video.clone()))
            .child(
                div()
                    .flex()
                    .items_center()
                    .justify_center()
                    .gap_3()
                    .p_2()
                    .child(back_5s)
                    .child(play_pause)
                    .child(stop)
                    .child(forward_5s)
                    .child(div().text_color(rgb(0xa0a0a0)).child(clock)),
            )
    }
}

fn main() {
    env_logger::init();
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/sample.mp4"));

    Application::new().run(move |cx: &mut App| {
        let _ = cx.open_window(
            WindowOptions {
                focus: true,
                ..Default::default()
            },
            |_, cx| {
                let video = cx.new(|cx| VideoView::new(VideoOptions::default(), cx));
                video.update(cx, |view, cx| {
                    view.set_scaled(true, true, cx);
                    if let Err(e) = view.player().load_file(&path) {
                        log::error!("Cannot load {}: {}", path.display(), e);
                    }
                });
                cx.new(|cx| WithControlsExample::new(video, cx))
            },
        );
        cx.activate(true);
    });
}
