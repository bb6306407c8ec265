use gpui::{div, prelude::*, App, Application, Context, Entity, Render, Window, WindowOptions};
use gpui_video_label::{VideoOptions, VideoView};
use std::path::PathBuf;

struct PlayerExample {
    video: Entity<VideoView>,
}

impl Render for PlayerExample {
    fn render(&mut self, _window: &mut Window, _cx: &mut Context<Self>) -> impl IntoElement {
        div().size_full().child(self.video.clone())
    }
}

fn main() {
    env_logger::init();
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/sample.mp4"));

    Application::new().run(move |cx: &mut App| {
        cx.open_window(
            WindowOptions {
                focus: true,
                ..Default::default()
            },
            |_, cx| {
                let options = VideoOptions {
                    autoplay: Some(true),
                    ..VideoOptions::default()
                };
                let video = cx.new(|cx| VideoView::new(options, cx));
                video.update(cx, |view, _| {
                    if let Err(e) = view.player().load_file(&path) {
                        log::error!("Cannot load {}: {}", path.display(), e);
                    }
                });
                cx.new(|_| PlayerExample { video })
            },
        )
        .unwrap();
        cx.activate(true);
    });
}
