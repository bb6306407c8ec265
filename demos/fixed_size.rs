use gpui::{
    div, prelude::*, rgb, App, Application, Context, Entity, Render, Window, WindowOptions,
};
use gpui_video_label::{DisplayMode, Resampling, VideoOptions, VideoView};
use std::path::PathBuf;

struct FixedSizeExample {
    letterboxed: Entity<VideoView>,
    stretched: Entity<VideoView>,
}

impl Render for FixedSizeExample {
    fn render(&mut self, _window: &mut Window, _cx: &mut Context<Self>) -> impl IntoElement {
        div()
            .size_full()
            .bg(rgb(0x151515))
            .flex()
            .gap_4()
            .child(div().w_1_2().h_full().child(self.letterboxed.clone()))
            .child(div().w_1_2().h_full().child(self.stretched.clone()))
    }
}

fn main() {
    env_logger::init();
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/sample.mp4"));

    Application::new().run(move |cx: &mut App| {
        cx.open_window(WindowOptions::default(), |_, cx| {
            let letterboxed = cx.new(|cx| {
                VideoView::new(
                    VideoOptions {
                        autoplay: Some(true),
                        display_mode: Some(DisplayMode::Scaled { keep_aspect: true }),
                        resampling: Some(Resampling::Triangle),
                        ..VideoOptions::default()
                    },
                    cx,
                )
            });
            let stretched = cx.new(|cx| {
                VideoView::new(
                    VideoOptions {
                        autoplay: Some(true),
                        display_mode: Some(DisplayMode::Fixed {
                            width: 320,
                            height: 320,
                        }),
                        ..VideoOptions::default()
                    },
                    cx,
                )
            });
            for view in [&letterboxed, &stretched] {
                view.update(cx, |view, _| {
                    if let Err(e) = view.player().load_file(&path) {
                        log::error!("Cannot load {}: {}", path.display(), e);
                    }
                });
            }
            cx.new(|_| FixedSizeExample {
                letterboxed,
                stretched,
            })
        })
        .unwrap();
        cx.activate(true);
    });
}
