use crate::present::{DisplayMode, PresentKey, Presenter, Resampling};
use crate::{Player, PlayerState};
use gpui::{
    Element, ElementId, GlobalElementId, InspectorElementId, IntoElement, LayoutId, Window,
};
use parking_lot::Mutex;
use std::sync::Arc;

type PaintCache = Option<(PresentKey, Arc<gpui::RenderImage>)>;

pub struct VideoElement {
    player: Player,
    presenter: Arc<Mutex<Presenter>>,
    element_id: Option<ElementId>,
}

impl VideoElement {
    pub fn new(player: Player, presenter: Arc<Mutex<Presenter>>) -> Self {
        Self {
            player,
            presenter,
            element_id: Some("video-label".into()),
        }
    }

    pub fn id(mut self, id: impl Into<ElementId>) -> Self {
        self.element_id = Some(id.into());
        self
    }

    /// Paints at exactly `width`x`height`. Applies to every element sharing the presenter.
    pub fn size(self, width: u32, height: u32) -> Self {
        self.display_mode(DisplayMode::Fixed { width, height })
    }

    pub fn display_mode(self, mode: DisplayMode) -> Self {
        self.presenter.lock().set_mode(mode);
        self
    }

    pub fn resampling(self, resampling: Resampling) -> Self {
        self.presenter.lock().set_resampling(resampling);
        self
    }

    fn layout_size(&self) -> gpui::Size<gpui::Length> {
        let absolute = |w: u32, h: u32| gpui::Size {
            width: gpui::Length::Definite(gpui::DefiniteLength::Absolute(
                gpui::AbsoluteLength::Pixels(gpui::px(w as f32)),
            )),
            height: gpui::Length::Definite(gpui::DefiniteLength::Absolute(
                gpui::AbsoluteLength::Pixels(gpui::px(h as f32)),
            )),
        };

        match self.presenter.lock().mode() {
            DisplayMode::Scaled { .. } => gpui::Size {
                width: gpui::Length::Definite(gpui::relative(1.0)),
                height: gpui::Length::Definite(gpui::relative(1.0)),
            },
            DisplayMode::Fixed { width, height } => absolute(width, height),
            DisplayMode::Native => {
                let (w, h) = self.player.size();
                absolute(w, h)
            }
        }
    }

    fn paint_frame(
        &mut self,
        window: &mut Window,
        cx: &mut gpui::App,
        bounds: gpui::Bounds<gpui::Pixels>,
    ) {
        use image::{ImageBuffer, Rgba};
        use smallvec::SmallVec;

        let (Some(frame), generation) = self.player.current_frame_with_generation() else {
            return;
        };

        let container: (f32, f32) = (bounds.size.width.into(), bounds.size.height.into());
        let Some(presented) = self.presenter.lock().present(&frame, generation, container) else {
            return;
        };
        let placement = presented.placement;

        let cache: gpui::Entity<PaintCache> = window.use_state(cx, |_, _| None);
        let cached = cache
            .read(cx)
            .as_ref()
            .filter(|(cached_key, _)| *cached_key == presented.key)
            .map(|(_, image)| Arc::clone(image));

        let render_image = match cached {
            Some(image) => image,
            None => {
                let Some(image_buffer) = ImageBuffer::<Rgba<u8>, _>::from_raw(
                    placement.width,
                    placement.height,
                    presented.pixels.to_vec(),
                ) else {
                    return;
                };

                let frames: SmallVec<[image::Frame; 1]> =
                    SmallVec::from_elem(image::Frame::new(image_buffer), 1);
                let render_image = Arc::new(gpui::RenderImage::new(frames));

                let key = presented.key;
                let previous = cache.update(cx, |this, _| this.replace((key, render_image.clone())));
                if let Some((_, prev)) = previous {
                    cx.drop_image(prev, Some(window));
                }
                render_image
            }
        };

        let dest_bounds = gpui::Bounds::new(
            gpui::point(
                bounds.origin.x + gpui::px(placement.offset_x),
                bounds.origin.y + gpui::px(placement.offset_y),
            ),
            gpui::size(
                gpui::px(placement.width as f32),
                gpui::px(placement.height as f32),
            ),
        );

        window
            .paint_image(dest_bounds, gpui::Corners::default(), render_image, 0, false)
            .ok();
    }
}

impl Element for VideoElement {
    type RequestLayoutState = ();
    type PrepaintState = ();

    fn id(&self) -> Option<ElementId> {
        self.element_id.clone()
    }

    fn source_location(&self) -> Option<&'static core::panic::Location<'static>> {
        None
    }

    fn request_layout(
        &mut self,
        _global_id: Option<&GlobalElementId>,
        _inspector_id: Option<&InspectorElementId>,
        window: &mut Window,
        cx: &mut gpui::App,
    ) -> (LayoutId, Self::RequestLayoutState) {
        let style = gpui::Style {
            size: self.layout_size(),
            ..Default::default()
        };

        let layout_id = window.request_layout(style, [], cx);
        (layout_id, ())
    }

    fn prepaint(
        &mut self,
        _global_id: Option<&GlobalElementId>,
        _inspector_id: Option<&InspectorElementId>,
        _bounds: gpui::Bounds<gpui::Pixels>,
        _request_layout_state: &mut Self::RequestLayoutState,
        window: &mut Window,
        _cx: &mut gpui::App,
    ) -> Self::PrepaintState {
        if self.player.state() == PlayerState::Playing {
            window.request_animation_frame();
        }
    }

    fn paint(
        &mut self,
        _global_id: Option<&GlobalElementId>,
        _inspector_id: Option<&InspectorElementId>,
        bounds: gpui::Bounds<gpui::Pixels>,
        _request_layout_state: &mut Self::RequestLayoutState,
        _prepaint_state: &mut Self::PrepaintState,
        window: &mut Window,
        cx: &mut gpui::App,
    ) {
        self.paint_frame(window, cx, bounds);
    }
}

impl IntoElement for VideoElement {
    type Element = Self;

    fn into_element(self) -> Self::Element {
        self
    }
}

/// Builds an element painting `player`'s current frame under `presenter`'s policy.
pub fn video(player: Player, presenter: Arc<Mutex<Presenter>>) -> VideoElement {
    VideoElement::new(player, presenter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_setters_update_the_shared_presenter() {
        let presenter = Arc::new(Mutex::new(Presenter::default()));
        let _element = video(Player::default(), Arc::clone(&presenter))
            .id("clip")
            .resampling(Resampling::CatmullRom)
            .size(320, 240);

        let presenter = presenter.lock();
        assert_eq!(
            presenter.mode(),
            DisplayMode::Fixed {
                width: 320,
                height: 240
            }
        );
        assert_eq!(presenter.resampling(), Resampling::CatmullRom);
    }

    #[test]
    fn scaled_elements_fill_their_parent() {
        let presenter = Arc::new(Mutex::new(Presenter::default()));
        let element = video(Player::default(), presenter)
            .display_mode(DisplayMode::Scaled { keep_aspect: true });
        assert!(matches!(
            element.layout_size().width,
            gpui::Length::Definite(gpui::DefiniteLength::Fraction(f)) if f == 1.0
        ));
    }
}
