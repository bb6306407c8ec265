use crate::Frame;
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgba};
use std::sync::Arc;

/// How a frame is sized inside the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Source resolution.
    Native,
    /// Exactly this size; aspect ratio is ignored.
    Fixed { width: u32, height: u32 },
    /// Follows the element bounds. With `keep_aspect` the frame is contained
    /// in the bounds, letterboxed, and never upscaled past the source.
    Scaled { keep_aspect: bool },
}

impl Default for DisplayMode {
    fn default() -> Self {
        Self::Scaled { keep_aspect: false }
    }
}

/// Interpolation used when a frame has to be resized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Resampling {
    #[default]
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl Resampling {
    pub fn filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Where and how large a frame is drawn, relative to the element origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub width: u32,
    pub height: u32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Placement {
    fn centered(width: u32, height: u32, container: (f32, f32)) -> Self {
        Self {
            width,
            height,
            offset_x: ((container.0 - width as f32) * 0.5).max(0.0),
            offset_y: ((container.1 - height as f32) * 0.5).max(0.0),
        }
    }
}

/// Computes the drawn size of a `frame_size` picture inside `container` (in pixels).
pub fn layout(mode: DisplayMode, frame_size: (u32, u32), container: (f32, f32)) -> Placement {
    let (fw, fh) = frame_size;
    let (cw, ch) = container;
    let laid_out = cw >= 1.0 && ch >= 1.0;

    match mode {
        DisplayMode::Fixed { width, height } => Placement::centered(width, height, container),
        DisplayMode::Scaled { .. } if !laid_out || fw == 0 || fh == 0 => {
            Placement::centered(fw, fh, container)
        }
        DisplayMode::Native => Placement::centered(fw, fh, container),
        DisplayMode::Scaled { keep_aspect: false } => Placement {
            width: cw.round() as u32,
            height: ch.round() as u32,
            offset_x: 0.0,
            offset_y: 0.0,
        },
        DisplayMode::Scaled { keep_aspect: true } => {
            let scale = (cw / fw as f32).min(ch / fh as f32).min(1.0);
            let width = ((fw as f32 * scale).round() as u32).clamp(1, fw);
            let height = ((fh as f32 * scale).round() as u32).clamp(1, fh);
            Placement::centered(width, height, container)
        }
    }
}

/// Identifies the pixels of a [`Presented`] image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentKey {
    pub generation: u64,
    pub width: u32,
    pub height: u32,
    pub resampling: Resampling,
}

/// A frame resampled for display, BGRA8 at `placement.width`x`placement.height`.
#[derive(Clone)]
pub struct Presented {
    pub key: PresentKey,
    pub placement: Placement,
    pub pixels: Arc<Vec<u8>>,
}

impl std::fmt::Debug for Presented {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Presented")
            .field("key", &self.key)
            .field("placement", &self.placement)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Display policy of a video widget: sizing mode plus resampling filter.
///
/// Keeps the last resampled image, so repainting an unchanged frame at an
/// unchanged size does no work.
#[derive(Debug, Clone, Default)]
pub struct Presenter {
    mode: DisplayMode,
    resampling: Resampling,
    last: Option<Presented>,
}

impl Presenter {
    pub fn new(mode: DisplayMode, resampling: Resampling) -> Self {
        Self {
            mode,
            resampling,
            last: None,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: DisplayMode) {
        self.mode = mode;
    }

    pub fn resampling(&self) -> Resampling {
        self.resampling
    }

    pub fn set_resampling(&mut self, resampling: Resampling) {
        self.resampling = resampling;
    }

    pub fn placement(&self, frame_size: (u32, u32), container: (f32, f32)) -> Placement {
        layout(self.mode, frame_size, container)
    }

    /// Sizes `frame` for a `container`-sized element.
    ///
    /// `generation` is the frame slot generation `frame` was read under. Returns
    /// `None` when there is nothing to draw.
    pub fn present(
        &mut self,
        frame: &Frame,
        generation: u64,
        container: (f32, f32),
    ) -> Option<Presented> {
        let placement = self.placement(frame.size(), container);
        if placement.width == 0 || placement.height == 0 {
            return None;
        }

        let key = PresentKey {
            generation,
            width: placement.width,
            height: placement.height,
            resampling: self.resampling,
        };

        if let Some(last) = self.last.as_ref().filter(|last| last.key == key) {
            return Some(Presented {
                key,
                placement,
                pixels: Arc::clone(&last.pixels),
            });
        }

        let presented = Presented {
            key,
            placement,
            pixels: Arc::new(self.resample(frame, placement.width, placement.height)),
        };
        self.last = Some(presented.clone());
        Some(presented)
    }

    /// Resizes `frame` to `width`x`height` with the configured filter.
    ///
    /// Channel order is preserved, so BGRA input gives BGRA output.
    pub fn resample(&self, frame: &Frame, width: u32, height: u32) -> Vec<u8> {
        if (width, height) == frame.size() {
            return frame.pixels.clone();
        }
        if width == 0 || height == 0 {
            return Vec::new();
        }

        let Some(source) =
            ImageBuffer::<Rgba<u8>, &[u8]>::from_raw(frame.width, frame.height, &frame.pixels[..])
        else {
            log::warn!(
                "Frame buffer does not match {}x{}, painting blank",
                frame.width,
                frame.height
            );
            return vec![0; width as usize * height as usize * 4];
        };

        imageops::resize(&source, width, height, self.resampling.filter()).into_raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const SOURCE: (u32, u32) = (640, 360);

    #[test]
    fn defaults_match_a_plain_label() {
        let presenter = Presenter::default();
        assert_eq!(presenter.mode(), DisplayMode::Scaled { keep_aspect: false });
        assert_eq!(presenter.resampling(), Resampling::Nearest);
    }

    #[test]
    fn fixed_size_ignores_aspect() {
        let placement = layout(
            DisplayMode::Fixed {
                width: 300,
                height: 300,
            },
            SOURCE,
            (300.0, 300.0),
        );
        assert_eq!((placement.width, placement.height), (300, 300));
    }

    #[test]
    fn scaled_fills_the_container() {
        let placement = layout(
            DisplayMode::Scaled { keep_aspect: false },
            SOURCE,
            (1000.0, 200.0),
        );
        assert_eq!((placement.width, placement.height), (1000, 200));
        assert_eq!((placement.offset_x, placement.offset_y), (0.0, 0.0));
    }

    #[test]
    fn keep_aspect_letterboxes() {
        let placement = layout(
            DisplayMode::Scaled { keep_aspect: true },
            SOURCE,
            (320.0, 400.0),
        );
        assert_eq!((placement.width, placement.height), (320, 180));
        assert_eq!(placement.offset_x, 0.0);
        assert_eq!(placement.offset_y, 110.0);
    }

    #[test]
    fn keep_aspect_never_upscales() {
        for w in (1..4000).step_by(37) {
            for h in (1..3000).step_by(53) {
                let placement = layout(
                    DisplayMode::Scaled { keep_aspect: true },
                    SOURCE,
                    (w as f32, h as f32),
                );
                assert!(placement.width <= SOURCE.0, "{w}x{h} -> {placement:?}");
                assert!(placement.height <= SOURCE.1, "{w}x{h} -> {placement:?}");
            }
        }

        let big = layout(
            DisplayMode::Scaled { keep_aspect: true },
            SOURCE,
            (1920.0, 1080.0),
        );
        assert_eq!((big.width, big.height), SOURCE);
        assert_eq!((big.offset_x, big.offset_y), (640.0, 360.0));
    }

    #[test]
    fn unlaid_out_container_falls_back_to_native() {
        for mode in [
            DisplayMode::Scaled { keep_aspect: false },
            DisplayMode::Scaled { keep_aspect: true },
            DisplayMode::Native,
        ] {
            let placement = layout(mode, SOURCE, (0.0, 0.0));
            assert_eq!((placement.width, placement.height), SOURCE, "{mode:?}");
        }
    }

    fn checker(width: u32, height: u32) -> Frame {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                pixels.extend_from_slice(&[v, v, v, 255]);
            }
        }
        Frame::new(pixels, width, height, Duration::ZERO, 0)
    }

    #[test]
    fn same_size_is_a_copy() {
        let frame = checker(4, 4);
        let presenter = Presenter::default();
        assert_eq!(presenter.resample(&frame, 4, 4), frame.pixels);
    }

    #[test]
    fn resampling_produces_target_dimensions() {
        let frame = checker(8, 6);
        for resampling in [
            Resampling::Nearest,
            Resampling::Triangle,
            Resampling::CatmullRom,
            Resampling::Gaussian,
            Resampling::Lanczos3,
        ] {
            let presenter = Presenter::new(DisplayMode::default(), resampling);
            let out = presenter.resample(&frame, 3, 5);
            assert_eq!(out.len(), 3 * 5 * 4, "{resampling:?}");
        }
    }

    #[test]
    fn present_reuses_pixels_for_an_unchanged_frame() {
        let frame = checker(64, 36);
        let mut presenter = Presenter::new(
            DisplayMode::Scaled { keep_aspect: true },
            Resampling::Triangle,
        );

        let first = presenter.present(&frame, 7, (32.0, 100.0)).expect("drawable");
        assert_eq!((first.placement.width, first.placement.height), (32, 18));
        assert_eq!(first.pixels.len(), 32 * 18 * 4);

        // Same size, different letterbox offset.
        let again = presenter.present(&frame, 7, (32.0, 50.0)).expect("drawable");
        assert!(Arc::ptr_eq(&first.pixels, &again.pixels));
        assert_eq!(again.placement.offset_y, 16.0);

        let next = presenter.present(&frame, 8, (32.0, 50.0)).expect("drawable");
        assert!(!Arc::ptr_eq(&first.pixels, &next.pixels));
        assert_eq!(next.key.generation, 8);
    }

    #[test]
    fn present_redraws_on_filter_or_size_change() {
        let frame = checker(64, 36);
        let mut presenter = Presenter::default();

        let first = presenter.present(&frame, 1, (20.0, 10.0)).expect("drawable");
        presenter.set_resampling(Resampling::Lanczos3);
        let filtered = presenter.present(&frame, 1, (20.0, 10.0)).expect("drawable");
        assert!(!Arc::ptr_eq(&first.pixels, &filtered.pixels));
        assert_eq!(filtered.key.resampling, Resampling::Lanczos3);

        let resized = presenter.present(&frame, 1, (40.0, 10.0)).expect("drawable");
        assert_eq!(resized.pixels.len(), 40 * 10 * 4);
    }

    #[test]
    fn present_skips_empty_placements() {
        let frame = checker(4, 4);
        let mut presenter = Presenter::new(
            DisplayMode::Fixed {
                width: 0,
                height: 10,
            },
            Resampling::Nearest,
        );
        assert!(presenter.present(&frame, 1, (100.0, 100.0)).is_none());
    }

    #[test]
    fn nearest_only_reuses_source_values() {
        let frame = checker(4, 4);
        let presenter = Presenter::new(DisplayMode::default(), Resampling::Nearest);
        let out = presenter.resample(&frame, 8, 8);
        assert!(out.iter().all(|&b| b == 0 || b == 255));
    }
}
