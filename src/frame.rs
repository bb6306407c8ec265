use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use yuv::{yuv_nv12_to_bgra, YuvBiPlanarImage, YuvConversionMode, YuvRange, YuvStandardMatrix};

/// A decoded picture in BGRA8, ready to be handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Duration,
    pub number: u64,
}

impl Frame {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, timestamp: Duration, number: u64) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize * 4);
        Self {
            pixels,
            width,
            height,
            timestamp,
            number,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Last-write-wins handoff between the decode worker and the UI.
///
/// There is no queue: publishing replaces whatever the reader has not picked up yet.
#[derive(Debug, Default)]
pub struct FrameSlot {
    frame: Mutex<Option<Arc<Frame>>>,
    generation: AtomicU64,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, frame: Frame) {
        let mut slot = self.frame.lock();
        *slot = Some(Arc::new(frame));
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.frame.lock().clone()
    }

    /// The latest frame together with the generation it was published under.
    pub fn latest_with_generation(&self) -> (Option<Arc<Frame>>, u64) {
        let slot = self.frame.lock();
        (slot.clone(), self.generation.load(Ordering::Acquire))
    }

    /// Bumped on every publish and clear.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn clear(&self) {
        let mut slot = self.frame.lock();
        *slot = None;
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

/// Converts a tightly packed NV12 buffer (Y plane then interleaved UV) to BGRA8.
///
/// Returns `None` when `data` is too short for the given dimensions.
pub fn nv12_to_bgra(data: &[u8], width: u32, height: u32) -> Option<Vec<u8>> {
    let width_usize = width as usize;
    let height_usize = height as usize;
    let y_size = width_usize * height_usize;
    let uv_size = width_usize * height_usize.div_ceil(2);

    if width == 0 || height == 0 || data.len() < y_size + uv_size {
        return None;
    }

    let image = YuvBiPlanarImage {
        y_plane: &data[..y_size],
        y_stride: width,
        uv_plane: &data[y_size..y_size + uv_size],
        uv_stride: width,
        width,
        height,
    };

    let mut bgra = vec![0u8; y_size * 4];
    let stride = width * 4;

    for (range, matrix) in [
        (YuvRange::Full, YuvStandardMatrix::Bt709),
        (YuvRange::Limited, YuvStandardMatrix::Bt709),
        (YuvRange::Limited, YuvStandardMatrix::Bt601),
    ] {
        if yuv_nv12_to_bgra(
            &image,
            &mut bgra,
            stride,
            range,
            matrix,
            YuvConversionMode::Balanced,
        )
        .is_ok()
        {
            return Some(bgra);
        }
    }

    log::warn!("NV12 conversion failed for {}x{} frame", width, height);
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(number: u64) -> Frame {
        Frame::new(vec![0; 16], 2, 2, Duration::from_millis(number * 40), number)
    }

    #[test]
    fn slot_keeps_only_the_latest_frame() {
        let slot = FrameSlot::new();
        assert!(slot.latest().is_none());

        slot.publish(frame(1));
        slot.publish(frame(2));
        slot.publish(frame(3));

        assert_eq!(slot.latest().map(|f| f.number), Some(3));
        assert_eq!(slot.generation(), 3);
    }

    #[test]
    fn clearing_bumps_generation() {
        let slot = FrameSlot::new();
        slot.publish(frame(1));
        let before = slot.generation();
        slot.clear();
        assert!(slot.latest().is_none());
        assert!(slot.generation() > before);
    }

    #[test]
    fn slot_hands_frames_across_threads() {
        let slot = Arc::new(FrameSlot::new());
        let writer = Arc::clone(&slot);
        std::thread::spawn(move || {
            for n in 0..50 {
                writer.publish(frame(n));
            }
        })
        .join()
        .unwrap();
        assert_eq!(slot.latest().map(|f| f.number), Some(49));
    }

    #[test]
    fn paired_read_never_mixes_generations() {
        let slot = Arc::new(FrameSlot::new());
        let writer = Arc::clone(&slot);
        let handle = std::thread::spawn(move || {
            for n in 0..2000 {
                writer.publish(frame(n));
            }
        });

        // Frame n is published as generation n + 1.
        let mut reads = 0;
        while !handle.is_finished() || reads == 0 {
            if let (Some(frame), generation) = slot.latest_with_generation() {
                assert_eq!(generation, frame.number + 1);
                reads += 1;
            }
        }
        handle.join().unwrap();

        let (frame, generation) = slot.latest_with_generation();
        assert_eq!(frame.map(|f| f.number), Some(1999));
        assert_eq!(generation, 2000);
    }

    #[test]
    fn grey_nv12_converts_to_opaque_grey() {
        let (w, h) = (4u32, 2u32);
        let data = vec![128u8; (w * h + w * h / 2) as usize];
        let bgra = nv12_to_bgra(&data, w, h).expect("conversion");
        assert_eq!(bgra.len(), (w * h * 4) as usize);
        for px in bgra.chunks_exact(4) {
            assert_eq!(px[3], 255);
            assert!(px[0].abs_diff(px[1]) <= 2 && px[1].abs_diff(px[2]) <= 2, "{px:?}");
        }
    }

    #[test]
    fn truncated_nv12_is_rejected() {
        assert!(nv12_to_bgra(&[0; 7], 4, 2).is_none());
        assert!(nv12_to_bgra(&[], 0, 0).is_none());
    }
}
