//! Evenly spaced frame sampling over a decoded video.

use image::RgbImage;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::media::{FrameDecoder, FrameSource};

/// A frame kept by the sampler together with its position in the stream
#[derive(Debug, Clone)]
pub struct SampledFrame {
    /// Zero-based index of the frame in decode order
    pub position: u64,
    pub image: RgbImage,
}

/// Ordered frames sampled from one video, in stream order
#[derive(Debug, Clone, Default)]
pub struct FrameSet {
    frames: Vec<SampledFrame>,
}

impl FrameSet {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[SampledFrame] {
        &self.frames
    }

    pub fn iter(&self) -> impl Iterator<Item = &SampledFrame> {
        self.frames.iter()
    }
}

/// Fixed stride between kept frames
///
/// Unknown or zero totals fall back to keeping every frame.
pub fn sampling_interval(total_frames: Option<u64>, max_frames: usize) -> u64 {
    match total_frames {
        Some(total) if total > 0 && max_frames > 0 => (total / max_frames as u64).max(1),
        _ => 1,
    }
}

/// Walk `source` sequentially, keeping every `interval`-th frame until
/// `max_frames` are collected or the stream ends.
///
/// A decode failure part-way through ends sampling; frames already kept are
/// returned.
pub fn sample(source: &mut dyn FrameSource, max_frames: usize) -> FrameSet {
    let total = source.frame_count();
    let interval = sampling_interval(total, max_frames);
    debug!("Sampling up to {} frames with interval {} (total {:?})", max_frames, interval, total);

    let mut frames = Vec::with_capacity(max_frames);
    let mut position: u64 = 0;

    while frames.len() < max_frames {
        let raw = match source.next_frame() {
            Ok(Some(raw)) => raw,
            Ok(None) => break,
            Err(e) => {
                warn!("Stopped reading at frame {} after {} samples: {}", position, frames.len(), e);
                break;
            }
        };

        if position % interval == 0 {
            match raw.into_rgb() {
                Ok(image) => frames.push(SampledFrame { position, image }),
                Err(e) => {
                    warn!("Dropping undecodable frame {}: {}", position, e);
                    break;
                }
            }
        }

        position += 1;
    }

    FrameSet { frames }
}

/// Open `video_path` with `decoder` and sample it
///
/// The decoder handle is released before returning.
pub fn sample_video(decoder: &dyn FrameDecoder, video_path: &Path, max_frames: usize) -> Result<FrameSet> {
    let mut source = decoder.open(video_path)?;
    let frames = sample(source.as_mut(), max_frames);
    drop(source);

    info!("Extracted {} frames from {}", frames.len(), video_path.display());
    Ok(frames)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::VidsumError;
    use crate::media::{PixelLayout, RawFrame};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Synthetic BGR source whose frame `i` is filled with blue value `i % 256`
    pub(crate) struct SyntheticSource {
        pub total: u64,
        pub reported: Option<u64>,
        pub fail_at: Option<u64>,
        pub next: u64,
        pub released: Arc<AtomicBool>,
    }

    impl SyntheticSource {
        pub(crate) fn new(total: u64) -> Self {
            Self {
                total,
                reported: Some(total),
                fail_at: None,
                next: 0,
                released: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl FrameSource for SyntheticSource {
        fn frame_count(&self) -> Option<u64> {
            self.reported
        }

        fn next_frame(&mut self) -> Result<Option<RawFrame>> {
            if Some(self.next) == self.fail_at {
                return Err(VidsumError::FrameExtraction("corrupt packet".to_string()));
            }
            if self.next >= self.total {
                return Ok(None);
            }
            let blue = (self.next % 256) as u8;
            self.next += 1;
            Ok(Some(RawFrame {
                width: 4,
                height: 2,
                layout: PixelLayout::Bgr24,
                data: [blue, 0, 255].repeat(8),
            }))
        }
    }

    impl Drop for SyntheticSource {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    pub(crate) struct SyntheticDecoder {
        pub total: u64,
        pub released: Arc<AtomicBool>,
    }

    impl FrameDecoder for SyntheticDecoder {
        fn open(&self, video_path: &Path) -> Result<Box<dyn FrameSource>> {
            if !video_path.exists() {
                return Err(VidsumError::FrameExtraction(format!("Cannot open {}", video_path.display())));
            }
            let mut source = SyntheticSource::new(self.total);
            source.released = Arc::clone(&self.released);
            Ok(Box::new(source))
        }
    }

    fn positions(set: &FrameSet) -> Vec<u64> {
        set.iter().map(|f| f.position).collect()
    }

    #[test]
    fn test_hundred_frames_sampled_with_stride_ten() {
        let mut source = SyntheticSource::new(100);
        let set = sample(&mut source, 10);

        assert_eq!(set.len(), 10);
        assert_eq!(positions(&set), (0..10).map(|i| i * 10).collect::<Vec<_>>());
    }

    #[test]
    fn test_short_video_yields_every_frame() {
        let mut source = SyntheticSource::new(3);
        let set = sample(&mut source, 10);

        assert_eq!(set.len(), 3);
        assert_eq!(positions(&set), vec![0, 1, 2]);
    }

    #[test]
    fn test_length_is_min_of_max_and_total() {
        for total in [1u64, 5, 9, 10, 11, 19, 37, 250] {
            for max in [1usize, 3, 10] {
                let mut source = SyntheticSource::new(total);
                let set = sample(&mut source, max);
                assert_eq!(set.len() as u64, total.min(max as u64), "total={} max={}", total, max);
            }
        }
    }

    #[test]
    fn test_frames_are_in_stream_order() {
        let mut source = SyntheticSource::new(73);
        let set = sample(&mut source, 10);
        let pos = positions(&set);
        assert!(pos.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_empty_video_yields_empty_set() {
        let mut source = SyntheticSource::new(0);
        assert!(sample(&mut source, 10).is_empty());
    }

    #[test]
    fn test_unknown_count_keeps_leading_frames() {
        let mut source = SyntheticSource::new(50);
        source.reported = None;
        let set = sample(&mut source, 10);
        assert_eq!(positions(&set), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_mid_stream_failure_keeps_frames_read_so_far() {
        let mut source = SyntheticSource::new(100);
        source.fail_at = Some(35);
        let set = sample(&mut source, 10);
        assert_eq!(positions(&set), vec![0, 10, 20, 30]);
    }

    #[test]
    fn test_frames_are_converted_to_rgb() {
        let mut source = SyntheticSource::new(20);
        let set = sample(&mut source, 2);
        let second = &set.frames()[1];
        assert_eq!(second.position, 10);
        assert_eq!(second.image.get_pixel(0, 0).0, [255, 0, 10]);
    }

    #[test]
    fn test_sample_video_releases_decoder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video.mp4");
        std::fs::write(&path, b"frames").unwrap();

        let released = Arc::new(AtomicBool::new(false));
        let decoder = SyntheticDecoder { total: 30, released: Arc::clone(&released) };

        let set = sample_video(&decoder, &path, 10).unwrap();
        assert_eq!(set.len(), 10);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_sample_video_unopenable_file() {
        let decoder = SyntheticDecoder { total: 30, released: Arc::new(AtomicBool::new(false)) };
        let result = sample_video(&decoder, Path::new("/nonexistent/video.mp4"), 10);
        assert!(matches!(result, Err(VidsumError::FrameExtraction(_))));
    }
}
