// Video decoding architecture
//
// This module abstracts the decoding backend behind two small traits:
// - FrameDecoder: opens a video file and hands out a FrameSource
// - FrameSource: a scoped decoder handle yielding raw frames in stream order
//
// The default backend drives ffprobe/ffmpeg as child processes:
// - Commands: command builders for ffmpeg and ffprobe
// - Decoder: probing plus raw frame streaming over a pipe

pub mod commands;
pub mod decoder;

use image::RgbImage;
use std::path::Path;

pub use commands::*;
pub use decoder::*;

use crate::config::MediaConfig;
use crate::error::{Result, VidsumError};

/// Channel order of a packed 8-bit raw frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Rgb24,
    Bgr24,
}

impl PixelLayout {
    /// Name understood by ffmpeg's `-pix_fmt`
    pub fn ffmpeg_name(&self) -> &'static str {
        match self {
            Self::Rgb24 => "rgb24",
            Self::Bgr24 => "bgr24",
        }
    }
}

/// One decoded frame as produced by the backend
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub data: Vec<u8>,
}

impl RawFrame {
    /// Convert to an RGB image, swapping channels when the backend emitted BGR
    pub fn into_rgb(self) -> Result<RgbImage> {
        let expected = self.width as usize * self.height as usize * 3;
        if self.data.len() != expected {
            return Err(VidsumError::FrameExtraction(format!(
                "Frame buffer holds {} bytes, expected {} for {}x{}",
                self.data.len(),
                expected,
                self.width,
                self.height
            )));
        }

        let mut data = self.data;
        if self.layout == PixelLayout::Bgr24 {
            for pixel in data.chunks_exact_mut(3) {
                pixel.swap(0, 2);
            }
        }

        RgbImage::from_raw(self.width, self.height, data)
            .ok_or_else(|| VidsumError::FrameExtraction("Invalid frame dimensions".to_string()))
    }
}

/// Open decoder handle over a single video
///
/// Implementations release their underlying resources on drop.
pub trait FrameSource {
    /// Total decodable frame count, when the container reports it
    fn frame_count(&self) -> Option<u64>;

    /// Next frame in stream order, `None` at end of stream
    fn next_frame(&mut self) -> Result<Option<RawFrame>>;
}

/// Opens videos for frame-by-frame decoding
pub trait FrameDecoder: Send + Sync {
    fn open(&self, video_path: &Path) -> Result<Box<dyn FrameSource>>;

    /// Check that the backend can run at all
    fn check_availability(&self) -> Result<()> {
        Ok(())
    }
}

/// Factory for creating frame decoder instances
pub struct FrameDecoderFactory;

impl FrameDecoderFactory {
    /// Create the default decoder implementation (FFmpeg-based)
    pub fn create_decoder(config: MediaConfig) -> Box<dyn FrameDecoder> {
        Box::new(decoder::FfmpegDecoder::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bgr_frame_is_converted_to_rgb() {
        let frame = RawFrame {
            width: 2,
            height: 1,
            layout: PixelLayout::Bgr24,
            data: vec![1, 2, 3, 10, 20, 30],
        };
        let image = frame.into_rgb().unwrap();
        assert_eq!(image.get_pixel(0, 0).0, [3, 2, 1]);
        assert_eq!(image.get_pixel(1, 0).0, [30, 20, 10]);
    }

    #[test]
    fn test_rgb_frame_is_untouched() {
        let frame = RawFrame {
            width: 1,
            height: 1,
            layout: PixelLayout::Rgb24,
            data: vec![7, 8, 9],
        };
        assert_eq!(frame.into_rgb().unwrap().get_pixel(0, 0).0, [7, 8, 9]);
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let frame = RawFrame {
            width: 2,
            height: 2,
            layout: PixelLayout::Rgb24,
            data: vec![0; 5],
        };
        assert!(matches!(frame.into_rgb(), Err(VidsumError::FrameExtraction(_))));
    }
}
