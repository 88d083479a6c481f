use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use crate::error::Result;

pub const JPEG_MEDIA_TYPE: &str = "image/jpeg";

// Same default most imaging libraries use for JPEG output.
const JPEG_QUALITY: u8 = 75;

/// A compressed frame in text-safe form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    media_type: &'static str,
    data: String,
}

impl EncodedFrame {
    pub fn media_type(&self) -> &str {
        self.media_type
    }

    /// Base64 payload without line wrapping
    pub fn data(&self) -> &str {
        &self.data
    }

    /// `data:<media type>;base64,<payload>`
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// Compress a frame as JPEG and base64 encode it
pub fn encode(image: &RgbImage) -> Result<EncodedFrame> {
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY).encode_image(image)?;

    Ok(EncodedFrame {
        media_type: JPEG_MEDIA_TYPE,
        data: general_purpose::STANDARD.encode(&jpeg),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 128]))
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let image = gradient(32, 24);
        assert_eq!(encode(&image).unwrap(), encode(&image).unwrap());
    }

    #[test]
    fn test_payload_decodes_to_jpeg_of_same_size() {
        let image = gradient(32, 24);
        let frame = encode(&image).unwrap();

        let bytes = general_purpose::STANDARD.decode(frame.data()).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory_with_format(&bytes, image::ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 24));
    }

    #[test]
    fn test_payload_has_no_line_breaks() {
        let frame = encode(&gradient(64, 64)).unwrap();
        assert!(!frame.data().contains('\n'));
        assert_eq!(frame.media_type(), "image/jpeg");
    }

    #[test]
    fn test_data_uri_prefix() {
        let frame = encode(&gradient(8, 8)).unwrap();
        let uri = frame.data_uri();
        assert!(uri.starts_with("data:image/jpeg;base64,/9j/"));
        assert!(uri.ends_with(frame.data()));
    }
}
