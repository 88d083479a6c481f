use serde::Deserialize;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout};
use tracing::{debug, info, warn};

use crate::config::MediaConfig;
use crate::error::{Result, VidsumError};
use super::{FrameDecoder, FrameSource, MediaCommandBuilder, PixelLayout, RawFrame};

// Matches what most decoding backends hand out; the sampler normalizes to RGB.
const DECODE_LAYOUT: PixelLayout = PixelLayout::Bgr24;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    nb_frames: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
}

/// Geometry and length of the first video stream
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub frame_count: Option<u64>,
}

impl VideoInfo {
    /// Parse ffprobe JSON; `None` when no usable video stream is present
    pub fn from_probe_json(json: &[u8]) -> Result<Option<Self>> {
        let probe: ProbeOutput = serde_json::from_slice(json)?;

        let Some(stream) = probe.streams.into_iter().next() else {
            return Ok(None);
        };

        let (width, height) = match (stream.width, stream.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => return Ok(None),
        };

        let frame_count = stream
            .nb_frames
            .as_deref()
            .and_then(|n| n.parse::<u64>().ok())
            .filter(|n| *n > 0)
            .or_else(|| estimate_frame_count(stream.duration.as_deref(), stream.avg_frame_rate.as_deref()));

        Ok(Some(Self { width, height, frame_count }))
    }
}

/// Estimate frame count from duration and average frame rate
fn estimate_frame_count(duration: Option<&str>, frame_rate: Option<&str>) -> Option<u64> {
    let duration: f64 = duration?.parse().ok()?;
    let fps = parse_frame_rate(frame_rate?)?;
    let estimate = (duration * fps).floor();
    (estimate >= 1.0).then_some(estimate as u64)
}

/// Parse "num/den" or plain decimal frame rates
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let fps = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.parse().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

/// Decoder backed by ffprobe (metadata) and ffmpeg (raw frame stream)
pub struct FfmpegDecoder {
    command_builder: MediaCommandBuilder,
}

impl FfmpegDecoder {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.ffmpeg_path, &config.ffprobe_path);
        Self { command_builder }
    }

    /// Probe the first video stream
    ///
    /// `Ok(None)` when ffprobe runs but finds nothing decodable; an error when
    /// ffprobe itself cannot be started.
    fn probe(&self, video_path: &Path) -> Result<Option<VideoInfo>> {
        let output = self.command_builder.probe_video_stream(video_path).execute()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("Could not probe {}: {}", video_path.display(), stderr.trim());
            return Ok(None);
        }

        match VideoInfo::from_probe_json(&output.stdout) {
            Ok(info) => Ok(info),
            Err(e) => {
                warn!("Unreadable probe output for {}: {}", video_path.display(), e);
                Ok(None)
            }
        }
    }
}

impl FrameDecoder for FfmpegDecoder {
    fn open(&self, video_path: &Path) -> Result<Box<dyn FrameSource>> {
        std::fs::File::open(video_path).map_err(|e| {
            VidsumError::FrameExtraction(format!("Cannot open {}: {}", video_path.display(), e))
        })?;

        let Some(info) = self.probe(video_path)? else {
            warn!("No decodable video stream in {}", video_path.display());
            return Ok(Box::new(FfmpegFrameSource::exhausted()));
        };

        info!(
            "Opened video {}x{} ({} frames)",
            info.width,
            info.height,
            info.frame_count.map_or_else(|| "unknown".to_string(), |n| n.to_string())
        );

        let child = self
            .command_builder
            .decode_raw_frames(video_path, DECODE_LAYOUT)
            .spawn_piped()?;

        Ok(Box::new(FfmpegFrameSource::new(child, info)?))
    }

    fn check_availability(&self) -> Result<()> {
        self.command_builder.version_check().run()?;
        self.command_builder.probe_version_check().run()?;
        info!("Media processor is available");
        Ok(())
    }
}

/// Running ffmpeg process streaming packed frames over stdout
///
/// The child is killed and reaped on drop, whether or not the stream was
/// read to the end.
pub struct FfmpegFrameSource {
    child: Option<Child>,
    stdout: Option<BufReader<ChildStdout>>,
    info: Option<VideoInfo>,
}

impl FfmpegFrameSource {
    fn new(mut child: Child, info: VideoInfo) -> Result<Self> {
        let stdout = child.stdout.take().map(BufReader::new);
        let mut source = Self { child: Some(child), stdout, info: Some(info) };
        if source.stdout.is_none() {
            source.release();
            return Err(VidsumError::FrameExtraction("Decoder stdout unavailable".to_string()));
        }
        Ok(source)
    }

    /// Source for a file with nothing decodable in it
    fn exhausted() -> Self {
        Self { child: None, stdout: None, info: None }
    }

    fn frame_size(info: &VideoInfo) -> usize {
        info.width as usize * info.height as usize * 3
    }

    fn release(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                // Already exited
                debug!("Decoder kill: {}", e);
            }
            if let Err(e) = child.wait() {
                warn!("Failed to reap decoder process: {}", e);
            }
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    fn frame_count(&self) -> Option<u64> {
        match &self.info {
            Some(info) => info.frame_count,
            None => Some(0),
        }
    }

    fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        let (Some(info), Some(stdout)) = (&self.info, self.stdout.as_mut()) else {
            return Ok(None);
        };

        let mut data = vec![0u8; Self::frame_size(info)];
        let mut filled = 0;
        while filled < data.len() {
            match stdout.read(&mut data[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(VidsumError::FrameExtraction(format!("Decoder read failed: {}", e))),
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        if filled < data.len() {
            return Err(VidsumError::FrameExtraction(format!(
                "Truncated frame: got {} of {} bytes",
                filled,
                data.len()
            )));
        }

        Ok(Some(RawFrame {
            width: info.width,
            height: info.height,
            layout: DECODE_LAYOUT,
            data,
        }))
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_with_frame_count() {
        let json = br#"{"streams":[{"width":640,"height":360,"nb_frames":"250","avg_frame_rate":"25/1","duration":"10.000000"}]}"#;
        let info = VideoInfo::from_probe_json(json).unwrap().unwrap();
        assert_eq!(info, VideoInfo { width: 640, height: 360, frame_count: Some(250) });
    }

    #[test]
    fn test_probe_estimates_missing_frame_count() {
        let json = br#"{"streams":[{"width":320,"height":240,"avg_frame_rate":"30000/1001","duration":"2.0"}]}"#;
        let info = VideoInfo::from_probe_json(json).unwrap().unwrap();
        assert_eq!(info.frame_count, Some(59));
    }

    #[test]
    fn test_probe_unknown_frame_count() {
        let json = br#"{"streams":[{"width":320,"height":240,"nb_frames":"N/A","avg_frame_rate":"0/0"}]}"#;
        let info = VideoInfo::from_probe_json(json).unwrap().unwrap();
        assert_eq!(info.frame_count, None);
    }

    #[test]
    fn test_probe_without_video_stream() {
        assert_eq!(VideoInfo::from_probe_json(br#"{"streams":[]}"#).unwrap(), None);
        assert_eq!(VideoInfo::from_probe_json(br#"{}"#).unwrap(), None);
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("25/1"), Some(25.0));
        assert_eq!(parse_frame_rate("24"), Some(24.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }

    #[test]
    fn test_open_missing_file_fails() {
        let decoder = FfmpegDecoder::new(MediaConfig {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
        });
        let result = decoder.open(Path::new("/nonexistent/video.mp4"));
        assert!(matches!(result, Err(VidsumError::FrameExtraction(_))));
    }

    fn corrupt_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("corrupt.mp4");
        std::fs::write(&path, b"not a video").unwrap();
        path
    }

    #[test]
    fn test_unprobeable_file_yields_empty_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = corrupt_file(&dir);

        // ffprobe runs and rejects the file
        let decoder = FfmpegDecoder::new(MediaConfig {
            ffmpeg_path: "/nonexistent/ffmpeg".to_string(),
            ffprobe_path: "false".to_string(),
        });
        let mut source = decoder.open(&path).unwrap();
        assert_eq!(source.frame_count(), Some(0));
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_missing_ffprobe_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = corrupt_file(&dir);

        let decoder = FfmpegDecoder::new(MediaConfig {
            ffmpeg_path: "true".to_string(),
            ffprobe_path: "/nonexistent/ffprobe".to_string(),
        });
        assert!(matches!(decoder.open(&path), Err(VidsumError::FrameExtraction(_))));
    }

    #[test]
    fn test_availability_requires_ffprobe() {
        let decoder = FfmpegDecoder::new(MediaConfig {
            ffmpeg_path: "true".to_string(),
            ffprobe_path: "/nonexistent/ffprobe".to_string(),
        });
        assert!(matches!(decoder.check_availability(), Err(VidsumError::FrameExtraction(_))));

        let decoder = FfmpegDecoder::new(MediaConfig {
            ffmpeg_path: "true".to_string(),
            ffprobe_path: "true".to_string(),
        });
        assert!(decoder.check_availability().is_ok());
    }
}
