use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use tracing::debug;

use crate::error::{Result, VidsumError};
use super::PixelLayout;

/// Abstract media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output target
    pub fn output<S: Into<String>>(self, target: S) -> Self {
        self.arg(target)
    }

    /// Only report errors on stderr
    pub fn quiet(self) -> Self {
        self.arg("-v").arg("error")
    }

    /// Select the first video stream
    pub fn first_video_stream(self) -> Self {
        self.arg("-map").arg("0:v:0")
    }

    /// Keep coded geometry instead of applying display-matrix rotation
    pub fn no_autorotate(self) -> Self {
        self.arg("-noautorotate")
    }

    /// Emit every decoded frame once, without CFR duplication or drops
    pub fn passthrough_timing(self) -> Self {
        self.arg("-fps_mode").arg("passthrough")
    }

    /// Disable audio
    pub fn no_audio(self) -> Self {
        self.arg("-an")
    }

    /// Set output container format
    pub fn format<S: Into<String>>(self, format: S) -> Self {
        self.arg("-f").arg(format)
    }

    /// Set output pixel format
    pub fn pixel_format(self, layout: PixelLayout) -> Self {
        self.arg("-pix_fmt").arg(layout.ffmpeg_name())
    }

    /// Run to completion; only a failure to start the binary is an error
    pub fn execute(&self) -> Result<Output> {
        debug!("Executing media command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        Command::new(&self.binary_path)
            .args(&self.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| VidsumError::FrameExtraction(format!(
                "Failed to execute {}: {}", self.binary_path, e
            )))
    }

    /// Run to completion and capture stdout
    pub fn run(&self) -> Result<Vec<u8>> {
        let output = self.execute()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VidsumError::FrameExtraction(format!(
                "{} failed: {}",
                self.description,
                stderr.trim()
            )));
        }

        Ok(output.stdout)
    }

    /// Start the command with stdout piped back to the caller
    pub fn spawn_piped(&self) -> Result<Child> {
        debug!("Spawning media command: {} {:?}", self.binary_path, self.args);

        Command::new(&self.binary_path)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| VidsumError::FrameExtraction(format!(
                "Failed to start {}: {}", self.binary_path, e
            )))
    }
}

/// Builder for the ffmpeg/ffprobe invocations used by the decoder
pub struct MediaCommandBuilder {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S1: Into<String>, S2: Into<String>>(ffmpeg_path: S1, ffprobe_path: S2) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Build a probe of the first video stream, reported as JSON
    pub fn probe_video_stream<P: AsRef<Path>>(&self, video_path: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Video probe")
            .quiet()
            .args(["-select_streams", "v:0"])
            .args(["-show_entries", "stream=width,height,nb_frames,avg_frame_rate,duration"])
            .args(["-of", "json"])
            .arg(video_path.as_ref().to_string_lossy().to_string())
    }

    /// Build a decode of every frame to packed raw pixels on stdout
    pub fn decode_raw_frames<P: AsRef<Path>>(
        &self,
        video_path: P,
        layout: PixelLayout,
    ) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Raw frame decode")
            .quiet()
            .no_autorotate()
            .input(video_path)
            .first_video_stream()
            .no_audio()
            .passthrough_timing()
            .format("rawvideo")
            .pixel_format(layout)
            .output("pipe:1")
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Version check").arg("-version")
    }

    /// Build ffprobe version check command
    pub fn probe_version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Probe version check").arg("-version")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_command_streams_bgr_to_stdout() {
        let builder = MediaCommandBuilder::new("ffmpeg", "ffprobe");
        let cmd = builder.decode_raw_frames("/tmp/in.mp4", PixelLayout::Bgr24);

        assert_eq!(cmd.binary_path, "ffmpeg");
        assert_eq!(
            cmd.args,
            vec![
                "-v", "error", "-noautorotate", "-i", "/tmp/in.mp4", "-map", "0:v:0", "-an",
                "-fps_mode", "passthrough", "-f", "rawvideo", "-pix_fmt", "bgr24", "pipe:1",
            ]
        );
    }

    #[test]
    fn test_probe_command_targets_first_video_stream() {
        let builder = MediaCommandBuilder::new("ffmpeg", "/opt/ffprobe");
        let cmd = builder.probe_video_stream("clip.mp4");

        assert_eq!(cmd.binary_path, "/opt/ffprobe");
        assert!(cmd.args.windows(2).any(|w| w == ["-select_streams", "v:0"]));
        assert!(cmd.args.windows(2).any(|w| w == ["-of", "json"]));
        assert_eq!(cmd.args.last().map(String::as_str), Some("clip.mp4"));
    }

    #[test]
    fn test_decode_command_keeps_probed_geometry() {
        let builder = MediaCommandBuilder::new("ffmpeg", "ffprobe");
        let cmd = builder.decode_raw_frames("/tmp/in.mp4", PixelLayout::Bgr24);

        // Input options must precede -i to apply to the input
        let input_at = cmd.args.iter().position(|a| a == "-i").unwrap();
        let rotate_at = cmd.args.iter().position(|a| a == "-noautorotate").unwrap();
        assert!(rotate_at < input_at);
        assert!(cmd.args.windows(2).any(|w| w == ["-fps_mode", "passthrough"]));
    }

    #[test]
    fn test_missing_binary_is_frame_extraction_error() {
        let cmd = MediaCommand::new("/nonexistent/ffprobe-binary", "Video probe").arg("-version");
        assert!(matches!(cmd.run(), Err(VidsumError::FrameExtraction(_))));
        assert!(matches!(cmd.execute(), Err(VidsumError::FrameExtraction(_))));
    }

    #[test]
    fn test_failing_exit_is_not_a_start_failure() {
        let cmd = MediaCommand::new("false", "Video probe");
        let output = cmd.execute().unwrap();
        assert!(!output.status.success());
        assert!(cmd.run().is_err());
    }
}
