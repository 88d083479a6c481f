use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::FetchConfig;
use crate::error::{Result, VidsumError};

const DOWNLOAD_FILE_NAME: &str = "downloaded_video.mp4";

/// Exclusive owner of a downloaded video and the temporary directory holding it
///
/// Both are removed when the handle is closed or dropped.
#[derive(Debug)]
pub struct VideoHandle {
    dir: TempDir,
    path: PathBuf,
}

impl VideoHandle {
    /// Take ownership of `dir`; the video lives at `dir/file_name`
    pub fn new(dir: TempDir, file_name: &str) -> Self {
        let path = dir.path().join(file_name);
        Self { dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Delete the video and its directory, reporting failures
    pub fn close(self) -> Result<()> {
        let dir = self.dir.path().to_path_buf();
        self.dir.close()?;
        debug!("Removed temporary directory {}", dir.display());
        Ok(())
    }
}

/// Downloads a video URL to a local file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<VideoHandle>;
}

/// Accept only absolute http(s) URLs; callers trim surrounding whitespace
pub fn validate_video_url(url: &str) -> Result<()> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));

    match rest {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(VidsumError::Download(format!("Invalid URL format: {}", url))),
    }
}

/// Fetcher backed by the yt-dlp command-line tool
pub struct YtDlpFetcher {
    config: FetchConfig,
}

impl YtDlpFetcher {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Fetcher for YtDlpFetcher {
    async fn fetch(&self, url: &str) -> Result<VideoHandle> {
        let url = url.trim();
        validate_video_url(url)?;

        let dir = tempfile::Builder::new()
            .prefix("vidsum-")
            .tempdir()
            .map_err(|e| VidsumError::Download(format!("Failed to create temp directory: {}", e)))?;
        let handle = VideoHandle::new(dir, DOWNLOAD_FILE_NAME);

        info!("Downloading {} to {}", url, handle.path().display());

        let output = Command::new(&self.config.binary_path)
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("-f").arg(&self.config.format)
            .arg("-o").arg(handle.path())
            .arg(url)
            .output()
            .await
            .map_err(|e| VidsumError::Download(format!(
                "Failed to execute {}: {}", self.config.binary_path, e
            )))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VidsumError::Download(stderr.trim().to_string()));
        }

        if !handle.path().is_file() {
            return Err(VidsumError::Download(format!(
                "No video file was produced for {}",
                url
            )));
        }

        info!("Download completed");
        Ok(handle)
    }
}
