use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::encoder::{self, EncodedFrame};
use crate::error::{Result, VidsumError};
use crate::fetch::{Fetcher, VideoHandle, YtDlpFetcher};
use crate::inference::{ChatCompletionsClient, InferenceClient};
use crate::media::{FrameDecoder, FrameDecoderFactory};
use crate::request::assemble;
use crate::sampler::{self, FrameSet};

/// Pipeline states of one summarize call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Fetching,
    Sampling,
    Encoding,
    Requesting,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Fetching => "fetching",
            Self::Sampling => "sampling",
            Self::Encoding => "encoding",
            Self::Requesting => "requesting",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Answer produced for a video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub text: String,
    pub model: String,
    /// Number of images that accompanied the prompt
    pub frames_sent: usize,
}

pub type SummaryResult = Result<Summary>;

/// Fetch -> sample -> encode -> request, with the download removed on every
/// exit path.
///
/// Holds only read-only state, so one instance can serve concurrent calls.
/// There is no cancellation hook: abandoning the future drops the video
/// handle, which still removes the download.
pub struct Workflow {
    config: Config,
    fetcher: Arc<dyn Fetcher>,
    decoder: Arc<dyn FrameDecoder>,
    client: Arc<dyn InferenceClient>,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let fetcher = Arc::new(YtDlpFetcher::new(config.fetch.clone()));
        let decoder: Arc<dyn FrameDecoder> =
            Arc::from(FrameDecoderFactory::create_decoder(config.media.clone()));
        let client = Arc::new(ChatCompletionsClient::new(&config.inference)?);

        // Check dependencies
        decoder.check_availability()?;

        Ok(Self::with_components(config, fetcher, decoder, client))
    }

    pub fn with_components(
        config: Config,
        fetcher: Arc<dyn Fetcher>,
        decoder: Arc<dyn FrameDecoder>,
        client: Arc<dyn InferenceClient>,
    ) -> Self {
        Self { config, fetcher, decoder, client }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Summarize the video at `video_url` according to `prompt`
    pub async fn summarize(&self, video_url: &str, prompt: &str) -> SummaryResult {
        let result = self.run(video_url, prompt).await;

        match &result {
            Ok(summary) => info!(stage = %Stage::Done, "Summary ready ({} frames sent)", summary.frames_sent),
            Err(e) => warn!(stage = %Stage::Failed, failed_at = %e.stage(), "Summarization failed: {}", e),
        }

        result
    }

    async fn run(&self, video_url: &str, prompt: &str) -> SummaryResult {
        info!(stage = %Stage::Fetching, "Fetching {}", video_url);
        // Nothing to clean up when the fetch fails.
        let video = self.fetcher.fetch(video_url).await?;

        let result = self.process(&video, prompt).await;

        let dir = video.dir().to_path_buf();
        if let Err(e) = video.close() {
            warn!("Failed to remove temporary directory {}: {}", dir.display(), e);
        }

        result
    }

    async fn process(&self, video: &VideoHandle, prompt: &str) -> SummaryResult {
        info!(stage = %Stage::Sampling, "Sampling frames from {}", video.path().display());
        let frames = self.sample(video.path().to_path_buf()).await?;

        info!(stage = %Stage::Encoding, "Encoding {} frames", frames.len());
        let encoded = encode_frames(frames).await?;

        if encoded.is_empty() {
            warn!("No frames extracted; sending text-only request");
        }

        let inference = &self.config.inference;
        let request = assemble(prompt, encoded, &inference.model, inference.max_tokens);
        let frames_sent = request.frames.len();

        info!(stage = %Stage::Requesting, "Requesting summary from {}", inference.model);
        let text = self.client.infer(&request).await?;

        Ok(Summary {
            text,
            model: request.model,
            frames_sent,
        })
    }

    async fn sample(&self, video_path: PathBuf) -> Result<FrameSet> {
        let decoder = Arc::clone(&self.decoder);
        let max_frames = self.config.sampling.max_frames;

        tokio::task::spawn_blocking(move || {
            sampler::sample_video(decoder.as_ref(), &video_path, max_frames)
        })
        .await
        .map_err(|e| VidsumError::FrameExtraction(format!("Sampling task failed: {}", e)))?
    }
}

async fn encode_frames(frames: FrameSet) -> Result<Vec<EncodedFrame>> {
    tokio::task::spawn_blocking(move || {
        frames.iter().map(|frame| encoder::encode(&frame.image)).collect::<Result<Vec<_>>>()
    })
    .await
    .map_err(|e| VidsumError::Encoding(format!("Encoding task failed: {}", e)))?
}
