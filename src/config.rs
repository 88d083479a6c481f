use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{Result, VidsumError};

pub const DEFAULT_PROMPT: &str = "Summarize this video in key points";

/// Environment variable holding the inference API credential
pub const ENV_API_KEY: &str = "VIDSUM_API_KEY";
/// Environment variable holding the chat-completions endpoint URL
pub const ENV_API_URL: &str = "VIDSUM_API_URL";
/// Environment variable overriding the model identifier
pub const ENV_MODEL: &str = "VIDSUM_MODEL";

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_fetch_format() -> String {
    "best[ext=mp4]".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub inference: InferenceConfig,
    pub sampling: SamplingConfig,
    pub media: MediaConfig,
    pub fetch: FetchConfig,
    pub server: ServerConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Chat-completions endpoint URL
    pub endpoint: String,
    /// Bearer credential for the endpoint
    pub api_key: String,
    /// Multimodal model identifier
    pub model: String,
    /// Upper bound on the answer length
    pub max_tokens: u32,
    /// Request timeout in seconds; transport default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

// Hand-written so the credential never reaches logs.
impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Maximum number of frames sent to the model
    pub max_frames: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Path to yt-dlp binary
    pub binary_path: String,
    /// yt-dlp format selector
    #[serde(default = "default_fetch_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Prompt used when a request omits one
    pub default_prompt: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inference: InferenceConfig {
                endpoint: String::new(),
                api_key: String::new(),
                model: "glm-4.5v".to_string(),
                max_tokens: 1000,
                timeout_secs: None,
            },
            sampling: SamplingConfig { max_frames: 10 },
            media: MediaConfig {
                ffmpeg_path: "ffmpeg".to_string(),
                ffprobe_path: default_ffprobe_path(),
            },
            fetch: FetchConfig {
                binary_path: "yt-dlp".to_string(),
                format: default_fetch_format(),
            },
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 5000,
                default_prompt: DEFAULT_PROMPT.to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VidsumError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| VidsumError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| VidsumError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| VidsumError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Override inference settings from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY).filter(|v| !v.is_empty()) {
            debug!("Using API key from {}", ENV_API_KEY);
            self.inference.api_key = key;
        }
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
            debug!("Using endpoint from {}: {}", ENV_API_URL, url);
            self.inference.endpoint = url;
        }
        if let Some(model) = lookup(ENV_MODEL).filter(|v| !v.is_empty()) {
            self.inference.model = model;
        }
    }

    /// Reject configurations that cannot reach the inference endpoint
    pub fn validate(&self) -> Result<()> {
        if self.inference.endpoint.trim().is_empty() {
            return Err(VidsumError::Config(format!(
                "Inference endpoint is not set (use [inference].endpoint or {})",
                ENV_API_URL
            )));
        }
        if self.inference.api_key.trim().is_empty() {
            return Err(VidsumError::Config(format!(
                "API key is not set (use [inference].api_key or {})",
                ENV_API_KEY
            )));
        }
        if self.sampling.max_frames == 0 {
            return Err(VidsumError::Config("sampling.max_frames must be at least 1".to_string()));
        }
        Ok(())
    }
}
