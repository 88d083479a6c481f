use thiserror::Error;

use crate::workflow::Stage;

#[derive(Error, Debug)]
pub enum VidsumError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to download video: {0}")]
    Download(String),

    #[error("Failed to extract frames: {0}")]
    FrameExtraction(String),

    #[error("Failed to encode frame: {0}")]
    Encoding(String),

    #[error("Inference transport error: {0}")]
    InferenceTransport(#[source] reqwest::Error),

    #[error("Request error: {status} - {body}")]
    InferenceApi { status: u16, body: String },

    #[error("Invalid inference response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl VidsumError {
    /// Pipeline stage at which this error ends a summarize request.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Download(_) => Stage::Fetching,
            Self::FrameExtraction(_) => Stage::Sampling,
            Self::Encoding(_) => Stage::Encoding,
            Self::InferenceTransport(_) | Self::InferenceApi { .. } | Self::InvalidResponse(_) => {
                Stage::Requesting
            }
            Self::Io(_) | Self::Json(_) | Self::Toml(_) | Self::Config(_) => Stage::Start,
        }
    }

    /// Stable identifier exposed to API callers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
            Self::Toml(_) => "toml_error",
            Self::Download(_) => "download_error",
            Self::FrameExtraction(_) => "frame_extraction_error",
            Self::Encoding(_) => "encoding_error",
            Self::InferenceTransport(_) => "inference_transport_error",
            Self::InferenceApi { .. } => "inference_api_error",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Config(_) => "config_error",
        }
    }
}

impl From<image::ImageError> for VidsumError {
    fn from(e: image::ImageError) -> Self {
        Self::Encoding(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VidsumError>;
