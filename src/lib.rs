//! Vidsum - Video Summarization over Multimodal Models
//!
//! Downloads a video, samples a bounded set of evenly spaced frames, and asks
//! a multimodal chat-completions endpoint to answer a prompt about them.

pub mod cli;
pub mod config;
pub mod workflow;
pub mod fetch;
pub mod media;
pub mod sampler;
pub mod encoder;
pub mod request;
pub mod inference;
pub mod server;
pub mod error;
