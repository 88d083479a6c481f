use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Summarize a single video
    Summarize {
        /// Video URL (http or https)
        #[arg(short, long)]
        url: String,

        /// Instruction for the model
        #[arg(short, long)]
        prompt: Option<String>,

        /// Maximum number of frames to send
        #[arg(short, long)]
        max_frames: Option<usize>,
    },

    /// Run the HTTP API
    Serve {
        /// Address to bind
        #[arg(short, long)]
        bind: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Write a configuration file with default values
    Config {
        /// Output file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}
