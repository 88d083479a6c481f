//! Vidsum - Video Summarization over Multimodal Models
//!
//! Command-line entry point: summarize a single video, or serve the
//! summarizer as an HTTP API.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vidsum::cli::{Args, Commands};
use vidsum::config::Config;
use vidsum::server::{self, AppState};
use vidsum::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            // Try to load config.toml from current directory first
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Config { output } => {
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
        Commands::Summarize { url, prompt, max_frames } => {
            config.apply_env();
            if let Some(max_frames) = max_frames {
                config.sampling.max_frames = max_frames;
            }
            let prompt = prompt.unwrap_or_else(|| config.server.default_prompt.clone());

            let workflow = Workflow::new(config)?;

            let spinner = ProgressBar::new_spinner();
            spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}")?);
            spinner.set_message("Analyzing and summarizing the video... This may take some time.");
            spinner.enable_steady_tick(Duration::from_millis(120));

            let result = workflow.summarize(&url, &prompt).await;
            spinner.finish_and_clear();

            let summary = result?;
            println!("\nVideo Summary:");
            println!("{}", summary.text);
        }
        Commands::Serve { bind, port } => {
            config.apply_env();
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            let bind_address = config.server.bind_address.clone();
            let port = config.server.port;
            let default_prompt = config.server.default_prompt.clone();

            let state = Arc::new(AppState {
                workflow: Arc::new(Workflow::new(config)?),
                default_prompt,
            });
            server::serve(state, &bind_address, port).await?;
        }
    }

    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".vidsum").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "vidsum.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("vidsum.log").display());

    Ok(())
}
