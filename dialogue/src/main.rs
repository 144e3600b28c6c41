//! `dialogue` binary: runs one request through the pipeline and writes the output.

use anyhow::{Context, Result};
use clap::Parser;
use dialogue::{build_components, AppConfig, Cli, Commands};
use dialogue_core::init_tracing;
use futures::StreamExt;
use std::io::Write;
use tokio::io::AsyncWriteExt;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.database_url, cli.log_file)?;
    init_tracing(&config.dialogue.log_file)?;
    let components = build_components(&config).await?;
    let pipeline = components.pipeline;

    match cli.command {
        Commands::Text { query } => {
            let mut tokens = pipeline.execute_text_only(&query);
            let mut stdout = std::io::stdout();
            while let Some(token) = tokens.next().await {
                write!(stdout, "{}", token?)?;
                stdout.flush()?;
            }
            writeln!(stdout)?;
        }
        Commands::Audio { query, out } => {
            let mut file = tokio::fs::File::create(&out)
                .await
                .with_context(|| format!("Failed to create {}", out.display()))?;
            let mut audio = pipeline.execute_audio_streaming(&query);
            let mut bytes = 0usize;
            while let Some(chunk) = audio.next().await {
                let chunk = chunk?;
                bytes += chunk.len();
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            info!(path = %out.display(), bytes, "Audio written");
        }
        Commands::Base64 { query } => {
            let mut chunks = pipeline.execute_streaming(&query);
            let mut stdout = std::io::stdout();
            while let Some(chunk) = chunks.next().await {
                writeln!(stdout, "{}", chunk?)?;
            }
        }
    }

    info!(endpoints = ?components.balancer.snapshot(), "TTS endpoint state at exit");
    Ok(())
}
