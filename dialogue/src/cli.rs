//! CLI parser.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dialogue")]
#[command(about = "Conversational voice pipeline CLI: text, audio, base64", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Overrides DATABASE_URL.
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Overrides LOG_FILE.
    #[arg(long, global = true)]
    pub log_file: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the reply as it streams.
    Text { query: String },
    /// Write the spoken reply to a file.
    Audio {
        query: String,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Print the spoken reply as base64 chunks, one per line.
    Base64 { query: String },
}
