//! # Dialogue application
//!
//! Wires storage, memory, LLM and TTS adapters into the [`DialoguePipelineService`] and exposes
//! the `dialogue` CLI.
//!
//! ## Modules
//!
//! - [`sentence_assembler`] - Token stream → sentence stream
//! - [`monitor`] - Per-request tracker, stage model and summary reporter
//! - [`retrieval`] - Keyword retrieval over earlier turns
//! - [`pipeline`] - [`DialoguePipelineService`]: text, audio and base64 operations
//! - [`config`] - [`DialogueConfig`], [`AppConfig`]
//! - [`components`] - Builds the pipeline from [`AppConfig`]
//! - [`cli`] - Command-line parser

pub mod cli;
pub mod components;
pub mod config;
pub mod monitor;
mod output_stream;
pub mod pipeline;
pub mod retrieval;
pub mod sentence_assembler;

pub use cli::{Cli, Commands};
pub use components::{build_components, pipeline_options, DialogueComponents};
pub use config::{AppConfig, DialogueConfig};
pub use monitor::{
    DialoguePipelineMonitor, DialoguePipelineTracker, LoggingPipelineReporter, PipelineReporter,
    PipelineStage, PipelineStatus, PipelineSummary, StageSnapshot, StageStatus,
};
pub use pipeline::{
    AudioChunkStream, DialoguePipelineService, PipelineDependencies, PipelineOptions, TextStream,
};
pub use retrieval::{keyword_overlap, ConversationRetriever};
pub use sentence_assembler::{assemble, is_sentence_end, SentenceAssembler};
