//! CLI parse: clap types only.

use crate::provider::ProviderType;
use crate::types::CefrLevel;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Lessonforge CLI - validated language lesson generation
#[derive(Parser, Debug)]
#[command(name = "lessonforge")]
#[command(about = "Generate validated multi-section language lessons from source text")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (where config/ is looked up)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a lesson from a text file
    Generate {
        /// Source text file
        #[arg(long)]
        input: PathBuf,
        /// CEFR level (A1, A2, B1, B2, C1)
        #[arg(long)]
        level: CefrLevel,
        /// Lesson type (discussion, grammar, pronunciation, conversation)
        #[arg(long, default_value = "discussion")]
        lesson_type: String,
        /// Target language
        #[arg(long)]
        language: Option<String>,
        /// Print server-sent-event frames instead of the final JSON
        #[arg(long)]
        stream: bool,
        /// Override the configured provider
        #[arg(long)]
        provider: Option<ProviderType>,
        /// Override the configured model
        #[arg(long)]
        model: Option<String>,
        /// Override the provider endpoint
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Run the content gate and quality scorer on a text file
    Check {
        /// Source text file
        #[arg(long)]
        input: PathBuf,
        /// Target language to check support for
        #[arg(long)]
        language: Option<String>,
    },
    /// Classify an error message and show the resulting user message
    Classify {
        /// Error message to classify
        message: String,
        /// Error name, e.g. TypeError
        #[arg(long)]
        name: Option<String>,
    },
}
