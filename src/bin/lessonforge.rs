//! Lessonforge CLI Binary
//!
//! Command-line interface for validated lesson generation.

use anyhow::Context;
use clap::Parser;
use lessonforge::cli::{map_error, Cli, RunContext};
use lessonforge::config::ConfigLoader;
use lessonforge::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    let logging_config = build_logging_config(&cli);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("Lessonforge CLI starting");

    if let Err(e) = run(&cli) {
        error!("Command failed: {:#}", e);
        match e.downcast_ref::<lessonforge::error::LessonError>() {
            Some(lesson_error) => eprintln!("{}", map_error(lesson_error)),
            None => eprintln!("{:#}", e),
        }
        process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let context = RunContext::new(cli.workspace.clone(), cli.config.clone())?;
    info!("CLI context initialized");

    let output = runtime.block_on(context.execute(&cli.command))?;
    info!("Command completed successfully");
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}

/// Build logging configuration from CLI args and the config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let loaded = match cli.config {
        Some(ref config_path) => ConfigLoader::load_from_file(config_path),
        None => ConfigLoader::load(&cli.workspace),
    };
    let mut config = loaded.map(|c| c.logging).unwrap_or_default();

    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.file = file.clone();
    }
    config
}
