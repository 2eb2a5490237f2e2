//! ID photo CLI
//!
//! Reads one JSON request, runs it through the processor and writes one JSON
//! response. Logs go to stderr so stdout stays machine-readable.

use super::config::CliConfigBuilder;
use crate::{
    processor::IdPhotoProcessor,
    segmentation::{DefaultModelFactory, ModelVariant},
    tracing_config::{init_cli_tracing, TracingFormat},
    utils::ExecutionProviderManager,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{debug, info};
use std::io::{self, Read, Write};
use std::path::PathBuf;

/// ID photo generator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "idphoto")]
pub struct Cli {
    /// JSON service configuration file
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the segmentation model files
    #[arg(long, value_name = "DIR", global = true)]
    pub model_dir: Option<PathBuf>,

    /// Execution provider for the learned model (auto, cpu, cuda, coreml)
    #[arg(short, long, global = true)]
    pub execution_provider: Option<String>,

    /// Disable the classical segmentation fallback
    #[arg(long, global = true)]
    pub no_classical_fallback: bool,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format (console, compact, json)
    #[arg(long, default_value = "console", global = true)]
    pub log_format: TracingFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Turn a photo request into an ID photo (default)
    Process(IoArgs),
    /// Run a standalone enhancement request
    Enhance(IoArgs),
    /// Show execution provider availability and installed models
    Providers,
}

/// Request source and response destination
#[derive(Args, Debug, Clone)]
pub struct IoArgs {
    /// Request JSON file ("-" for stdin)
    #[arg(short, long, default_value = "-")]
    pub input: String,

    /// Response JSON file ("-" for stdout)
    #[arg(short, long, default_value = "-")]
    pub output: String,
}

impl Default for IoArgs {
    fn default() -> Self {
        Self {
            input: "-".to_string(),
            output: "-".to_string(),
        }
    }
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_cli_tracing(cli.verbose, cli.log_format).context("Failed to initialize tracing")?;

    let config = CliConfigBuilder::from_cli(&cli)?;
    let command = cli
        .command
        .clone()
        .unwrap_or_else(|| Command::Process(IoArgs::default()));

    match command {
        Command::Providers => {
            show_provider_diagnostics(&DefaultModelFactory::new(&config));
            Ok(())
        },
        Command::Process(io_args) => {
            let processor = IdPhotoProcessor::new(config).context("Failed to create processor")?;
            let request = read_input(&io_args.input)?;
            let response = processor.handle_json(&request).await;
            info!(
                "Request finished (success: {}, usedGPU: {})",
                response.success, response.used_gpu
            );
            write_output(&io_args.output, &response.to_json())
        },
        Command::Enhance(io_args) => {
            let processor = IdPhotoProcessor::new(config).context("Failed to create processor")?;
            let request = read_input(&io_args.input)?;
            let response = processor.handle_enhance_json(&request).await;
            info!("Enhancement finished (success: {})", response.success);
            write_output(&io_args.output, &response.to_json())
        },
    }
}

fn show_provider_diagnostics(factory: &DefaultModelFactory) {
    let cpu_count = std::thread::available_parallelism()
        .map(std::num::NonZero::get)
        .unwrap_or(1);
    println!("System: {cpu_count} CPU cores detected");

    println!("\nExecution providers:");
    for provider in ExecutionProviderManager::list_providers() {
        let status = if provider.available { "available" } else { "not available" };
        println!("  {}: {} - {}", provider.name, status, provider.description);
    }

    println!("\nSegmentation models:");
    for variant in ModelVariant::all() {
        let path = factory.model_path(variant);
        let status = if path.is_file() { "installed" } else { "missing" };
        println!("  {}: {} ({})", variant, status, path.display());
    }

    if cfg!(not(feature = "onnx")) {
        println!("\nThis build has no ONNX support; only classical segmentation is used.");
    }
}

/// Read request text from a file or stdin
fn read_input(source: &str) -> Result<String> {
    if source == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read request from stdin")?;
        debug!("Read {} bytes from stdin", buffer.len());
        Ok(buffer)
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read request from {}", source))
    }
}

/// Write response text to a file or stdout
fn write_output(destination: &str, json: &str) -> Result<()> {
    if destination == "-" {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", json).context("Failed to write response to stdout")?;
        stdout.flush().context("Failed to flush stdout")?;
    } else {
        std::fs::write(destination, json)
            .with_context(|| format!("Failed to write response to {}", destination))?;
        info!("Response written to {}", destination);
    }
    Ok(())
}
