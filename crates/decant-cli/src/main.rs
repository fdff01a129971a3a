//! CLI application for decant sequence generation and CTC decoding.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{config, decode, generate, recognize};

/// Sequence decoding over ONNX models - generation and CTC recognition
#[derive(Parser)]
#[command(name = "decant")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a token sequence from a causal language model
    Generate(generate::GenerateArgs),

    /// Recognize text from a feature tensor with a CTC model
    Recognize(recognize::RecognizeArgs),

    /// Decode a CTC score matrix without running a model
    Decode(decode::DecodeArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Execute command
    match cli.command {
        Commands::Generate(args) => generate::run(args, cli.config.as_deref()).await,
        Commands::Recognize(args) => recognize::run(args, cli.config.as_deref()).await,
        Commands::Decode(args) => decode::run(args, cli.config.as_deref()).await,
        Commands::Config(args) => config::run(args).await,
    }
}
