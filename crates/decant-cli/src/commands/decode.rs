//! Decode command - greedy CTC decoding of a stored score matrix.
//!
//! No model is involved: the input file already holds the per-timestep
//! label scores, so this is the fastest way to sanity-check a charlist
//! against captured model outputs.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use decant_core::{Charlist, CtcDecoder};

use super::{load_config, read_tensor};

/// Arguments for the decode command.
#[derive(Args)]
pub struct DecodeArgs {
    /// Score matrix file: JSON with "shape" [timesteps, labels] (a
    /// leading batch axis of 1 is accepted) and flat "data"
    #[arg(required = true)]
    input: PathBuf,

    /// Charlist file, one symbol per line (overrides config)
    #[arg(long)]
    charlist: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Decoded text and emitting frames as JSON
    Json,
    /// Decoded text only
    Text,
}

pub async fn run(args: DecodeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let charlist_path = args
        .charlist
        .clone()
        .unwrap_or_else(|| config.model_path(&config.models.charlist));
    if !charlist_path.exists() {
        anyhow::bail!("Charlist file not found: {}", charlist_path.display());
    }

    let charlist = Charlist::from_file(&charlist_path)?;
    info!(
        "Decoding {} with {} symbols",
        args.input.display(),
        charlist.len()
    );

    let scores = read_tensor(&args.input)?;
    let decoder = CtcDecoder::new(charlist);
    let decoded = decoder.decode_dyn(&scores)?;

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&decoded)?,
        OutputFormat::Text => decoded.text.clone(),
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    Ok(())
}
