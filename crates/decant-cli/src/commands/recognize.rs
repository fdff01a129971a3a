//! Recognize command - run a CTC recognition model on stored features.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use decant_core::{Charlist, CtcDecoder, OrtBackend, Recognizer};

use super::{load_config, read_tensor};

/// Arguments for the recognize command.
#[derive(Args)]
pub struct RecognizeArgs {
    /// Feature tensor file: JSON with "shape" and flat "data", already
    /// preprocessed for the model
    #[arg(short, long)]
    input: PathBuf,

    /// Recognition model file (overrides config)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Charlist file, one symbol per line (overrides config)
    #[arg(long)]
    charlist: Option<PathBuf>,

    /// Feature input tensor name (overrides config)
    #[arg(long)]
    input_name: Option<String>,

    /// Score output tensor name (overrides config)
    #[arg(long)]
    scores_name: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Full result as JSON
    Json,
    /// Recognized text only
    Text,
}

pub async fn run(args: RecognizeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let model_path = args
        .model
        .clone()
        .unwrap_or_else(|| config.model_path(&config.models.recognition_model));
    if !model_path.exists() {
        anyhow::bail!("Model file not found: {}", model_path.display());
    }

    let charlist_path = args
        .charlist
        .clone()
        .unwrap_or_else(|| config.model_path(&config.models.charlist));
    if !charlist_path.exists() {
        anyhow::bail!("Charlist file not found: {}", charlist_path.display());
    }

    let charlist = Charlist::from_file(&charlist_path)?;
    let decoder = CtcDecoder::new(charlist);

    info!("Loading model: {}", model_path.display());
    let backend = OrtBackend::from_file(&model_path)?;
    let recognizer = Recognizer::new(backend, decoder)
        .with_input_name(
            args.input_name
                .unwrap_or_else(|| config.recognition.input_name.clone()),
        )
        .with_scores_name(
            args.scores_name
                .unwrap_or_else(|| config.recognition.scores_name.clone()),
        );

    let features = read_tensor(&args.input)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message("Recognizing...");
    pb.enable_steady_tick(Duration::from_millis(80));

    let recognition = recognizer.recognize(features)?;

    pb.finish_and_clear();

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&recognition)?,
        OutputFormat::Text => recognition.text.clone(),
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
