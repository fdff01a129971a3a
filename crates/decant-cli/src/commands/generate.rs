//! Generate command - sample a continuation from a causal language
//! model.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::info;

use decant_core::{
    ByteTokenizer, FinishReason, Generation, OrtBackend, SequenceGenerator, Tokenizer,
};

use super::{load_config, parse_token_ids};

/// Arguments for the generate command.
#[derive(Args)]
pub struct GenerateArgs {
    /// Prompt text (encoded one byte per token)
    #[arg(
        short,
        long,
        required_unless_present = "prompt_ids",
        conflicts_with = "prompt_ids"
    )]
    prompt: Option<String>,

    /// Prompt as comma-separated token ids (e.g. "464,3290,318")
    #[arg(long)]
    prompt_ids: Option<String>,

    /// Language model file (overrides config)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Maximum total sequence length, prompt included
    #[arg(long)]
    max_length: Option<usize>,

    /// Minimum sequence length before end-of-sequence is allowed
    #[arg(long)]
    min_length: Option<usize>,

    /// Top-k sampling cutoff
    #[arg(long)]
    top_k: Option<usize>,

    /// End-of-sequence token id
    #[arg(long)]
    eos_id: Option<i64>,

    /// Sampling seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

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
    /// Human-readable summary
    Text,
    /// Comma-separated token ids
    Tokens,
}

#[derive(Serialize)]
struct GenerateReport<'a> {
    prompt_len: usize,
    #[serde(flatten)]
    generation: &'a Generation,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

pub async fn run(args: GenerateArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let model_path = args
        .model
        .clone()
        .unwrap_or_else(|| config.model_path(&config.models.language_model));
    if !model_path.exists() {
        anyhow::bail!("Model file not found: {}", model_path.display());
    }

    // Assemble the prompt: ids verbatim, or text through the byte
    // tokenizer.
    let tokenizer = ByteTokenizer::new();
    let prompt_ids: Vec<i64> = match (&args.prompt, &args.prompt_ids) {
        (_, Some(ids)) => parse_token_ids(ids)?,
        (Some(prompt), None) => tokenizer.encode(prompt),
        (None, None) => anyhow::bail!("either --prompt or --prompt-ids is required"),
    };
    let attention_mask = vec![1i64; prompt_ids.len()];

    let mut options = config.generation.to_options();
    if let Some(max_length) = args.max_length {
        options.max_length = max_length;
    }
    if let Some(min_length) = args.min_length {
        options.min_length = min_length;
    }
    if let Some(top_k) = args.top_k {
        options.top_k = top_k;
    }
    if let Some(eos_id) = args.eos_id {
        options.eos_id = eos_id;
    }
    if let Some(seed) = args.seed {
        options.seed = Some(seed);
    }

    info!("Loading model: {}", model_path.display());
    let backend = OrtBackend::from_file(&model_path)?;
    let generator = SequenceGenerator::new(backend);

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(format!(
        "Generating up to {} tokens...",
        options.max_length.saturating_sub(prompt_ids.len())
    ));
    pb.enable_steady_tick(Duration::from_millis(80));

    let generation = generator.generate(&prompt_ids, &attention_mask, &options)?;

    pb.finish_and_clear();

    // Decode through the byte tokenizer only when the prompt came in as
    // text; arbitrary ids have no meaningful byte rendering.
    let text = args
        .prompt
        .as_ref()
        .map(|_| tokenizer.decode(&generation.tokens));

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&GenerateReport {
            prompt_len: prompt_ids.len(),
            generation: &generation,
            text: text.clone(),
        })?,
        OutputFormat::Tokens => generation
            .tokens
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(","),
        OutputFormat::Text => format_summary(&generation, prompt_ids.len(), text.as_deref()),
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

fn format_summary(generation: &Generation, prompt_len: usize, text: Option<&str>) -> String {
    let finish = match generation.finish {
        FinishReason::Stop => "stop",
        FinishReason::Length => "length",
    };
    let mut lines = Vec::new();
    if let Some(text) = text {
        lines.push(text.to_string());
        lines.push(String::new());
    }
    lines.push(format!(
        "{} tokens ({} sampled), finish: {}, {} steps, {} ms",
        generation.tokens.len(),
        generation.tokens.len() - prompt_len,
        finish,
        generation.steps,
        generation.elapsed_ms
    ));
    lines.join("\n")
}
