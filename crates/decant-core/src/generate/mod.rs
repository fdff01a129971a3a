//! Autoregressive sequence generation with top-k sampling.
//!
//! The generator drives a causal language model one step at a time:
//! feed the whole sequence, take the logits for the last position, run
//! them through eos suppression, top-k filtering and softmax, then draw
//! the next token. Termination is checked strictly after sampling, so
//! the end-of-sequence token is never part of the result and reaching
//! `max_length` still costs one final engine call.

mod logits;

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::GenerateError;
use decant_inference::{InferenceBackend, InputTensor};

/// Default number of candidates kept by top-k filtering.
pub const DEFAULT_TOP_K: usize = 20;

/// Knobs for one generation run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Hard cap on total sequence length, prompt included.
    pub max_length: usize,

    /// Suppress the end-of-sequence token while the sequence is shorter
    /// than this. Zero disables suppression.
    pub min_length: usize,

    /// Number of candidate tokens kept per step. Ties with the k-th
    /// best logit are retained.
    pub top_k: usize,

    /// Token id that terminates generation.
    pub eos_id: i64,

    /// Seed for the sampling RNG. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl GenerateOptions {
    /// Options with default sampling settings.
    pub fn new(max_length: usize, eos_id: i64) -> Self {
        Self {
            max_length,
            min_length: 0,
            top_k: DEFAULT_TOP_K,
            eos_id,
            seed: None,
        }
    }

    /// Set the minimum sequence length before eos may be sampled.
    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    /// Set the top-k cutoff.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Fix the sampling seed for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Why a generation run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    /// The model sampled the end-of-sequence token.
    Stop,
    /// The sequence reached `max_length`.
    Length,
}

/// Outcome of a generation run.
#[derive(Debug, Clone, Serialize)]
pub struct Generation {
    /// Full token sequence: the prompt followed by sampled tokens. The
    /// end-of-sequence token is never included.
    pub tokens: Vec<i64>,

    /// Attention mask matching `tokens` entry for entry; sampled tokens
    /// always carry mask 1.
    pub attention_mask: Vec<i64>,

    /// Why generation stopped.
    pub finish: FinishReason,

    /// Engine calls issued, one per sampled token (the terminal sample
    /// included).
    pub steps: usize,

    /// Wall-clock duration of the run in milliseconds.
    pub elapsed_ms: u64,
}

/// Autoregressive generator over an inference backend.
///
/// Tensor names default to the usual causal-LM export conventions
/// (`input_ids`, `attention_mask`, `logits`) and can be overridden for
/// models exported with different port names.
pub struct SequenceGenerator<B: InferenceBackend> {
    backend: B,
    ids_name: String,
    mask_name: String,
    logits_name: String,
}

impl<B: InferenceBackend> SequenceGenerator<B> {
    /// Create a generator with default tensor names.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            ids_name: "input_ids".to_string(),
            mask_name: "attention_mask".to_string(),
            logits_name: "logits".to_string(),
        }
    }

    /// Override the model's input tensor names.
    pub fn with_input_names(mut self, ids: impl Into<String>, mask: impl Into<String>) -> Self {
        self.ids_name = ids.into();
        self.mask_name = mask.into();
        self
    }

    /// Override the model's logits output name.
    pub fn with_logits_name(mut self, name: impl Into<String>) -> Self {
        self.logits_name = name.into();
        self
    }

    /// Generate a continuation of `prompt`.
    ///
    /// The RNG is seeded from `options.seed`, or from the OS when no
    /// seed is set.
    pub fn generate(
        &self,
        prompt: &[i64],
        attention_mask: &[i64],
        options: &GenerateOptions,
    ) -> Result<Generation, GenerateError> {
        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.generate_with_rng(prompt, attention_mask, options, &mut rng)
    }

    /// Generate a continuation of `prompt`, sampling from a caller
    /// supplied RNG.
    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        prompt: &[i64],
        attention_mask: &[i64],
        options: &GenerateOptions,
        rng: &mut R,
    ) -> Result<Generation, GenerateError> {
        validate_request(prompt, attention_mask, options)?;

        let start = Instant::now();
        let mut tokens = prompt.to_vec();
        let mut mask = attention_mask.to_vec();
        let mut steps = 0usize;

        let finish = loop {
            steps += 1;
            let mut step_logits = self.next_logits(&tokens, &mask)?;

            logits::suppress_eos(&mut step_logits, options.eos_id, tokens.len(), options.min_length);
            logits::top_k_filter(&mut step_logits, options.top_k);
            let probs = logits::softmax(&step_logits);
            let next = logits::sample_index(&probs, rng) as i64;
            trace!("Step {}: sampled token {}", steps, next);

            // Termination is checked strictly after sampling: the eos
            // token is never appended, and a run that is already at
            // max_length still issues one engine call.
            if next == options.eos_id {
                break FinishReason::Stop;
            }
            if tokens.len() >= options.max_length {
                break FinishReason::Length;
            }
            tokens.push(next);
            mask.push(1);
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        debug!(
            "Generated {} tokens in {} steps ({} ms, finish: {:?})",
            tokens.len() - prompt.len(),
            steps,
            elapsed_ms,
            finish
        );

        Ok(Generation {
            tokens,
            attention_mask: mask,
            finish,
            steps,
            elapsed_ms,
        })
    }

    /// Run the engine on the current sequence and pull out the logits
    /// for the last position.
    fn next_logits(&self, tokens: &[i64], mask: &[i64]) -> Result<Vec<f32>, GenerateError> {
        let len = tokens.len();
        let ids = InputTensor::from_i64(tokens.to_vec(), &[1, len])?;
        let attention = InputTensor::from_i64(mask.to_vec(), &[1, len])?;

        let outputs = self.backend.run(&[
            (self.ids_name.as_str(), ids),
            (self.mask_name.as_str(), attention),
        ])?;

        let output = outputs.take_or_first(&self.logits_name).ok_or_else(|| {
            GenerateError::UnexpectedOutput("model produced no outputs".to_string())
        })?;

        let dtype = output.dtype();
        let arr = output.into_f32().ok_or_else(|| {
            GenerateError::UnexpectedOutput(format!(
                "expected float32 logits, got {}",
                dtype.name()
            ))
        })?;

        let shape = arr.shape();
        let (rows, vocab) = match shape {
            &[1, rows, vocab] if rows > 0 && vocab > 0 => (rows, vocab),
            &[1, vocab] if vocab > 0 => (1, vocab),
            other => {
                return Err(GenerateError::UnexpectedOutput(format!(
                    "expected [1, seq, vocab] or [1, vocab] logits, got {:?}",
                    other
                )));
            }
        };

        // Only the last position feeds the next-token distribution.
        Ok(arr.iter().copied().skip((rows - 1) * vocab).take(vocab).collect())
    }
}

fn validate_request(
    prompt: &[i64],
    mask: &[i64],
    options: &GenerateOptions,
) -> Result<(), GenerateError> {
    if prompt.is_empty() {
        return Err(GenerateError::InvalidInput(
            "prompt must not be empty".to_string(),
        ));
    }
    if mask.len() != prompt.len() {
        return Err(GenerateError::InvalidInput(format!(
            "attention mask has {} entries for {} prompt tokens",
            mask.len(),
            prompt.len()
        )));
    }
    if let Some(bad) = mask.iter().find(|&&m| m != 0 && m != 1) {
        return Err(GenerateError::InvalidInput(format!(
            "attention mask entries must be 0 or 1, got {}",
            bad
        )));
    }
    if options.max_length < prompt.len() {
        return Err(GenerateError::InvalidInput(format!(
            "max_length {} is shorter than the prompt ({} tokens)",
            options.max_length,
            prompt.len()
        )));
    }
    if options.top_k == 0 {
        return Err(GenerateError::InvalidInput(
            "top_k must be at least 1".to_string(),
        ));
    }
    Ok(())
}
