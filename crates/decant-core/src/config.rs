//! Configuration structures for the decant pipelines.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::generate::{GenerateOptions, DEFAULT_TOP_K};

/// Main configuration for the decant pipelines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecantConfig {
    /// Sequence generation configuration.
    pub generation: GenerationConfig,

    /// Recognition configuration.
    pub recognition: RecognitionConfig,

    /// Model configuration.
    pub models: ModelConfig,
}

impl Default for DecantConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            recognition: RecognitionConfig::default(),
            models: ModelConfig::default(),
        }
    }
}

/// Sequence generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Hard cap on total sequence length, prompt included.
    pub max_length: usize,

    /// Suppress the end-of-sequence token below this sequence length.
    pub min_length: usize,

    /// Number of candidate tokens kept per sampling step.
    pub top_k: usize,

    /// End-of-sequence token id.
    pub eos_id: i64,

    /// Fixed sampling seed; omit for OS-seeded runs.
    pub seed: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_length: 128,
            min_length: 0,
            top_k: DEFAULT_TOP_K,
            eos_id: 50256, // GPT-2 <|endoftext|>
            seed: None,
        }
    }
}

impl GenerationConfig {
    /// Turn the configuration into per-run generation options.
    pub fn to_options(&self) -> GenerateOptions {
        GenerateOptions {
            max_length: self.max_length,
            min_length: self.min_length,
            top_k: self.top_k,
            eos_id: self.eos_id,
            seed: self.seed,
        }
    }
}

/// Recognition configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Feature input tensor name of the recognition model.
    pub input_name: String,

    /// Score output tensor name of the recognition model.
    pub scores_name: String,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            input_name: "x".to_string(),
            scores_name: "logits".to_string(),
        }
    }
}

/// Model file paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Causal language model file name.
    pub language_model: String,

    /// CTC recognition model file name.
    pub recognition_model: String,

    /// Charlist file name for the recognition model.
    pub charlist: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            language_model: "lm.onnx".to_string(),
            recognition_model: "rec.onnx".to_string(),
            charlist: "charlist.txt".to_string(),
        }
    }
}

impl DecantConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }

    /// Get the full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.models.model_dir.join(model_name)
    }
}
