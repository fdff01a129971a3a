//! Core library for decant decoding pipelines.
//!
//! This crate provides:
//! - Autoregressive sequence generation with top-k sampling over a
//!   causal language model
//! - Greedy CTC decoding of per-timestep label scores, with charlist
//!   resources and a recognizer that pairs decoding with a model
//! - A tokenizer seam between text and token ids
//!
//! Model execution is delegated to `decant-inference`; both pipelines
//! are generic over its `InferenceBackend` trait, so they run against
//! ONNX sessions in production and scripted backends in tests.

pub mod config;
pub mod ctc;
pub mod error;
pub mod generate;
pub mod recognize;
pub mod tokenizer;

pub use config::{DecantConfig, GenerationConfig, ModelConfig, RecognitionConfig};
pub use ctc::{Charlist, CtcDecoder, Decoded, BLANK_LABEL};
pub use error::{DecantError, DecodeError, GenerateError, Result};
pub use generate::{FinishReason, GenerateOptions, Generation, SequenceGenerator, DEFAULT_TOP_K};
pub use recognize::{Recognition, Recognizer};
pub use tokenizer::{ByteTokenizer, Tokenizer};

/// Re-export inference types.
pub use decant_inference::{InferenceBackend, InputTensor, OutputTensor, Outputs};

#[cfg(feature = "native")]
pub use decant_inference::OrtBackend;

#[cfg(feature = "wasm")]
pub use decant_inference::{InputSpec, TractBackend};
