//! Error types for the decant-core library.

use thiserror::Error;

/// Main error type for the decant library.
#[derive(Error, Debug)]
pub enum DecantError {
    /// Sequence generation error.
    #[error("generation error: {0}")]
    Generate(#[from] GenerateError),

    /// CTC decoding error.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Inference error from the inference layer.
    #[error("inference error: {0}")]
    Inference(#[from] decant_inference::InferenceError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised by the autoregressive generation loop.
#[derive(Error, Debug)]
pub enum GenerateError {
    /// The caller handed in malformed arguments (empty prompt, mask
    /// mismatch, impossible length bounds).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The underlying engine call failed. The loop surfaces this
    /// immediately and never retries.
    #[error("engine failure: {0}")]
    Engine(#[from] decant_inference::InferenceError),

    /// The engine answered, but with outputs that do not fit the
    /// causal-LM contract (wrong name, dtype, or shape).
    #[error("unexpected engine output: {0}")]
    UnexpectedOutput(String),
}

/// Errors raised by the CTC decoder and its charlist resources.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The charlist has no symbols.
    #[error("charlist is empty")]
    EmptyCharlist,

    /// Failed to read a charlist file.
    #[error("failed to load charlist: {0}")]
    CharlistLoad(String),

    /// The score tensor is not a `[timesteps, labels]` matrix (a unit
    /// batch axis is the only extra axis tolerated).
    #[error("expected a [timesteps, labels] score matrix, got shape {0:?}")]
    MatrixRank(Vec<usize>),

    /// The score matrix has no label columns to take an argmax over.
    #[error("score matrix has no label columns")]
    EmptyLabelAxis,

    /// The label axis is wider than the charlist plus the blank.
    #[error("charlist with {symbols} symbols cannot cover {labels} labels")]
    CharlistTooShort { symbols: usize, labels: usize },
}

/// Result type for the decant library.
pub type Result<T> = std::result::Result<T, DecantError>;
