//! ONNX inference abstraction layer for decant.
//!
//! Both decoding pipelines in decant (autoregressive generation and CTC
//! recognition) treat the inference engine as an external collaborator:
//! named input tensors go in, named output tensors come out, and the
//! engine's lifecycle is owned by whoever constructed it. This crate
//! provides that contract plus two interchangeable implementations:
//! - `ort` with the XNNPACK execution provider for native platforms
//! - `tract` directly for WASM/browser environments

mod backend;
mod error;
mod tensor;

pub use backend::InferenceBackend;
pub use error::InferenceError;
pub use tensor::{InputTensor, OutputTensor, Outputs, TensorType};

#[cfg(feature = "native")]
pub use backend::ort::OrtBackend;

#[cfg(feature = "wasm")]
pub use backend::tract::{InputSpec, TractBackend};

/// Result type for inference operations.
pub type Result<T> = std::result::Result<T, InferenceError>;
