//! Sequence-labeling recognition: one engine call plus CTC decoding.

use std::time::Instant;

use ndarray::ArrayD;
use serde::Serialize;
use tracing::{debug, trace};

use crate::ctc::CtcDecoder;
use crate::error::DecantError;
use decant_inference::{InferenceBackend, InferenceError, InputTensor};

/// Recognition result for a single input.
#[derive(Debug, Clone, Serialize)]
pub struct Recognition {
    /// Decoded text.
    pub text: String,

    /// Time step that emitted each character of `text`.
    pub frames: Vec<usize>,

    /// Wall-clock duration of the run in milliseconds.
    pub elapsed_ms: u64,
}

/// Recognizer pairing an inference backend with a CTC decoder.
///
/// This drives the fixed-width labeling contract: the caller hands in
/// an already prepared feature tensor, the model scores every time
/// step in a single call, and the decoder collapses the score matrix
/// into text. Feature extraction is the caller's concern.
pub struct Recognizer<B: InferenceBackend> {
    backend: B,
    decoder: CtcDecoder,
    input_name: String,
    scores_name: String,
}

impl<B: InferenceBackend> Recognizer<B> {
    /// Create a recognizer with default tensor names (`x` in, `logits`
    /// out).
    pub fn new(backend: B, decoder: CtcDecoder) -> Self {
        Self {
            backend,
            decoder,
            input_name: "x".to_string(),
            scores_name: "logits".to_string(),
        }
    }

    /// Override the model's feature input name.
    pub fn with_input_name(mut self, name: impl Into<String>) -> Self {
        self.input_name = name.into();
        self
    }

    /// Override the model's score output name.
    pub fn with_scores_name(mut self, name: impl Into<String>) -> Self {
        self.scores_name = name.into();
        self
    }

    /// The decoder this recognizer maps scores through.
    pub fn decoder(&self) -> &CtcDecoder {
        &self.decoder
    }

    /// Recognize the text in one prepared feature tensor.
    pub fn recognize(&self, features: ArrayD<f32>) -> Result<Recognition, DecantError> {
        let start = Instant::now();

        let outputs = self
            .backend
            .run(&[(self.input_name.as_str(), InputTensor::Float32(features))])?;

        let output = outputs.take_or_first(&self.scores_name).ok_or_else(|| {
            DecantError::Inference(InferenceError::OutputExtraction(
                "model produced no outputs".to_string(),
            ))
        })?;

        let dtype = output.dtype();
        let scores = output.into_f32().ok_or_else(|| {
            DecantError::Inference(InferenceError::OutputExtraction(format!(
                "expected float32 scores, got {}",
                dtype.name()
            )))
        })?;
        trace!("Scores shape: {:?}", scores.shape());

        let decoded = self.decoder.decode_dyn(&scores)?;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        debug!(
            "Recognized {} characters in {} ms",
            decoded.text.chars().count(),
            elapsed_ms
        );

        Ok(Recognition {
            text: decoded.text,
            frames: decoded.frames,
            elapsed_ms,
        })
    }
}
