//! Both decoding pipelines run end to end against scripted engines,
//! touching only the public API.

use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::{Array3, ArrayD, IxDyn};
use pretty_assertions::assert_eq;

use decant_core::{
    Charlist, CtcDecoder, FinishReason, GenerateOptions, InferenceBackend, InputTensor,
    OutputTensor, Outputs, Recognizer, SequenceGenerator,
};

const VOCAB: usize = 6;
const EOS: i64 = 5;

/// Causal-LM stand-in replaying one scripted logit row per call.
struct ScriptedLm {
    rows: Vec<Vec<f32>>,
    calls: AtomicUsize,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

impl ScriptedLm {
    fn new(rows: Vec<Vec<f32>>) -> Self {
        Self {
            rows,
            calls: AtomicUsize::new(0),
            inputs: vec!["input_ids".to_string(), "attention_mask".to_string()],
            outputs: vec!["logits".to_string()],
        }
    }
}

impl InferenceBackend for ScriptedLm {
    fn run(&self, inputs: &[(&str, InputTensor)]) -> decant_inference::Result<Outputs> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(inputs.len(), 2);

        let row = self.rows[call.min(self.rows.len() - 1)].clone();
        let arr = ArrayD::from_shape_vec(IxDyn(&[1, VOCAB]), row).unwrap();
        Ok(Outputs::new(vec![(
            "logits".to_string(),
            OutputTensor::Float32(arr),
        )]))
    }

    fn input_names(&self) -> &[String] {
        &self.inputs
    }

    fn output_names(&self) -> &[String] {
        &self.outputs
    }
}

/// Labeling-model stand-in returning one fixed score tensor.
struct ScoresEngine {
    scores: ArrayD<f32>,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

impl ScoresEngine {
    fn new(scores: ArrayD<f32>) -> Self {
        Self {
            scores,
            inputs: vec!["x".to_string()],
            outputs: vec!["logits".to_string()],
        }
    }
}

impl InferenceBackend for ScoresEngine {
    fn run(&self, _inputs: &[(&str, InputTensor)]) -> decant_inference::Result<Outputs> {
        Ok(Outputs::new(vec![(
            "logits".to_string(),
            OutputTensor::Float32(self.scores.clone()),
        )]))
    }

    fn input_names(&self) -> &[String] {
        &self.inputs
    }

    fn output_names(&self) -> &[String] {
        &self.outputs
    }
}

fn spiked(idx: usize) -> Vec<f32> {
    let mut row = vec![0.0; VOCAB];
    row[idx] = 100.0;
    row
}

#[test]
fn test_generation_pipeline_stops_on_eos() {
    let rows = vec![spiked(2), spiked(4), spiked(EOS as usize)];
    let generator = SequenceGenerator::new(ScriptedLm::new(rows));
    let options = GenerateOptions::new(16, EOS).with_top_k(1);

    let generation = generator.generate(&[1, 3], &[1, 1], &options).unwrap();

    assert_eq!(generation.tokens, vec![1, 3, 2, 4]);
    assert_eq!(generation.attention_mask, vec![1, 1, 1, 1]);
    assert_eq!(generation.finish, FinishReason::Stop);
    assert_eq!(generation.steps, 3);
}

#[test]
fn test_generation_pipeline_is_reproducible_with_seed() {
    // Several near-equal candidates so the sampler has real choices.
    let mut row = vec![0.0; VOCAB];
    row[1] = 1.0;
    row[2] = 1.05;
    row[3] = 0.95;
    let options = GenerateOptions::new(10, EOS).with_top_k(3).with_seed(42);

    let first = SequenceGenerator::new(ScriptedLm::new(vec![row.clone()]))
        .generate(&[0], &[1], &options)
        .unwrap();
    let second = SequenceGenerator::new(ScriptedLm::new(vec![row]))
        .generate(&[0], &[1], &options)
        .unwrap();

    assert_eq!(first.tokens, second.tokens);
    assert_eq!(first.finish, FinishReason::Length);
}

#[test]
fn test_recognition_pipeline_decodes_argmax_labels() {
    let labels = [0usize, 0, 2, 2, 3, 0, 3];
    let mut scores = Array3::<f32>::zeros((1, labels.len(), 4));
    for (t, &label) in labels.iter().enumerate() {
        scores[[0, t, label]] = 1.0;
    }
    let scores = scores.into_dyn();

    let decoder = CtcDecoder::new(Charlist::from_symbols(vec!['A', 'B', 'C']).unwrap());
    let recognizer = Recognizer::new(ScoresEngine::new(scores.clone()), decoder);

    let features = ArrayD::zeros(IxDyn(&[1, 1, 8, 32]));
    let recognition = recognizer.recognize(features).unwrap();
    assert_eq!(recognition.text, "BCC");

    // The offline decoder agrees with the full pipeline.
    let offline = recognizer.decoder().decode_dyn(&scores).unwrap();
    assert_eq!(offline.text, recognition.text);
    assert_eq!(offline.frames, recognition.frames);
}
