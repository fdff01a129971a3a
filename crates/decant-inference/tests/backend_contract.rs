//! The backend trait as a downstream crate sees it: implemented on a
//! scripted engine and driven through a trait object.

use pretty_assertions::assert_eq;

use decant_inference::{
    InferenceBackend, InferenceError, InputTensor, OutputTensor, Outputs, Result, TensorType,
};

/// Engine that doubles a float input and returns it under `doubled`.
struct DoublingEngine {
    inputs: Vec<String>,
    outputs: Vec<String>,
}

impl DoublingEngine {
    fn new() -> Self {
        Self {
            inputs: vec!["x".to_string()],
            outputs: vec!["doubled".to_string()],
        }
    }
}

impl InferenceBackend for DoublingEngine {
    fn run(&self, inputs: &[(&str, InputTensor)]) -> Result<Outputs> {
        let (_, tensor) = inputs
            .first()
            .ok_or_else(|| InferenceError::InvalidInput("no inputs".to_string()))?;
        match tensor {
            InputTensor::Float32(arr) => Ok(Outputs::new(vec![(
                self.outputs[0].clone(),
                OutputTensor::Float32(arr.mapv(|v| v * 2.0)),
            )])),
            other => Err(InferenceError::InvalidInput(format!(
                "expected float32, got {}",
                other.dtype().name()
            ))),
        }
    }

    fn input_names(&self) -> &[String] {
        &self.inputs
    }

    fn output_names(&self) -> &[String] {
        &self.outputs
    }
}

#[test]
fn test_backend_runs_as_trait_object() {
    let engine: Box<dyn InferenceBackend> = Box::new(DoublingEngine::new());
    assert_eq!(engine.input_names()[0], "x");

    let input = InputTensor::from_f32(vec![1.0, 2.5], &[1, 2]).unwrap();
    let outputs = engine.run(&[("x", input)]).unwrap();
    assert_eq!(outputs.names().collect::<Vec<_>>(), vec!["doubled"]);

    let doubled = outputs.take("doubled").unwrap();
    assert_eq!(doubled.dtype(), TensorType::Float32);
    assert_eq!(doubled.shape(), &[1, 2]);
    let values: Vec<f32> = doubled.into_f32().unwrap().iter().copied().collect();
    assert_eq!(values, vec![2.0, 5.0]);
}

#[test]
fn test_rejected_input_surfaces_as_invalid_input() {
    let engine = DoublingEngine::new();
    let input = InputTensor::from_i64(vec![1, 2], &[1, 2]).unwrap();

    let err = engine.run(&[("x", input)]).unwrap_err();
    assert!(matches!(err, InferenceError::InvalidInput(_)));
}

#[test]
fn test_trait_objects_stay_send_sync() {
    fn is_send_sync<T: Send + Sync + ?Sized>() {}
    is_send_sync::<dyn InferenceBackend>();
}
