//! Tract backend for cross-platform ONNX inference.
//!
//! Tract plans are fully typed, so every model input needs a concrete
//! dtype and shape before the graph can be optimized. That makes this
//! backend a natural fit for the fixed-width sequence-labeling contract;
//! variable-length generation should prefer the ort backend.

use std::path::Path;

use ndarray::ArrayD;
use tract_onnx::prelude::*;
use tracing::debug;

use crate::error::InferenceError;
use crate::tensor::{InputTensor, OutputTensor, Outputs, TensorType};
use crate::{InferenceBackend, Result};

type RunnablePlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Concrete dtype and shape for one model input.
///
/// Tract cannot keep dynamic dimensions, so callers describe each input
/// up front, e.g. `InputSpec::i64(&[1, 128])` for padded token ids or
/// `InputSpec::f32(&[1, 1, 96, 2000])` for a recognition feature map.
#[derive(Debug, Clone)]
pub struct InputSpec {
    /// Element type of the input tensor.
    pub dtype: TensorType,
    /// Fully concrete input shape.
    pub shape: Vec<usize>,
}

impl InputSpec {
    /// Spec for a float32 input.
    pub fn f32(shape: &[usize]) -> Self {
        Self {
            dtype: TensorType::Float32,
            shape: shape.to_vec(),
        }
    }

    /// Spec for an int64 input.
    pub fn i64(shape: &[usize]) -> Self {
        Self {
            dtype: TensorType::Int64,
            shape: shape.to_vec(),
        }
    }

    fn datum_type(&self) -> DatumType {
        match self.dtype {
            TensorType::Float32 => f32::datum_type(),
            TensorType::Float64 => f64::datum_type(),
            TensorType::Int32 => i32::datum_type(),
            TensorType::Int64 => i64::datum_type(),
            TensorType::Uint8 => u8::datum_type(),
        }
    }
}

/// Backend using Tract for cross-platform ONNX inference.
pub struct TractBackend {
    model: RunnablePlan,
    input_names: Vec<String>,
    output_names: Vec<String>,
}

impl TractBackend {
    /// Load a model from a file path, pinning each input to a spec.
    pub fn from_file_with_specs<P: AsRef<Path>>(path: P, specs: &[InputSpec]) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading ONNX model with Tract from: {}", path.display());

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| InferenceError::ModelLoad(format!("failed to load model: {}", e)))?;

        Self::finish(model, specs)
    }

    /// Load a model from bytes, pinning each input to a spec.
    pub fn from_bytes_with_specs(bytes: &[u8], specs: &[InputSpec]) -> Result<Self> {
        debug!("Loading ONNX model with Tract from {} bytes", bytes.len());

        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(bytes))
            .map_err(|e| InferenceError::ModelLoad(format!("failed to load model: {}", e)))?;

        Self::finish(model, specs)
    }

    fn finish(mut model: InferenceModel, specs: &[InputSpec]) -> Result<Self> {
        // Replace every dynamic dimension with the caller's concrete spec.
        for (index, spec) in specs.iter().enumerate() {
            model
                .set_input_fact(
                    index,
                    InferenceFact::dt_shape(spec.datum_type(), &spec.shape),
                )
                .map_err(|e| {
                    InferenceError::ModelLoad(format!(
                        "failed to set input fact {}: {}",
                        index, e
                    ))
                })?;
        }

        let model = model
            .into_typed()
            .map_err(|e| InferenceError::ModelLoad(format!("failed to type model: {}", e)))?
            .into_optimized()
            .map_err(|e| InferenceError::ModelLoad(format!("failed to optimize: {}", e)))?
            .into_runnable()
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?;

        // Tract does not preserve ONNX tensor names; inputs and outputs
        // are positional.
        let input_names = (0..specs.len().max(1))
            .map(|i| format!("input_{}", i))
            .collect();
        let output_names = vec!["output_0".to_string()];

        Ok(Self {
            model,
            input_names,
            output_names,
        })
    }

    fn convert_input(tensor: &InputTensor) -> Result<TValue> {
        let shape: TVec<usize> = tensor.shape().iter().copied().collect();
        match tensor {
            InputTensor::Float32(arr) => Self::to_tvalue(shape, arr.iter().copied().collect()),
            InputTensor::Float64(arr) => Self::to_tvalue(shape, arr.iter().copied().collect()),
            InputTensor::Int32(arr) => Self::to_tvalue(shape, arr.iter().copied().collect()),
            InputTensor::Int64(arr) => Self::to_tvalue(shape, arr.iter().copied().collect()),
            InputTensor::Uint8(arr) => Self::to_tvalue(shape, arr.iter().copied().collect()),
        }
    }

    fn to_tvalue<T: Datum>(shape: TVec<usize>, data: Vec<T>) -> Result<TValue> {
        let arr = tract_ndarray::ArrayD::from_shape_vec(tract_ndarray::IxDyn(shape.as_slice()), data)
            .map_err(|e| InferenceError::InvalidInput(e.to_string()))?;
        Ok(arr.into_tvalue())
    }

    fn extract_output(name: &str, output: &TValue) -> Result<OutputTensor> {
        if let Ok(view) = output.to_array_view::<f32>() {
            let arr = ArrayD::from_shape_vec(
                ndarray::IxDyn(view.shape()),
                view.iter().copied().collect(),
            )
            .map_err(|e| InferenceError::OutputExtraction(e.to_string()))?;
            return Ok(OutputTensor::Float32(arr));
        }
        if let Ok(view) = output.to_array_view::<i64>() {
            let arr = ArrayD::from_shape_vec(
                ndarray::IxDyn(view.shape()),
                view.iter().copied().collect(),
            )
            .map_err(|e| InferenceError::OutputExtraction(e.to_string()))?;
            return Ok(OutputTensor::Int64(arr));
        }
        if let Ok(view) = output.to_array_view::<i32>() {
            let arr = ArrayD::from_shape_vec(
                ndarray::IxDyn(view.shape()),
                view.iter().copied().collect(),
            )
            .map_err(|e| InferenceError::OutputExtraction(e.to_string()))?;
            return Ok(OutputTensor::Int32(arr));
        }
        Err(InferenceError::OutputExtraction(format!(
            "unsupported output type for '{}'",
            name
        )))
    }
}

impl InferenceBackend for TractBackend {
    fn run(&self, inputs: &[(&str, InputTensor)]) -> Result<Outputs> {
        let tract_inputs: TVec<TValue> = inputs
            .iter()
            .map(|(_, tensor)| Self::convert_input(tensor))
            .collect::<Result<TVec<_>>>()?;

        let outputs = self
            .model
            .run(tract_inputs)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let mut results = Vec::with_capacity(outputs.len());
        for (idx, output) in outputs.iter().enumerate() {
            let name = self
                .output_names
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("output_{}", idx));
            let tensor = Self::extract_output(&name, output)?;
            results.push((name, tensor));
        }

        Ok(Outputs::new(results))
    }

    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }
}
