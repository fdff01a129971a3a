//! Tensor types for inference input/output.

use ndarray::{ArrayD, IxDyn};

use crate::error::InferenceError;
use crate::Result;

/// Supported tensor data types.
///
/// Covers the dtypes the decant pipelines exchange with models: int64
/// token ids and attention masks, float32 features and logits, plus the
/// float64/int32/uint8 variants some exported models declare instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorType {
    Float32,
    Float64,
    Int32,
    Int64,
    Uint8,
}

impl TensorType {
    /// Human-readable dtype name for error messages.
    pub fn name(self) -> &'static str {
        match self {
            TensorType::Float32 => "float32",
            TensorType::Float64 => "float64",
            TensorType::Int32 => "int32",
            TensorType::Int64 => "int64",
            TensorType::Uint8 => "uint8",
        }
    }
}

/// Input tensor for inference.
#[derive(Debug, Clone)]
pub enum InputTensor {
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
    Int32(ArrayD<i32>),
    Int64(ArrayD<i64>),
    Uint8(ArrayD<u8>),
}

impl InputTensor {
    /// Get the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        match self {
            InputTensor::Float32(arr) => arr.shape(),
            InputTensor::Float64(arr) => arr.shape(),
            InputTensor::Int32(arr) => arr.shape(),
            InputTensor::Int64(arr) => arr.shape(),
            InputTensor::Uint8(arr) => arr.shape(),
        }
    }

    /// Get the data type of the tensor.
    pub fn dtype(&self) -> TensorType {
        match self {
            InputTensor::Float32(_) => TensorType::Float32,
            InputTensor::Float64(_) => TensorType::Float64,
            InputTensor::Int32(_) => TensorType::Int32,
            InputTensor::Int64(_) => TensorType::Int64,
            InputTensor::Uint8(_) => TensorType::Uint8,
        }
    }

    /// Create a Float32 tensor from raw data and shape.
    pub fn from_f32(data: Vec<f32>, shape: &[usize]) -> Result<Self> {
        let arr = ArrayD::from_shape_vec(IxDyn(shape), data)
            .map_err(|e| InferenceError::InvalidInput(e.to_string()))?;
        Ok(InputTensor::Float32(arr))
    }

    /// Create an Int64 tensor from raw data and shape.
    ///
    /// Token ids and attention masks go through here as `[1, len]`.
    pub fn from_i64(data: Vec<i64>, shape: &[usize]) -> Result<Self> {
        let arr = ArrayD::from_shape_vec(IxDyn(shape), data)
            .map_err(|e| InferenceError::InvalidInput(e.to_string()))?;
        Ok(InputTensor::Int64(arr))
    }
}

/// Output tensor from inference.
#[derive(Debug, Clone)]
pub enum OutputTensor {
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
    Int32(ArrayD<i32>),
    Int64(ArrayD<i64>),
    Uint8(ArrayD<u8>),
}

impl OutputTensor {
    /// Get the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        match self {
            OutputTensor::Float32(arr) => arr.shape(),
            OutputTensor::Float64(arr) => arr.shape(),
            OutputTensor::Int32(arr) => arr.shape(),
            OutputTensor::Int64(arr) => arr.shape(),
            OutputTensor::Uint8(arr) => arr.shape(),
        }
    }

    /// Get the data type of the tensor.
    pub fn dtype(&self) -> TensorType {
        match self {
            OutputTensor::Float32(_) => TensorType::Float32,
            OutputTensor::Float64(_) => TensorType::Float64,
            OutputTensor::Int32(_) => TensorType::Int32,
            OutputTensor::Int64(_) => TensorType::Int64,
            OutputTensor::Uint8(_) => TensorType::Uint8,
        }
    }

    /// Try to get the inner Float32 array.
    pub fn as_f32(&self) -> Option<&ArrayD<f32>> {
        match self {
            OutputTensor::Float32(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to get the inner Int64 array.
    pub fn as_i64(&self) -> Option<&ArrayD<i64>> {
        match self {
            OutputTensor::Int64(arr) => Some(arr),
            _ => None,
        }
    }

    /// Consume the tensor and return the Float32 array, if that is its dtype.
    pub fn into_f32(self) -> Option<ArrayD<f32>> {
        match self {
            OutputTensor::Float32(arr) => Some(arr),
            _ => None,
        }
    }
}

/// Named output tensors from a single inference call, in model order.
#[derive(Debug)]
pub struct Outputs(Vec<(String, OutputTensor)>);

impl Outputs {
    /// Wrap a list of named tensors.
    pub fn new(pairs: Vec<(String, OutputTensor)>) -> Self {
        Outputs(pairs)
    }

    /// Number of output tensors.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the model produced no outputs.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names in model order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    /// Borrow the tensor with the given name.
    pub fn get(&self, name: &str) -> Option<&OutputTensor> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, tensor)| tensor)
    }

    /// Take ownership of the tensor with the given name.
    pub fn take(self, name: &str) -> Option<OutputTensor> {
        self.0
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, tensor)| tensor)
    }

    /// Take the named tensor, falling back to the first output.
    ///
    /// Some backends (tract in particular) do not preserve ONNX output
    /// names, so single-output models are addressed positionally.
    pub fn take_or_first(self, name: &str) -> Option<OutputTensor> {
        if self.get(name).is_some() {
            self.take(name)
        } else {
            self.0.into_iter().next().map(|(_, tensor)| tensor)
        }
    }
}

impl IntoIterator for Outputs {
    type Item = (String, OutputTensor);
    type IntoIter = std::vec::IntoIter<(String, OutputTensor)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
