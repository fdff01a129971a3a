//! CLI command implementations.

pub mod config;
pub mod decode;
pub mod generate;
pub mod recognize;

use std::path::Path;

use ndarray::{ArrayD, IxDyn};
use serde::Deserialize;

use decant_core::DecantConfig;

/// Load the effective configuration: an explicit file if given,
/// defaults otherwise.
pub(crate) fn load_config(path: Option<&str>) -> anyhow::Result<DecantConfig> {
    match path {
        Some(path) => Ok(DecantConfig::from_file(Path::new(path))?),
        None => Ok(DecantConfig::default()),
    }
}

/// On-disk tensor notation: a shape plus the values in row-major order.
#[derive(Debug, Deserialize)]
struct TensorFile {
    shape: Vec<usize>,
    data: Vec<f32>,
}

/// Read a float tensor from a JSON file of the form
/// `{"shape": [2, 4], "data": [...]}`.
pub(crate) fn read_tensor(path: &Path) -> anyhow::Result<ArrayD<f32>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
    let file: TensorFile = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("{} is not a tensor file: {}", path.display(), e))?;
    ArrayD::from_shape_vec(IxDyn(&file.shape), file.data)
        .map_err(|e| anyhow::anyhow!("inconsistent tensor in {}: {}", path.display(), e))
}

/// Parse a comma-separated token id list like `464,3290,318`.
pub(crate) fn parse_token_ids(text: &str) -> anyhow::Result<Vec<i64>> {
    text.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .map_err(|_| anyhow::anyhow!("invalid token id: {}", part))
        })
        .collect()
}
