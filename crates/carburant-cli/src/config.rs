//! `--config` file loading

use std::path::Path;

use anyhow::{Context, Result};
use carburant::{ExtractOptions, RegressionOptions};
use serde::Deserialize;

/// Settings read from a JSON file. Every section and field is optional.
///
/// ```json
/// { "extract": { "header_row": 1 }, "regression": { "outlier_sigma": 2.5 } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub extract: ExtractOptions,
    pub regression: RegressionOptions,
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config '{}'", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid config '{}'", path.display()))
    }
}
