//! Rendering of resolved tasks

use serde::{Deserialize, Serialize};

use crate::error::TaskGroupError;

/// Output format enum
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// YAML manifest (default)
    #[default]
    Yaml,

    /// Pretty-printed JSON
    Json,
}

/// Render any manifest in the requested format
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String, TaskGroupError> {
    Ok(match format {
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(value)?;
            json.push('\n');
            json
        }
    })
}
