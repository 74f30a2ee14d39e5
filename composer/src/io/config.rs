//! Pipeline configuration files (TOML).
//!
//! Configurations are open-keyed: blocks navigate whatever tree the file
//! defines, so loading converts the TOML document to a generic JSON value
//! rather than deserializing into a fixed struct.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

use crate::core::config::PipelineConfig;

/// Load a pipeline configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("parse {}", path.display()))
}

/// Parse a TOML document into a pipeline configuration.
pub fn parse_config(contents: &str) -> Result<PipelineConfig> {
    let document: toml::Value = toml::from_str(contents).context("invalid toml")?;
    let root = serde_json::to_value(document).context("convert toml to json value")?;
    if !root.is_object() {
        return Err(anyhow!("configuration root must be a table"));
    }
    Ok(PipelineConfig::new(root))
}
