//! Test-only helpers for constructing compositions and output trees.

use std::fs;
use std::path::Path;

use crate::compose::Seed;
use crate::core::config::PipelineConfig;
use crate::core::identity::RunIdentity;

/// Default identity used across tests.
pub fn identity() -> RunIdentity {
    RunIdentity::new("default", "sub01")
}

/// Build a config directly from a JSON value.
pub fn config(root: serde_json::Value) -> PipelineConfig {
    PipelineConfig::new(root)
}

/// One seed entry.
pub fn seed(resource: &str, filename: &str) -> Seed {
    Seed {
        resource: resource.to_string(),
        filename: filename.to_string(),
    }
}

/// Create `filename` (empty) under the instance's output container.
pub fn touch_output(
    output_dir: &Path,
    identity: &RunIdentity,
    subdir: &str,
    filename: &str,
) -> std::io::Result<()> {
    let dir = output_dir.join(identity.container()).join(subdir);
    fs::create_dir_all(&dir)?;
    fs::write(dir.join(filename), b"")
}
