//! Per-instance output logs under the pipeline's log directory.
//!
//! The expected-outputs log is written before execution starts, so that the
//! verifier can run even if the engine crashed mid-pipeline. The missing-
//! outputs log is written only when verification finds discrepancies.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::outputs::ExpectedOutputs;

/// Path of the expected-outputs log for one instance.
pub fn expected_outputs_path(log_dir: &Path, unique_id: &str) -> PathBuf {
    log_dir.join(format!("expected_outputs_{unique_id}.json"))
}

/// Path of the missing-outputs log for one instance.
pub fn missing_outputs_path(log_dir: &Path, unique_id: &str) -> PathBuf {
    log_dir.join(format!("missing_outputs_{unique_id}.json"))
}

/// Persist the expected-outputs registry as pretty JSON.
pub fn write_expected(log_dir: &Path, unique_id: &str, expected: &ExpectedOutputs) -> Result<PathBuf> {
    let path = expected_outputs_path(log_dir, unique_id);
    write_outputs(&path, expected)?;
    debug!(path = %path.display(), entries = expected.len(), "wrote expected-outputs log");
    Ok(path)
}

/// Load a previously persisted expected-outputs registry. Returns
/// `Ok(None)` when the log file does not exist.
pub fn load_expected(log_dir: &Path, unique_id: &str) -> Result<Option<ExpectedOutputs>> {
    let path = expected_outputs_path(log_dir, unique_id);
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let expected =
        serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(expected))
}

/// Persist the set of outputs that verification could not find.
pub fn write_missing(log_dir: &Path, unique_id: &str, missing: &ExpectedOutputs) -> Result<PathBuf> {
    let path = missing_outputs_path(log_dir, unique_id);
    write_outputs(&path, missing)?;
    debug!(path = %path.display(), entries = missing.len(), "wrote missing-outputs log");
    Ok(path)
}

/// Atomically write an outputs registry (temp file + rename).
fn write_outputs(path: &Path, outputs: &ExpectedOutputs) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("log path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let mut buf = serde_json::to_string_pretty(outputs).context("serialize outputs json")?;
    buf.push('\n');
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, &buf)
        .with_context(|| format!("write temp log {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace log {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut expected = ExpectedOutputs::new();
        expected.add("connectome", "sub01_desc-PearsonCorr_connectome.npy");

        let path = write_expected(temp.path(), "sub01", &expected).expect("write");
        assert!(path.ends_with("expected_outputs_sub01.json"));
        let loaded = load_expected(temp.path(), "sub01")
            .expect("load")
            .expect("present");
        assert_eq!(loaded, expected);
    }

    #[test]
    fn load_missing_log_is_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(load_expected(temp.path(), "sub01").expect("load").is_none());
    }

    #[test]
    fn logs_are_keyed_by_unique_id() {
        let temp = tempfile::tempdir().expect("tempdir");
        let expected = ExpectedOutputs::new();
        write_expected(temp.path(), "sub01", &expected).expect("write");
        assert!(load_expected(temp.path(), "sub02").expect("load").is_none());
    }

    #[test]
    fn missing_log_lands_next_to_expected_log() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut missing = ExpectedOutputs::new();
        missing.add("qc", "sub01_desc-axial_qc.png");
        let path = write_missing(temp.path(), "sub01", &missing).expect("write");
        assert_eq!(path, temp.path().join("missing_outputs_sub01.json"));
        assert!(path.exists());
    }
}
