//! Post-execution output verification.
//!
//! Reloads the expected-outputs log for one instance, scans the instance's
//! output container, and reports which promised artifacts never appeared.
//! Missing outputs are a report, not an error: partial pipelines are a
//! normal outcome and the caller decides what to do about them.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::core::identity::container_dir;
use crate::core::matching::any_matches;
use crate::core::outputs::ExpectedOutputs;
use crate::io::outputs_log;

/// Result of verifying one pipeline instance.
#[derive(Debug, PartialEq, Eq)]
pub enum CheckOutcome {
    /// No expected-outputs log was found for this instance, so there is
    /// nothing to verify against.
    LogMissing,
    /// Every expected output matched an observed file.
    AllPresent,
    /// Some expected outputs never appeared; the set has been persisted.
    Missing {
        outputs: ExpectedOutputs,
        log_path: PathBuf,
    },
}

impl CheckOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, CheckOutcome::AllPresent)
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckOutcome::LogMissing => {
                write!(f, "Could not find expected outputs log file")
            }
            CheckOutcome::AllPresent => {
                write!(f, "All expected outputs were generated")
            }
            CheckOutcome::Missing { outputs, log_path } => {
                write!(
                    f,
                    "Missing expected outputs:\n{}\nMissing outputs have been logged in {}",
                    outputs,
                    log_path.display()
                )
            }
        }
    }
}

/// Verify the outputs of one pipeline instance.
///
/// Expected filenames are matched fuzzily (see [`crate::core::matching`]);
/// an output subdirectory that was never created reads as an empty listing,
/// so every expected file under it is reported missing rather than the
/// scan failing. The missing-outputs log is written only when there is
/// something to report.
pub fn check_outputs(
    output_dir: &Path,
    log_dir: &Path,
    pipeline_name: &str,
    unique_id: &str,
) -> Result<CheckOutcome> {
    let Some(expected) = outputs_log::load_expected(log_dir, unique_id)? else {
        warn!(
            unique_id,
            log_dir = %log_dir.display(),
            "no expected-outputs log for this instance"
        );
        return Ok(CheckOutcome::LogMissing);
    };

    let container = output_dir.join(container_dir(pipeline_name, unique_id));
    let mut missing = ExpectedOutputs::new();
    for (subdir, files) in expected.iter() {
        let observed = list_dir(&container.join(subdir))?;
        for file in files {
            if !any_matches(&observed, unique_id, file) {
                missing.add(subdir, file);
            }
        }
    }

    if missing.is_empty() {
        debug!(unique_id, checked = expected.len(), "all expected outputs present");
        return Ok(CheckOutcome::AllPresent);
    }

    warn!(
        unique_id,
        missing = missing.len(),
        checked = expected.len(),
        "expected outputs missing"
    );
    let log_path = outputs_log::write_missing(log_dir, unique_id, &missing)?;
    Ok(CheckOutcome::Missing {
        outputs: missing,
        log_path,
    })
}

/// Filenames directly under `dir`. A directory that does not exist yields
/// an empty listing.
fn list_dir(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    let entries = fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}
