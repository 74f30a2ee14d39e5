//! Expected-outputs registry for one pipeline instance.
//!
//! During composition, every instantiated node block records where its
//! products will land (output subdirectory + filename pattern). After the
//! execution engine finishes, the verifier compares this registry against
//! the actual output tree.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Set of (subdirectory, filename pattern) pairs a composed graph promises
/// to produce.
///
/// Addition is idempotent: recording the same pair twice has no effect.
/// BTree containers keep the serialized log and the rendered report stable
/// across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedOutputs {
    #[serde(flatten)]
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl ExpectedOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an expected output. Returns `true` if the pair was new.
    pub fn add(&mut self, subdir: &str, filename: &str) -> bool {
        self.entries
            .entry(subdir.to_string())
            .or_default()
            .insert(filename.to_string())
    }

    /// Total count of distinct filename entries across all subdirectories
    /// (not the count of subdirectories).
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate subdirectories with their filename sets, in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.entries
            .iter()
            .map(|(subdir, files)| (subdir.as_str(), files))
    }

    pub fn contains(&self, subdir: &str, filename: &str) -> bool {
        self.entries
            .get(subdir)
            .is_some_and(|files| files.contains(filename))
    }
}

impl fmt::Display for ExpectedOutputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (subdir, files) in &self.entries {
            writeln!(f, "{}:", subdir)?;
            for file in files {
                writeln!(f, "  - {}", file)?;
            }
        }
        Ok(())
    }
}
