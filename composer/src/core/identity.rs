//! Run identity: which configuration variant ran against which
//! subject/session instance.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Identity of one pipeline instance.
///
/// `unique_id` names the subject/session and is embedded in every output
/// filename; `pipeline_name` names the configuration variant. Together
/// they fix the output container directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    pub pipeline_name: String,
    pub unique_id: String,
}

impl RunIdentity {
    pub fn new(pipeline_name: impl Into<String>, unique_id: impl Into<String>) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
            unique_id: unique_id.into(),
        }
    }

    /// Container path for this instance's outputs, relative to the output
    /// directory.
    pub fn container(&self) -> PathBuf {
        container_dir(&self.pipeline_name, &self.unique_id)
    }
}

/// `cpac_<pipeline_name>/<unique_id>`, the container every output of one
/// instance lives under.
pub fn container_dir(pipeline_name: &str, unique_id: &str) -> PathBuf {
    PathBuf::from(format!("cpac_{pipeline_name}")).join(unique_id)
}
