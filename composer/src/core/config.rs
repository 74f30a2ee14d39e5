//! Navigation over a loaded pipeline configuration.
//!
//! The configuration is an open-keyed tree (loaded from TOML by
//! `io::config`); blocks locate their governing subtree by key path,
//! evaluate boolean switches, and read scalar or list option values.

use serde_json::Value;

/// A resolved pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    root: Value,
}

impl PipelineConfig {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Resolve an ordered key path to its subtree, if present.
    pub fn subtree(&self, path: &[String]) -> Option<&Value> {
        let mut current = &self.root;
        for key in path {
            current = current.get(key)?;
        }
        Some(current)
    }

    /// Evaluate switch keys relative to a config scope. All keys must be
    /// present and `true`; a missing or non-boolean key reads as `false`.
    pub fn switch_on(&self, scope: &[String], keys: &[String]) -> bool {
        let Some(subtree) = self.subtree(scope) else {
            return false;
        };
        keys.iter().all(|key| {
            subtree
                .get(key)
                .and_then(Value::as_bool)
                .unwrap_or(false)
        })
    }

    /// Read the configured values for an option key under a scope.
    ///
    /// A scalar yields one value; an array yields its string elements; a
    /// mapping yields its keys (a choice table, e.g. correlation method ->
    /// atlas paths). A missing key yields nothing.
    pub fn option_values(&self, scope: &[String], key: &str) -> Vec<String> {
        let Some(value) = self.subtree(scope).and_then(|subtree| subtree.get(key)) else {
            return Vec::new();
        };
        match value {
            Value::String(text) => vec![text.clone()],
            Value::Number(number) => vec![number.to_string()],
            Value::Array(items) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(text) => Some(text.clone()),
                    Value::Number(number) => Some(number.to_string()),
                    _ => None,
                })
                .collect(),
            Value::Object(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> PipelineConfig {
        PipelineConfig::new(json!({
            "timeseries_extraction": {
                "run": true,
                "tse_roi_paths": {
                    "Avg": "/atlas/aal.nii.gz",
                    "PearsonCorr": "/atlas/aal.nii.gz",
                    "PartialCorr": "/atlas/aal.nii.gz",
                },
            },
            "post_processing": {
                "spatial_smoothing": {
                    "run": true,
                    "fwhm": [4, 6],
                },
            },
            "quality_control": {
                "generate_quality_control_images": false,
            },
        }))
    }

    fn path(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|key| key.to_string()).collect()
    }

    #[test]
    fn resolves_nested_subtrees() {
        let cfg = sample();
        assert!(cfg.subtree(&path(&["post_processing", "spatial_smoothing"])).is_some());
        assert!(cfg.subtree(&path(&["missing", "subtree"])).is_none());
    }

    #[test]
    fn switch_requires_all_keys_true() {
        let cfg = sample();
        assert!(cfg.switch_on(&path(&["timeseries_extraction"]), &path(&["run"])));
        assert!(!cfg.switch_on(
            &path(&["quality_control"]),
            &path(&["generate_quality_control_images"])
        ));
        // Missing key reads as false.
        assert!(!cfg.switch_on(&path(&["timeseries_extraction"]), &path(&["run", "nope"])));
    }

    #[test]
    fn option_values_from_choice_table() {
        let cfg = sample();
        let methods = cfg.option_values(&path(&["timeseries_extraction"]), "tse_roi_paths");
        assert_eq!(methods, vec!["Avg", "PartialCorr", "PearsonCorr"]);
    }

    #[test]
    fn option_values_from_numeric_list() {
        let cfg = sample();
        let widths =
            cfg.option_values(&path(&["post_processing", "spatial_smoothing"]), "fwhm");
        assert_eq!(widths, vec!["4", "6"]);
    }

    #[test]
    fn option_values_missing_key_is_empty() {
        let cfg = sample();
        assert!(cfg
            .option_values(&path(&["timeseries_extraction"]), "absent")
            .is_empty());
    }
}
