//! Node-block descriptors: the declarative contract each graph-building
//! unit registers with the composer.
//!
//! A descriptor carries seven fields (name, governing config path, enable
//! switches, option key/value selector, required inputs, produced outputs).
//! Descriptors are validated when they are registered, never at composition
//! time: a malformed descriptor is a developer error and must fail fast.

use std::fmt;

use serde_json::Value;

/// Delimiter introducing the structured portion of a block annotation.
pub const ANNOTATION_DELIMITER: &str = "Node Block:";

/// Required keys of the annotation schema, in canonical order.
pub const REQUIRED_KEYS: [&str; 7] = [
    "name",
    "config",
    "switch",
    "option_key",
    "option_val",
    "inputs",
    "outputs",
];

/// Where in the pipeline configuration a block's governing subtree lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigScope {
    /// Block is not governed by any config subtree; always considered.
    Unconditional,
    /// Ordered keys locating the governing subtree.
    Path(Vec<String>),
}

/// Boolean keys (relative to the config scope) gating instantiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Switch {
    /// No switch; the block runs whenever its config scope resolves.
    AlwaysOn,
    /// All listed keys must be `true` (ANDed).
    Keys(Vec<String>),
}

/// Config key whose value selects which variant of the block to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionKey {
    None,
    Key(String),
}

/// Which configured option values instantiate the block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionVal {
    /// No option selection (paired with `OptionKey::None`).
    None,
    /// Every configured value instantiates the block.
    Any,
    /// Only configured values in this list instantiate the block.
    Choices(Vec<String>),
}

/// One required input: alternate resource names, first found wins.
pub type ResourceSelector = Vec<String>;

/// The seven-field node-block descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSpec {
    pub name: String,
    pub config: ConfigScope,
    pub switch: Switch,
    pub option_key: OptionKey,
    pub option_val: OptionVal,
    pub inputs: Vec<ResourceSelector>,
    pub outputs: Vec<String>,
}

impl BlockSpec {
    /// Check schema completeness. Returns all problems, not just the first.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("name must be non-empty".to_string());
        }
        if let ConfigScope::Path(path) = &self.config {
            if path.is_empty() || path.iter().any(|key| key.trim().is_empty()) {
                errors.push(format!("{}: config path keys must be non-empty", self.name));
            }
        }
        if let Switch::Keys(keys) = &self.switch {
            if keys.is_empty() || keys.iter().any(|key| key.trim().is_empty()) {
                errors.push(format!("{}: switch keys must be non-empty", self.name));
            }
        }
        match (&self.option_key, &self.option_val) {
            (OptionKey::None, OptionVal::None) => {}
            (OptionKey::None, _) => errors.push(format!(
                "{}: option_val set without an option_key",
                self.name
            )),
            (OptionKey::Key(_), OptionVal::None) => errors.push(format!(
                "{}: option_key set without an option_val",
                self.name
            )),
            (OptionKey::Key(key), _) if key.trim().is_empty() => {
                errors.push(format!("{}: option_key must be non-empty", self.name));
            }
            (OptionKey::Key(_), _) => {}
        }
        if let OptionVal::Choices(choices) = &self.option_val {
            if choices.is_empty() {
                errors.push(format!("{}: option_val choices must be non-empty", self.name));
            }
        }
        for selector in &self.inputs {
            if selector.is_empty() || selector.iter().any(|name| name.trim().is_empty()) {
                errors.push(format!(
                    "{}: input selectors must list at least one resource name",
                    self.name
                ));
            }
        }
        if self.outputs.is_empty() || self.outputs.iter().any(|name| name.trim().is_empty()) {
            errors.push(format!("{}: outputs must be non-empty", self.name));
        }
        errors
    }
}

impl fmt::Display for BlockSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Parse a block annotation into a [`BlockSpec`].
///
/// The annotation is free text containing [`ANNOTATION_DELIMITER`] followed
/// by a literal JSON mapping (no code execution). Missing required keys are
/// a fatal schema error; the message names the missing keys, the full
/// required-key list, and the keys actually found.
pub fn parse_annotation(annotation: &str) -> Result<BlockSpec, String> {
    let Some(position) = annotation.find(ANNOTATION_DELIMITER) else {
        return Err(format!(
            "block annotation is missing the '{ANNOTATION_DELIMITER}' delimiter"
        ));
    };
    let structured = annotation[position + ANNOTATION_DELIMITER.len()..].trim();
    let value: Value = serde_json::from_str(structured)
        .map_err(|err| format!("block annotation is not a literal mapping: {err}"))?;
    let Value::Object(map) = value else {
        return Err("block annotation must be a mapping".to_string());
    };

    let found: Vec<&str> = map.keys().map(String::as_str).collect();
    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|key| !map.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(format!(
            "required annotation keys are missing: [{}]\nrequired keys: [{}]\nkeys found: [{}]",
            missing.join(", "),
            REQUIRED_KEYS.join(", "),
            found.join(", "),
        ));
    }

    let spec = BlockSpec {
        name: string_field(&map, "name")?,
        config: match sentinel_or(&map, "config")? {
            None => ConfigScope::Unconditional,
            Some(value) => ConfigScope::Path(string_list(value, "config")?),
        },
        switch: match sentinel_or(&map, "switch")? {
            None => Switch::AlwaysOn,
            Some(value) => Switch::Keys(string_list(value, "switch")?),
        },
        option_key: match sentinel_or(&map, "option_key")? {
            None => OptionKey::None,
            Some(Value::String(key)) => OptionKey::Key(key.clone()),
            Some(_) => return Err("option_key must be a string".to_string()),
        },
        option_val: match sentinel_or(&map, "option_val")? {
            None => OptionVal::None,
            Some(Value::String(value)) if value == "Any" => OptionVal::Any,
            Some(Value::String(value)) => OptionVal::Choices(vec![value.clone()]),
            Some(value @ Value::Array(_)) => {
                OptionVal::Choices(string_list(value, "option_val")?)
            }
            Some(_) => return Err("option_val must be a string or list".to_string()),
        },
        inputs: selector_list(&map, "inputs")?,
        outputs: string_list(&map["outputs"], "outputs")?,
    };

    let errors = spec.validate();
    if errors.is_empty() {
        Ok(spec)
    } else {
        Err(format!("invalid block annotation:\n- {}", errors.join("\n- ")))
    }
}

/// Return `None` for the `"None"` sentinel, otherwise the raw value.
fn sentinel_or<'a>(
    map: &'a serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Value>, String> {
    match map.get(key) {
        None => Err(format!("missing key '{key}'")),
        Some(Value::String(text)) if text == "None" => Ok(None),
        Some(value) => Ok(Some(value)),
    }
}

fn string_field(map: &serde_json::Map<String, Value>, key: &str) -> Result<String, String> {
    match map.get(key) {
        Some(Value::String(text)) => Ok(text.clone()),
        _ => Err(format!("'{key}' must be a string")),
    }
}

/// Accept either a single string or a list of strings.
fn string_list(value: &Value, key: &str) -> Result<Vec<String>, String> {
    match value {
        Value::String(text) => Ok(vec![text.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => Ok(text.clone()),
                _ => Err(format!("'{key}' entries must be strings")),
            })
            .collect(),
        _ => Err(format!("'{key}' must be a string or list of strings")),
    }
}

/// Inputs accept strings or lists of alternate names; a bare string is a
/// one-element selector.
fn selector_list(
    map: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Vec<ResourceSelector>, String> {
    match map.get(key) {
        Some(Value::String(text)) if text == "None" => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => Ok(vec![text.clone()]),
                Value::Array(_) => string_list(item, key),
                _ => Err(format!("'{key}' entries must be strings or lists")),
            })
            .collect(),
        Some(_) => Err(format!("'{key}' must be a list")),
        None => Err(format!("missing key '{key}'")),
    }
}
