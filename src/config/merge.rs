//! Recursive configuration merging with per-key validation.

use std::collections::HashSet;

use serde_yaml::Value;

use super::{ConfigError, Configuration};

/// Accepted values of `validate_label` besides `null`.
const VALIDATE_LABEL_MODES: &[&str] = &["exact", "instance"];

/// Per-key check run on every override entry before it is merged.
pub type Validator = fn(&str, &Value) -> Result<(), ConfigError>;

/// Merge `overrides` into `target`.
///
/// For each override entry, in order:
/// - `validate` (if any) is called first; an error aborts the merge.
/// - Keys missing from `target` are logged and skipped, never inserted.
/// - Mapping values merge recursively into mapping values.
/// - Anything else (scalars, sequences, or a type change) replaces the
///   existing value wholesale.
///
/// Entries merged before a validation failure stay merged.
pub fn merge_into(
    target: &mut Configuration,
    overrides: &Configuration,
    validate: Option<Validator>,
) -> Result<(), ConfigError> {
    for (key, value) in overrides {
        if let (Some(validate), Some(name)) = (validate, key.as_str()) {
            validate(name, value)?;
        }

        let Some(existing) = target.get_mut(key) else {
            log::warn!("Skipping unexpected key in config: {}", display_key(key));
            continue;
        };

        match (existing, value) {
            (Value::Mapping(existing), Value::Mapping(incoming)) => {
                merge_into(existing, incoming, validate)?;
            }
            (existing, _) => *existing = value.clone(),
        }
    }
    Ok(())
}

/// Validate the config keys that have domain constraints.
///
/// - `validate_label` must be `null`, `"exact"` or `"instance"`.
/// - `labels` must be `null` or a sequence without duplicates.
pub fn validate_item(key: &str, value: &Value) -> Result<(), ConfigError> {
    match key {
        "validate_label" => match value {
            Value::Null => Ok(()),
            Value::String(mode) if VALIDATE_LABEL_MODES.contains(&mode.as_str()) => Ok(()),
            other => Err(ConfigError::validation(
                key,
                format!(
                    "Unexpected value for config key 'validate_label': {}",
                    display_value(other)
                ),
            )),
        },
        "labels" => match value {
            Value::Null => Ok(()),
            Value::Sequence(labels) => {
                let mut seen = HashSet::new();
                if labels.iter().all(|label| seen.insert(label)) {
                    Ok(())
                } else {
                    Err(ConfigError::validation(
                        key,
                        format!(
                            "Duplicates are detected for config key 'labels': {}",
                            display_value(value)
                        ),
                    ))
                }
            }
            other => Err(ConfigError::validation(
                key,
                format!(
                    "Config key 'labels' must be a list, got: {}",
                    display_value(other)
                ),
            )),
        },
        _ => Ok(()),
    }
}

fn display_key(key: &Value) -> String {
    match key.as_str() {
        Some(name) => name.to_string(),
        None => display_value(key),
    }
}

fn display_value(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|yaml| yaml.trim_end().replace('\n', " "))
        .unwrap_or_else(|_| format!("{:?}", value))
}
