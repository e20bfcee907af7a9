//! Layered application configuration.
//!
//! Configuration is a YAML mapping. The packaged default defines the schema;
//! override layers (a user or `--config` file, then command line values) are
//! merged on top of it and may only change keys the default already has.
//! Annotated directories get their own layer, seeded from the
//! `default_directory_config` section.
//!
//! Load order, lowest priority first:
//!
//! 1. packaged default (`default_config.yaml`)
//! 2. config file (`--config` or `~/.labelstorerc`)
//! 3. command line overrides

mod merge;
mod resolver;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use merge::{Validator, merge_into, validate_item};
pub use resolver::{ConfigResolver, DEFAULT_CONFIG, DIRECTORY_CONFIG_KEY};

/// A configuration tree: string keys mapping to scalars, sequences or
/// nested mappings.
pub type Configuration = serde_yaml::Mapping;

/// Log level setting for the application.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Errors that can occur when loading or merging configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A recognized key was given a value it does not accept
    #[error("{message}")]
    Validation {
        /// The offending key
        key: String,
        /// What is wrong with the value
        message: String,
    },

    /// YAML parsing or serialization error
    #[error("Failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A config file or section is not a mapping
    #[error("Configuration in {source_name} must be a mapping")]
    NotAMapping {
        /// File path or key that held the value
        source_name: String,
    },

    /// A required section is missing from the configuration
    #[error("Missing configuration key: {key}")]
    MissingKey {
        /// The missing key
        key: String,
    },
}

impl ConfigError {
    /// Create a validation error for `key`.
    pub fn validation(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            key: key.into(),
            message: message.into(),
        }
    }

    fn not_a_mapping(path: &Path) -> Self {
        Self::NotAMapping {
            source_name: format!("{:?}", path),
        }
    }
}
