//! Resolution of the packaged default, file and command line layers.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use super::merge::{merge_into, validate_item};
use super::{ConfigError, Configuration};

/// The packaged default configuration. Defines every recognized key.
pub const DEFAULT_CONFIG: &str = include_str!("default_config.yaml");

/// Section of the configuration used as the base of directory configs.
pub const DIRECTORY_CONFIG_KEY: &str = "default_directory_config";

/// Builds the effective configuration from its layers.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    /// YAML text of the default layer
    default_config: Cow<'static, str>,

    /// Where the default is copied on first run (`None` disables the copy)
    user_config_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// File name of the user-level configuration in the home directory.
    pub const USER_CONFIG_FILENAME: &'static str = ".labelstorerc";

    /// Create a resolver using the packaged default and `~/.labelstorerc`.
    pub fn new() -> Self {
        Self {
            default_config: Cow::Borrowed(DEFAULT_CONFIG),
            user_config_path: Self::default_user_config_path(),
        }
    }

    /// Get the user-level config path (`~/.labelstorerc`), if a home
    /// directory can be determined.
    pub fn default_user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(Self::USER_CONFIG_FILENAME))
    }

    /// Use a different user-level config path, or none at all.
    pub fn with_user_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.user_config_path = path;
        self
    }

    /// Use a different default layer (YAML text).
    pub fn with_default_config(mut self, yaml: impl Into<String>) -> Self {
        self.default_config = Cow::Owned(yaml.into());
        self
    }

    /// Parse the default layer.
    ///
    /// If the user-level config file does not exist yet, the default is
    /// copied there verbatim. Failing to do so is only logged.
    pub fn load_default(&self) -> Result<Configuration, ConfigError> {
        let config = parse_mapping(&self.default_config, Path::new("default_config.yaml"))?;

        if let Some(user_config_path) = &self.user_config_path {
            if !user_config_path.exists() {
                match std::fs::write(user_config_path, self.default_config.as_bytes()) {
                    Ok(()) => log::info!("Saved default configuration to {:?}", user_config_path),
                    Err(e) => log::warn!("Failed to save config: {:?}: {}", user_config_path, e),
                }
            }
        }

        Ok(config)
    }

    /// Resolve the effective configuration.
    ///
    /// Layers, lowest priority first: the default, `config_file` (when it
    /// exists), then `cli_overrides`. Each layer is merged with
    /// [`validate_item`]; the first validation error aborts resolution.
    pub fn resolve(
        &self,
        cli_overrides: Option<&Configuration>,
        config_file: Option<&Path>,
    ) -> Result<Configuration, ConfigError> {
        let mut layers: Vec<Cow<'_, Configuration>> = Vec::new();
        if let Some(path) = config_file.filter(|path| path.exists()) {
            log::debug!("Applying config file {:?}", path);
            layers.push(Cow::Owned(read_mapping(path)?));
        }
        if let Some(cli_overrides) = cli_overrides {
            layers.push(Cow::Borrowed(cli_overrides));
        }

        layers
            .iter()
            .try_fold(self.load_default()?, |mut config, layer| {
                merge_into(&mut config, layer, Some(validate_item))?;
                Ok(config)
            })
    }

    /// Resolve the configuration of an annotated directory.
    ///
    /// Starts from the `default_directory_config` section of `config`. If
    /// `directory_config_file` exists it is merged on top. If it does not,
    /// the whole of `config` is written there so the directory gets its own
    /// editable copy, and the default section is returned unmerged.
    pub fn resolve_directory(
        config: &Configuration,
        directory_config_file: Option<&Path>,
    ) -> Result<Configuration, ConfigError> {
        let mut directory_config = match config.get(DIRECTORY_CONFIG_KEY) {
            Some(Value::Mapping(section)) => section.clone(),
            Some(_) => {
                return Err(ConfigError::NotAMapping {
                    source_name: DIRECTORY_CONFIG_KEY.to_string(),
                });
            }
            None => {
                return Err(ConfigError::MissingKey {
                    key: DIRECTORY_CONFIG_KEY.to_string(),
                });
            }
        };

        let Some(path) = directory_config_file else {
            return Ok(directory_config);
        };

        if path.exists() {
            let overrides = read_mapping(path)?;
            merge_into(&mut directory_config, &overrides, Some(validate_item))?;
            log::debug!("Applied directory config {:?}", path);
        } else {
            std::fs::write(path, serde_yaml::to_string(config)?)?;
            log::info!("Created directory config {:?}", path);
        }

        Ok(directory_config)
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn read_mapping(path: &Path) -> Result<Configuration, ConfigError> {
    let yaml = std::fs::read_to_string(path)?;
    parse_mapping(&yaml, path)
}

/// Parse YAML text as a mapping. An empty document is an empty mapping.
fn parse_mapping(yaml: &str, path: &Path) -> Result<Configuration, ConfigError> {
    match serde_yaml::from_str(yaml)? {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Configuration::new()),
        _ => Err(ConfigError::not_a_mapping(path)),
    }
}
