//! Configuration parser for loading and merging configuration files.
//!
//! This module handles loading configuration from YAML files, `.env` files and
//! environment variables, with proper precedence and error handling.

use crate::error::{ConfigError, PluginError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::resource::PropertyMap;

use super::spec::HostConfig;

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "PROVPLUG_";

/// Configuration parser for loading host configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<HostConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(PluginError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            PluginError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<HostConfig> {
        debug!("Parsing YAML configuration");

        let config: HostConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            PluginError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!(
            "Parsed configuration for project {} (stack {})",
            config.project.name, config.project.stack
        );
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// Recognized variables: `PROVPLUG_PROJECT`, `PROVPLUG_STACK`,
    /// `PROVPLUG_PARALLEL` and `PROVPLUG_DEBUG_PROVIDERS`
    /// (`pkg:port,pkg:port`).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an override
    /// is malformed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<HostConfig> {
        let mut config = self.load_file(path)?;
        Self::apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if an override value is malformed.
    pub fn apply_env_overrides<F>(config: &mut HostConfig, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(&format!("{ENV_PREFIX}{key}"));

        if let Some(name) = var("PROJECT") {
            debug!("Overriding project.name from environment");
            config.project.name = name;
        }

        if let Some(stack) = var("STACK") {
            debug!("Overriding project.stack from environment");
            config.project.stack = stack;
        }

        if let Some(parallel) = var("PARALLEL") {
            debug!("Overriding engine.parallel from environment");
            config.engine.parallel = parallel.trim().parse().map_err(|_| {
                ConfigError::validation(
                    format!("{ENV_PREFIX}PARALLEL must be a non-negative integer, got '{parallel}'"),
                    "engine.parallel",
                )
            })?;
        }

        if let Some(providers) = var("DEBUG_PROVIDERS") {
            debug!("Overriding debug_providers from environment");
            config.debug_providers.extend(parse_debug_providers(&providers)?);
        }

        Ok(())
    }

    /// Loads a property map from a JSON or YAML file.
    ///
    /// Files ending in `.json` are read as JSON, anything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a map.
    pub fn load_properties(path: impl AsRef<Path>) -> Result<PropertyMap> {
        let path = path.as_ref();
        debug!("Loading properties from: {}", path.display());

        if !path.exists() {
            return Err(PluginError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let parsed = if is_json {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        };

        parsed.map_err(|message| {
            PluginError::Config(ConfigError::ParseError {
                message: format!("Invalid property file: {message}"),
                location: Some(path.display().to_string()),
            })
        })
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                PluginError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Parses a `pkg:port,pkg:port` list of providers running under a debugger.
///
/// # Errors
///
/// Returns an error naming the first malformed entry.
pub fn parse_debug_providers(value: &str) -> Result<BTreeMap<String, u16>> {
    let mut providers = BTreeMap::new();

    for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let invalid = || {
            PluginError::Config(ConfigError::InvalidDebugProvider {
                entry: entry.to_string(),
            })
        };
        let (package, port) = entry.split_once(':').ok_or_else(invalid)?;
        let port: u16 = port.parse().map_err(|_| invalid())?;
        if package.is_empty() {
            return Err(invalid());
        }
        providers.insert(package.to_string(), port);
    }

    Ok(providers)
}

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "provplug.yaml";

/// Finds the configuration file.
///
/// Looks for `provplug.yaml` in `start_dir` and its parents, then for
/// `provplug/config.yaml` in the user configuration directory.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(DEFAULT_CONFIG_FILE);
        if config_path.exists() {
            info!("Found configuration file: {}", config_path.display());
            return Ok(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    if let Some(user_path) = dirs::config_dir().map(|d| d.join("provplug").join("config.yaml"))
        && user_path.exists()
    {
        info!("Using user configuration file: {}", user_path.display());
        return Ok(user_path);
    }

    Err(PluginError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILE),
    }))
}
