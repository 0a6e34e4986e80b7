//! Configuration module for the provider host.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `provplug.yaml`
//! - Applying `.env` and `PROVPLUG_*` environment overrides
//! - Validation of configuration values and the provider schema

mod spec;
mod parser;
mod validator;

pub use spec::{
    ConfigSchema, DiffConfig, EngineConfig, FunctionSchema, HostConfig, ProjectConfig,
    ProviderSchema, ProviderSection, ResourceSchema,
};
pub use parser::{
    ConfigParser, DEFAULT_CONFIG_FILE, ENV_PREFIX, find_config_file, parse_debug_providers,
};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
