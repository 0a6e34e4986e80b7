//! Configuration validation for host configurations.
//!
//! This module validates a [`HostConfig`] before any provider is started,
//! collecting every problem instead of stopping at the first.

use crate::error::{ConfigError, PluginError, Result};
use tracing::debug;

use super::spec::{HostConfig, ProjectConfig, ProviderSchema, ProviderSection};

/// Validator for host configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a host configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any were found.
    pub fn validate(&self, config: &HostConfig) -> Result<ValidationResult> {
        let result = self.check(config);

        if let Some(first_error) = result.errors.first() {
            Err(PluginError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        } else {
            debug!("Configuration validation passed");
            Ok(result)
        }
    }

    /// Collects every error and warning without failing.
    #[must_use]
    pub fn check(&self, config: &HostConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_project(&config.project, &mut result);
        Self::validate_engine(config, &mut result);
        Self::validate_provider(&config.provider, &mut result);

        for (package, port) in &config.debug_providers {
            if *port == 0 {
                result.error(
                    format!("debug_providers.{package}"),
                    "Debug provider port cannot be 0",
                );
            }
        }

        result
    }

    fn validate_project(project: &ProjectConfig, result: &mut ValidationResult) {
        if project.name.is_empty() {
            result.error("project.name", "Project name cannot be empty");
        } else if !is_valid_name(&project.name) {
            result.error(
                "project.name",
                format!(
                    "Project name '{}' is invalid. Must be lowercase alphanumeric with hyphens.",
                    project.name
                ),
            );
        }

        if project.stack.is_empty() {
            result.error("project.stack", "Stack cannot be empty");
        } else if project.stack.contains("::") {
            result.error("project.stack", "Stack name cannot contain '::'");
        }
    }

    fn validate_engine(config: &HostConfig, result: &mut ValidationResult) {
        if config.engine.parallel == 0 {
            result.error("engine.parallel", "Parallelism must be at least 1");
        }

        if config.engine.timeout_secs == Some(0) {
            result.error("engine.timeout_secs", "Timeout must be at least 1 second");
        }

        if config.engine.preview && config.provider.latency_ms > 0 {
            result
                .warnings
                .push(String::from("provider.latency_ms has no effect in preview mode"));
        }
    }

    fn validate_provider(provider: &ProviderSection, result: &mut ValidationResult) {
        if provider.package.is_empty() {
            result.error("provider.package", "Provider package cannot be empty");
        } else if provider.package.contains(':') {
            result.error("provider.package", "Provider package cannot contain ':'");
        }

        for key in &provider.secret_keys {
            if !provider.config.contains_key(key) {
                result
                    .warnings
                    .push(format!("Secret key '{key}' is not set in provider.config"));
            }
        }

        Self::validate_schema(&provider.package, &provider.schema, result);
    }

    fn validate_schema(package: &str, schema: &ProviderSchema, result: &mut ValidationResult) {
        let tokens = schema
            .resources
            .keys()
            .chain(schema.functions.keys())
            .chain(schema.methods.keys());
        for token in tokens {
            if token.split(':').next() != Some(package) {
                result.error(
                    format!("provider.schema.{token}"),
                    format!("Token '{token}' does not belong to package '{package}'"),
                );
            }
        }

        for (type_token, resource) in &schema.resources {
            let field = |name: &str| format!("provider.schema.resources.{type_token}.{name}");

            for key in &resource.replace_on_changes {
                if key.is_empty() {
                    result.error(field("replace_on_changes"), "Property path cannot be empty");
                }
            }

            for key in &resource.required {
                if resource.defaults.contains_key(key) {
                    result.warnings.push(format!(
                        "{type_token}: required property '{key}' also has a default"
                    ));
                }
            }

            if resource.component && !resource.replace_on_changes.is_empty() {
                result.warnings.push(format!(
                    "{type_token}: replace_on_changes is ignored for components"
                ));
            }

            if resource.delete_before_replace && resource.replace_on_changes.is_empty() {
                result.warnings.push(format!(
                    "{type_token}: delete_before_replace set but no property forces replacement"
                ));
            }
        }
    }
}

/// Validates that a name follows the naming convention.
/// Names must be lowercase alphanumeric with hyphens, starting with a letter.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();

    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_lowercase() {
        return false;
    }

    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        return false;
    }

    !name.ends_with('-') && !name.contains("--")
}

impl ValidationResult {
    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
