//! Configuration specification types for the provider host.
//!
//! This module defines all the structs that map to the `provplug.yaml` file:
//! the project being evaluated, engine knobs, diff policy, and the provider
//! together with the schema that drives it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::planner::DiffPolicy;
use crate::plugin::{CallInfo, ConfigKey, ConstructInfo};
use crate::resource::{PropertyMap, PropertyValue, TypeToken, Urn};

/// Type token prefix of provider instances.
const PROVIDER_TYPE_PREFIX: &str = "infra:providers:";

/// The root configuration structure for the provider host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostConfig {
    /// Project-level configuration.
    pub project: ProjectConfig,
    /// Engine behavior.
    #[serde(default)]
    pub engine: EngineConfig,
    /// How diffs are interpreted.
    #[serde(default)]
    pub diff: DiffConfig,
    /// The provider to drive.
    pub provider: ProviderSection,
    /// Providers already running under a debugger, keyed by package.
    #[serde(default)]
    pub debug_providers: BTreeMap<String, u16>,
}

/// Project-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Project name.
    pub name: String,
    /// Stack being evaluated (e.g., "dev", "prod").
    #[serde(default = "default_stack")]
    pub stack: String,
}

/// Engine behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Degree of parallelism for resource operations.
    #[serde(default = "default_parallel")]
    pub parallel: u32,
    /// Timeout for create, update and delete, in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// How long to wait after signalling cancellation before closing.
    #[serde(default = "default_cancel_grace")]
    pub cancel_grace_secs: u64,
    /// Run every operation as a preview.
    #[serde(default)]
    pub preview: bool,
}

/// How diffs are interpreted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DiffConfig {
    /// What to do when a provider cannot compute a diff.
    #[serde(default)]
    pub on_unavailable: DiffPolicy,
    /// Reject diffs whose coarse and detailed views disagree.
    #[serde(default)]
    pub strict: bool,
}

/// The provider to drive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderSection {
    /// Package name served by the provider.
    pub package: String,
    /// Provider configuration passed to `CheckConfig` and `Configure`.
    #[serde(default)]
    pub config: PropertyMap,
    /// Configuration keys whose values are secret.
    #[serde(default)]
    pub secret_keys: Vec<String>,
    /// Simulated latency of mutating operations, in milliseconds.
    #[serde(default)]
    pub latency_ms: u64,
    /// Resource types, functions and methods the provider serves.
    #[serde(default)]
    pub schema: ProviderSchema,
}

/// Describes what a provider serves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProviderSchema {
    /// Plugin version reported by `GetPluginInfo`.
    #[serde(default)]
    pub version: Option<String>,
    /// Provider configuration schema.
    #[serde(default)]
    pub config: ConfigSchema,
    /// Resource types keyed by type token.
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceSchema>,
    /// Functions keyed by token.
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionSchema>,
    /// Component methods keyed by token.
    #[serde(default)]
    pub methods: BTreeMap<String, FunctionSchema>,
}

/// Provider configuration schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ConfigSchema {
    /// Keys that must be set.
    #[serde(default)]
    pub required: Vec<String>,
}

/// Schema of one resource type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceSchema {
    /// Input properties that must be set.
    #[serde(default)]
    pub required: Vec<String>,
    /// Values applied to unset inputs.
    #[serde(default)]
    pub defaults: PropertyMap,
    /// Properties whose change forces replacement.
    #[serde(default)]
    pub replace_on_changes: Vec<String>,
    /// Delete the old resource before creating its replacement.
    #[serde(default)]
    pub delete_before_replace: bool,
    /// Property filled with a generated name when unset.
    #[serde(default)]
    pub auto_name: Option<String>,
    /// Whether the provider can compute diffs for this type.
    #[serde(default = "default_true")]
    pub diffable: bool,
    /// Whether this type is a component built by `Construct`.
    #[serde(default)]
    pub component: bool,
}

/// Schema of a function or method.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FunctionSchema {
    /// Arguments that must be set.
    #[serde(default)]
    pub required: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            timeout_secs: None,
            cancel_grace_secs: default_cancel_grace(),
            preview: false,
        }
    }
}

impl Default for ResourceSchema {
    fn default() -> Self {
        Self {
            required: Vec::new(),
            defaults: PropertyMap::new(),
            replace_on_changes: Vec::new(),
            delete_before_replace: false,
            auto_name: None,
            diffable: true,
            component: false,
        }
    }
}

// Default value functions

fn default_stack() -> String {
    String::from("dev")
}

const fn default_parallel() -> u32 {
    4
}

const fn default_cancel_grace() -> u64 {
    30
}

const fn default_true() -> bool {
    true
}

impl HostConfig {
    /// Returns the operation timeout, if one is configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.engine.timeout_secs.map(Duration::from_secs)
    }

    /// Returns the provider configuration keyed by namespaced config key.
    #[must_use]
    pub fn config_values(&self) -> BTreeMap<ConfigKey, String> {
        self.provider
            .config
            .iter()
            .map(|(k, v)| (ConfigKey::new(&self.provider.package, k), config_string(v)))
            .collect()
    }

    /// Builds the evaluation context for a `Construct` call.
    #[must_use]
    pub fn construct_info(&self, dry_run: bool, monitor_address: impl Into<String>) -> ConstructInfo {
        ConstructInfo {
            project: self.project.name.clone(),
            stack: self.project.stack.clone(),
            config: self.config_values(),
            config_secret_keys: self
                .provider
                .secret_keys
                .iter()
                .map(|k| ConfigKey::new(&self.provider.package, k))
                .collect(),
            dry_run,
            parallel: self.parallel(),
            monitor_address: monitor_address.into(),
        }
    }

    /// Builds the evaluation context for a `Call`.
    #[must_use]
    pub fn call_info(&self, dry_run: bool, monitor_address: impl Into<String>) -> CallInfo {
        CallInfo {
            project: self.project.name.clone(),
            stack: self.project.stack.clone(),
            config: self.config_values(),
            dry_run,
            parallel: self.parallel(),
            monitor_address: monitor_address.into(),
        }
    }

    /// Returns the address of a provider running under a debugger.
    #[must_use]
    pub fn attach_address(&self, package: &str) -> Option<String> {
        self.debug_providers
            .get(package)
            .map(|port| format!("127.0.0.1:{port}"))
    }

    /// Returns the provider configuration with secret keys wrapped as secrets.
    #[must_use]
    pub fn provider_inputs(&self) -> PropertyMap {
        let mut inputs = self.provider.config.clone();
        for key in &self.provider.secret_keys {
            if let Some(value) = inputs.remove(key) {
                inputs.insert(key.as_str(), value.into_secret());
            }
        }
        inputs
    }

    /// Returns the URN of the default provider instance.
    #[must_use]
    pub fn provider_urn(&self) -> Urn {
        let type_token = TypeToken::new(format!("{PROVIDER_TYPE_PREFIX}{}", self.provider.package));
        self.resource_urn(&type_token, "default")
    }

    /// Returns the URN of a top-level resource in this project's stack.
    #[must_use]
    pub fn resource_urn(&self, type_token: &TypeToken, name: &str) -> Urn {
        Urn::new(&self.project.stack, &self.project.name, None, type_token, name)
    }

    fn parallel(&self) -> i32 {
        i32::try_from(self.engine.parallel).unwrap_or(i32::MAX)
    }
}

impl ProviderSchema {
    /// Returns the schema of a resource type.
    #[must_use]
    pub fn resource(&self, type_token: &str) -> Option<&ResourceSchema> {
        self.resources.get(type_token)
    }
}

/// Config values are passed to programs as strings.
fn config_string(value: &PropertyValue) -> String {
    match value {
        PropertyValue::String(s) => s.clone(),
        PropertyValue::Secret(inner) => config_string(inner),
        other => serde_json::Value::from(other.clone()).to_string(),
    }
}
