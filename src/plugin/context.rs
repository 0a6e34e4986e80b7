//! Evaluation context for `Construct` and `Call`.
//!
//! These records carry the ambient state of the program being evaluated
//! (project, stack, configuration, preview flag, parallelism) across a single
//! invocation. They are built fresh for every call and never mutated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::resource::{PropertyKey, PropertyMap, TypeToken, Urn};

/// A namespaced configuration key, written `namespace:name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConfigKey {
    /// Namespace, usually the project or package name.
    pub namespace: String,
    /// Key name within the namespace.
    pub name: String,
}

impl ConfigKey {
    /// Creates a configuration key.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::str::FromStr for ConfigKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() => Ok(Self::new(ns, name)),
            _ => Err(format!("config key '{s}' must be of the form namespace:name")),
        }
    }
}

impl TryFrom<String> for ConfigKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ConfigKey> for String {
    fn from(key: ConfigKey) -> Self {
        key.to_string()
    }
}

impl std::fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

/// An alternate identity a resource was previously known by.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Alias {
    /// Previous name.
    #[serde(default)]
    pub name: Option<String>,
    /// Previous type.
    #[serde(default)]
    pub type_token: Option<TypeToken>,
    /// Previous project.
    #[serde(default)]
    pub project: Option<String>,
    /// Previous stack.
    #[serde(default)]
    pub stack: Option<String>,
    /// Previous parent.
    #[serde(default)]
    pub parent: Option<Urn>,
}

/// Context needed to register child resources during `Construct`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConstructInfo {
    /// Project housing the program being run.
    pub project: String,
    /// Stack being evaluated.
    pub stack: String,
    /// Configuration values to apply before running.
    pub config: BTreeMap<ConfigKey, String>,
    /// Configuration keys whose values are secret.
    pub config_secret_keys: Vec<ConfigKey>,
    /// True for a preview.
    pub dry_run: bool,
    /// Degree of parallelism for resource operations (`<= 1` is serial).
    pub parallel: i32,
    /// Address of the host resource monitor.
    pub monitor_address: String,
}

/// Options for a `Construct` call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConstructOptions {
    /// Aliases of the component.
    pub aliases: Vec<Alias>,
    /// Resources the component depends on.
    pub dependencies: Vec<Urn>,
    /// True if the component is protected from deletion.
    pub protect: bool,
    /// Provider references keyed by package name.
    pub providers: BTreeMap<String, String>,
    /// Resources each input property depends on.
    pub property_dependencies: BTreeMap<PropertyKey, Vec<Urn>>,
}

/// Result of a `Construct` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructResult {
    /// URN of the constructed component.
    pub urn: Urn,
    /// Output properties of the component.
    pub outputs: PropertyMap,
    /// Resources each output property depends on.
    pub output_dependencies: BTreeMap<PropertyKey, Vec<Urn>>,
}

/// Context needed to run a component method during `Call`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CallInfo {
    /// Project housing the program being run.
    pub project: String,
    /// Stack being evaluated.
    pub stack: String,
    /// Configuration values to apply before running.
    pub config: BTreeMap<ConfigKey, String>,
    /// True for a preview.
    pub dry_run: bool,
    /// Degree of parallelism for resource operations (`<= 1` is serial).
    pub parallel: i32,
    /// Address of the host resource monitor.
    pub monitor_address: String,
}

/// Options for a `Call`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CallOptions {
    /// Resources each argument depends on.
    pub arg_dependencies: BTreeMap<PropertyKey, Vec<Urn>>,
}

/// Result of a `Call`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CallResult {
    /// Returned values.
    pub return_values: PropertyMap,
    /// Resources each returned value depends on.
    pub return_dependencies: BTreeMap<PropertyKey, Vec<Urn>>,
    /// Argument validation failures.
    pub failures: Vec<super::CheckFailure>,
}

impl ConstructInfo {
    /// Returns true if resource operations run one at a time.
    #[must_use]
    pub const fn is_serial(&self) -> bool {
        self.parallel <= 1
    }

    /// Returns true if the given configuration key holds a secret.
    #[must_use]
    pub fn is_secret(&self, key: &ConfigKey) -> bool {
        self.config_secret_keys.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_key_parse() {
        let key: ConfigKey = "aws:region".parse().expect("valid key");
        assert_eq!(key, ConfigKey::new("aws", "region"));
        assert_eq!(key.to_string(), "aws:region");

        assert!("region".parse::<ConfigKey>().is_err());
        assert!(":region".parse::<ConfigKey>().is_err());
    }

    #[test]
    fn test_config_key_serde() {
        let mut config = BTreeMap::new();
        config.insert(ConfigKey::new("web", "domain"), String::from("example.com"));
        let json = serde_json::to_string(&config).expect("serializable");
        assert_eq!(json, r#"{"web:domain":"example.com"}"#);

        let back: BTreeMap<ConfigKey, String> = serde_json::from_str(&json).expect("deserializable");
        assert_eq!(back, config);
    }

    #[test]
    fn test_construct_info_helpers() {
        let info = ConstructInfo {
            parallel: 1,
            config_secret_keys: vec![ConfigKey::new("web", "token")],
            ..ConstructInfo::default()
        };
        assert!(info.is_serial());
        assert!(info.is_secret(&ConfigKey::new("web", "token")));
        assert!(!info.is_secret(&ConfigKey::new("web", "domain")));
    }
}
