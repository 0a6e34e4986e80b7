//! Input validation results.

use serde::{Deserialize, Serialize};

use crate::resource::{PropertyKey, PropertyMap};

/// A validation failure tied to one property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckFailure {
    /// The property that failed checking.
    pub property: PropertyKey,
    /// Why the property failed.
    pub reason: String,
}

/// Sanitized inputs plus any validation failures.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CheckResult {
    /// Inputs to pass to subsequent Diff, Create or Update calls.
    pub inputs: PropertyMap,
    /// Validation failures; empty when the inputs are valid.
    #[serde(default)]
    pub failures: Vec<CheckFailure>,
}

impl CheckFailure {
    /// Creates a check failure.
    #[must_use]
    pub fn new(property: impl Into<PropertyKey>, reason: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            reason: reason.into(),
        }
    }
}

impl CheckResult {
    /// Creates a result with no failures.
    #[must_use]
    pub const fn valid(inputs: PropertyMap) -> Self {
        Self {
            inputs,
            failures: Vec::new(),
        }
    }

    /// Returns true if no failures were reported.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns the failures reported for one property.
    pub fn failures_for<'a>(&'a self, property: &'a str) -> impl Iterator<Item = &'a CheckFailure> {
        self.failures.iter().filter(move |f| f.property == property)
    }
}

impl std::fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.property, self.reason)
    }
}
