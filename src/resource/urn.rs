//! Resource identity: URNs and provider-assigned IDs.
//!
//! A URN is assigned once by the engine and never changes. An ID is assigned
//! by the provider on creation and may change across a replacement.

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

use super::tokens::TypeToken;

/// URN scheme prefix.
const URN_PREFIX: &str = "urn:infra:";

/// Separator between URN components.
const URN_SEPARATOR: &str = "::";

/// Separator between parent and child types in a qualified type.
const TYPE_SEPARATOR: char = '$';

/// Stable, hierarchical, type-qualified resource name.
///
/// Format: `urn:infra:<stack>::<project>::<qualified-type>::<name>`, where the
/// qualified type chains parent types with `$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Urn(String);

/// Provider-assigned resource identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl Urn {
    /// Builds a URN, optionally nested under a parent's qualified type.
    #[must_use]
    pub fn new(
        stack: &str,
        project: &str,
        parent_type: Option<&str>,
        type_token: &TypeToken,
        name: &str,
    ) -> Self {
        let qualified = match parent_type {
            Some(parent) if !parent.is_empty() => format!("{parent}{TYPE_SEPARATOR}{type_token}"),
            _ => type_token.to_string(),
        };
        Self(format!(
            "{URN_PREFIX}{stack}{URN_SEPARATOR}{project}{URN_SEPARATOR}{qualified}{URN_SEPARATOR}{name}"
        ))
    }

    /// Parses and validates a URN string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a well-formed URN.
    pub fn parse(raw: &str) -> Result<Self, ProviderError> {
        let invalid = |reason: &str| ProviderError::InvalidUrn {
            urn: raw.to_string(),
            reason: reason.to_string(),
        };

        let rest = raw
            .strip_prefix(URN_PREFIX)
            .ok_or_else(|| invalid("missing 'urn:infra:' prefix"))?;

        let parts: Vec<&str> = rest.splitn(4, URN_SEPARATOR).collect();
        if parts.len() != 4 {
            return Err(invalid("expected stack, project, type and name components"));
        }
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid("URN components must not be empty"));
        }

        Ok(Self(raw.to_string()))
    }

    /// Builds the URN of a child resource of this one.
    #[must_use]
    pub fn child(&self, type_token: &TypeToken, name: &str) -> Self {
        Self::new(
            self.stack(),
            self.project(),
            Some(self.qualified_type()),
            type_token,
            name,
        )
    }

    /// Returns the URN text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn component(&self, index: usize) -> &str {
        self.0
            .strip_prefix(URN_PREFIX)
            .and_then(|rest| rest.splitn(4, URN_SEPARATOR).nth(index))
            .unwrap_or("")
    }

    /// Returns the stack component.
    #[must_use]
    pub fn stack(&self) -> &str {
        self.component(0)
    }

    /// Returns the project component.
    #[must_use]
    pub fn project(&self) -> &str {
        self.component(1)
    }

    /// Returns the full qualified type, including parent types.
    #[must_use]
    pub fn qualified_type(&self) -> &str {
        self.component(2)
    }

    /// Returns the resource's own type token.
    #[must_use]
    pub fn type_token(&self) -> TypeToken {
        let qualified = self.qualified_type();
        TypeToken::new(
            qualified
                .rsplit(TYPE_SEPARATOR)
                .next()
                .unwrap_or(qualified),
        )
    }

    /// Returns the resource name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.component(3)
    }
}

impl ResourceId {
    /// Creates a resource ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the placeholder ID produced by a preview create.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Urn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Urn {
    type Error = ProviderError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<Urn> for String {
    fn from(urn: Urn) -> Self {
        urn.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
