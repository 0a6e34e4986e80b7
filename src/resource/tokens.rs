//! Package, type, and function tokens.
//!
//! Tokens are colon-separated names of the form `pkg:module:member`. The first
//! segment always names the package that owns the token.

use serde::{Deserialize, Serialize};

/// Name of a provider package, e.g. `memory`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Package(String);

/// A resource type token, e.g. `memory:index:Bucket`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeToken(String);

/// A function or method token, e.g. `memory:index:echo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleMember(String);

fn package_of(token: &str) -> &str {
    token.split(':').next().unwrap_or(token)
}

fn member_of(token: &str) -> &str {
    token.rsplit(':').next().unwrap_or(token)
}

impl Package {
    /// Creates a package name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the package name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TypeToken {
    /// Creates a type token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the package that owns this type.
    #[must_use]
    pub fn package(&self) -> Package {
        Package::new(package_of(&self.0))
    }

    /// Returns the unqualified type name (the last segment).
    #[must_use]
    pub fn name(&self) -> &str {
        member_of(&self.0)
    }
}

impl ModuleMember {
    /// Creates a module member token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the package that owns this member.
    #[must_use]
    pub fn package(&self) -> Package {
        Package::new(package_of(&self.0))
    }

    /// Returns the member name (the last segment).
    #[must_use]
    pub fn name(&self) -> &str {
        member_of(&self.0)
    }
}

impl std::fmt::Display for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for TypeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for ModuleMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_segments() {
        let ty = TypeToken::new("memory:index:Bucket");
        assert_eq!(ty.package(), Package::new("memory"));
        assert_eq!(ty.name(), "Bucket");

        let fun = ModuleMember::new("memory:index:echo");
        assert_eq!(fun.package().as_str(), "memory");
        assert_eq!(fun.name(), "echo");
    }

    #[test]
    fn test_bare_token() {
        let ty = TypeToken::new("Bucket");
        assert_eq!(ty.package().as_str(), "Bucket");
        assert_eq!(ty.name(), "Bucket");
    }
}
