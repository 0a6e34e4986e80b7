//! Error types for the provider plugin runtime.
//!
//! This module provides the error hierarchy for every layer of the crate:
//! host configuration, provider operations, and diff classification.
//!
//! Validation problems found by `Check` are not errors; they are reported as
//! [`CheckFailure`](crate::plugin::CheckFailure)s alongside a successful result.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::plugin::DiffUnavailableError;
use crate::resource::{PropertyMap, ResourceId, Status};

/// The main error type for the provider plugin runtime.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Provider operation errors.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Diff classification errors.
    #[error("Diff error: {0}")]
    Diff(#[from] DiffError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
    },

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// A debug provider entry could not be parsed.
    #[error("Invalid debug provider entry '{entry}': expected <package>:<port>")]
    InvalidDebugProvider {
        /// The offending entry.
        entry: String,
    },
}

/// Errors returned by provider operations.
///
/// Mutating operations are not transactional. [`ProviderError::status`] tells
/// the caller whether a failed operation may have left real-world state behind.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// An optional operation is not supported by this provider.
    #[error("{operation} is not yet implemented")]
    NotYetImplemented {
        /// Name of the unsupported operation.
        operation: String,
    },

    /// The provider could not compute a diff for the resource.
    #[error("Diff unavailable: {0}")]
    DiffUnavailable(#[from] DiffUnavailableError),

    /// The operation was aborted after cancellation was signalled.
    #[error("{operation} was cancelled")]
    Cancelled {
        /// Name of the cancelled operation.
        operation: String,
    },

    /// The operation did not complete within its timeout.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        /// Name of the operation.
        operation: String,
        /// Timeout that elapsed.
        timeout: Duration,
    },

    /// The resource was created but failed to initialize completely.
    #[error("Resource {id} was left in a partial state: {}", reasons.join("; "))]
    PartialFailure {
        /// ID of the partially created resource.
        id: ResourceId,
        /// Outputs the provider recorded before failing.
        outputs: PropertyMap,
        /// Reasons reported by the provider.
        reasons: Vec<String>,
    },

    /// The operation failed with an explicit status.
    #[error("{operation} failed ({status}): {message}")]
    OperationFailed {
        /// Name of the operation.
        operation: String,
        /// Resulting status of the resource.
        status: Status,
        /// Description of the failure.
        message: String,
    },

    /// The resource does not exist.
    #[error("Resource not found: {id}")]
    ResourceNotFound {
        /// ID of the missing resource.
        id: ResourceId,
    },

    /// The requested schema version is not supported.
    #[error("Unsupported schema version: {version}")]
    UnsupportedSchemaVersion {
        /// Requested version.
        version: i32,
    },

    /// A resource operation was issued before `configure`.
    #[error("Provider has not been configured")]
    NotConfigured,

    /// `configure` was called more than once.
    #[error("Provider has already been configured")]
    AlreadyConfigured,

    /// The resource type is not managed by this provider.
    #[error("Unknown resource type: {type_token}")]
    UnknownResourceType {
        /// The unrecognized type token.
        type_token: String,
    },

    /// The function token is not served by this provider.
    #[error("Unknown function: {token}")]
    UnknownFunction {
        /// The unrecognized function token.
        token: String,
    },

    /// A URN could not be parsed.
    #[error("Invalid URN '{urn}': {reason}")]
    InvalidUrn {
        /// The malformed URN.
        urn: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Attaching to a running provider failed.
    #[error("Failed to attach to {address}: {message}")]
    AttachFailed {
        /// Address that was given.
        address: String,
        /// Description of the failure.
        message: String,
    },

    /// The provider has been closed.
    #[error("Provider is closed")]
    Closed,
}

/// Diff classification errors.
#[derive(Debug, Error)]
pub enum DiffError {
    /// A wire value did not map to any diff kind.
    #[error("Unknown diff kind: {value}")]
    UnknownDiffKind {
        /// The out-of-range value.
        value: i32,
    },

    /// The coarse and detailed views of a diff disagree.
    #[error("Inconsistent diff result: {message}")]
    Inconsistent {
        /// Description of the disagreement.
        message: String,
    },
}

/// Result type alias for provider plugin operations.
pub type Result<T> = std::result::Result<T, PluginError>;

impl PluginError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Returns the provider error, if this is one.
    #[must_use]
    pub const fn as_provider(&self) -> Option<&ProviderError> {
        match self {
            Self::Provider(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the resource status implied by this error.
    ///
    /// Errors that never reached a provider leave nothing behind.
    #[must_use]
    pub const fn status(&self) -> Status {
        match self {
            Self::Provider(e) => e.status(),
            _ => Status::Failed,
        }
    }
}

impl ProviderError {
    /// Creates a not-yet-implemented error for the named operation.
    #[must_use]
    pub fn not_implemented(operation: impl Into<String>) -> Self {
        Self::NotYetImplemented {
            operation: operation.into(),
        }
    }

    /// Creates a cancellation error for the named operation.
    #[must_use]
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Creates an operation failure with an explicit status.
    #[must_use]
    pub fn failed(operation: impl Into<String>, status: Status, message: impl Into<String>) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            status,
            message: message.into(),
        }
    }

    /// Returns the status of the resource after this error.
    #[must_use]
    pub const fn status(&self) -> Status {
        match self {
            Self::PartialFailure { .. } => Status::PartialFailure,
            Self::Cancelled { .. } | Self::Timeout { .. } => Status::Unknown,
            Self::OperationFailed { status, .. } => *status,
            _ => Status::Failed,
        }
    }

    /// Returns true if the operation is unsupported rather than failed.
    #[must_use]
    pub const fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotYetImplemented { .. })
    }

    /// Returns true if the provider could not compute a diff.
    #[must_use]
    pub const fn is_diff_unavailable(&self) -> bool {
        matches!(self, Self::DiffUnavailable(_))
    }

    /// Returns true if the operation was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns true if the resource was not found.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound { .. })
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl DiffError {
    /// Creates an inconsistency error.
    #[must_use]
    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::Inconsistent {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for PluginError {
    fn from(e: serde_json::Error) -> Self {
        Self::serialization(e.to_string())
    }
}
