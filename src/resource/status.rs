//! Status codes for mutating provider operations.

use serde::{Deserialize, Serialize};

/// Outcome of a create, update, or delete as seen by the resource ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    /// The operation succeeded.
    #[default]
    Ok,
    /// The operation failed and left nothing behind.
    Failed,
    /// The operation failed and the resource may exist in a partial state.
    PartialFailure,
    /// The outcome is not known, e.g. the operation was cancelled or timed out.
    Unknown,
}

impl Status {
    /// Returns true if the operation succeeded.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Returns true if a follow-up `Read` is needed to learn the real state.
    #[must_use]
    pub const fn requires_refresh(self) -> bool {
        matches!(self, Self::PartialFailure | Self::Unknown)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ok => "ok",
            Self::Failed => "failed",
            Self::PartialFailure => "partial-failure",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}
