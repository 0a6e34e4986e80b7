//! Provider plugin contract.
//!
//! This module defines everything the engine exchanges with a provider:
//! - The [`Provider`] trait and its result records
//! - Diff classification and the detailed-diff translator
//! - Check results, streamed invoke results, and Construct/Call context

mod check;
mod context;
mod diff;
mod provider;
mod stream;

pub use check::{CheckFailure, CheckResult};
pub use context::{
    Alias, CallInfo, CallOptions, CallResult, ConfigKey, ConstructInfo, ConstructOptions,
    ConstructResult,
};
pub use diff::{
    DetailedDiff, DiffChanges, DiffKind, DiffResult, DiffUnavailableError, PropertyDiff,
    detailed_diff_from_object_diff, mark_input_diff, path_is_under, top_level_key,
};
#[cfg(test)]
pub use provider::MockProvider;
pub use provider::{AttachableProvider, CreateResult, InvokeResult, PluginInfo, Provider, ReadResult};
pub use stream::{DEFAULT_STREAM_CAPACITY, InvokeStream, StreamSender};
