//! The provider contract.
//!
//! A provider is a plugin that manages the lifecycle of a family of resource
//! types for one package. The engine drives it through the fixed set of
//! operations on [`Provider`]; every call is independent and instances are
//! shared across concurrent operations on distinct resources.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ProviderError, Result};
use crate::resource::{ModuleMember, Package, PropertyMap, ResourceId, TypeToken, Urn};

use super::check::{CheckFailure, CheckResult};
use super::context::{CallInfo, CallOptions, CallResult, ConstructInfo, ConstructOptions, ConstructResult};
use super::diff::DiffResult;
use super::stream::InvokeStream;

/// Result of creating a resource.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CreateResult {
    /// Provider-assigned ID. Empty during preview.
    pub id: ResourceId,
    /// Output properties of the new resource.
    pub outputs: PropertyMap,
}

/// Result of reading a resource's live state.
///
/// An absent resource is reported by `outputs` being `None`, not by an error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReadResult {
    /// ID of the resource that was read.
    pub id: ResourceId,
    /// Inputs reconstructed from the live state, if the provider can.
    #[serde(default)]
    pub inputs: Option<PropertyMap>,
    /// Live output state.
    #[serde(default)]
    pub outputs: Option<PropertyMap>,
}

impl ReadResult {
    /// Returns a result for a resource that no longer exists.
    #[must_use]
    pub const fn missing(id: ResourceId) -> Self {
        Self {
            id,
            inputs: None,
            outputs: None,
        }
    }

    /// Returns true if the resource exists.
    #[must_use]
    pub const fn exists(&self) -> bool {
        self.outputs.is_some()
    }
}

/// Result of invoking a provider function.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InvokeResult {
    /// Returned values.
    pub outputs: PropertyMap,
    /// Argument validation failures.
    #[serde(default)]
    pub failures: Vec<CheckFailure>,
}

/// Information about a provider plugin.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Plugin version, if known.
    pub version: Option<String>,
}

/// Operations the engine may invoke on a resource provider.
///
/// `configure` must complete before any resource operation. Optional
/// operations default to [`ProviderError::NotYetImplemented`], which callers
/// treat as "skip" rather than failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    /// Returns the package this provider serves.
    fn pkg(&self) -> Package;

    /// Returns the package schema for the given schema version.
    async fn get_schema(&self, version: i32) -> Result<Vec<u8>> {
        let _ = version;
        Err(ProviderError::not_implemented("GetSchema").into())
    }

    /// Validates provider configuration.
    async fn check_config(
        &self,
        urn: &Urn,
        olds: &PropertyMap,
        news: &PropertyMap,
        allow_unknowns: bool,
    ) -> Result<CheckResult>;

    /// Compares old and new provider configuration.
    async fn diff_config(
        &self,
        urn: &Urn,
        olds: &PropertyMap,
        news: &PropertyMap,
        allow_unknowns: bool,
        ignore_changes: &[String],
    ) -> Result<DiffResult>;

    /// Applies provider configuration. Called at most once.
    async fn configure(&self, inputs: &PropertyMap) -> Result<()>;

    /// Validates and normalizes resource inputs.
    ///
    /// `random_seed` makes generated values (such as auto-names) deterministic
    /// across runs of the same program.
    async fn check(
        &self,
        urn: &Urn,
        olds: &PropertyMap,
        news: &PropertyMap,
        allow_unknowns: bool,
        random_seed: &[u8],
    ) -> Result<CheckResult>;

    /// Compares the old state of a resource with new inputs.
    ///
    /// May fail with [`ProviderError::DiffUnavailable`], in which case the
    /// caller should assume changes.
    async fn diff(
        &self,
        urn: &Urn,
        id: &ResourceId,
        olds: &PropertyMap,
        news: &PropertyMap,
        allow_unknowns: bool,
        ignore_changes: &[String],
    ) -> Result<DiffResult>;

    /// Creates a resource. With `preview` set, no side effects occur.
    async fn create(
        &self,
        urn: &Urn,
        news: &PropertyMap,
        timeout: Option<Duration>,
        preview: bool,
    ) -> Result<CreateResult>;

    /// Reads the live state of a resource.
    async fn read(
        &self,
        urn: &Urn,
        id: &ResourceId,
        inputs: Option<PropertyMap>,
        state: Option<PropertyMap>,
    ) -> Result<ReadResult>;

    /// Updates a resource and returns its new outputs.
    #[allow(clippy::too_many_arguments)]
    async fn update(
        &self,
        urn: &Urn,
        id: &ResourceId,
        olds: &PropertyMap,
        news: &PropertyMap,
        timeout: Option<Duration>,
        ignore_changes: &[String],
        preview: bool,
    ) -> Result<PropertyMap>;

    /// Deletes a resource.
    async fn delete(
        &self,
        urn: &Urn,
        id: &ResourceId,
        props: &PropertyMap,
        timeout: Option<Duration>,
    ) -> Result<()>;

    /// Constructs a component resource.
    async fn construct(
        &self,
        info: &ConstructInfo,
        type_token: &TypeToken,
        name: &str,
        parent: Option<Urn>,
        inputs: &PropertyMap,
        options: &ConstructOptions,
    ) -> Result<ConstructResult> {
        let _ = (info, type_token, name, parent, inputs, options);
        Err(ProviderError::not_implemented("Construct").into())
    }

    /// Invokes a provider function.
    async fn invoke(&self, token: &ModuleMember, args: &PropertyMap) -> Result<InvokeResult> {
        let _ = (token, args);
        Err(ProviderError::not_implemented("Invoke").into())
    }

    /// Invokes a provider function that returns a stream of results.
    async fn stream_invoke(&self, token: &ModuleMember, args: &PropertyMap) -> Result<InvokeStream> {
        let _ = (token, args);
        Err(ProviderError::not_implemented("StreamInvoke").into())
    }

    /// Calls a method of a component resource.
    async fn call(
        &self,
        token: &ModuleMember,
        args: &PropertyMap,
        info: &CallInfo,
        options: &CallOptions,
    ) -> Result<CallResult> {
        let _ = (token, args, info, options);
        Err(ProviderError::not_implemented("Call").into())
    }

    /// Returns information about the plugin.
    async fn get_plugin_info(&self) -> Result<PluginInfo>;

    /// Asks in-flight operations to stop. Returns without waiting.
    async fn signal_cancellation(&self) -> Result<()>;

    /// Releases the provider. Safe to call more than once.
    async fn close(&self) -> Result<()>;
}

/// A provider that can attach to an already running engine.
#[async_trait]
pub trait AttachableProvider: Provider {
    /// Attaches to the engine listening on `address` (`host:port`).
    async fn attach(&self, address: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::DiffChanges;

    struct Minimal;

    #[async_trait]
    impl Provider for Minimal {
        fn pkg(&self) -> Package {
            Package::new("minimal")
        }

        async fn check_config(
            &self,
            _urn: &Urn,
            _olds: &PropertyMap,
            news: &PropertyMap,
            _allow_unknowns: bool,
        ) -> Result<CheckResult> {
            Ok(CheckResult::valid(news.clone()))
        }

        async fn diff_config(
            &self,
            _urn: &Urn,
            _olds: &PropertyMap,
            _news: &PropertyMap,
            _allow_unknowns: bool,
            _ignore_changes: &[String],
        ) -> Result<DiffResult> {
            Ok(DiffResult::default())
        }

        async fn configure(&self, _inputs: &PropertyMap) -> Result<()> {
            Ok(())
        }

        async fn check(
            &self,
            _urn: &Urn,
            _olds: &PropertyMap,
            news: &PropertyMap,
            _allow_unknowns: bool,
            _random_seed: &[u8],
        ) -> Result<CheckResult> {
            Ok(CheckResult::valid(news.clone()))
        }

        async fn diff(
            &self,
            _urn: &Urn,
            _id: &ResourceId,
            _olds: &PropertyMap,
            _news: &PropertyMap,
            _allow_unknowns: bool,
            _ignore_changes: &[String],
        ) -> Result<DiffResult> {
            Ok(DiffResult::none())
        }

        async fn create(
            &self,
            _urn: &Urn,
            news: &PropertyMap,
            _timeout: Option<Duration>,
            _preview: bool,
        ) -> Result<CreateResult> {
            Ok(CreateResult {
                id: ResourceId::new("1"),
                outputs: news.clone(),
            })
        }

        async fn read(
            &self,
            _urn: &Urn,
            id: &ResourceId,
            _inputs: Option<PropertyMap>,
            _state: Option<PropertyMap>,
        ) -> Result<ReadResult> {
            Ok(ReadResult::missing(id.clone()))
        }

        async fn update(
            &self,
            _urn: &Urn,
            _id: &ResourceId,
            _olds: &PropertyMap,
            news: &PropertyMap,
            _timeout: Option<Duration>,
            _ignore_changes: &[String],
            _preview: bool,
        ) -> Result<PropertyMap> {
            Ok(news.clone())
        }

        async fn delete(
            &self,
            _urn: &Urn,
            _id: &ResourceId,
            _props: &PropertyMap,
            _timeout: Option<Duration>,
        ) -> Result<()> {
            Ok(())
        }

        async fn get_plugin_info(&self) -> Result<PluginInfo> {
            Ok(PluginInfo::default())
        }

        async fn signal_cancellation(&self) -> Result<()> {
            Ok(())
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    fn not_implemented<T>(result: Result<T>) -> bool {
        result
            .err()
            .and_then(|e| e.as_provider().map(ProviderError::is_not_implemented))
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn test_optional_operations_default_to_not_implemented() {
        let provider = Minimal;
        let token = ModuleMember::new("minimal:index:echo");
        let args = PropertyMap::new();

        assert!(not_implemented(provider.get_schema(0).await));
        assert!(not_implemented(provider.invoke(&token, &args).await));
        assert!(not_implemented(provider.stream_invoke(&token, &args).await));
        assert!(not_implemented(
            provider
                .call(&token, &args, &CallInfo::default(), &CallOptions::default())
                .await
        ));
        assert!(not_implemented(
            provider
                .construct(
                    &ConstructInfo::default(),
                    &TypeToken::new("minimal:index:Component"),
                    "c",
                    None,
                    &args,
                    &ConstructOptions::default(),
                )
                .await
        ));
    }

    #[tokio::test]
    async fn test_provider_is_object_safe() {
        let provider: Box<dyn Provider> = Box::new(Minimal);
        let urn = Urn::new("dev", "demo", None, &TypeToken::new("minimal:index:Thing"), "a");
        let diff = provider
            .diff(&urn, &ResourceId::new("1"), &PropertyMap::new(), &PropertyMap::new(), false, &[])
            .await
            .expect("diff succeeds");
        assert_eq!(diff.changes, DiffChanges::None);
        assert_eq!(provider.pkg().as_str(), "minimal");
    }

    #[test]
    fn test_read_result_exists() {
        assert!(!ReadResult::missing(ResourceId::new("x")).exists());
        let found = ReadResult {
            id: ResourceId::new("x"),
            inputs: None,
            outputs: Some(PropertyMap::new()),
        };
        assert!(found.exists());
    }
}
