//! In-memory reference provider.
//!
//! [`MemoryProvider`] implements the whole provider contract over a resource
//! table held in memory. Its behavior is driven by a [`ProviderSchema`]:
//! required inputs, defaults, auto-naming, replacement rules, components,
//! functions and methods.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{FunctionSchema, ProviderSchema, ProviderSection, ResourceSchema};
use crate::error::{ProviderError, Result};
use crate::plugin::{
    AttachableProvider, CallInfo, CallOptions, CallResult, CheckFailure, CheckResult,
    ConstructInfo, ConstructOptions, ConstructResult, CreateResult, DEFAULT_STREAM_CAPACITY,
    DiffResult, DiffUnavailableError, InvokeResult, InvokeStream, PluginInfo, Provider,
    ReadResult, detailed_diff_from_object_diff, mark_input_diff, path_is_under,
};
use crate::resource::{
    ModuleMember, Package, PropertyKey, PropertyMap, PropertyValue, ResourceId, Status,
    TypeToken, Urn,
};

use super::naming::auto_name;

/// Output property holding the resource ID.
pub const ID_PROPERTY: &str = "id";

/// Built-in function returning its arguments.
pub const ECHO_FUNCTION: &str = "echo";
/// Built-in function returning a stored resource's outputs.
pub const LOOKUP_FUNCTION: &str = "lookup";
/// Built-in streaming function listing stored resources.
pub const LIST_FUNCTION: &str = "list";

/// A resource held by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResource {
    /// URN the resource was created with.
    pub urn: Urn,
    /// Inputs of the last create or update.
    pub inputs: PropertyMap,
    /// Current outputs.
    pub outputs: PropertyMap,
}

#[derive(Debug, Default)]
struct MemoryState {
    config: Option<PropertyMap>,
    resources: BTreeMap<ResourceId, StoredResource>,
    engine_address: Option<SocketAddr>,
}

/// In-memory implementation of the provider contract.
#[derive(Debug)]
pub struct MemoryProvider {
    package: Package,
    schema: ProviderSchema,
    latency: Duration,
    state: RwLock<MemoryState>,
    cancel: CancellationToken,
    closed: AtomicBool,
}

impl MemoryProvider {
    /// Creates a provider for `package` serving `schema`.
    #[must_use]
    pub fn new(package: impl Into<String>, schema: ProviderSchema) -> Self {
        Self {
            package: Package::new(package),
            schema,
            latency: Duration::ZERO,
            state: RwLock::new(MemoryState::default()),
            cancel: CancellationToken::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Creates a provider from the host configuration's provider section.
    #[must_use]
    pub fn from_config(section: &ProviderSection) -> Self {
        Self::new(&section.package, section.schema.clone())
            .with_latency(Duration::from_millis(section.latency_ms))
    }

    /// Sets the simulated latency of mutating operations.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Returns the stored resource with the given ID.
    pub async fn resource(&self, id: &ResourceId) -> Option<StoredResource> {
        self.state.read().await.resources.get(id).cloned()
    }

    /// Returns the number of stored resources.
    pub async fn resource_count(&self) -> usize {
        self.state.read().await.resources.len()
    }

    /// Returns the engine address recorded by `attach`.
    pub async fn engine_address(&self) -> Option<SocketAddr> {
        self.state.read().await.engine_address
    }

    /// Adopts an existing resource into the table, replacing any entry with
    /// the same ID.
    pub async fn import(&self, urn: Urn, id: ResourceId, inputs: PropertyMap, outputs: PropertyMap) {
        debug!("Importing {urn} (ID: {id})");
        self.state
            .write()
            .await
            .resources
            .insert(id, StoredResource { urn, inputs, outputs });
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ProviderError::Closed.into());
        }
        Ok(())
    }

    async fn ensure_configured(&self) -> Result<()> {
        self.ensure_open()?;
        if self.state.read().await.config.is_none() {
            return Err(ProviderError::NotConfigured.into());
        }
        Ok(())
    }

    fn resource_schema(&self, type_token: &TypeToken) -> Result<&ResourceSchema> {
        self.schema.resource(type_token.as_str()).ok_or_else(|| {
            ProviderError::UnknownResourceType {
                type_token: type_token.to_string(),
            }
            .into()
        })
    }

    fn builtin(&self, name: &str) -> String {
        format!("{}:index:{name}", self.package)
    }

    /// Waits out the simulated latency unless cancelled or timed out first.
    async fn simulate(&self, operation: &str, timeout: Option<Duration>) -> Result<()> {
        let work = async {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => Err(ProviderError::cancelled(operation)),
                () = tokio::time::sleep(self.latency) => Ok(()),
            }
        };

        let outcome = match timeout {
            Some(limit) => tokio::time::timeout(limit, work).await.unwrap_or_else(|_| {
                Err(ProviderError::Timeout {
                    operation: operation.to_string(),
                    timeout: limit,
                })
            }),
            None => work.await,
        };

        outcome.map_err(Into::into)
    }
}

/// Reports every required key missing from `values`.
fn missing_required(required: &[String], values: &PropertyMap) -> Vec<CheckFailure> {
    required
        .iter()
        .filter(|key| values.get(key).is_none_or(PropertyValue::is_null))
        .map(|key| CheckFailure::new(key.as_str(), "missing required property"))
        .collect()
}

/// Reports every value that is not known yet.
fn unknown_values(values: &PropertyMap) -> Vec<CheckFailure> {
    values
        .iter()
        .filter(|(_, v)| v.contains_unknowns())
        .map(|(k, _)| CheckFailure::new(k.as_str(), "value is not known yet"))
        .collect()
}

fn with_id(inputs: &PropertyMap, id: &ResourceId) -> PropertyMap {
    let value = if id.is_empty() {
        PropertyValue::Computed
    } else {
        PropertyValue::from(id.as_str())
    };
    inputs.clone().with(ID_PROPERTY, value)
}

/// Keeps only the dependencies of properties present in `values`.
fn dependencies_of(
    dependencies: &BTreeMap<PropertyKey, Vec<Urn>>,
    values: &PropertyMap,
) -> BTreeMap<PropertyKey, Vec<Urn>> {
    dependencies
        .iter()
        .filter(|(k, _)| values.contains_key(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn check_args(schema: Option<&FunctionSchema>, args: &PropertyMap) -> Vec<CheckFailure> {
    schema.map_or_else(Vec::new, |s| missing_required(&s.required, args))
}

#[async_trait]
impl Provider for MemoryProvider {
    fn pkg(&self) -> Package {
        self.package.clone()
    }

    async fn get_schema(&self, version: i32) -> Result<Vec<u8>> {
        self.ensure_open()?;
        if version != 0 {
            return Err(ProviderError::UnsupportedSchemaVersion { version }.into());
        }
        Ok(serde_json::to_vec(&self.schema)?)
    }

    async fn check_config(
        &self,
        urn: &Urn,
        _olds: &PropertyMap,
        news: &PropertyMap,
        allow_unknowns: bool,
    ) -> Result<CheckResult> {
        self.ensure_open()?;
        debug!("Checking provider config for {urn}");

        let mut failures = missing_required(&self.schema.config.required, news);
        if !allow_unknowns {
            failures.extend(unknown_values(news));
        }

        Ok(CheckResult {
            inputs: news.clone(),
            failures,
        })
    }

    async fn diff_config(
        &self,
        urn: &Urn,
        olds: &PropertyMap,
        news: &PropertyMap,
        _allow_unknowns: bool,
        ignore_changes: &[String],
    ) -> Result<DiffResult> {
        self.ensure_open()?;
        debug!("Diffing provider config for {urn}");

        let mut detailed = detailed_diff_from_object_diff(olds.diff(news).as_ref());
        mark_input_diff(&mut detailed, true);

        let mut result = DiffResult::from_detailed_diff(detailed, false);
        result.apply_ignore_changes(ignore_changes);
        Ok(result)
    }

    async fn configure(&self, inputs: &PropertyMap) -> Result<()> {
        self.ensure_open()?;
        let mut state = self.state.write().await;
        if state.config.is_some() {
            return Err(ProviderError::AlreadyConfigured.into());
        }
        state.config = Some(inputs.clone());
        info!("Configured provider {}", self.package);
        Ok(())
    }

    async fn check(
        &self,
        urn: &Urn,
        olds: &PropertyMap,
        news: &PropertyMap,
        allow_unknowns: bool,
        random_seed: &[u8],
    ) -> Result<CheckResult> {
        self.ensure_open()?;
        let schema = self.resource_schema(&urn.type_token())?;

        let mut inputs = schema.defaults.merged(news);

        if let Some(property) = &schema.auto_name
            && inputs.get(property).is_none_or(PropertyValue::is_null)
        {
            let name = olds
                .get(property)
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or_else(|| PropertyValue::from(auto_name(urn, random_seed)));
            debug!("Auto-named {urn}: {property} = {name}");
            inputs.insert(property.clone(), name);
        }

        let mut failures = missing_required(&schema.required, &inputs);
        if !allow_unknowns {
            failures.extend(unknown_values(&inputs));
        }

        Ok(CheckResult { inputs, failures })
    }

    async fn diff(
        &self,
        urn: &Urn,
        id: &ResourceId,
        olds: &PropertyMap,
        news: &PropertyMap,
        _allow_unknowns: bool,
        ignore_changes: &[String],
    ) -> Result<DiffResult> {
        self.ensure_open()?;
        let schema = self.resource_schema(&urn.type_token())?;

        if !schema.diffable {
            return Err(ProviderError::from(DiffUnavailableError::new(format!(
                "{} does not support diffs",
                urn.type_token()
            )))
            .into());
        }

        let object_diff = olds.diff_ignoring(news, |key| key == ID_PROPERTY);
        let mut detailed = detailed_diff_from_object_diff(object_diff.as_ref());
        for (path, diff) in &mut detailed {
            if schema
                .replace_on_changes
                .iter()
                .any(|rule| path_is_under(path, rule))
            {
                *diff = diff.to_replace();
            }
        }
        mark_input_diff(&mut detailed, false);

        let mut result = DiffResult::from_detailed_diff(detailed, schema.delete_before_replace);
        result.apply_ignore_changes(ignore_changes);
        if !result.replace() {
            result.stable_keys.push(ID_PROPERTY.to_string());
        }

        debug!("Diffed {urn} (ID: {id}): {:?}", result.changes);
        Ok(result)
    }

    async fn create(
        &self,
        urn: &Urn,
        news: &PropertyMap,
        timeout: Option<Duration>,
        preview: bool,
    ) -> Result<CreateResult> {
        self.ensure_configured().await?;
        self.resource_schema(&urn.type_token())?;

        if preview {
            let id = ResourceId::default();
            return Ok(CreateResult {
                outputs: with_id(news, &id),
                id,
            });
        }

        if news.contains_unknowns() {
            return Err(ProviderError::failed(
                "Create",
                Status::Failed,
                "inputs contain values that are not known yet",
            )
            .into());
        }

        self.simulate("Create", timeout).await?;

        let id = ResourceId::new(uuid::Uuid::new_v4().simple().to_string());
        let outputs = with_id(news, &id);
        self.state.write().await.resources.insert(
            id.clone(),
            StoredResource {
                urn: urn.clone(),
                inputs: news.clone(),
                outputs: outputs.clone(),
            },
        );

        info!("Created {urn} (ID: {id})");
        Ok(CreateResult { id, outputs })
    }

    async fn read(
        &self,
        urn: &Urn,
        id: &ResourceId,
        _inputs: Option<PropertyMap>,
        _state: Option<PropertyMap>,
    ) -> Result<ReadResult> {
        self.ensure_open()?;
        let state = self.state.read().await;

        let Some(stored) = state.resources.get(id) else {
            debug!("Read {urn} (ID: {id}): not found");
            return Ok(ReadResult::missing(id.clone()));
        };

        Ok(ReadResult {
            id: id.clone(),
            inputs: Some(stored.inputs.clone()),
            outputs: Some(stored.outputs.clone()),
        })
    }

    async fn update(
        &self,
        urn: &Urn,
        id: &ResourceId,
        _olds: &PropertyMap,
        news: &PropertyMap,
        timeout: Option<Duration>,
        ignore_changes: &[String],
        preview: bool,
    ) -> Result<PropertyMap> {
        self.ensure_configured().await?;

        let previous = self
            .resource(id)
            .await
            .ok_or_else(|| ProviderError::ResourceNotFound { id: id.clone() })?;

        // Ignored paths keep their previous value, or stay absent if they had none.
        let mut inputs = news.clone();
        for path in ignore_changes {
            let old = previous.inputs.get_path(path).cloned();
            if !inputs.set_path(path, old) {
                debug!("Ignored path {path} not present in the new inputs of {urn}");
            }
        }

        if preview {
            return Ok(with_id(&inputs, id));
        }

        self.simulate("Update", timeout).await?;

        let outputs = with_id(&inputs, id);
        let mut state = self.state.write().await;
        let Some(stored) = state.resources.get_mut(id) else {
            return Err(ProviderError::ResourceNotFound { id: id.clone() }.into());
        };
        stored.inputs = inputs;
        stored.outputs = outputs.clone();

        info!("Updated {urn} (ID: {id})");
        Ok(outputs)
    }

    async fn delete(
        &self,
        urn: &Urn,
        id: &ResourceId,
        _props: &PropertyMap,
        timeout: Option<Duration>,
    ) -> Result<()> {
        self.ensure_configured().await?;
        self.simulate("Delete", timeout).await?;

        if self.state.write().await.resources.remove(id).is_none() {
            warn!("Delete {urn}: no resource with ID {id}");
            return Err(ProviderError::ResourceNotFound { id: id.clone() }.into());
        }

        info!("Deleted {urn} (ID: {id})");
        Ok(())
    }

    async fn construct(
        &self,
        info: &ConstructInfo,
        type_token: &TypeToken,
        name: &str,
        parent: Option<Urn>,
        inputs: &PropertyMap,
        options: &ConstructOptions,
    ) -> Result<ConstructResult> {
        self.ensure_open()?;
        let schema = self.resource_schema(type_token)?;
        if !schema.component {
            return Err(ProviderError::failed(
                "Construct",
                Status::Failed,
                format!("{type_token} is not a component"),
            )
            .into());
        }

        let urn = parent.map_or_else(
            || Urn::new(&info.stack, &info.project, None, type_token, name),
            |p| p.child(type_token, name),
        );
        info!("Constructed component {urn}");

        Ok(ConstructResult {
            output_dependencies: dependencies_of(&options.property_dependencies, inputs),
            outputs: inputs.clone(),
            urn,
        })
    }

    async fn invoke(&self, token: &ModuleMember, args: &PropertyMap) -> Result<InvokeResult> {
        self.ensure_open()?;
        let declared = self.schema.functions.get(token.as_str());
        let failures = check_args(declared, args);
        if !failures.is_empty() {
            return Ok(InvokeResult {
                outputs: PropertyMap::new(),
                failures,
            });
        }

        if token.as_str() == self.builtin(LOOKUP_FUNCTION) {
            let Some(id) = args.get(ID_PROPERTY).and_then(PropertyValue::as_str) else {
                return Ok(InvokeResult {
                    outputs: PropertyMap::new(),
                    failures: vec![CheckFailure::new(ID_PROPERTY, "missing required argument")],
                });
            };
            let id = ResourceId::new(id);
            let stored = self
                .resource(&id)
                .await
                .ok_or_else(|| ProviderError::ResourceNotFound { id: id.clone() })?;
            return Ok(InvokeResult {
                outputs: stored.outputs,
                failures: vec![],
            });
        }

        if token.as_str() == self.builtin(ECHO_FUNCTION) || declared.is_some() {
            return Ok(InvokeResult {
                outputs: args.clone(),
                failures: vec![],
            });
        }

        Err(ProviderError::UnknownFunction {
            token: token.to_string(),
        }
        .into())
    }

    async fn stream_invoke(&self, token: &ModuleMember, args: &PropertyMap) -> Result<InvokeStream> {
        self.ensure_open()?;
        if token.as_str() != self.builtin(LIST_FUNCTION) {
            return Err(ProviderError::UnknownFunction {
                token: token.to_string(),
            }
            .into());
        }

        let type_filter = args.get("type").and_then(PropertyValue::as_str).map(TypeToken::new);
        let items: Vec<PropertyMap> = self
            .state
            .read()
            .await
            .resources
            .values()
            .filter(|r| type_filter.as_ref().is_none_or(|t| r.urn.type_token() == *t))
            .map(|r| r.outputs.clone())
            .collect();

        debug!("Streaming {} resource(s) from {token}", items.len());
        let (tx, stream) = InvokeStream::channel(DEFAULT_STREAM_CAPACITY);
        let cancel = self.cancel.clone();
        let operation = token.to_string();

        tokio::spawn(async move {
            for item in items {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        tx.fail(ProviderError::cancelled(&operation).into()).await;
                        return;
                    }
                    sent = tx.send(item) => {
                        if !sent {
                            debug!("Consumer stopped {operation}");
                            return;
                        }
                    }
                }
            }
        });

        Ok(stream)
    }

    async fn call(
        &self,
        token: &ModuleMember,
        args: &PropertyMap,
        _info: &CallInfo,
        options: &CallOptions,
    ) -> Result<CallResult> {
        self.ensure_open()?;
        let Some(method) = self.schema.methods.get(token.as_str()) else {
            return Err(ProviderError::not_implemented(format!("Call {token}")).into());
        };

        let failures = check_args(Some(method), args);
        if !failures.is_empty() {
            return Ok(CallResult {
                failures,
                ..CallResult::default()
            });
        }

        Ok(CallResult {
            return_values: args.clone(),
            return_dependencies: dependencies_of(&options.arg_dependencies, args),
            failures: vec![],
        })
    }

    async fn get_plugin_info(&self) -> Result<PluginInfo> {
        Ok(PluginInfo {
            version: self.schema.version.clone(),
        })
    }

    async fn signal_cancellation(&self) -> Result<()> {
        info!("Cancellation signalled for provider {}", self.package);
        self.cancel.cancel();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("Closed provider {}", self.package);
        }
        Ok(())
    }
}

#[async_trait]
impl AttachableProvider for MemoryProvider {
    async fn attach(&self, address: &str) -> Result<()> {
        self.ensure_open()?;
        let parsed: SocketAddr = address.parse().map_err(|e| ProviderError::AttachFailed {
            address: address.to_string(),
            message: format!("{e}"),
        })?;
        self.state.write().await.engine_address = Some(parsed);
        info!("Attached provider {} to {parsed}", self.package);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{DiffChanges, DiffKind};
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    const SCHEMA: &str = r#"
version: "0.3.0"
config:
  required: [region]
resources:
  "memory:index:Bucket":
    required: [size]
    defaults:
      versioning: false
    replace_on_changes: [region]
    auto_name: bucketName
  "memory:index:Opaque":
    diffable: false
  "memory:index:Site":
    component: true
functions:
  "memory:index:greet":
    required: [name]
methods:
  "memory:index:Site/url":
    required: [path]
"#;

    fn provider() -> MemoryProvider {
        let schema: ProviderSchema = serde_yaml::from_str(SCHEMA).expect("valid schema");
        MemoryProvider::new("memory", schema)
    }

    async fn configured() -> MemoryProvider {
        let p = provider();
        assert_ok!(p.configure(&PropertyMap::new().with("region", "eu")).await);
        p
    }

    fn bucket(name: &str) -> Urn {
        Urn::new("dev", "web", None, &TypeToken::new("memory:index:Bucket"), name)
    }

    fn provider_error(err: &crate::error::PluginError) -> &ProviderError {
        err.as_provider().expect("provider error")
    }

    #[tokio::test]
    async fn test_check_config_reports_missing_keys() {
        let p = provider();
        let urn = Urn::new("dev", "web", None, &TypeToken::new("infra:providers:memory"), "default");
        let result = assert_ok!(p.check_config(&urn, &PropertyMap::new(), &PropertyMap::new(), false).await);
        assert!(!result.is_valid());
        assert_eq!(result.failures_for("region").count(), 1);
    }

    #[tokio::test]
    async fn test_configure_once() {
        let p = configured().await;
        let err = assert_err!(p.configure(&PropertyMap::new()).await);
        assert!(matches!(provider_error(&err), ProviderError::AlreadyConfigured));
    }

    #[tokio::test]
    async fn test_mutations_require_configure() {
        let p = provider();
        let err = assert_err!(p.create(&bucket("a"), &PropertyMap::new(), None, false).await);
        assert!(matches!(provider_error(&err), ProviderError::NotConfigured));
    }

    #[tokio::test]
    async fn test_check_applies_defaults_and_auto_name() {
        let p = provider();
        let news = PropertyMap::new().with("size", 10);
        let result = assert_ok!(p.check(&bucket("assets"), &PropertyMap::new(), &news, false, b"seed").await);

        assert!(result.is_valid());
        assert_eq!(result.inputs.get("versioning"), Some(&PropertyValue::Bool(false)));
        let name = result.inputs.get("bucketName").and_then(PropertyValue::as_str).expect("auto name");
        assert_eq!(name, auto_name(&bucket("assets"), b"seed"));

        let olds = PropertyMap::new().with("bucketName", "kept-name");
        let result = assert_ok!(p.check(&bucket("assets"), &olds, &news, false, b"other").await);
        assert_eq!(result.inputs.get("bucketName").and_then(PropertyValue::as_str), Some("kept-name"));
    }

    #[tokio::test]
    async fn test_check_failures() {
        let p = provider();
        let news = PropertyMap::new().with("tags", PropertyValue::Computed);

        let result = assert_ok!(p.check(&bucket("a"), &PropertyMap::new(), &news, false, b"").await);
        assert_eq!(result.failures_for("size").count(), 1);
        assert_eq!(result.failures_for("tags").count(), 1);

        let result = assert_ok!(p.check(&bucket("a"), &PropertyMap::new(), &news, true, b"").await);
        assert_eq!(result.failures_for("tags").count(), 0);

        let unknown = Urn::new("dev", "web", None, &TypeToken::new("memory:index:Nope"), "x");
        let err = assert_err!(p.check(&unknown, &PropertyMap::new(), &news, true, b"").await);
        assert!(matches!(provider_error(&err), ProviderError::UnknownResourceType { .. }));
    }

    #[tokio::test]
    async fn test_resource_lifecycle() {
        let p = configured().await;
        let urn = bucket("assets");
        let inputs = PropertyMap::new().with("size", 1).with("region", "eu");

        let created = assert_ok!(p.create(&urn, &inputs, None, false).await);
        assert!(!created.id.is_empty());
        assert_eq!(
            created.outputs.get(ID_PROPERTY).and_then(PropertyValue::as_str),
            Some(created.id.as_str())
        );

        let read = assert_ok!(p.read(&urn, &created.id, None, None).await);
        assert!(read.exists());
        assert_eq!(read.inputs, Some(inputs.clone()));

        let news = inputs.clone().with("size", 2);
        let outputs = assert_ok!(
            p.update(&urn, &created.id, &created.outputs, &news, None, &[], false).await
        );
        assert_eq!(outputs.get("size"), Some(&PropertyValue::from(2)));

        assert_ok!(p.delete(&urn, &created.id, &outputs, None).await);
        assert!(!assert_ok!(p.read(&urn, &created.id, None, None).await).exists());

        let err = assert_err!(p.delete(&urn, &created.id, &outputs, None).await);
        assert!(provider_error(&err).is_not_found());
    }

    #[tokio::test]
    async fn test_preview_has_no_side_effects() {
        let p = configured().await;
        let created = assert_ok!(
            p.create(&bucket("a"), &PropertyMap::new().with("size", PropertyValue::Computed), None, true).await
        );
        assert!(created.id.is_empty());
        assert!(created.outputs.get(ID_PROPERTY).is_some_and(PropertyValue::is_computed));
        assert_eq!(p.resource_count().await, 0);
    }

    #[tokio::test]
    async fn test_update_keeps_ignored_inputs() {
        let p = configured().await;
        let urn = bucket("a");
        let created = assert_ok!(
            p.create(&urn, &PropertyMap::new().with("size", 1).with("tier", "hot"), None, false).await
        );

        let news = PropertyMap::new().with("size", 5).with("tier", "cold");
        let outputs = assert_ok!(
            p.update(&urn, &created.id, &created.outputs, &news, None, &[String::from("tier")], false)
                .await
        );
        assert_eq!(outputs.get("tier").and_then(PropertyValue::as_str), Some("hot"));
        assert_eq!(outputs.get("size"), Some(&PropertyValue::from(5)));
    }

    #[tokio::test]
    async fn test_update_keeps_ignored_nested_inputs() {
        let p = configured().await;
        let urn = bucket("a");
        let tags = PropertyMap::new().with("env", "prod").with("team", "web");
        let created = assert_ok!(
            p.create(&urn, &PropertyMap::new().with("size", 1).with("tags", tags), None, false).await
        );

        let news = PropertyMap::new().with("size", 1).with(
            "tags",
            PropertyMap::new().with("env", "dev").with("team", "data").with("owner", "ops"),
        );
        let ignore = [String::from("tags.env"), String::from("tags.owner")];
        let outputs = assert_ok!(
            p.update(&urn, &created.id, &created.outputs, &news, None, &ignore, false).await
        );

        assert_eq!(outputs.get_path("tags.env").and_then(PropertyValue::as_str), Some("prod"));
        assert_eq!(outputs.get_path("tags.team").and_then(PropertyValue::as_str), Some("data"));
        assert_eq!(outputs.get_path("tags.owner"), None);
    }

    #[tokio::test]
    async fn test_diff_ignores_nested_replacement_path() {
        let schema: ProviderSchema = serde_yaml::from_str(
            r#"
resources:
  "memory:index:Bucket":
    replace_on_changes: [tags]
"#,
        )
        .expect("valid schema");
        let p = MemoryProvider::new("memory", schema);
        let urn = bucket("a");
        let olds = PropertyMap::new()
            .with("size", 1)
            .with("tags", PropertyMap::new().with("env", "prod"));
        let news = PropertyMap::new()
            .with("size", 1)
            .with("tags", PropertyMap::new().with("env", "dev"));

        let diff = assert_ok!(p.diff(&urn, &ResourceId::new("x"), &olds, &news, false, &[]).await);
        assert!(diff.replace());
        assert_eq!(diff.replace_keys, vec!["tags"]);

        let diff = assert_ok!(
            p.diff(&urn, &ResourceId::new("x"), &olds, &news, false, &[String::from("tags.env")])
                .await
        );
        assert_eq!(diff.changes, DiffChanges::None);
        assert!(!diff.replace());
        assert!(diff.changed_keys.is_empty());
        assert!(diff.detailed_diff.is_empty());
    }

    #[tokio::test]
    async fn test_imported_resource_can_be_updated() {
        let p = configured().await;
        let urn = bucket("a");
        let id = ResourceId::new("existing");
        let inputs = PropertyMap::new().with("size", 1);
        p.import(urn.clone(), id.clone(), inputs.clone(), inputs.clone().with(ID_PROPERTY, "existing"))
            .await;

        let outputs = assert_ok!(
            p.update(&urn, &id, &inputs, &PropertyMap::new().with("size", 3), None, &[], false).await
        );
        assert_eq!(outputs.get(ID_PROPERTY).and_then(PropertyValue::as_str), Some("existing"));
        assert_eq!(p.resource_count().await, 1);
    }

    #[tokio::test]
    async fn test_diff_classifies_replacements() {
        let p = configured().await;
        let urn = bucket("a");
        let olds = PropertyMap::new().with("size", 1).with("region", "eu").with(ID_PROPERTY, "x");

        let news = PropertyMap::new().with("size", 2).with("region", "eu");
        let diff = assert_ok!(p.diff(&urn, &ResourceId::new("x"), &olds, &news, false, &[]).await);
        assert_eq!(diff.changes, DiffChanges::Some);
        assert!(!diff.replace());
        assert_eq!(diff.stable_keys, vec![ID_PROPERTY]);
        assert!(diff.detailed_diff.values().all(|d| !d.input_diff));

        let news = PropertyMap::new().with("size", 1).with("region", "us");
        let diff = assert_ok!(p.diff(&urn, &ResourceId::new("x"), &olds, &news, false, &[]).await);
        assert!(diff.replace());
        assert_eq!(diff.replace_keys, vec!["region"]);
        assert_eq!(diff.detailed_diff.get("region").map(|d| d.kind), Some(DiffKind::UpdateReplace));
        assert!(diff.validate().is_ok());

        let diff = assert_ok!(
            p.diff(&urn, &ResourceId::new("x"), &olds, &news, false, &[String::from("region")]).await
        );
        assert_eq!(diff.changes, DiffChanges::None);
    }

    #[tokio::test]
    async fn test_diff_unavailable_for_opaque_types() {
        let p = configured().await;
        let urn = Urn::new("dev", "web", None, &TypeToken::new("memory:index:Opaque"), "o");
        let err = assert_err!(
            p.diff(&urn, &ResourceId::new("x"), &PropertyMap::new(), &PropertyMap::new(), false, &[])
                .await
        );
        assert!(provider_error(&err).is_diff_unavailable());
    }

    #[tokio::test]
    async fn test_diff_config_is_input_diff() {
        let p = provider();
        let urn = Urn::new("dev", "web", None, &TypeToken::new("infra:providers:memory"), "default");
        let olds = PropertyMap::new().with("region", "eu");
        let news = PropertyMap::new().with("region", "us");

        let diff = assert_ok!(p.diff_config(&urn, &olds, &news, false, &[]).await);
        assert_eq!(diff.changed_keys, vec!["region"]);
        assert!(diff.detailed_diff.values().all(|d| d.input_diff));
    }

    #[tokio::test]
    async fn test_cancellation_aborts_create() {
        let p = Arc::new(configured().await.with_latency(Duration::from_secs(30)));
        let task = {
            let p = Arc::clone(&p);
            tokio::spawn(async move {
                p.create(&bucket("slow"), &PropertyMap::new().with("size", 1), None, false)
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_ok!(p.signal_cancellation().await);

        let err = assert_err!(task.await.expect("task joined"));
        assert!(provider_error(&err).is_cancelled());
        assert_eq!(err.status(), Status::Unknown);
        assert_eq!(p.resource_count().await, 0);
    }

    #[tokio::test]
    async fn test_timeout() {
        let p = configured().await.with_latency(Duration::from_secs(30));
        let err = assert_err!(
            p.create(&bucket("slow"), &PropertyMap::new(), Some(Duration::from_millis(10)), false)
                .await
        );
        assert!(matches!(
            provider_error(&err),
            ProviderError::Timeout { timeout, .. } if *timeout == Duration::from_millis(10)
        ));
        assert!(err.to_string().contains("10ms"), "{err}");
        assert_eq!(err.status(), Status::Unknown);
    }

    #[tokio::test]
    async fn test_invoke() {
        let p = configured().await;
        let args = PropertyMap::new().with("name", "ada");

        let echoed = assert_ok!(p.invoke(&ModuleMember::new("memory:index:echo"), &args).await);
        assert_eq!(echoed.outputs, args);

        let missing = assert_ok!(p.invoke(&ModuleMember::new("memory:index:greet"), &PropertyMap::new()).await);
        assert_eq!(missing.failures.len(), 1);

        let lookup = assert_ok!(p.invoke(&ModuleMember::new("memory:index:lookup"), &PropertyMap::new()).await);
        assert_eq!(lookup.failures.len(), 1);

        let created = assert_ok!(p.create(&bucket("a"), &PropertyMap::new().with("size", 1), None, false).await);
        let found = assert_ok!(
            p.invoke(
                &ModuleMember::new("memory:index:lookup"),
                &PropertyMap::new().with(ID_PROPERTY, created.id.as_str()),
            )
            .await
        );
        assert_eq!(found.outputs, created.outputs);

        let err = assert_err!(p.invoke(&ModuleMember::new("memory:index:nope"), &args).await);
        assert!(matches!(provider_error(&err), ProviderError::UnknownFunction { .. }));
    }

    #[tokio::test]
    async fn test_stream_invoke_lists_resources() {
        let p = configured().await;
        for name in ["a", "b", "c"] {
            assert_ok!(p.create(&bucket(name), &PropertyMap::new().with("size", 1), None, false).await);
        }

        let stream = assert_ok!(
            p.stream_invoke(&ModuleMember::new("memory:index:list"), &PropertyMap::new()).await
        );
        let items = assert_ok!(stream.collect().await);
        assert_eq!(items.len(), 3);

        let filtered = assert_ok!(
            p.stream_invoke(
                &ModuleMember::new("memory:index:list"),
                &PropertyMap::new().with("type", "memory:index:Site"),
            )
            .await
        );
        assert!(assert_ok!(filtered.collect().await).is_empty());
    }

    #[tokio::test]
    async fn test_construct_component() {
        let p = provider();
        let info = ConstructInfo {
            project: String::from("web"),
            stack: String::from("dev"),
            ..ConstructInfo::default()
        };
        let parent = Urn::new("dev", "web", None, &TypeToken::new("memory:index:Stack"), "root");
        let options = ConstructOptions {
            property_dependencies: BTreeMap::from([
                (String::from("domain"), vec![bucket("a")]),
                (String::from("unused"), vec![bucket("b")]),
            ]),
            ..ConstructOptions::default()
        };
        let inputs = PropertyMap::new().with("domain", "example.com");

        let result = assert_ok!(
            p.construct(&info, &TypeToken::new("memory:index:Site"), "site", Some(parent), &inputs, &options)
                .await
        );
        assert_eq!(result.urn.qualified_type(), "memory:index:Stack$memory:index:Site");
        assert_eq!(result.outputs, inputs);
        assert_eq!(result.output_dependencies.len(), 1);

        let err = assert_err!(
            p.construct(&info, &TypeToken::new("memory:index:Bucket"), "b", None, &inputs, &options)
                .await
        );
        assert_eq!(err.status(), Status::Failed);
    }

    #[tokio::test]
    async fn test_call() {
        let p = provider();
        let token = ModuleMember::new("memory:index:Site/url");
        let options = CallOptions {
            arg_dependencies: BTreeMap::from([(String::from("path"), vec![bucket("a")])]),
        };

        let result = assert_ok!(
            p.call(&token, &PropertyMap::new().with("path", "/"), &CallInfo::default(), &options)
                .await
        );
        assert_eq!(result.return_dependencies.len(), 1);

        let result = assert_ok!(p.call(&token, &PropertyMap::new(), &CallInfo::default(), &options).await);
        assert_eq!(result.failures.len(), 1);

        let err = assert_err!(
            p.call(&ModuleMember::new("memory:index:Site/nope"), &PropertyMap::new(), &CallInfo::default(), &options)
                .await
        );
        assert!(provider_error(&err).is_not_implemented());
    }

    #[tokio::test]
    async fn test_schema_and_info() {
        let p = provider();
        let bytes = assert_ok!(p.get_schema(0).await);
        let schema: ProviderSchema = assert_ok!(serde_json::from_slice(&bytes));
        assert!(schema.resource("memory:index:Bucket").is_some());

        let err = assert_err!(p.get_schema(1).await);
        assert!(matches!(provider_error(&err), ProviderError::UnsupportedSchemaVersion { version: 1 }));

        let info = assert_ok!(p.get_plugin_info().await);
        assert_eq!(info.version.as_deref(), Some("0.3.0"));
    }

    #[tokio::test]
    async fn test_attach_and_close() {
        let p = provider();
        let err = assert_err!(p.attach("not an address").await);
        assert!(matches!(provider_error(&err), ProviderError::AttachFailed { .. }));

        assert_ok!(p.attach("127.0.0.1:50051").await);
        assert_eq!(p.engine_address().await.map(|a| a.port()), Some(50051));

        assert_ok!(p.signal_cancellation().await);
        assert_ok!(p.close().await);
        assert_ok!(p.close().await);
        let err = assert_err!(p.configure(&PropertyMap::new()).await);
        assert!(matches!(provider_error(&err), ProviderError::Closed));
    }
}
