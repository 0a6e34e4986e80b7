//! Resource plan types and construction.
//!
//! This module turns a provider's `Check` and `Diff` answers for one resource
//! into the ordered steps needed to reach the desired state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PluginError, ProviderError, Result};
use crate::plugin::{CheckFailure, DiffChanges, DiffResult, Provider};
use crate::resource::{PropertyMap, ResourceId, Urn};

/// What to do when a provider cannot compute a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiffPolicy {
    /// Assume the resource changed and plan an update.
    #[default]
    AssumeChanges,
    /// Abort planning.
    Fail,
}

/// One provider mutation planned for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    /// Nothing to do.
    Same,
    /// Create a new resource.
    Create,
    /// Update the resource in place.
    Update,
    /// Create the replacement of an existing resource.
    CreateReplacement,
    /// Delete the resource being replaced.
    DeleteReplaced,
}

/// The last known state of an existing resource.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PriorState {
    /// Provider-assigned ID.
    pub id: ResourceId,
    /// Inputs the resource was last created or updated with.
    pub inputs: PropertyMap,
    /// Outputs recorded for the resource.
    pub outputs: PropertyMap,
}

/// Everything needed to plan one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRequest {
    /// URN of the resource.
    pub urn: Urn,
    /// Existing state, if the resource already exists.
    pub prior: Option<PriorState>,
    /// Desired inputs.
    pub news: PropertyMap,
    /// Property paths whose changes are ignored.
    pub ignore_changes: Vec<String>,
    /// Seed for deterministic generated values.
    pub random_seed: Vec<u8>,
    /// Whether inputs may contain unknown values (preview).
    pub allow_unknowns: bool,
}

/// The planned steps for one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourcePlan {
    /// URN of the resource.
    pub urn: Urn,
    /// ID of the existing resource, if any.
    pub id: Option<ResourceId>,
    /// Recorded outputs of the existing resource.
    pub olds: PropertyMap,
    /// Checked inputs to apply.
    pub inputs: PropertyMap,
    /// Steps in execution order.
    pub steps: Vec<Step>,
    /// The provider's diff, if one ran.
    pub diff: Option<DiffResult>,
    /// Check failures; a plan with failures has no steps.
    pub failures: Vec<CheckFailure>,
    /// Property paths whose changes are ignored.
    pub ignore_changes: Vec<String>,
    /// Remarks about how the plan was reached.
    pub notes: Vec<String>,
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
}

/// Plans the steps for individual resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepPlanner {
    policy: DiffPolicy,
    strict: bool,
}

impl PlanRequest {
    /// Creates a request for a resource that does not exist yet.
    #[must_use]
    pub fn new(urn: Urn, news: PropertyMap) -> Self {
        Self {
            urn,
            prior: None,
            news,
            ignore_changes: Vec::new(),
            random_seed: Vec::new(),
            allow_unknowns: false,
        }
    }

    /// Sets the existing state of the resource.
    #[must_use]
    pub fn with_prior(mut self, prior: PriorState) -> Self {
        self.prior = Some(prior);
        self
    }

    /// Sets the ignored property paths.
    #[must_use]
    pub fn with_ignore_changes(mut self, ignore_changes: Vec<String>) -> Self {
        self.ignore_changes = ignore_changes;
        self
    }

    /// Sets the random seed.
    #[must_use]
    pub fn with_random_seed(mut self, seed: impl Into<Vec<u8>>) -> Self {
        self.random_seed = seed.into();
        self
    }

    /// Allows unknown values in the inputs.
    #[must_use]
    pub const fn with_allow_unknowns(mut self, allow_unknowns: bool) -> Self {
        self.allow_unknowns = allow_unknowns;
        self
    }
}

impl StepPlanner {
    /// Creates a planner with the default policy.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            policy: DiffPolicy::AssumeChanges,
            strict: false,
        }
    }

    /// Sets the policy for unavailable diffs.
    #[must_use]
    pub const fn with_policy(mut self, policy: DiffPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Rejects diffs whose coarse and detailed views disagree.
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Plans the steps for one resource.
    ///
    /// # Errors
    ///
    /// Returns an error if `Check` or `Diff` fail, if the diff is unavailable
    /// under [`DiffPolicy::Fail`], or if strict mode rejects the diff.
    pub async fn plan(&self, provider: &dyn Provider, request: PlanRequest) -> Result<ResourcePlan> {
        let PlanRequest {
            urn,
            prior,
            news,
            ignore_changes,
            random_seed,
            allow_unknowns,
        } = request;

        debug!("Planning {urn}");
        let old_inputs = prior.as_ref().map(|p| p.inputs.clone()).unwrap_or_default();
        let checked = provider
            .check(&urn, &old_inputs, &news, allow_unknowns, &random_seed)
            .await?;

        let mut plan = ResourcePlan {
            urn,
            id: prior.as_ref().map(|p| p.id.clone()),
            olds: prior.as_ref().map(|p| p.outputs.clone()).unwrap_or_default(),
            inputs: checked.inputs,
            steps: Vec::new(),
            diff: None,
            failures: checked.failures,
            ignore_changes,
            notes: Vec::new(),
            created_at: Utc::now(),
        };

        if !plan.failures.is_empty() {
            warn!("{} failed checking with {} failure(s)", plan.urn, plan.failures.len());
            return Ok(plan);
        }

        let Some(prior) = prior else {
            plan.steps.push(Step::Create);
            info!("Planned {}: create", plan.urn);
            return Ok(plan);
        };

        let diff = match provider
            .diff(
                &plan.urn,
                &prior.id,
                &prior.outputs,
                &plan.inputs,
                allow_unknowns,
                &plan.ignore_changes,
            )
            .await
        {
            Ok(diff) => diff,
            Err(PluginError::Provider(ProviderError::DiffUnavailable(reason)))
                if self.policy == DiffPolicy::AssumeChanges =>
            {
                warn!("Diff unavailable for {}: {reason}; assuming changes", plan.urn);
                plan.notes.push(format!("diff unavailable, assuming changes: {reason}"));
                DiffResult {
                    changes: DiffChanges::Some,
                    ..DiffResult::default()
                }
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = diff.validate() {
            if self.strict {
                return Err(e.into());
            }
            warn!("Inconsistent diff for {}: {e}", plan.urn);
        }

        plan.steps = match diff.changes {
            DiffChanges::None => vec![Step::Same],
            DiffChanges::Unknown => {
                let changed = prior
                    .inputs
                    .diff_ignoring(&plan.inputs, |key| {
                        plan.ignore_changes.iter().any(|ignore| ignore == key)
                    })
                    .is_some();
                plan.notes
                    .push(String::from("provider reported unknown changes; compared inputs"));
                if changed { vec![Step::Update] } else { vec![Step::Same] }
            }
            DiffChanges::Some if diff.replace() => {
                if diff.delete_before_replace {
                    vec![Step::DeleteReplaced, Step::CreateReplacement]
                } else {
                    vec![Step::CreateReplacement, Step::DeleteReplaced]
                }
            }
            DiffChanges::Some => vec![Step::Update],
        };
        plan.diff = Some(diff);

        info!("Planned {}: {}", plan.urn, plan.summary());
        Ok(plan)
    }
}

impl ResourcePlan {
    /// Returns true if check failures prevent any step from running.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Returns true if any step mutates the resource.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.steps.iter().any(|s| *s != Step::Same)
    }

    /// Returns true if the plan replaces the resource.
    #[must_use]
    pub fn is_replacement(&self) -> bool {
        self.steps.contains(&Step::CreateReplacement)
    }

    /// Returns a one-line summary of the steps.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_blocked() {
            return format!("blocked by {} check failure(s)", self.failures.len());
        }
        if self.steps.is_empty() {
            return String::from("no steps");
        }
        self.steps
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Step {
    /// Returns true if the step changes real-world state.
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        !matches!(self, Self::Same)
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Same => "same",
            Self::Create => "create",
            Self::Update => "update",
            Self::CreateReplacement => "create-replacement",
            Self::DeleteReplaced => "delete-replaced",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for DiffPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AssumeChanges => "assume-changes",
            Self::Fail => "fail",
        };
        write!(f, "{s}")
    }
}
