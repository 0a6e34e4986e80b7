//! Step executor for applying resource plans.
//!
//! This module runs the steps of a [`ResourcePlan`] against a provider,
//! recording the resulting status of every step. Mutations are not
//! transactional: when a failure leaves the resource in an uncertain state,
//! the executor reads it back and flags the outcome for manual verification.

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::{PluginError, ProviderError};
use crate::plugin::{Provider, ReadResult};
use crate::resource::{PropertyMap, ResourceId, Status};

use super::plan::{ResourcePlan, Step};

/// Executor for resource plans.
pub struct StepExecutor<'a> {
    /// Provider to drive.
    provider: &'a dyn Provider,
    /// Timeout for each mutation.
    timeout: Option<Duration>,
    /// Whether to run without side effects.
    preview: bool,
}

/// Result of running a single step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    /// The step that was run.
    pub step: Step,
    /// Resulting status of the resource.
    pub status: Status,
    /// ID of the resource after the step, if known.
    pub id: Option<ResourceId>,
    /// Outputs of the resource after the step, if known.
    pub outputs: Option<PropertyMap>,
    /// Error message (if failed).
    pub error: Option<String>,
    /// Live state read back after an uncertain failure.
    pub refreshed: Option<ReadResult>,
    /// The step was not run because an earlier step failed.
    pub skipped: bool,
}

/// Result of executing a whole plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    /// Individual step outcomes, in plan order.
    pub outcomes: Vec<StepOutcome>,
    /// Whether every step succeeded.
    pub success: bool,
    /// ID of the resource after execution, if it exists.
    pub id: Option<ResourceId>,
    /// Outputs of the resource after execution, if known.
    pub outputs: Option<PropertyMap>,
}

impl std::fmt::Debug for StepExecutor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepExecutor")
            .field("provider", &self.provider.pkg())
            .field("timeout", &self.timeout)
            .field("preview", &self.preview)
            .finish()
    }
}

impl<'a> StepExecutor<'a> {
    /// Creates a new step executor.
    #[must_use]
    pub const fn new(provider: &'a dyn Provider) -> Self {
        Self {
            provider,
            timeout: None,
            preview: false,
        }
    }

    /// Sets the timeout for each mutation.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs every step as a preview.
    #[must_use]
    pub const fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    /// Executes a resource plan.
    ///
    /// Steps run in order; after the first failure the remaining steps are
    /// recorded as skipped.
    pub async fn execute(&self, plan: &ResourcePlan) -> ExecutionResult {
        info!(
            "Executing plan for {} with {} step(s){}",
            plan.urn,
            plan.steps.len(),
            if self.preview { " (preview)" } else { "" }
        );

        if plan.is_blocked() {
            error!("Plan for {} is blocked by check failures", plan.urn);
            return ExecutionResult {
                outcomes: vec![],
                success: false,
                id: plan.id.clone(),
                outputs: None,
            };
        }

        let mut current_id = plan.id.clone();
        let mut current_outputs = plan.id.as_ref().map(|_| plan.olds.clone());
        let mut outcomes = Vec::with_capacity(plan.steps.len());
        let mut failed = false;

        for &step in &plan.steps {
            if failed {
                warn!("Skipping {step} for {} after earlier failure", plan.urn);
                outcomes.push(StepOutcome::skipped(step));
                continue;
            }

            let outcome = self.execute_step(plan, step, current_id.as_ref()).await;

            if outcome.status.is_ok() && outcome.error.is_none() {
                match step {
                    Step::Create | Step::CreateReplacement | Step::Update => {
                        current_id.clone_from(&outcome.id);
                        current_outputs.clone_from(&outcome.outputs);
                    }
                    Step::DeleteReplaced => {
                        // Only the delete-first ordering leaves the old resource current.
                        if current_id == outcome.id {
                            current_id = None;
                            current_outputs = None;
                        }
                    }
                    Step::Same => {}
                }
            } else {
                failed = true;
                Self::record_failure(&outcome, &mut current_id, &mut current_outputs);
            }

            outcomes.push(outcome);
        }

        let success = !failed;
        if success {
            info!("Plan for {} applied", plan.urn);
        } else {
            error!("Plan for {} failed", plan.urn);
        }

        ExecutionResult {
            outcomes,
            success,
            id: current_id,
            outputs: current_outputs,
        }
    }

    /// Updates the resource ledger after a failed step.
    ///
    /// A resource left behind by a partial failure, or confirmed by the
    /// read-back, becomes the current one. A current resource the read-back
    /// reports as absent is cleared.
    fn record_failure(
        outcome: &StepOutcome,
        current_id: &mut Option<ResourceId>,
        current_outputs: &mut Option<PropertyMap>,
    ) {
        let Some(id) = outcome.id.as_ref().filter(|id| !id.is_empty()) else {
            return;
        };

        match &outcome.refreshed {
            Some(read) if read.exists() => {
                *current_id = Some(id.clone());
                current_outputs.clone_from(&read.outputs);
            }
            Some(_) => {
                if current_id.as_ref() == Some(id) {
                    *current_id = None;
                    *current_outputs = None;
                }
            }
            None if outcome.outputs.is_some() => {
                *current_id = Some(id.clone());
                current_outputs.clone_from(&outcome.outputs);
            }
            None => {}
        }
    }

    /// Runs a single step.
    async fn execute_step(
        &self,
        plan: &ResourcePlan,
        step: Step,
        current_id: Option<&ResourceId>,
    ) -> StepOutcome {
        debug!("Running {step} for {}", plan.urn);

        match step {
            Step::Same => StepOutcome::ok(step, plan.id.clone(), Some(plan.olds.clone())),
            Step::Create | Step::CreateReplacement => {
                match self
                    .provider
                    .create(&plan.urn, &plan.inputs, self.timeout, self.preview)
                    .await
                {
                    Ok(created) => {
                        info!("Created {} (ID: {})", plan.urn, created.id);
                        StepOutcome::ok(step, Some(created.id), Some(created.outputs))
                    }
                    Err(e) => self.failure(plan, step, None, e).await,
                }
            }
            Step::Update => {
                let Some(id) = current_id else {
                    return StepOutcome::failed(step, Status::Failed, "update planned without an ID");
                };
                match self
                    .provider
                    .update(
                        &plan.urn,
                        id,
                        &plan.olds,
                        &plan.inputs,
                        self.timeout,
                        &plan.ignore_changes,
                        self.preview,
                    )
                    .await
                {
                    Ok(outputs) => {
                        info!("Updated {} (ID: {id})", plan.urn);
                        StepOutcome::ok(step, Some(id.clone()), Some(outputs))
                    }
                    Err(e) => self.failure(plan, step, Some(id), e).await,
                }
            }
            Step::DeleteReplaced => {
                let Some(old_id) = plan.id.as_ref() else {
                    return StepOutcome::failed(step, Status::Failed, "replacement planned without an ID");
                };
                if self.preview {
                    return StepOutcome::ok(step, Some(old_id.clone()), None);
                }
                match self
                    .provider
                    .delete(&plan.urn, old_id, &plan.olds, self.timeout)
                    .await
                {
                    Ok(()) => {
                        info!("Deleted replaced {} (ID: {old_id})", plan.urn);
                        StepOutcome::ok(step, Some(old_id.clone()), None)
                    }
                    Err(PluginError::Provider(e)) if e.is_not_found() => {
                        warn!("Replaced {} (ID: {old_id}) was already gone", plan.urn);
                        StepOutcome::ok(step, Some(old_id.clone()), None)
                    }
                    Err(e) => self.failure(plan, step, Some(old_id), e).await,
                }
            }
        }
    }

    /// Records a failed step, reading the resource back when its state is
    /// uncertain.
    async fn failure(
        &self,
        plan: &ResourcePlan,
        step: Step,
        known_id: Option<&ResourceId>,
        err: PluginError,
    ) -> StepOutcome {
        let status = err.status();
        error!("{step} failed for {} ({status}): {err}", plan.urn);

        let mut outcome = StepOutcome::failed(step, status, err.to_string());
        outcome.id = known_id.cloned();

        if let PluginError::Provider(ProviderError::PartialFailure { id: partial_id, outputs, .. }) = err {
            outcome.id = Some(partial_id);
            outcome.outputs = Some(outputs);
        }

        if !status.requires_refresh() || self.preview {
            return outcome;
        }

        let Some(id) = outcome.id.clone().filter(|id| !id.is_empty()) else {
            warn!("{} requires manual verification; no ID to read back", plan.urn);
            return outcome;
        };

        match self
            .provider
            .read(&plan.urn, &id, Some(plan.inputs.clone()), outcome.outputs.clone())
            .await
        {
            Ok(read) => {
                warn!(
                    "{} requires manual verification (exists: {})",
                    plan.urn,
                    read.exists()
                );
                outcome.refreshed = Some(read);
            }
            Err(e) => {
                warn!("Failed to read back {} after {step}: {e}", plan.urn);
            }
        }

        outcome
    }
}

impl StepOutcome {
    const fn ok(step: Step, id: Option<ResourceId>, outputs: Option<PropertyMap>) -> Self {
        Self {
            step,
            status: Status::Ok,
            id,
            outputs,
            error: None,
            refreshed: None,
            skipped: false,
        }
    }

    fn failed(step: Step, status: Status, message: impl Into<String>) -> Self {
        Self {
            step,
            status,
            id: None,
            outputs: None,
            error: Some(message.into()),
            refreshed: None,
            skipped: false,
        }
    }

    fn skipped(step: Step) -> Self {
        Self {
            skipped: true,
            ..Self::failed(step, Status::Failed, "skipped after earlier failure")
        }
    }

    /// Returns true if the step succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status.is_ok() && self.error.is_none()
    }

    /// Returns true if the resource may exist in an unknown or partial state.
    #[must_use]
    pub const fn requires_verification(&self) -> bool {
        !self.skipped && self.status.requires_refresh()
    }
}

impl ExecutionResult {
    /// Returns true if any step left the resource in an uncertain state.
    #[must_use]
    pub fn requires_verification(&self) -> bool {
        self.outcomes.iter().any(StepOutcome::requires_verification)
    }

    /// Returns the number of steps that failed (not counting skipped ones).
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| !o.skipped && !o.is_success())
            .count()
    }

    /// Returns the number of skipped steps.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.skipped).count()
    }
}
