//! Planning module for resource operations.
//!
//! This module turns a provider's `Check` and `Diff` answers into the
//! ordered steps needed to bring one resource to its desired state, and
//! runs those steps against the provider.

mod plan;
mod executor;

pub use plan::{DiffPolicy, PlanRequest, PriorState, ResourcePlan, Step, StepPlanner};
pub use executor::{ExecutionResult, StepExecutor, StepOutcome};
