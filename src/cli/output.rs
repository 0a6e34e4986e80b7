//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{HostConfig, ValidationResult};
use crate::planner::{ExecutionResult, ResourcePlan, Step, StepOutcome};
use crate::plugin::{CallResult, CheckFailure, ConstructResult, DiffChanges, DiffKind, DiffResult};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Detailed diff row for table display.
#[derive(Tabled)]
struct DiffRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Compared")]
    compared: &'static str,
}

/// Step outcome row for table display.
#[derive(Tabled)]
struct StepRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Step")]
    step: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Error")]
    error: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a diff result for display.
    #[must_use]
    pub fn format_diff(&self, diff: &DiffResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(diff).unwrap_or_default(),
            OutputFormat::Text => Self::format_diff_text(diff),
        }
    }

    fn format_diff_text(diff: &DiffResult) -> String {
        if diff.changes == DiffChanges::None {
            return format!("{} No differences.\n", "=".green());
        }

        let mut output = String::new();

        if !diff.detailed_diff.is_empty() {
            let rows: Vec<DiffRow> = diff
                .detailed_diff
                .iter()
                .map(|(path, d)| DiffRow {
                    kind: Self::format_diff_kind(d.kind),
                    path: Self::truncate(path, 60),
                    compared: if d.input_diff { "inputs" } else { "state" },
                })
                .collect();
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        let _ = writeln!(output, "\nChanges: {}", diff.changes);
        if !diff.changed_keys.is_empty() {
            let _ = writeln!(output, "Changed keys: {}", diff.changed_keys.join(", "));
        }
        if diff.replace() {
            let _ = writeln!(
                output,
                "{} {}{}",
                "Replace keys:".red(),
                diff.replace_keys.join(", "),
                if diff.delete_before_replace {
                    " (delete before replace)"
                } else {
                    ""
                }
            );
        }
        if !diff.stable_keys.is_empty() {
            let _ = writeln!(output, "Stable keys: {}", diff.stable_keys.join(", "));
        }

        output
    }

    /// Formats a resource plan for display.
    #[must_use]
    pub fn format_plan(&self, plan: &ResourcePlan) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(plan).unwrap_or_default(),
            OutputFormat::Text => Self::format_plan_text(plan),
        }
    }

    fn format_plan_text(plan: &ResourcePlan) -> String {
        let mut output = String::new();

        let _ = writeln!(output, "\nResource: {}", plan.urn.as_str().bold());
        if let Some(id) = &plan.id {
            let _ = writeln!(output, "ID: {id}");
        }

        if plan.is_blocked() {
            let _ = writeln!(output, "\n{} Check failed:", "x".red());
            output.push_str(&Self::format_failures(&plan.failures));
            return output;
        }

        if plan.has_changes() {
            let steps: Vec<String> = plan.steps.iter().map(|s| Self::format_step(*s)).collect();
            let _ = writeln!(output, "\nSteps: {}", steps.join(" -> "));
        } else {
            let _ = writeln!(
                output,
                "\n{} No changes required - resource is up to date.",
                "=".green()
            );
        }

        if let Some(diff) = &plan.diff
            && diff.changes != DiffChanges::None
        {
            output.push('\n');
            output.push_str(&Self::format_diff_text(diff));
        }

        for note in &plan.notes {
            let _ = writeln!(output, "{} {note}", "!".yellow());
        }

        output
    }

    /// Formats the result of executing a plan.
    #[must_use]
    pub fn format_execution(&self, result: &ExecutionResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_default(),
            OutputFormat::Text => Self::format_execution_text(result),
        }
    }

    /// Formats a plan together with the result of executing it.
    #[must_use]
    pub fn format_apply(&self, plan: &ResourcePlan, result: &ExecutionResult) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({ "plan": plan, "result": result });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = Self::format_plan_text(plan);
                output.push_str(&Self::format_execution_text(result));
                output
            }
        }
    }

    fn format_execution_text(result: &ExecutionResult) -> String {
        let mut output = String::new();

        if !result.outcomes.is_empty() {
            let rows: Vec<StepRow> = result
                .outcomes
                .iter()
                .enumerate()
                .map(|(i, o)| StepRow {
                    index: i + 1,
                    step: Self::format_step(o.step),
                    status: Self::format_outcome_status(o),
                    id: o
                        .id
                        .as_ref()
                        .map_or_else(|| String::from("-"), |id| Self::truncate(id.as_str(), 24)),
                    error: o.error.as_deref().map_or_else(String::new, |e| Self::truncate(e, 48)),
                })
                .collect();
            output.push('\n');
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        if result.success {
            let _ = writeln!(output, "\n{} Apply complete.", "ok".green());
        } else {
            let _ = writeln!(
                output,
                "\n{} Apply failed: {} failed, {} skipped",
                "x".red(),
                result.failed_count(),
                result.skipped_count()
            );
        }

        if let Some(id) = &result.id {
            let _ = writeln!(output, "ID: {id}");
        }
        if let Some(outputs) = &result.outputs {
            for (key, value) in outputs.iter() {
                let _ = writeln!(output, "  {key} = {value}");
            }
        }

        if result.requires_verification() {
            let _ = writeln!(
                output,
                "\n{} The resource may be in an unknown state and requires manual verification.",
                "!".yellow()
            );
            for outcome in result.outcomes.iter().filter(|o| o.requires_verification()) {
                match &outcome.refreshed {
                    Some(read) if read.outputs.is_some() => {
                        let _ = writeln!(output, "   {} still exists as {}", outcome.step, read.id);
                    }
                    Some(_) => {
                        let _ = writeln!(output, "   {} left no resource behind", outcome.step);
                    }
                    None => {}
                }
            }
        }

        output
    }

    /// Formats the result of constructing a component.
    #[must_use]
    pub fn format_construct(&self, result: &ConstructResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = format!("{} Constructed {}\n", "ok".green(), result.urn);
                for (key, value) in result.outputs.iter() {
                    let _ = writeln!(output, "  {key} = {value}");
                }
                Self::push_dependencies(&mut output, &result.output_dependencies);
                output
            }
        }
    }

    /// Formats the result of a component method call.
    #[must_use]
    pub fn format_call(&self, result: &CallResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_default(),
            OutputFormat::Text => {
                if !result.failures.is_empty() {
                    let mut output = format!("{} Call rejected:\n", "x".red());
                    for failure in &result.failures {
                        let _ = writeln!(output, "  {}: {}", failure.property, failure.reason);
                    }
                    return output;
                }

                let mut output = String::new();
                for (key, value) in result.return_values.iter() {
                    let _ = writeln!(output, "{key} = {value}");
                }
                Self::push_dependencies(&mut output, &result.return_dependencies);
                output
            }
        }
    }

    fn push_dependencies(
        output: &mut String,
        dependencies: &std::collections::BTreeMap<String, Vec<crate::resource::Urn>>,
    ) {
        for (key, urns) in dependencies {
            let urns: Vec<&str> = urns.iter().map(crate::resource::Urn::as_str).collect();
            let _ = writeln!(output, "  {key} depends on {}", urns.join(", "));
        }
    }

    /// Formats a schema document for display.
    #[must_use]
    pub fn format_schema(&self, schema: &[u8]) -> String {
        let Ok(value) = serde_json::from_slice::<serde_json::Value>(schema) else {
            return String::from_utf8_lossy(schema).into_owned();
        };
        match self.format {
            OutputFormat::Json => value.to_string(),
            OutputFormat::Text => serde_json::to_string_pretty(&value).unwrap_or_default(),
        }
    }

    /// Formats a configuration validation result.
    #[must_use]
    pub fn format_validation(
        &self,
        config: &HostConfig,
        result: &ValidationResult,
        show_warnings: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&ValidationJson::new(result)).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_validation_text(config, result, show_warnings),
        }
    }

    fn format_validation_text(
        config: &HostConfig,
        result: &ValidationResult,
        show_warnings: bool,
    ) -> String {
        let mut output = String::new();

        if result.is_valid() {
            let _ = writeln!(output, "{} Configuration is valid!", "ok".green());
        } else {
            let _ = writeln!(
                output,
                "{} Configuration has {} error(s):",
                "x".red(),
                result.error_count()
            );
            for error in &result.errors {
                let _ = writeln!(output, "  - {error}");
            }
        }

        if show_warnings && !result.warnings.is_empty() {
            let _ = writeln!(output, "\nWarnings:");
            for warning in &result.warnings {
                let _ = writeln!(output, "  - {}", warning.yellow());
            }
        }

        let _ = writeln!(output, "\nConfiguration summary:");
        let _ = writeln!(output, "  Project: {}", config.project.name);
        let _ = writeln!(output, "  Stack: {}", config.project.stack);
        let _ = writeln!(output, "  Provider: {}", config.provider.package);
        let _ = writeln!(output, "  Resource types: {}", config.provider.schema.resources.len());
        let _ = writeln!(output, "  Debug providers: {}", config.debug_providers.len());

        output
    }

    /// Formats check failures as an indented list.
    fn format_failures(failures: &[CheckFailure]) -> String {
        failures.iter().fold(String::new(), |mut out, f| {
            let _ = writeln!(out, "   - {}: {}", f.property, f.reason);
            out
        })
    }

    /// Formats a diff kind with color.
    fn format_diff_kind(kind: DiffKind) -> String {
        match kind {
            DiffKind::Add => "+add".green().to_string(),
            DiffKind::Delete => "-delete".red().to_string(),
            DiffKind::Update => "~update".yellow().to_string(),
            DiffKind::AddReplace | DiffKind::DeleteReplace | DiffKind::UpdateReplace => {
                format!("+-{kind}").magenta().to_string()
            }
        }
    }

    /// Formats a step with color.
    fn format_step(step: Step) -> String {
        match step {
            Step::Same => "same".dimmed().to_string(),
            Step::Create => "+create".green().to_string(),
            Step::Update => "~update".yellow().to_string(),
            Step::CreateReplacement => "++create-replacement".magenta().to_string(),
            Step::DeleteReplaced => "--delete-replaced".red().to_string(),
        }
    }

    fn format_outcome_status(outcome: &StepOutcome) -> String {
        if outcome.skipped {
            "skipped".dimmed().to_string()
        } else if outcome.is_success() {
            outcome.status.to_string().green().to_string()
        } else {
            outcome.status.to_string().red().to_string()
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }

    /// Formats an error message.
    #[must_use]
    pub fn error(&self, message: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({ "status": "error", "message": message });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => format!("{} {message}", "Error:".red()),
        }
    }
}

// JSON serialization helpers

#[derive(serde::Serialize)]
struct ValidationJson {
    valid: bool,
    errors: Vec<ValidationErrorJson>,
    warnings: Vec<String>,
}

#[derive(serde::Serialize)]
struct ValidationErrorJson {
    field: String,
    message: String,
}

impl ValidationJson {
    fn new(result: &ValidationResult) -> Self {
        Self {
            valid: result.is_valid(),
            errors: result
                .errors
                .iter()
                .map(|e| ValidationErrorJson {
                    field: e.field.clone(),
                    message: e.message.clone(),
                })
                .collect(),
            warnings: result.warnings.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PropertyDiff;
    use crate::resource::{PropertyMap, ResourceId, Status, TypeToken, Urn};

    fn replace_diff() -> DiffResult {
        let mut detailed = crate::plugin::DetailedDiff::new();
        detailed.insert(String::from("region"), PropertyDiff::new(DiffKind::UpdateReplace));
        detailed.insert(String::from("tags.env"), PropertyDiff::new(DiffKind::Add));
        DiffResult::from_detailed_diff(detailed, true)
    }

    fn plan(steps: Vec<Step>, diff: Option<DiffResult>) -> ResourcePlan {
        ResourcePlan {
            urn: Urn::new("dev", "web", None, &TypeToken::new("memory:index:Bucket"), "assets"),
            id: Some(ResourceId::new("b-1")),
            olds: PropertyMap::new(),
            inputs: PropertyMap::new(),
            steps,
            diff,
            failures: Vec::new(),
            ignore_changes: Vec::new(),
            notes: Vec::new(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_diff_text_lists_paths_and_replace_keys() {
        colored::control::set_override(false);
        let text = OutputFormatter::new(OutputFormat::Text).format_diff(&replace_diff());
        assert!(text.contains("tags.env"));
        assert!(text.contains("Replace keys: region (delete before replace)"));
    }

    #[test]
    fn test_diff_json_round_trips() {
        let json = OutputFormatter::new(OutputFormat::Json).format_diff(&replace_diff());
        let parsed: DiffResult = serde_json::from_str(&json).expect("valid json");
        assert_eq!(parsed, replace_diff());
    }

    #[test]
    fn test_plan_text_shows_blocking_failures() {
        colored::control::set_override(false);
        let mut blocked = plan(Vec::new(), None);
        blocked.failures.push(CheckFailure::new("size", "missing required property"));

        let text = OutputFormatter::new(OutputFormat::Text).format_plan(&blocked);
        assert!(text.contains("Check failed"));
        assert!(text.contains("size: missing required property"));
    }

    #[test]
    fn test_plan_text_orders_replacement_steps() {
        colored::control::set_override(false);
        let text = OutputFormatter::new(OutputFormat::Text).format_plan(&plan(
            vec![Step::DeleteReplaced, Step::CreateReplacement],
            Some(replace_diff()),
        ));
        assert!(text.contains("--delete-replaced -> ++create-replacement"));
    }

    #[test]
    fn test_execution_text_flags_verification() {
        colored::control::set_override(false);
        let result = ExecutionResult {
            outcomes: vec![StepOutcome {
                step: Step::Create,
                status: Status::PartialFailure,
                id: Some(ResourceId::new("b-1")),
                outputs: None,
                error: Some(String::from("health check failed")),
                refreshed: None,
                skipped: false,
            }],
            success: false,
            id: Some(ResourceId::new("b-1")),
            outputs: None,
        };

        let text = OutputFormatter::new(OutputFormat::Text).format_execution(&result);
        assert!(text.contains("Apply failed: 1 failed, 0 skipped"));
        assert!(text.contains("requires manual verification"));
    }

    #[test]
    fn test_construct_and_call_text() {
        colored::control::set_override(false);
        let formatter = OutputFormatter::new(OutputFormat::Text);
        let dep = Urn::new("dev", "web", None, &TypeToken::new("memory:index:Bucket"), "a");

        let constructed = ConstructResult {
            urn: Urn::new("dev", "web", None, &TypeToken::new("memory:index:Site"), "site"),
            outputs: PropertyMap::new().with("domain", "example.com"),
            output_dependencies: std::collections::BTreeMap::from([(
                String::from("domain"),
                vec![dep],
            )]),
        };
        let text = formatter.format_construct(&constructed);
        assert!(text.contains("Constructed urn:infra:dev::web::memory:index:Site::site"));
        assert!(text.contains("domain depends on urn:infra:dev::web::memory:index:Bucket::a"));

        let rejected = CallResult {
            failures: vec![CheckFailure::new("path", "missing required argument")],
            ..CallResult::default()
        };
        let text = formatter.format_call(&rejected);
        assert!(text.contains("Call rejected"));
        assert!(text.contains("path: missing required argument"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(OutputFormatter::truncate("short", 10), "short");
        assert_eq!(OutputFormatter::truncate("ééééééééé", 6), "ééé...");
    }
}
