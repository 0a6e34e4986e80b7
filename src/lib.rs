// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Provider Plugin
//!
//! The provider contract and resource-diff engine of a declarative
//! infrastructure runtime.
//!
//! ## Overview
//!
//! A provider is the component that knows how to manage one family of
//! resources. The engine drives every provider through the same fixed set of
//! lifecycle operations:
//!
//! - Validate and configure the provider itself (`CheckConfig`, `Configure`)
//! - Validate, diff, create, read, update and delete resources
//! - Build components (`Construct`) and call their methods (`Call`)
//! - Invoke functions, including streamed invocations
//!
//! ## Architecture
//!
//! 1. **Value model**: URNs, tokens, property values and their structural diff
//! 2. **Diff model**: [`plugin::DiffResult`] and the translator that flattens
//!    nested value diffs into a path-keyed detailed diff
//! 3. **Planner**: turns `Check`/`Diff` answers into ordered steps and runs them
//!
//! ## Modules
//!
//! - [`resource`]: Resource identity, property values and status codes
//! - [`plugin`]: Provider trait and diff classification
//! - [`planner`]: Step planning and execution for one resource
//! - [`memory`]: In-memory reference provider
//! - [`config`]: Host configuration parsing and validation
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! project:
//!   name: web
//!   stack: dev
//!
//! provider:
//!   package: memory
//!   config:
//!     region: eu-west
//!   schema:
//!     config:
//!       required: [region]
//!     resources:
//!       "memory:index:Bucket":
//!         required: [size]
//!         replace_on_changes: [region]
//!         auto_name: bucketName
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod memory;
pub mod planner;
pub mod plugin;
pub mod resource;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, HostConfig};
pub use error::{PluginError, Result};
pub use memory::MemoryProvider;
pub use planner::{ExecutionResult, ResourcePlan, StepExecutor, StepPlanner};
pub use plugin::{DetailedDiff, DiffResult, Provider};
