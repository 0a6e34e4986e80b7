//! CLI module for the `provplug` tool.
//!
//! This module provides the command-line interface for inspecting diffs,
//! plans and schemas served by a provider.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat, ResourceArgs};
pub use output::OutputFormatter;
