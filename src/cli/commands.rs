//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// provplug - Drive a resource provider from the command line.
#[derive(Parser, Debug)]
#[command(name = "provplug")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "PROVPLUG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute the detailed diff between two property files.
    Diff {
        /// File holding the old properties (JSON or YAML).
        #[arg(long)]
        olds: PathBuf,

        /// File holding the new properties (JSON or YAML).
        #[arg(long)]
        news: PathBuf,

        /// Property paths whose changes are ignored.
        #[arg(long = "ignore-changes")]
        ignore_changes: Vec<String>,
    },

    /// Check and diff a resource, and show the planned steps.
    Plan(ResourceArgs),

    /// Plan a resource and run its steps against the provider.
    Apply {
        /// Resource to apply.
        #[command(flatten)]
        resource: ResourceArgs,

        /// Run the steps without side effects.
        #[arg(long)]
        preview: bool,
    },

    /// Construct a component resource.
    Construct {
        /// Component type token (e.g. `memory:index:Site`).
        #[arg(long = "type")]
        type_token: String,

        /// Component name.
        #[arg(long)]
        name: String,

        /// File holding the component inputs (JSON or YAML).
        #[arg(long)]
        inputs: PathBuf,

        /// URN of the parent resource.
        #[arg(long)]
        parent: Option<String>,

        /// Address of the host resource monitor.
        #[arg(long, default_value = "")]
        monitor: String,

        /// Construct without side effects.
        #[arg(long)]
        preview: bool,
    },

    /// Call a method of a component resource.
    Call {
        /// Method token (e.g. `memory:index:Site/url`).
        #[arg(long)]
        token: String,

        /// File holding the call arguments (JSON or YAML).
        #[arg(long)]
        args: PathBuf,

        /// Address of the host resource monitor.
        #[arg(long, default_value = "")]
        monitor: String,

        /// Call without side effects.
        #[arg(long)]
        preview: bool,
    },

    /// Print the provider schema.
    Schema {
        /// Schema version to request.
        #[arg(long, default_value = "0")]
        version: i32,
    },

    /// Validate the host configuration.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },
}

/// Arguments identifying a resource and its desired state.
#[derive(Args, Debug, Clone)]
pub struct ResourceArgs {
    /// Resource type token (e.g. `memory:index:Bucket`).
    #[arg(long = "type")]
    pub type_token: String,

    /// Resource name.
    #[arg(long)]
    pub name: String,

    /// ID of the existing resource, if any.
    #[arg(long)]
    pub id: Option<String>,

    /// File holding the existing resource's state (JSON or YAML).
    #[arg(long, requires = "id")]
    pub olds: Option<PathBuf>,

    /// File holding the desired inputs (JSON or YAML).
    #[arg(long)]
    pub news: PathBuf,

    /// Seed for deterministic auto-naming.
    #[arg(long)]
    pub seed: Option<String>,

    /// Property paths whose changes are ignored.
    #[arg(long = "ignore-changes")]
    pub ignore_changes: Vec<String>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
