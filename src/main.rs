//! provplug CLI entrypoint.
//!
//! This is the main entrypoint for the provplug command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use provider_plugin::cli::{Cli, Commands, OutputFormatter, ResourceArgs};
use provider_plugin::config::{ConfigParser, ConfigValidator, HostConfig, find_config_file};
use provider_plugin::error::{ConfigError, PluginError, Result};
use provider_plugin::memory::MemoryProvider;
use provider_plugin::planner::{PlanRequest, PriorState, ResourcePlan, StepExecutor, StepPlanner};
use provider_plugin::plugin::{
    AttachableProvider, CallOptions, ConstructOptions, DiffResult, Provider,
    detailed_diff_from_object_diff, mark_input_diff,
};
use provider_plugin::resource::{ModuleMember, PropertyMap, ResourceId, TypeToken, Urn};

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.log_json);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let formatter = OutputFormatter::new(cli.output);
    match runtime.block_on(run(cli, &formatter)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", formatter.error(&e.to_string()));
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// Logs go to stderr so that command output on stdout stays parseable.
fn init_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Main async entry point.
async fn run(cli: Cli, formatter: &OutputFormatter) -> Result<ExitCode> {
    match cli.command {
        Commands::Diff {
            olds,
            news,
            ignore_changes,
        } => cmd_diff(&olds, &news, &ignore_changes, formatter),
        Commands::Plan(args) => cmd_plan(cli.config.as_ref(), &args, formatter).await,
        Commands::Apply { resource, preview } => {
            cmd_apply(cli.config.as_ref(), &resource, preview, formatter).await
        }
        Commands::Construct {
            type_token,
            name,
            inputs,
            parent,
            monitor,
            preview,
        } => {
            let request = ConstructRequest {
                type_token: TypeToken::new(type_token.as_str()),
                name,
                inputs,
                parent,
                monitor,
                preview,
            };
            cmd_construct(cli.config.as_ref(), request, formatter).await
        }
        Commands::Call {
            token,
            args,
            monitor,
            preview,
        } => {
            let token = ModuleMember::new(token.as_str());
            cmd_call(cli.config.as_ref(), &token, &args, &monitor, preview, formatter).await
        }
        Commands::Schema { version } => cmd_schema(cli.config.as_ref(), version, formatter).await,
        Commands::Validate { warnings } => cmd_validate(cli.config.as_ref(), warnings, formatter),
    }
}

/// Diff two property files.
fn cmd_diff(
    olds_path: &Path,
    news_path: &Path,
    ignore_changes: &[String],
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let olds = ConfigParser::load_properties(olds_path)?;
    let news = ConfigParser::load_properties(news_path)?;

    let object_diff = olds.diff(&news);
    let mut detailed = detailed_diff_from_object_diff(object_diff.as_ref());
    mark_input_diff(&mut detailed, true);

    let mut result = DiffResult::from_detailed_diff(detailed, false);
    result.apply_ignore_changes(ignore_changes);
    debug!("Diffed {} against {}", olds_path.display(), news_path.display());

    emit(&formatter.format_diff(&result))?;
    Ok(ExitCode::SUCCESS)
}

/// Show the plan for one resource.
async fn cmd_plan(
    config_path: Option<&PathBuf>,
    args: &ResourceArgs,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let provider = start_provider(&config).await?;

    let plan = plan_resource(&config, &provider, args, true).await;
    provider.close().await?;
    let plan = plan?;

    emit(&formatter.format_plan(&plan))?;
    Ok(exit_code(!plan.is_blocked()))
}

/// Plan one resource and run its steps.
async fn cmd_apply(
    config_path: Option<&PathBuf>,
    args: &ResourceArgs,
    preview: bool,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let provider = start_provider(&config).await?;
    let preview = preview || config.engine.preview;

    let plan = match plan_resource(&config, &provider, args, preview).await {
        Ok(plan) => plan,
        Err(e) => {
            provider.close().await?;
            return Err(e);
        }
    };

    if plan.is_blocked() {
        provider.close().await?;
        emit(&formatter.format_plan(&plan))?;
        return Ok(ExitCode::FAILURE);
    }

    let executor = StepExecutor::new(&provider)
        .with_timeout(config.timeout())
        .with_preview(preview);

    let execution = executor.execute(&plan);
    tokio::pin!(execution);

    let result = tokio::select! {
        result = &mut execution => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, signalling cancellation to the provider");
            provider.signal_cancellation().await?;
            let grace = Duration::from_secs(config.engine.cancel_grace_secs);
            tokio::time::timeout(grace, execution).await.map_err(|_| {
                PluginError::internal(format!(
                    "provider did not stop within {}s of cancellation",
                    grace.as_secs()
                ))
            })?
        }
    };

    provider.close().await?;

    info!(
        "Applied {}: {}",
        plan.urn,
        if result.success { "success" } else { "failed" }
    );
    emit(&formatter.format_apply(&plan, &result))?;
    Ok(exit_code(result.success))
}

/// Arguments of the construct command.
struct ConstructRequest {
    type_token: TypeToken,
    name: String,
    inputs: PathBuf,
    parent: Option<String>,
    monitor: String,
    preview: bool,
}

/// Construct a component resource.
async fn cmd_construct(
    config_path: Option<&PathBuf>,
    request: ConstructRequest,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let inputs = ConfigParser::load_properties(&request.inputs)?;
    let parent = request.parent.as_deref().map(Urn::parse).transpose()?;
    let info = config.construct_info(request.preview || config.engine.preview, request.monitor);

    let provider = start_provider(&config).await?;
    let result = provider
        .construct(
            &info,
            &request.type_token,
            &request.name,
            parent,
            &inputs,
            &ConstructOptions::default(),
        )
        .await;
    provider.close().await?;
    let result = result?;

    emit(&formatter.format_construct(&result))?;
    Ok(ExitCode::SUCCESS)
}

/// Call a component method.
async fn cmd_call(
    config_path: Option<&PathBuf>,
    token: &ModuleMember,
    args_path: &Path,
    monitor: &str,
    preview: bool,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let args = ConfigParser::load_properties(args_path)?;
    let info = config.call_info(preview || config.engine.preview, monitor);

    let provider = start_provider(&config).await?;
    let result = provider
        .call(token, &args, &info, &CallOptions::default())
        .await;
    provider.close().await?;
    let result = result?;

    emit(&formatter.format_call(&result))?;
    Ok(exit_code(result.failures.is_empty()))
}

/// Print the provider schema.
async fn cmd_schema(
    config_path: Option<&PathBuf>,
    version: i32,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let provider = MemoryProvider::from_config(&config.provider);

    let schema = provider.get_schema(version).await?;
    provider.close().await?;

    emit(&formatter.format_schema(&schema))?;
    Ok(ExitCode::SUCCESS)
}

/// Validate configuration.
fn cmd_validate(
    config_path: Option<&PathBuf>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let config_file = resolve_config_path(config_path)?;
    info!("Validating configuration: {}", config_file.display());

    let parser = config_parser(&config_file);
    parser.load_dotenv()?;
    let config = parser.load_with_env(&config_file)?;

    let result = ConfigValidator::new().check(&config);
    emit(&formatter.format_validation(&config, &result, show_warnings))?;
    Ok(exit_code(result.is_valid()))
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

/// Creates a parser rooted at the configuration file's directory.
fn config_parser(config_file: &Path) -> ConfigParser {
    ConfigParser::new().with_base_path(config_file.parent().unwrap_or_else(|| Path::new(".")))
}

/// Loads and validates the host configuration.
fn load_config(config_path: Option<&PathBuf>) -> Result<HostConfig> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading configuration from: {}", config_file.display());

    let parser = config_parser(&config_file);
    parser.load_dotenv()?;
    let config = parser.load_with_env(&config_file)?;

    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

/// Creates the provider, attaches it if it runs under a debugger, and
/// configures it.
async fn start_provider(config: &HostConfig) -> Result<MemoryProvider> {
    let provider = MemoryProvider::from_config(&config.provider);

    if let Some(address) = config.attach_address(&config.provider.package) {
        info!("Attaching to debug provider at {address}");
        provider.attach(&address).await?;
    }

    let urn = config.provider_urn();
    let checked = provider
        .check_config(&urn, &PropertyMap::new(), &config.provider_inputs(), false)
        .await?;

    if let Some(failure) = checked.failures.first() {
        return Err(ConfigError::validation(
            format!(
                "provider config check failed: {} ({} failure(s))",
                failure.reason,
                checked.failures.len()
            ),
            format!("provider.config.{}", failure.property),
        )
        .into());
    }

    provider.configure(&checked.inputs).await?;
    Ok(provider)
}

/// Builds the plan request from the command arguments and plans it.
async fn plan_resource(
    config: &HostConfig,
    provider: &MemoryProvider,
    args: &ResourceArgs,
    allow_unknowns: bool,
) -> Result<ResourcePlan> {
    let urn = config.resource_urn(&TypeToken::new(args.type_token.as_str()), &args.name);
    let news = ConfigParser::load_properties(&args.news)?;

    let seed = args.seed.as_ref().map_or_else(
        || uuid::Uuid::new_v4().as_bytes().to_vec(),
        |s| s.as_bytes().to_vec(),
    );

    let mut request = PlanRequest::new(urn.clone(), news)
        .with_ignore_changes(args.ignore_changes.clone())
        .with_random_seed(seed)
        .with_allow_unknowns(allow_unknowns);

    if let Some(id) = &args.id {
        let olds = args
            .olds
            .as_ref()
            .map(ConfigParser::load_properties)
            .transpose()?
            .unwrap_or_default();
        let id = ResourceId::new(id.as_str());

        // The provider only knows resources it created, so adopt the prior one.
        provider
            .import(urn, id.clone(), olds.clone(), olds.clone())
            .await;
        request = request.with_prior(PriorState {
            id,
            inputs: olds.clone(),
            outputs: olds,
        });
    }

    StepPlanner::new()
        .with_policy(config.diff.on_unavailable)
        .with_strict(config.diff.strict)
        .plan(provider, request)
        .await
}

/// Writes command output to stdout.
fn emit(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{output}")?;
    Ok(())
}

const fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
