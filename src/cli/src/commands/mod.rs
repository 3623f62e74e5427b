//! CLI command definitions and dispatch.
//!
//! The static surface is declared with clap derive. Every catalog field is
//! then registered as a long flag on the commands that bind configuration
//! (`run-task`, `run-pipeline`, `config info`, `config render`); parsed flag
//! values land in the field slots before binding.

mod config;
mod run_pipeline;
mod run_task;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Arg, ArgAction, ArgMatches, Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use wfe_core::{
    fold_defaults, format, unmarshal_with_sources, Config, FieldKind, MetaConfig, ProcessEnv, Source,
};
use wfe_runtime::{Sink, TaskContext, ToolPaths};

use crate::error::CliError;

pub use config::{ConfigArgs, ConfigCommand};
pub use run_pipeline::RunPipelineArgs;
pub use run_task::RunTaskArgs;

/// Workflow Engine: security pipeline driver for container images and code.
#[derive(Parser, Debug)]
#[command(name = "workflow-engine", version, about)]
pub struct Cli {
    /// Debug logging
    #[arg(short, long, global = true, conflicts_with = "silent")]
    pub verbose: bool,

    /// Error-only logging
    #[arg(short, long, global = true)]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a single task
    RunTask(RunTaskArgs),
    /// Run a named pipeline of tasks
    RunPipeline(RunPipelineArgs),
    /// Inspect, convert and document configuration
    Config(ConfigArgs),
}

/// Options shared by `run-task` and `run-pipeline`.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Log the commands without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Config file (JSON, YAML or TOML)
    #[arg(long, env = "WFE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cancel the run after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Parsed command line plus the raw catalog flag values.
#[derive(Debug)]
pub struct Invocation {
    pub cli: Cli,
    /// `(tag, raw value)` for every catalog flag given on the command line.
    pub flags: Vec<(String, String)>,
}

/// The full clap command, with catalog flags registered.
pub fn command(meta: &MetaConfig) -> clap::Command {
    Cli::command()
        .mut_subcommand("run-task", |c| with_field_flags(c, meta))
        .mut_subcommand("run-pipeline", |c| with_field_flags(c, meta))
        .mut_subcommand("config", |c| {
            c.mut_subcommand("info", |c| with_field_flags(c, meta))
                .mut_subcommand("render", |c| with_field_flags(c, meta))
        })
}

fn with_field_flags(mut cmd: clap::Command, meta: &MetaConfig) -> clap::Command {
    for field in meta.fields() {
        let mut arg = Arg::new(field.name)
            .long(field.flag)
            .help(field.description)
            .value_name(value_name(field.kind))
            .action(ArgAction::Set)
            .help_heading("Configuration");
        if field.kind == FieldKind::Bool {
            arg = arg.num_args(0..=1).default_missing_value("true");
        }
        cmd = cmd.arg(arg);
    }
    cmd
}

fn value_name(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::String => "STRING",
        FieldKind::Bool => "BOOL",
        FieldKind::Int => "INT",
        FieldKind::List => "LIST",
    }
}

/// Parse `args` against the full command.
pub fn parse_from<I, T>(meta: &MetaConfig, args: I) -> Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = command(meta).try_get_matches_from(args)?;
    let cli = Cli::from_arg_matches(&matches)?;
    let flags = field_flags(meta, leaf_matches(&matches));
    Ok(Invocation { cli, flags })
}

fn leaf_matches(matches: &ArgMatches) -> &ArgMatches {
    let mut current = matches;
    while let Some((_, sub)) = current.subcommand() {
        current = sub;
    }
    current
}

fn field_flags(meta: &MetaConfig, matches: &ArgMatches) -> Vec<(String, String)> {
    meta.fields()
        .filter_map(|field| {
            // Commands without catalog flags report the id as undefined.
            let value = matches.try_get_one::<String>(field.name).ok().flatten()?;
            Some((field.name.to_string(), value.clone()))
        })
        .collect()
}

/// Shared state handed to every command.
pub struct CommandContext {
    /// Catalog with command-line values already in the slots.
    pub meta: MetaConfig,
    pub cancel: CancellationToken,
}

impl CommandContext {
    pub fn new(mut meta: MetaConfig, flags: &[(String, String)], cancel: CancellationToken) -> Self {
        for (tag, raw) in flags {
            if let Some(field) = meta.get_mut(tag) {
                field.set_slot(raw.as_str());
            }
        }
        Self { meta, cancel }
    }

    /// Resolve the configuration: flags, then environment, then the config
    /// file, then built-in defaults.
    pub fn resolve_config(&self, config_file: Option<&Path>) -> Result<Config, CliError> {
        self.resolve_with_sources(config_file).map(|(config, _)| config)
    }

    /// Like [`CommandContext::resolve_config`], also reporting the layer that
    /// supplied each field. File values count as defaults.
    pub fn resolve_with_sources(
        &self,
        config_file: Option<&Path>,
    ) -> Result<(Config, Vec<(String, Source)>), CliError> {
        let mut meta = self.meta.clone();
        if let Some(path) = config_file {
            let file: Config = format::load_file(path).map_err(|e| match e {
                wfe_core::PipelineError::Io(io) => {
                    CliError::System(format!("failed to read {}: {io}", path.display()))
                }
                other => CliError::UserInput(format!("{}: {other}", path.display())),
            })?;
            fold_defaults(&mut meta, &file).map_err(CliError::from_config_error)?;
            tracing::debug!(path = %path.display(), "Loaded config file");
        }

        let mut config = Config::default();
        let sources = unmarshal_with_sources(&mut config, &meta, &ProcessEnv)
            .map_err(CliError::from_config_error)?;
        Ok((config, sources))
    }

    /// Task context for a run: dry-run flag, deadline and tool overrides.
    pub fn task_context(&self, args: &RunArgs) -> TaskContext {
        let tools = ToolPaths::from_env(&ProcessEnv);
        for (name, program) in tools.entries() {
            tracing::debug!(tool = name, program, "Tool");
        }
        let ctx = TaskContext::new(self.cancel.clone())
            .with_dry_run(args.dry_run)
            .with_display(Sink::stdout())
            .with_tools(tools);
        match args.timeout {
            Some(secs) => ctx.with_timeout(Duration::from_secs(secs)),
            None => ctx,
        }
    }
}

/// Dispatch a parsed command line to the appropriate command handler.
pub async fn dispatch(command: Command, ctx: CommandContext) -> Result<(), CliError> {
    match command {
        Command::RunTask(args) => run_task::execute(args, &ctx).await,
        Command::RunPipeline(args) => run_pipeline::execute(args, &ctx).await,
        Command::Config(args) => config::execute(args, &ctx).await,
    }
}
