//! `workflow-engine config` commands.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use indexmap::IndexMap;
use serde::Serialize;

use wfe_core::{format, Config, ConfigFormat, Environment, MetaConfig, ProcessEnv};

use super::CommandContext;
use crate::error::CliError;
use crate::output;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the default configuration
    Init {
        /// Output format (json, yaml, toml)
        #[arg(long, default_value_t = ConfigFormat::Yaml)]
        format: ConfigFormat,
    },
    /// Print the resolved configuration (flags, environment, file, defaults)
    Info {
        /// Config file (JSON, YAML or TOML)
        #[arg(long, env = "WFE_CONFIG")]
        config: Option<PathBuf>,

        /// Output format (json, yaml, toml)
        #[arg(long, default_value_t = ConfigFormat::Yaml)]
        format: ConfigFormat,
    },
    /// List every configuration field with its flag and environment variable
    Vars,
    /// Show each resolved value and where it came from
    Render {
        /// Config file (JSON, YAML or TOML)
        #[arg(long, env = "WFE_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Convert a config file to another format
    Convert {
        /// Input config file; its format is taken from the extension
        #[arg(long, short)]
        input: PathBuf,

        /// Output format (json, yaml, toml)
        #[arg(long, short, default_value_t = ConfigFormat::Yaml)]
        output_format: ConfigFormat,
    },
    /// Print a Markdown table of every configuration field
    GenerateTable,
    /// Print a GitHub composite action exposing every field as an input
    GenerateAction,
    /// Print a Markdown table of the action inputs
    GenerateActionTable,
}

pub async fn execute(args: ConfigArgs, ctx: &CommandContext) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init { format } => output::print(&encode(format, &Config::default())?),
        ConfigCommand::Info { config, format } => {
            let resolved = ctx.resolve_config(config.as_deref())?;
            output::print(&encode(format, &resolved)?)
        }
        ConfigCommand::Vars => output::print(&vars_table(&ctx.meta, &ProcessEnv)),
        ConfigCommand::Render { config } => {
            let (resolved, sources) = ctx.resolve_with_sources(config.as_deref())?;
            let mut table = output::new_table(&["FIELD", "VALUE", "SOURCE"]);
            for (tag, value) in resolved.leaves() {
                let source = sources
                    .iter()
                    .find(|(t, _)| *t == tag)
                    .map(|(_, s)| s.to_string())
                    .unwrap_or_default();
                table.add_row(vec![tag, value.encode(), source]);
            }
            output::print(&table.to_string())
        }
        ConfigCommand::Convert {
            input,
            output_format,
        } => {
            let config: Config = format::load_file(&input).map_err(|e| match e {
                wfe_core::PipelineError::Io(io) => {
                    CliError::System(format!("failed to read {}: {io}", input.display()))
                }
                other => CliError::UserInput(format!("{}: {other}", input.display())),
            })?;
            output::print(&encode(output_format, &config)?)
        }
        ConfigCommand::GenerateTable => output::print(&field_table(&ctx.meta)),
        ConfigCommand::GenerateAction => output::print(&encode(ConfigFormat::Yaml, &action(&ctx.meta))?),
        ConfigCommand::GenerateActionTable => output::print(&action_table(&ctx.meta)),
    }
}

fn encode<T: Serialize>(format: ConfigFormat, value: &T) -> Result<String, CliError> {
    format
        .encode(value)
        .map_err(|e| CliError::System(format!("failed to encode {format}: {e}")))
}

fn vars_table(meta: &MetaConfig, env: &dyn Environment) -> String {
    let mut table = output::new_table(&["FIELD", "FLAG", "ENV", "TYPE", "DEFAULT", "CURRENT"]);
    for field in meta.fields() {
        table.add_row(vec![
            field.name.to_string(),
            format!("--{}", field.flag),
            field.env_key.to_string(),
            field.kind.to_string(),
            field.default_raw().to_string(),
            env.var(field.env_key).unwrap_or_default(),
        ]);
    }
    table.to_string()
}

fn field_table(meta: &MetaConfig) -> String {
    let mut table = output::markdown_table(&[
        "Config Key",
        "CLI Flag",
        "Environment Variable",
        "Type",
        "Default",
        "Description",
    ]);
    for field in meta.fields() {
        table.add_row(vec![
            field.name.to_string(),
            format!("`--{}`", field.flag),
            format!("`{}`", field.env_key),
            field.kind.to_string(),
            output::markdown_cell(field.default_raw()),
            field.description.to_string(),
        ]);
    }
    table.to_string()
}

/// Input of the generated action selecting which pipeline to run.
const PIPELINE_INPUT: &str = "pipeline";

#[derive(Debug, Serialize)]
struct Action {
    name: String,
    description: String,
    inputs: IndexMap<String, ActionInput>,
    runs: ActionRuns,
}

#[derive(Debug, Serialize)]
struct ActionInput {
    description: String,
    required: bool,
    default: String,
}

#[derive(Debug, Serialize)]
struct ActionRuns {
    using: String,
    steps: Vec<ActionStep>,
}

#[derive(Debug, Serialize)]
struct ActionStep {
    name: String,
    shell: String,
    run: String,
    env: IndexMap<String, String>,
}

fn input_expr(id: &str) -> String {
    format!("${{{{ inputs.{id} }}}}")
}

fn action(meta: &MetaConfig) -> Action {
    let mut inputs = IndexMap::new();
    inputs.insert(
        PIPELINE_INPUT.to_string(),
        ActionInput {
            description: "Pipeline to run (image-build, image-scan, code-scan, image-publish, deploy)"
                .to_string(),
            required: true,
            default: "image-build".to_string(),
        },
    );
    let mut env = IndexMap::new();
    for field in meta.fields() {
        inputs.insert(
            field.flag.to_string(),
            ActionInput {
                description: field.description.to_string(),
                required: false,
                default: field.default_raw().to_string(),
            },
        );
        env.insert(field.env_key.to_string(), input_expr(field.flag));
    }

    Action {
        name: "workflow-engine".to_string(),
        description: "Build, scan and publish container images with workflow-engine".to_string(),
        inputs,
        runs: ActionRuns {
            using: "composite".to_string(),
            steps: vec![ActionStep {
                name: "Run workflow-engine".to_string(),
                shell: "bash".to_string(),
                run: format!(
                    "workflow-engine run-pipeline \"{}\"",
                    input_expr(PIPELINE_INPUT)
                ),
                env,
            }],
        },
    }
}

fn action_table(meta: &MetaConfig) -> String {
    let mut table =
        output::markdown_table(&["Input", "Description", "Default", "Environment Variable"]);
    table.add_row(vec![
        format!("`{PIPELINE_INPUT}`"),
        "Pipeline to run".to_string(),
        output::markdown_cell("image-build"),
        String::new(),
    ]);
    for field in meta.fields() {
        table.add_row(vec![
            format!("`{}`", field.flag),
            field.description.to_string(),
            output::markdown_cell(field.default_raw()),
            format!("`{}`", field.env_key),
        ]);
    }
    table.to_string()
}
