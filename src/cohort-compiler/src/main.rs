//! Cohort Compiler — compiles cohort definition files into targeting
//! queries and the create/update payloads that carry them.

mod loader;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cohort_core::config::AppConfig;
use cohort_core::CohortDefinition;
use cohort_query::{filter_by_workspace, roll_up_seeds, QueryCompiler};
use serde::Serialize;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "cohort-compiler")]
#[command(about = "Compile cohort definitions into targeting queries")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Root folder holding query/*.json (overrides config)
    #[arg(long, global = true, env = "COHORT_COMPILER__DATA__DATA_PATH")]
    data_path: Option<String>,

    /// Only process definitions bound to this workspace
    #[arg(long, global = true)]
    workspace: Option<String>,

    /// Market used to name seed cohorts (overrides config)
    #[arg(long, global = true)]
    market: Option<String>,

    /// Pretty-print JSON output
    #[arg(long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the compiled query of each definition
    Compile {
        /// Definition file (default: every file under the data path)
        file: Option<PathBuf>,
    },

    /// Print the create/update payload of each definition
    Payload {
        file: Option<PathBuf>,

        /// Extra tag for the cohort (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Print the slot-clickers payload of each definition
    Clickers {
        file: Option<PathBuf>,

        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Roll definitions up into seed cohorts and print their queries
    Seeds { file: Option<PathBuf> },
}

impl Commands {
    fn file(&self) -> Option<&PathBuf> {
        match self {
            Commands::Compile { file }
            | Commands::Payload { file, .. }
            | Commands::Clickers { file, .. }
            | Commands::Seeds { file } => file.as_ref(),
        }
    }
}

#[derive(Serialize)]
struct CompiledQuery<'a> {
    name: &'a str,
    query: serde_json::Value,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries only JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cohort_compiler=info,cohort_query=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    // Unset variables already fall back to defaults; a bad value stops the run.
    let mut config = AppConfig::load().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e
    })?;

    // Apply CLI overrides
    if let Some(data_path) = cli.data_path.clone() {
        config.data.data_path = Some(data_path);
    }
    if let Some(market) = cli.market.clone() {
        config.compiler.default_market = market;
    }

    info!(
        data_path = ?config.data.data_path,
        market = %config.compiler.default_market,
        "Configuration loaded"
    );

    let mut definitions = loader::load_definitions(
        cli.command.file().map(PathBuf::as_path),
        config.data.data_path.as_deref(),
    )?;
    if let Some(workspace) = cli.workspace.as_deref() {
        definitions = filter_by_workspace(definitions, workspace);
    }
    info!(definitions = definitions.len(), "Definitions ready");

    let compiler = QueryCompiler::new(config.compiler.clone());
    let output = match &cli.command {
        Commands::Compile { .. } => serde_json::to_value(compile_all(&compiler, &definitions)?)?,
        Commands::Payload { tags, .. } => serde_json::to_value(
            definitions
                .iter()
                .map(|d| compiler.to_payload(d, tags))
                .collect::<Result<Vec<_>, _>>()?,
        )?,
        Commands::Clickers { tags, .. } => serde_json::to_value(
            definitions
                .iter()
                .map(|d| compiler.to_clickers_payload(d, tags))
                .collect::<Result<Vec<_>, _>>()?,
        )?,
        Commands::Seeds { .. } => {
            let seeds = roll_up_seeds(&definitions, &config.compiler.default_market);
            serde_json::to_value(compile_all(&compiler, &seeds)?)?
        }
    };

    let text = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{text}");
    Ok(())
}

fn compile_all<'a>(
    compiler: &QueryCompiler,
    definitions: &'a [CohortDefinition],
) -> anyhow::Result<Vec<CompiledQuery<'a>>> {
    definitions
        .iter()
        .map(|definition| {
            let query = compiler
                .to_query_json(definition)
                .map_err(|e| anyhow::anyhow!("compiling '{}': {e}", definition.name))?;
            Ok(CompiledQuery {
                name: &definition.name,
                query,
            })
        })
        .collect()
}
