mod cli;

use std::sync::Arc;

use clap::Parser;

use cli::{Cli, Command, RunArgs};
use pup_core::config::PupSettings;
use pup_core::contract::{OutputContract, RunOutput};
use pup_core::error::{ErrorCategory, PupError};
use pup_engine::{client_from_settings, Pup};
use pup_tools::{BuiltinCatalog, JsonFileMemory, ToolRegistry};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error("{0}")]
    Pup(#[from] PupError),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            Self::Pup(err) => match err.category() {
                ErrorCategory::Technical => 1,
                ErrorCategory::Cognitive => 2,
            },
        }
    }
}

#[tokio::main]
async fn main() {
    init_telemetry();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        let exit_code = err.exit_code();
        eprintln!("{err}");
        std::process::exit(exit_code);
    }
}

fn init_telemetry() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let settings = PupSettings::load(cli.config.as_deref())?;
    match cli.command {
        Command::Run(args) => run_task(&settings, args).await,
        Command::Tools => list_tools(&settings),
    }
}

async fn run_task(settings: &PupSettings, args: RunArgs) -> Result<(), CliError> {
    let client = client_from_settings(settings, args.model.as_deref())?;

    let memory = Arc::new(JsonFileMemory::new(settings.memory_file.clone()));
    let catalog = BuiltinCatalog::new(memory).with_translator(client.clone());
    let mut registry = ToolRegistry::new();
    registry.discover(&catalog, None);
    let tools = registry.resolve(&args.tools)?;

    let mut pup = Pup::new(client, &args.instructions)
        .with_tools(tools)
        .with_max_iterations(args.max_iterations.unwrap_or(settings.max_iterations));
    if let Some(path) = &args.contract {
        pup = pup.with_contract(load_contract(path)?);
    }

    match pup.run(&args.task).await? {
        RunOutput::Text(text) => println!("{text}"),
        RunOutput::Structured(value) => {
            let pretty = serde_json::to_string_pretty(&value)
                .map_err(|e| CliError::Usage(format!("unprintable output: {e}")))?;
            println!("{pretty}");
        }
    }
    Ok(())
}

fn load_contract(path: &std::path::Path) -> Result<OutputContract, CliError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| CliError::Usage(format!("cannot read contract file {}: {e}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|e| CliError::Usage(format!("invalid contract file {}: {e}", path.display())))
}

/// List the built-in registry. Capabilities needing a live model client
/// (translate) are included only when an API key is available.
fn list_tools(settings: &PupSettings) -> Result<(), CliError> {
    let memory = Arc::new(JsonFileMemory::new(settings.memory_file.clone()));
    let mut catalog = BuiltinCatalog::new(memory);
    if let Ok(client) = client_from_settings(settings, None) {
        catalog = catalog.with_translator(client);
    }

    let mut registry = ToolRegistry::new();
    registry.discover(&catalog, None);

    for summary in registry.list() {
        println!("{}", summary.name);
        println!("  {}", summary.description);
        for param in &summary.parameters {
            let requirement = if param.required { "required" } else { "optional" };
            println!("  - {} ({requirement}): {}", param.name, param.description);
        }
    }
    for diagnostic in registry.diagnostics() {
        println!("{} (unavailable: {})", diagnostic.tool, diagnostic.error);
    }
    Ok(())
}
