use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "pup", version, about = "Run bounded single-task model agents")]
pub struct Cli {
    /// Settings file (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one task to completion.
    Run(RunArgs),
    /// List the built-in tool registry.
    Tools,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Task text handed to the pup.
    #[arg(long)]
    pub task: String,

    /// System instructions for the pup.
    #[arg(
        long,
        default_value = "You are a helpful assistant. Complete the given task."
    )]
    pub instructions: String,

    /// Comma-separated tool names to enable.
    #[arg(long, value_delimiter = ',')]
    pub tools: Vec<String>,

    /// Output contract file (JSON). The run returns structured output.
    #[arg(long)]
    pub contract: Option<PathBuf>,

    /// Model id, overriding the settings default.
    #[arg(long)]
    pub model: Option<String>,

    /// Iteration cap, overriding the settings default.
    #[arg(long)]
    pub max_iterations: Option<u32>,
}
