use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "conform")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Converge containers and certificates to a declared state", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply every operation of a plan file
    Apply(ApplyArgs),

    /// Validate a plan file without touching the target
    Validate(PlanArgs),

    /// List supported operation kinds
    Kinds,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct PlanArgs {
    /// Plan file (.toml or .json)
    #[arg(value_name = "PLAN")]
    pub plan: PathBuf,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Plan file (.toml or .json)
    #[arg(value_name = "PLAN")]
    pub plan: PathBuf,

    /// Inspect only; log state-changing commands instead of running them
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Stop at the first failed operation
    #[arg(long)]
    pub fail_fast: bool,
}
