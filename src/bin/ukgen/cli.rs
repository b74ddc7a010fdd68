//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use ukgen::ops::ProjectOptions;

/// ukgen - Generate build and run scripts for Unikraft applications
#[derive(Parser)]
#[command(name = "ukgen")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Global configuration file
    #[arg(long, global = true, env = "UKGEN_GLOBAL_CONFIG", value_name = "PATH")]
    pub global_config: Option<PathBuf>,

    /// Ignore the global configuration file
    #[arg(long, global = true)]
    pub no_global_config: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate setup, build and run scripts
    Generate(GenerateArgs),

    /// List the valid configuration variants
    Variants(VariantsArgs),

    /// List the targets resolved on this host
    Targets(TargetsArgs),

    /// Show the compilers and VMMs found on this host
    Probe(ProbeArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Descriptor locations shared by the project commands.
#[derive(Args)]
pub struct ProjectArgs {
    /// Path to the application descriptor (default: app.toml in cwd or a parent)
    #[arg(long, value_name = "PATH")]
    pub app: Option<PathBuf>,

    /// Path to the user descriptor (default: config.toml next to app.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Path to the exclusion rules (default: variants.toml next to app.toml)
    #[arg(long, value_name = "PATH")]
    pub exclusions: Option<PathBuf>,
}

impl ProjectArgs {
    pub fn to_options(&self) -> ProjectOptions {
        ProjectOptions {
            app: self.app.clone(),
            config: self.config.clone(),
            exclusions: self.exclusions.clone(),
        }
    }
}

#[derive(Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Show what would be generated without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct VariantsArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Print the variants as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct TargetsArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Print the targets as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ProbeArgs {
    /// Print the capabilities as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
