//! ukgen CLI - Unikraft build and run script generator

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ukgen::util::diagnostic::{self, Diagnostic};
use ukgen::util::GlobalContext;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    // Parse CLI
    let cli = Cli::parse();
    let color = !cli.no_color;

    if let Err(e) = run(cli) {
        diagnostic::emit(&Diagnostic::error(format!("{:#}", e)), color);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("ukgen=debug")
    } else {
        EnvFilter::new("ukgen=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let mut gctx = GlobalContext::new()?;
    if cli.no_global_config {
        gctx = gctx.with_global_config(None);
    } else if let Some(path) = cli.global_config {
        let path = gctx.resolve_path(&path);
        gctx = gctx.with_global_config(Some(path));
    }
    gctx.set_verbose(cli.verbose);
    gctx.set_color(!cli.no_color);

    // Execute command
    match cli.command {
        Commands::Generate(args) => commands::generate::execute(&gctx, args),
        Commands::Variants(args) => commands::variants::execute(&gctx, args),
        Commands::Targets(args) => commands::targets::execute(&gctx, args),
        Commands::Probe(args) => commands::probe::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
