// src/main.rs

use anyhow::Result;
use clap::Parser;
use hpcpkg::Settings;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise info, or debug with -v
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Completions { shell } = cli.command {
        return commands::cmd_completions(shell);
    }

    let mut settings = Settings::load()?;
    if let Some(repo) = cli.repo {
        settings.repo = Some(repo);
    }

    match cli.command {
        Commands::Info { package, json } => commands::cmd_info(&settings, &package, json),
        Commands::Check { strict } => commands::cmd_check(&settings, strict),
        Commands::Deps {
            package,
            configuration,
            json,
        } => commands::cmd_deps(&settings, &package, &configuration, json),
        Commands::Order {
            package,
            configuration,
        } => commands::cmd_order(&settings, &package, &configuration),
        Commands::Build {
            package,
            configuration,
            prefix,
            source,
            dep_prefixes,
            jobs,
            dry_run,
        } => commands::cmd_build(
            &settings,
            commands::BuildOptions {
                package: &package,
                configuration: &configuration,
                prefix,
                source,
                dep_prefixes: &dep_prefixes,
                jobs,
                dry_run,
            },
        ),
        Commands::Verify { file, checksum } => commands::cmd_verify(&file, &checksum),
        Commands::Completions { shell } => commands::cmd_completions(shell),
    }
}
