// src/commands/build.rs

//! Build command - run a package's lifecycle hooks

use super::{load_repository, select_configuration};
use crate::cli::ConfigurationArgs;
use anyhow::{Context, Result, bail};
use hpcpkg::{
    BuildRequest, Builder, CommandRunner, DryRunRunner, HookRegistry, Settings, ShellRunner,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::warn;

/// Arguments of `hpcpkg build`
pub struct BuildOptions<'a> {
    pub package: &'a str,
    pub configuration: &'a ConfigurationArgs,
    pub prefix: PathBuf,
    pub source: PathBuf,
    pub dep_prefixes: &'a [String],
    pub jobs: Option<usize>,
    pub dry_run: bool,
}

/// Parse `name=path` dependency prefixes
fn parse_dep_prefixes(args: &[String]) -> Result<BTreeMap<String, PathBuf>> {
    let mut prefixes = BTreeMap::new();
    for arg in args {
        let Some((name, path)) = arg.split_once('=') else {
            bail!("Invalid --dep-prefix '{}': expected name=path", arg);
        };
        if prefixes
            .insert(name.to_string(), PathBuf::from(path))
            .is_some()
        {
            bail!("--dep-prefix given twice for '{}'", name);
        }
    }
    Ok(prefixes)
}

/// Build one package from an unpacked source tree into a prefix
pub fn cmd_build(settings: &Settings, options: BuildOptions<'_>) -> Result<()> {
    let repo = load_repository(settings)?;
    let spec = repo.require(options.package)?;
    let config = select_configuration(spec, options.configuration, settings)?;
    let config = repo.default_tree(config);
    let dependency_prefixes = parse_dep_prefixes(options.dep_prefixes)?;

    if !options.dry_run && !options.source.is_dir() {
        bail!("Source directory {} does not exist", options.source.display());
    }

    for dep in spec.active_dependencies(&config) {
        if !dependency_prefixes.contains_key(&dep.target) {
            warn!(
                "No --dep-prefix for {}; %(dep:{})s is left unexpanded",
                dep.target, dep.target
            );
        }
    }

    let registry = HookRegistry::from_repository(&repo)
        .with_context(|| "Failed to compile build hooks")?;

    let dry_runner = DryRunRunner::new();
    let runner: &dyn CommandRunner = if options.dry_run {
        &dry_runner
    } else {
        &ShellRunner
    };

    let jobs = options.jobs.unwrap_or_else(|| settings.jobs());
    if options.dry_run {
        println!("Dry run: building {} with {} jobs", config, jobs);
        let order = repo.install_order(&config)?;
        println!("Install order: {}", order.join(" -> "));
    } else {
        println!("Building {} with {} jobs", config, jobs);
    }

    let request = BuildRequest {
        spec,
        configuration: &config,
        prefix: options.prefix,
        source_dir: options.source,
        dependency_prefixes,
    };
    let report = Builder::new(&registry, runner)
        .with_jobs(jobs)
        .build(&request)
        .with_context(|| format!("Failed to build {}", spec.name()))?;

    if options.dry_run {
        let commands = dry_runner.commands();
        println!("\nWould run {} command(s):", commands.len());
        for command in &commands {
            println!("  {}", command);
        }
        if !report.environment.is_empty() {
            println!("\nWith environment:");
            for (name, value) in report.environment.iter() {
                println!("  {}={}", name, value);
            }
        }
        return Ok(());
    }

    println!(
        "\n[COMPLETE] Installed {} into {}",
        report.package,
        report.prefix.display()
    );
    Ok(())
}
