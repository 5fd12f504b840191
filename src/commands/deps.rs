// src/commands/deps.rs

//! Deps and order commands - inspect a configuration's dependency tree

use super::{load_repository, select_configuration};
use crate::cli::ConfigurationArgs;
use anyhow::Result;
use hpcpkg::Settings;

/// Show the dependencies active for one configuration
pub fn cmd_deps(
    settings: &Settings,
    package: &str,
    args: &ConfigurationArgs,
    json: bool,
) -> Result<()> {
    let repo = load_repository(settings)?;
    let spec = repo.require(package)?;
    let config = select_configuration(spec, args, settings)?;

    let conflicts = spec.active_conflicts(&config);

    if json {
        let tree = repo.default_tree(config);
        println!("{}", serde_json::to_string_pretty(&tree)?);
        return Ok(());
    }

    println!("{}", config);
    for conflict in &conflicts {
        println!("[CONFLICT] {}", conflict);
    }

    let active = spec.active_dependencies(&config);
    if active.is_empty() {
        println!("No active dependencies");
        return Ok(());
    }

    println!("\nActive dependencies:");
    for dep in active {
        let types: Vec<&str> = dep.types.iter().map(|t| t.as_ref()).collect();
        let origin = if repo.get(&dep.target).is_some() {
            ""
        } else {
            " (external)"
        };
        println!("  {} [{}]{}", dep, types.join(", "), origin);
    }

    Ok(())
}

/// Show the order in which a configuration's packages would be installed
pub fn cmd_order(settings: &Settings, package: &str, args: &ConfigurationArgs) -> Result<()> {
    let repo = load_repository(settings)?;
    let spec = repo.require(package)?;
    let config = select_configuration(spec, args, settings)?;

    let order = repo.dependency_graph(&config).topological_sort()?;

    println!("Install order for {}:", config);
    for (i, name) in order.iter().enumerate() {
        let origin = if repo.get(name).is_some() {
            ""
        } else {
            " (external)"
        };
        println!("  {:>3}. {}{}", i + 1, name, origin);
    }
    Ok(())
}
