// src/commands/info.rs

//! Info command - show what a package declares

use super::load_repository;
use anyhow::Result;
use hpcpkg::spec::VariantKind;
use hpcpkg::{PackageSpec, Settings};

/// Print a package's versions, variants, dependencies and conflicts
pub fn cmd_info(settings: &Settings, package: &str, json: bool) -> Result<()> {
    let repo = load_repository(settings)?;
    let spec = repo.require(package)?;

    if json {
        println!("{}", serde_json::to_string_pretty(spec)?);
        return Ok(());
    }

    print_spec(spec);
    Ok(())
}

fn print_spec(spec: &PackageSpec) {
    println!("{}", spec.name());
    if let Some(summary) = &spec.summary {
        println!("  {}", summary);
    }
    if let Some(homepage) = &spec.homepage {
        println!("  Homepage: {}", homepage);
    }
    println!(
        "  Build system: {}{}",
        spec.build_system,
        if spec.parallel { "" } else { " (serial make)" }
    );

    println!("\nVersions:");
    let preferred = spec.preferred_version().map(|v| v.label().to_string());
    for decl in spec.versions() {
        let marker = if preferred.as_deref() == Some(decl.label()) {
            " [preferred]"
        } else {
            ""
        };
        println!("  {:<24} {}{}", decl.label(), decl.locator, marker);
        if let Some(checksum) = &decl.integrity {
            println!("  {:<24} {}", "", checksum);
        }
    }

    if !spec.variants().is_empty() {
        println!("\nVariants:");
        for variant in spec.variants() {
            let values = match variant.kind {
                VariantKind::Boolean => "on, off".to_string(),
                _ => variant.allowed_values.join(", "),
            };
            println!(
                "  {:<24} [{}] default={} values: {}",
                variant.name, variant.kind, variant.default, values
            );
            if let Some(description) = &variant.description {
                println!("  {:<24} {}", "", description);
            }
        }
    }

    if !spec.dependencies().is_empty() {
        println!("\nDependencies:");
        for dep in spec.dependencies() {
            let types: Vec<String> = dep.types.iter().map(ToString::to_string).collect();
            let mut line = format!("  {} ({})", dep, types.join(", "));
            if !dep.when.is_always() {
                line.push_str(&format!(" when {}", dep.when));
            }
            println!("{}", line);
        }
    }

    if !spec.conflicts().is_empty() {
        println!("\nConflicts:");
        for conflict in spec.conflicts() {
            println!("  {}", conflict);
        }
    }
}
