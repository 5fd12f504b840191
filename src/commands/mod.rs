// src/commands/mod.rs
//! Command handlers for the hpcpkg CLI

mod build;
mod check;
mod completions;
mod deps;
mod info;
mod verify;

pub use build::{BuildOptions, cmd_build};
pub use check::cmd_check;
pub use completions::cmd_completions;
pub use deps::{cmd_deps, cmd_order};
pub use info::cmd_info;
pub use verify::cmd_verify;

use crate::cli::ConfigurationArgs;
use anyhow::{Context, Result, anyhow, bail};
use hpcpkg::spec::VariantKind;
use hpcpkg::{Compiler, Configuration, PackageSpec, Repository, Settings, VariantValue, Version};
use std::collections::BTreeSet;

/// Load the repository the settings point at
pub(crate) fn load_repository(settings: &Settings) -> Result<Repository> {
    let dir = settings.repo_dir();
    Repository::load_dir(&dir)
        .with_context(|| format!("Failed to load recipes from {}", dir.display()))
}

/// Parse `name=value`, `+name` or `~name`
pub(crate) fn parse_variant_arg(arg: &str) -> Result<(String, VariantValue)> {
    if let Some(name) = arg.strip_prefix('+') {
        return Ok((name.to_string(), VariantValue::Bool(true)));
    }
    if let Some(name) = arg.strip_prefix('~').or_else(|| arg.strip_prefix('-')) {
        return Ok((name.to_string(), VariantValue::Bool(false)));
    }
    match arg.split_once('=') {
        Some((name, value)) if !name.is_empty() => {
            Ok((name.trim().to_string(), VariantValue::parse(value)))
        }
        _ => bail!("Invalid variant '{}': expected name=value, +name or ~name", arg),
    }
}

/// The configuration of `spec` selected on the command line
///
/// Starts from the package's default configuration and applies the requested
/// version, variants and compiler, then checks the result against its `PackageSpec`.
pub(crate) fn select_configuration(
    spec: &PackageSpec,
    args: &ConfigurationArgs,
    settings: &Settings,
) -> Result<Configuration> {
    let mut config = spec
        .default_configuration()
        .ok_or_else(|| anyhow!("{} declares no versions", spec.name()))?;

    if let Some(label) = &args.version {
        let version = Version::parse(label)?;
        if spec.version(&version).is_none() {
            let known: Vec<&str> = spec.versions().iter().map(|v| v.label()).collect();
            bail!(
                "{} has no version '{}' (known: {})",
                spec.name(),
                label,
                known.join(", ")
            );
        }
        config.version = version;
    }

    for arg in &args.variants {
        let (name, value) = parse_variant_arg(arg)?;
        // A single value given for a multi-valued variant selects just that value
        let value = match (spec.variant(&name).map(|v| v.kind), value) {
            (Some(VariantKind::Multi), VariantValue::Single(v)) => {
                VariantValue::Multi(BTreeSet::from([v]))
            }
            (_, value) => value,
        };
        config = config.with_variant(name, value);
    }

    let compiler = match &args.compiler {
        Some(c) => Some(Compiler::parse(c)?),
        None => settings.compiler()?,
    };
    if let Some(compiler) = compiler {
        config = config.with_compiler(compiler);
    }

    spec.check_configuration(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hpcpkg::parse_recipe;

    const GENE_ALL: &str = r#"
[package]
name = "gene-all"
build_system = "makefile"
git = "https://code.ornl.gov/eqs/gene-coupling.git"

[[versions]]
version = "gabriele"
branch = "ecp+xgc"

[[versions]]
version = "gitlab"
branch = "effis"

[[variants]]
name = "couple"
default = "none"
values = ["xgc-edge", "none"]

[[variants]]
name = "effis"
default = false
"#;

    fn spec() -> PackageSpec {
        parse_recipe(GENE_ALL).unwrap().to_spec().unwrap()
    }

    #[test]
    fn test_parse_variant_arg() {
        assert_eq!(
            parse_variant_arg("+effis").unwrap(),
            ("effis".to_string(), VariantValue::Bool(true))
        );
        assert_eq!(
            parse_variant_arg("~openmp").unwrap(),
            ("openmp".to_string(), VariantValue::Bool(false))
        );
        assert_eq!(
            parse_variant_arg("couple=xgc-edge").unwrap(),
            ("couple".to_string(), VariantValue::Single("xgc-edge".into()))
        );
        assert!(parse_variant_arg("effis").is_err());
        assert!(parse_variant_arg("=on").is_err());
    }

    #[test]
    fn test_select_configuration() {
        let args = ConfigurationArgs {
            version: Some("gitlab".into()),
            variants: vec!["couple=xgc-edge".into(), "+effis".into()],
            compiler: Some("gcc@8.1.0".into()),
        };
        let config = select_configuration(&spec(), &args, &Settings::default()).unwrap();
        assert_eq!(config.version.as_str(), "gitlab");
        assert!(config.is_enabled("effis"));
        assert_eq!(config.compiler.unwrap().name, "gcc");
    }

    #[test]
    fn test_select_configuration_rejects_unknown() {
        let unknown_version = ConfigurationArgs {
            version: Some("master".into()),
            ..Default::default()
        };
        assert!(select_configuration(&spec(), &unknown_version, &Settings::default()).is_err());

        let bad_value = ConfigurationArgs {
            variants: vec!["couple=gene".into()],
            ..Default::default()
        };
        assert!(select_configuration(&spec(), &bad_value, &Settings::default()).is_err());
    }
}
