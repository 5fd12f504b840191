// src/recipe/parser.rs

//! Recipe file parsing

use crate::error::{Error, Result};
use crate::lifecycle::RecipeHooks;
use crate::recipe::format::{CommandPhase, Recipe};
use crate::spec::BuildSystem;
use std::path::Path;

/// Parse a recipe from a TOML string
pub fn parse_recipe(content: &str) -> Result<Recipe> {
    toml::from_str(content).map_err(|e| Error::ParseError(format!("Invalid recipe: {}", e)))
}

/// Parse a recipe from a file
pub fn parse_recipe_file(path: &Path) -> Result<Recipe> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::IoError(format!("Failed to read recipe file {}: {}", path.display(), e))
    })?;

    parse_recipe(&content).map_err(|e| match e {
        Error::ParseError(msg) => Error::ParseError(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

/// Validate a recipe for completeness and correctness
///
/// Declaration errors are returned as `Err`; anything that would still
/// build but is probably a mistake comes back as a warning.
pub fn validate_recipe(recipe: &Recipe) -> Result<Vec<String>> {
    let mut warnings = Vec::new();

    let spec = recipe.to_spec()?;
    // Compiling the hooks checks every `[build]` condition and pattern
    RecipeHooks::new(recipe, &spec)?;

    // Warn about missing fields
    if recipe.package.summary.is_none() {
        warnings.push("Missing package summary".to_string());
    }
    if recipe.package.homepage.is_none() {
        warnings.push("Missing package homepage".to_string());
    }

    if recipe.versions.is_empty() {
        warnings.push("No versions declared; nothing can be fetched".to_string());
    }

    for entry in &recipe.versions {
        if !entry.is_git() && !entry.has_checksum() {
            warnings.push(format!(
                "Archive version {} has no checksum and cannot be verified",
                entry.version
            ));
        }
    }

    let build = &recipe.build;
    match recipe.package.build_system {
        BuildSystem::Makefile if build.targets.is_empty() && build.install_target.is_none() => {
            warnings.push("Makefile build declares no targets; make runs its default".to_string());
        }
        BuildSystem::Makefile | BuildSystem::Generic if !build.cmake_args.is_empty() => {
            warnings.push(format!(
                "cmake_args are ignored by the {} build system",
                recipe.package.build_system
            ));
        }
        _ => {}
    }

    let installs_with_make =
        build.make_install && recipe.package.build_system != BuildSystem::Generic;
    let installs_with_command = build
        .commands
        .iter()
        .any(|c| c.phase == CommandPhase::Install);
    if build.install.is_empty() && !installs_with_make && !installs_with_command {
        warnings.push("Nothing is installed into the prefix".to_string());
    }

    Ok(warnings)
}
