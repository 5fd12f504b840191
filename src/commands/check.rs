// src/commands/check.rs

//! Check command - validate every recipe in the repository

use anyhow::{Result, bail};
use hpcpkg::{Repository, Settings, parse_recipe_file, validate_recipe};

/// Validate all recipes, reporting every problem rather than the first
pub fn cmd_check(settings: &Settings, strict: bool) -> Result<()> {
    let dir = settings.repo_dir();
    println!("Checking recipes in {}", dir.display());

    let mut repo = Repository::new();
    let mut errors = 0usize;
    let mut warnings = 0usize;

    for path in Repository::recipe_files(&dir)? {
        let recipe = match parse_recipe_file(&path) {
            Ok(recipe) => recipe,
            Err(e) => {
                println!("[ERROR] {}", e);
                errors += 1;
                continue;
            }
        };

        let name = recipe.package.name.clone();
        match validate_recipe(&recipe) {
            Ok(found) => {
                for warning in &found {
                    println!("[WARN] {}: {}", name, warning);
                }
                warnings += found.len();
            }
            Err(e) => {
                println!("[ERROR] {}: {}", path.display(), e);
                errors += 1;
                continue;
            }
        }

        if let Err(e) = repo.add(recipe, Some(path)) {
            println!("[ERROR] {}", e);
            errors += 1;
        }
    }

    for (package, target) in repo.unknown_targets() {
        println!("[INFO] {} depends on external package '{}'", package, target);
    }

    println!(
        "\n{} recipe(s), {} error(s), {} warning(s)",
        repo.len(),
        errors,
        warnings
    );

    if errors > 0 {
        bail!("{} recipe(s) failed validation", errors);
    }
    if strict && warnings > 0 {
        bail!("{} warning(s) with --strict", warnings);
    }
    println!("[OK] All recipes are valid");
    Ok(())
}
