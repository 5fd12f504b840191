// src/lifecycle/hooks.rs

//! Lifecycle hook traits and their dispatch by package name

use crate::error::Result;
use crate::lifecycle::{BuildContext, DependencyInfo, Environment, RecipeHooks};
use crate::repository::Repository;
use std::collections::BTreeMap;
use tracing::debug;

/// Environment setup, run before any other phase
pub trait EnvironmentSetup {
    /// Extend the environment this package is built with
    fn setup_environment(&self, _ctx: &BuildContext<'_>, env: Environment) -> Result<Environment> {
        Ok(env)
    }

    /// Extend the environment of a package that depends on this one
    ///
    /// `dependency` describes this package as installed; `ctx` is the
    /// dependent's build.
    fn setup_dependent_environment(
        &self,
        _ctx: &BuildContext<'_>,
        _dependency: &DependencyInfo<'_>,
        env: Environment,
    ) -> Result<Environment> {
        Ok(env)
    }
}

/// Source edits made before configuring
pub trait Edit {
    fn edit(&self, _ctx: &BuildContext<'_>) -> Result<()> {
        Ok(())
    }
}

pub trait Configure {
    fn configure(&self, _ctx: &BuildContext<'_>) -> Result<()> {
        Ok(())
    }
}

pub trait Build {
    fn build(&self, _ctx: &BuildContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Populates the install prefix
pub trait Install {
    fn install(&self, _ctx: &BuildContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// The complete hook set of one package
pub trait PackageHooks: EnvironmentSetup + Edit + Configure + Build + Install + Send + Sync {}

impl<T> PackageHooks for T where T: EnvironmentSetup + Edit + Configure + Build + Install + Send + Sync {}

/// Hooks that do nothing in every phase
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl EnvironmentSetup for NoHooks {}
impl Edit for NoHooks {}
impl Configure for NoHooks {}
impl Build for NoHooks {}
impl Install for NoHooks {}

static NO_HOOKS: NoHooks = NoHooks;

/// Hook implementations by package name
///
/// Lookups prefer hooks registered in code, then the recipe's `[build]`
/// section, and finally fall back to `NoHooks`.
#[derive(Default)]
pub struct HookRegistry {
    custom: BTreeMap<String, Box<dyn PackageHooks>>,
    recipes: BTreeMap<String, RecipeHooks>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile the `[build]` section of every recipe in `repo`
    pub fn from_repository(repo: &Repository) -> Result<Self> {
        let mut registry = Self::new();
        for entry in repo.iter() {
            registry.register_recipe(RecipeHooks::new(&entry.recipe, &entry.spec)?);
        }
        debug!("Compiled build hooks for {} recipes", registry.recipes.len());
        Ok(registry)
    }

    /// Register hand-written hooks, replacing any recipe hooks for `name`
    pub fn register(&mut self, name: impl Into<String>, hooks: Box<dyn PackageHooks>) {
        self.custom.insert(name.into(), hooks);
    }

    pub fn register_recipe(&mut self, hooks: RecipeHooks) {
        self.recipes.insert(hooks.package().to_string(), hooks);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.custom.contains_key(name) || self.recipes.contains_key(name)
    }

    /// The hooks for `name`
    pub fn hooks(&self, name: &str) -> &dyn PackageHooks {
        if let Some(hooks) = self.custom.get(name) {
            return hooks.as_ref();
        }
        if let Some(hooks) = self.recipes.get(name) {
            return hooks;
        }
        &NO_HOOKS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::Configuration;
    use crate::lifecycle::DryRunRunner;
    use crate::spec::PackageSpec;
    use crate::version::Version;

    struct Pspline;

    impl EnvironmentSetup for Pspline {
        fn setup_dependent_environment(
            &self,
            _ctx: &BuildContext<'_>,
            dependency: &DependencyInfo<'_>,
            env: Environment,
        ) -> Result<Environment> {
            Ok(env.with_var("PSPLINE_DIR", dependency.prefix.display().to_string()))
        }
    }
    impl Edit for Pspline {}
    impl Configure for Pspline {}
    impl Build for Pspline {}
    impl Install for Pspline {}

    #[test]
    fn test_no_hooks_fallback() {
        let registry = HookRegistry::new();
        assert!(!registry.contains("zlib"));

        let spec = PackageSpec::new("zlib").unwrap();
        let config = Configuration::new("zlib", Version::parse("1.2.11").unwrap());
        let runner = DryRunRunner::new();
        let ctx = BuildContext::new(&spec, &config, "/opt/zlib", "/src/zlib", &runner);

        let hooks = registry.hooks("zlib");
        let env = hooks.setup_environment(&ctx, Environment::new()).unwrap();
        assert!(env.is_empty());
        hooks.edit(&ctx).unwrap();
        hooks.install(&ctx).unwrap();
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn test_custom_hooks_dispatch() {
        let mut registry = HookRegistry::new();
        registry.register("pspline", Box::new(Pspline));
        assert!(registry.contains("pspline"));

        let spec = PackageSpec::new("xgc-devel").unwrap();
        let config = Configuration::new("xgc-devel", Version::parse("master").unwrap());
        let dep = Configuration::new("pspline", Version::parse("wdmapp").unwrap());
        let runner = DryRunRunner::new();
        let ctx = BuildContext::new(&spec, &config, "/opt/xgc", "/src/xgc", &runner);

        let prefix = std::path::Path::new("/opt/pspline");
        let info = DependencyInfo {
            configuration: &dep,
            prefix,
        };
        let env = registry
            .hooks("pspline")
            .setup_dependent_environment(&ctx, &info, Environment::new())
            .unwrap();
        assert_eq!(env.get("PSPLINE_DIR"), Some("/opt/pspline"));
    }
}
