// src/lifecycle/builder.rs

//! Runs a package's hooks through the fixed phase sequence

use crate::configuration::Configuration;
use crate::error::{Error, Result};
use crate::lifecycle::hooks::{
    Build, Configure, Edit, EnvironmentSetup, HookRegistry, Install, PackageHooks,
};
use crate::lifecycle::{BuildContext, CommandRunner, DependencyInfo, Environment, Phase};
use crate::spec::PackageSpec;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// Everything needed to build one resolved package
pub struct BuildRequest<'a> {
    pub spec: &'a PackageSpec,
    pub configuration: &'a Configuration,
    pub prefix: PathBuf,
    pub source_dir: PathBuf,
    pub dependency_prefixes: BTreeMap<String, PathBuf>,
}

/// Outcome of a successful build
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub package: String,
    pub prefix: PathBuf,
    pub phases: Vec<Phase>,
    /// Environment the edit, configure, build and install phases ran with
    pub environment: Environment,
}

/// Drives packages through environment, edit, configure, build and install
pub struct Builder<'a> {
    registry: &'a HookRegistry,
    runner: &'a dyn CommandRunner,
    jobs: usize,
}

impl<'a> Builder<'a> {
    pub fn new(registry: &'a HookRegistry, runner: &'a dyn CommandRunner) -> Self {
        Self {
            registry,
            runner,
            jobs: 1,
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Build one package
    ///
    /// The configuration must be well-formed and free of conflicts. A
    /// failing hook stops the sequence and is reported as `HookFailed`.
    pub fn build(&self, request: &BuildRequest<'_>) -> Result<BuildReport> {
        let spec = request.spec;
        let package = spec.name();

        spec.check_configuration(request.configuration)?;
        if let Some(conflict) = spec.active_conflicts(request.configuration).first() {
            return Err(Error::InvalidConfiguration {
                package: package.to_string(),
                reason: format!("conflict {}", conflict),
            });
        }

        if !self.runner.is_dry_run() {
            std::fs::create_dir_all(&request.prefix).map_err(|e| {
                Error::IoError(format!(
                    "Failed to create prefix {}: {}",
                    request.prefix.display(),
                    e
                ))
            })?;
        }

        info!("Building {}", request.configuration);
        let hooks = self.registry.hooks(package);
        let mut ctx = BuildContext::new(
            spec,
            request.configuration,
            &request.prefix,
            &request.source_dir,
            self.runner,
        )
        .with_dependency_prefixes(request.dependency_prefixes.clone())
        .with_jobs(self.jobs);

        let mut phases = Vec::new();
        for phase in Phase::ALL {
            info!("Running {} phase", phase);
            self.run_phase(hooks, phase, &mut ctx)
                .map_err(|e| Error::HookFailed {
                    package: package.to_string(),
                    phase: phase.to_string(),
                    message: e.to_string(),
                })?;
            phases.push(phase);
        }

        info!("Installed {} into {}", package, request.prefix.display());
        Ok(BuildReport {
            package: package.to_string(),
            prefix: request.prefix.clone(),
            phases,
            environment: ctx.environment,
        })
    }

    fn run_phase(
        &self,
        hooks: &dyn PackageHooks,
        phase: Phase,
        ctx: &mut BuildContext<'_>,
    ) -> Result<()> {
        match phase {
            Phase::Environment => {
                let env = self.dependent_environment(ctx)?;
                let env = hooks.setup_environment(ctx, env)?;
                debug!("Build environment:\n{}", env);
                ctx.environment = env;
                Ok(())
            }
            Phase::Edit => hooks.edit(ctx),
            Phase::Configure => hooks.configure(ctx),
            Phase::Build => hooks.build(ctx),
            Phase::Install => hooks.install(ctx),
        }
    }

    /// What the direct dependencies contribute to this package's environment
    fn dependent_environment(&self, ctx: &BuildContext<'_>) -> Result<Environment> {
        let mut env = Environment::new();
        for (name, configuration) in &ctx.configuration.dependencies {
            let Some(prefix) = ctx.dependency_prefixes.get(name) else {
                debug!("No prefix for dependency {}; skipping its environment", name);
                continue;
            };
            let dependency = DependencyInfo {
                configuration,
                prefix,
            };
            env = self
                .registry
                .hooks(name)
                .setup_dependent_environment(ctx, &dependency, env)?;
        }
        Ok(env)
    }
}
