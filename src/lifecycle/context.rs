// src/lifecycle/context.rs

//! What a hook gets to see while a package is being built

use crate::configuration::Configuration;
use crate::error::{Error, Result};
use crate::lifecycle::{CommandRunner, Environment, Invocation};
use crate::recipe::substitute;
use crate::spec::PackageSpec;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Directory below the source tree where CMake builds out of tree
pub const BUILD_DIR_NAME: &str = "hpcpkg-build";

/// Explicit state for one package's build
///
/// Hooks never consult globals: the package spec, the resolved configuration,
/// all paths and the environment accumulated so far arrive here.
pub struct BuildContext<'a> {
    pub spec: &'a PackageSpec,
    pub configuration: &'a Configuration,
    pub prefix: PathBuf,
    pub source_dir: PathBuf,
    /// Install prefixes of the already-built dependencies, by package name
    pub dependency_prefixes: BTreeMap<String, PathBuf>,
    pub environment: Environment,
    pub jobs: usize,
    runner: &'a dyn CommandRunner,
}

/// A dependency as seen by the package that depends on it
pub struct DependencyInfo<'a> {
    pub configuration: &'a Configuration,
    pub prefix: &'a Path,
}

impl<'a> BuildContext<'a> {
    pub fn new(
        spec: &'a PackageSpec,
        configuration: &'a Configuration,
        prefix: impl Into<PathBuf>,
        source_dir: impl Into<PathBuf>,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            spec,
            configuration,
            prefix: prefix.into(),
            source_dir: source_dir.into(),
            dependency_prefixes: BTreeMap::new(),
            environment: Environment::new(),
            jobs: 1,
            runner,
        }
    }

    pub fn with_dependency_prefixes(mut self, prefixes: BTreeMap<String, PathBuf>) -> Self {
        self.dependency_prefixes = prefixes;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn package(&self) -> &str {
        self.spec.name()
    }

    /// Install prefix of dependency `name`
    pub fn dependency_prefix(&self, name: &str) -> Result<&Path> {
        self.dependency_prefixes
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "install prefix of dependency '{}' of {}",
                    name,
                    self.package()
                ))
            })
    }

    /// Out-of-tree build directory
    pub fn build_dir(&self) -> PathBuf {
        self.source_dir.join(BUILD_DIR_NAME)
    }

    /// Jobs to hand to `make`, honouring non-parallel packages
    pub fn make_jobs(&self) -> usize {
        if self.spec.parallel { self.jobs } else { 1 }
    }

    pub fn is_dry_run(&self) -> bool {
        self.runner.is_dry_run()
    }

    /// Resolve a path relative to the source directory
    pub fn source_path(&self, relative: &str) -> PathBuf {
        self.source_dir.join(self.substitute(relative))
    }

    /// Value of a `%(key)s` placeholder
    pub fn lookup(&self, key: &str) -> Option<String> {
        if let Some(dep) = key.strip_prefix("dep:") {
            return self
                .dependency_prefixes
                .get(dep)
                .map(|p| p.display().to_string());
        }
        if let Some(variant) = key.strip_prefix("variant:") {
            return self.configuration.variant(variant).map(|v| v.to_string());
        }

        match key {
            "name" => Some(self.package().to_string()),
            "version" => Some(self.configuration.version.to_string()),
            "prefix" => Some(self.prefix.display().to_string()),
            "source" => Some(self.source_dir.display().to_string()),
            "build" => Some(self.build_dir().display().to_string()),
            "jobs" => Some(self.make_jobs().to_string()),
            "compiler" => self.configuration.compiler.as_ref().map(|c| c.name.clone()),
            _ => None,
        }
    }

    /// Expand every known placeholder in `template`
    pub fn substitute(&self, template: &str) -> String {
        substitute(template, |key| self.lookup(key))
    }

    /// Run a command with the accumulated environment
    pub fn run(&self, invocation: Invocation) -> Result<()> {
        let invocation = invocation.with_environment(&self.environment);
        self.runner.run(&invocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::{Compiler, VariantValue};
    use crate::lifecycle::DryRunRunner;
    use crate::version::Version;

    fn spec() -> PackageSpec {
        let mut spec = PackageSpec::new("gene-app").unwrap();
        spec.parallel = false;
        spec
    }

    fn config() -> Configuration {
        Configuration::new("gene-app", Version::parse("coupling").unwrap())
            .with_variant("perf", VariantValue::Single("nvtx".into()))
            .with_compiler(Compiler::parse("gcc@8.1.0").unwrap())
    }

    #[test]
    fn test_lookup_placeholders() {
        let spec = spec();
        let config = config();
        let runner = DryRunRunner::new();
        let ctx = BuildContext::new(&spec, &config, "/opt/gene", "/src/gene", &runner)
            .with_dependency_prefixes(BTreeMap::from([(
                "fftw".to_string(),
                PathBuf::from("/opt/fftw"),
            )]))
            .with_jobs(8);

        assert_eq!(
            ctx.substitute("-DGENE_PERF=%(variant:perf)s"),
            "-DGENE_PERF=nvtx"
        );
        assert_eq!(ctx.substitute("%(dep:fftw)s/include"), "/opt/fftw/include");
        assert_eq!(ctx.substitute("%(prefix)s/bin"), "/opt/gene/bin");
        assert_eq!(ctx.substitute("%(compiler)s"), "gcc");
        assert_eq!(ctx.substitute("%(name)s@%(version)s"), "gene-app@coupling");
        // Not parallel, so make gets a single job
        assert_eq!(ctx.substitute("-j%(jobs)s"), "-j1");
        // Unknown dependencies stay visible in the output
        assert_eq!(ctx.substitute("%(dep:hdf5)s"), "%(dep:hdf5)s");
    }

    #[test]
    fn test_dependency_prefix_missing() {
        let spec = spec();
        let config = config();
        let runner = DryRunRunner::new();
        let ctx = BuildContext::new(&spec, &config, "/opt/gene", "/src/gene", &runner);
        assert!(matches!(ctx.dependency_prefix("fftw"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_run_passes_environment() {
        let spec = spec();
        let config = config();
        let runner = DryRunRunner::new();
        let mut ctx = BuildContext::new(&spec, &config, "/opt/gene", "/src/gene", &runner);
        ctx.environment = Environment::new().with_var("MACHINE", "spack-suchyta");

        ctx.run(Invocation::new("make", "/src/gene")).unwrap();
        let recorded = runner.commands();
        assert_eq!(
            recorded[0].env,
            vec![("MACHINE".to_string(), "spack-suchyta".to_string())]
        );
    }
}
