// src/lifecycle/recipe_hooks.rs

//! Hooks compiled from a recipe's `[build]` section
//!
//! Every `when` is parsed once, when the hooks are compiled, and
//! evaluated against the configuration being built. The phases run:
//! - **environment**: `[[build.environment]]`, and
//!   `[[build.dependent_environment]]` for packages that depend on this one
//! - **edit**: copies, then regex edits, then appends, then edit commands
//! - **configure**: `cmake` for CMake packages, then configure commands
//! - **build**: `make` with the active targets, then build commands
//! - **install**: `make install`, artifact copies, then install commands

use crate::condition::Condition;
use crate::configuration::Configuration;
use crate::error::{Error, Result};
use crate::lifecycle::hooks::{Build, Configure, Edit, EnvironmentSetup, Install};
use crate::lifecycle::{BuildContext, DependencyInfo, Environment, Invocation};
use crate::recipe::{
    AppendEntry, CommandEntry, CommandPhase, CopyEntry, EnvEntry, InstallEntry, Recipe, When,
    parse_when, substitute,
};
use crate::spec::{BuildSystem, PackageSpec};
use glob::Pattern;
use regex::{NoExpand, Regex};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One `[build]` entry and the condition that activates it
#[derive(Debug, Clone)]
struct Step<T> {
    when: Condition,
    entry: T,
}

#[derive(Debug, Clone)]
struct CompiledEdit {
    file: String,
    pattern: Regex,
    replacement: String,
}

/// Declarative hooks for one package
#[derive(Debug, Clone)]
pub struct RecipeHooks {
    package: String,
    build_system: BuildSystem,
    workdir: Option<String>,
    makefile: Option<String>,
    make_args: Vec<String>,
    install_target: String,
    make_install: bool,
    targets: Vec<Step<String>>,
    environment: Vec<Step<EnvEntry>>,
    dependent_environment: Vec<Step<EnvEntry>>,
    copies: Vec<Step<CopyEntry>>,
    edits: Vec<Step<CompiledEdit>>,
    appends: Vec<Step<AppendEntry>>,
    cmake_args: Vec<Step<Vec<String>>>,
    commands: Vec<Step<CommandEntry>>,
    install: Vec<Step<InstallEntry>>,
}

fn compile<T, U>(
    spec: &PackageSpec,
    section: &str,
    entries: &[T],
    when: impl Fn(&T) -> &When,
    map: impl Fn(usize, &T) -> Result<U>,
) -> Result<Vec<Step<U>>> {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let field = format!("build.{}[{}].when", section, i);
            Ok(Step {
                when: parse_when(spec, when(entry), &field)?,
                entry: map(i, entry)?,
            })
        })
        .collect()
}

fn active<'s, T>(steps: &'s [Step<T>], config: &'s Configuration) -> impl Iterator<Item = &'s T> {
    steps
        .iter()
        .filter(move |step| step.when.evaluate(config))
        .map(|step| &step.entry)
}

impl RecipeHooks {
    /// Compile the `[build]` section of `recipe`, whose spec is `spec`
    pub fn new(recipe: &Recipe, spec: &PackageSpec) -> Result<Self> {
        let build = &recipe.build;
        let package = spec.name().to_string();

        let edits = compile(spec, "edits", &build.edits, |e| &e.when, |i, e| {
            let source = if e.literal {
                regex::escape(&e.pattern)
            } else {
                e.pattern.clone()
            };
            let pattern = Regex::new(&source).map_err(|err| Error::InvalidField {
                package: package.clone(),
                field: format!("build.edits[{}].pattern", i),
                reason: err.to_string(),
            })?;
            Ok(CompiledEdit {
                file: e.file.clone(),
                pattern,
                replacement: e.replacement.clone(),
            })
        })?;

        let commands = compile(spec, "commands", &build.commands, |c| &c.when, |i, c| {
            if c.args.is_empty() {
                return Err(Error::InvalidField {
                    package: package.clone(),
                    field: format!("build.commands[{}].args", i),
                    reason: "command is empty".to_string(),
                });
            }
            Ok(c.clone())
        })?;

        Ok(Self {
            build_system: spec.build_system,
            workdir: build.workdir.clone(),
            makefile: build.makefile.clone(),
            make_args: build.make_args.clone(),
            install_target: build.install_target().to_string(),
            make_install: build.make_install,
            targets: compile(spec, "targets", &build.targets, |t| &t.when, |_, t| {
                Ok(t.target.clone())
            })?,
            environment: compile(spec, "environment", &build.environment, |e| &e.when, |_, e| {
                Ok(e.clone())
            })?,
            dependent_environment: compile(
                spec,
                "dependent_environment",
                &build.dependent_environment,
                |e| &e.when,
                |_, e| Ok(e.clone()),
            )?,
            copies: compile(spec, "copies", &build.copies, |c| &c.when, |_, c| Ok(c.clone()))?,
            edits,
            appends: compile(spec, "appends", &build.appends, |a| &a.when, |_, a| Ok(a.clone()))?,
            cmake_args: compile(spec, "cmake_args", &build.cmake_args, |a| &a.when, |_, a| {
                Ok(a.args.clone())
            })?,
            commands,
            install: compile(spec, "install", &build.install, |e| &e.when, |_, e| Ok(e.clone()))?,
            package,
        })
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Where `make` and relative install sources are run from
    fn work_dir(&self, ctx: &BuildContext<'_>) -> PathBuf {
        match &self.workdir {
            Some(dir) => ctx.source_path(dir),
            None => ctx.source_dir.clone(),
        }
    }

    /// Directory `make` runs in for this build system
    fn make_dir(&self, ctx: &BuildContext<'_>) -> PathBuf {
        match self.build_system {
            BuildSystem::Cmake => ctx.build_dir(),
            BuildSystem::Makefile | BuildSystem::Generic => self.work_dir(ctx),
        }
    }

    fn make(&self, ctx: &BuildContext<'_>, targets: Vec<String>) -> Invocation {
        let mut invocation =
            Invocation::new("make", self.make_dir(ctx)).arg(format!("-j{}", ctx.make_jobs()));
        if let Some(makefile) = &self.makefile {
            invocation = invocation.arg(format!("--makefile={}", ctx.substitute(makefile)));
        }
        invocation
            .args(self.make_args.iter().map(|a| ctx.substitute(a)))
            .args(targets)
    }

    fn run_commands(&self, ctx: &BuildContext<'_>, phase: CommandPhase) -> Result<()> {
        for command in active(&self.commands, ctx.configuration).filter(|c| c.phase == phase) {
            let cwd = match &command.workdir {
                Some(dir) => ctx.source_path(dir),
                None => self.work_dir(ctx),
            };
            let mut args = command.args.iter().map(|a| ctx.substitute(a));
            // Empty commands are rejected when compiling
            let Some(program) = args.next() else {
                continue;
            };
            ctx.run(Invocation::new(program, cwd).args(args))?;
        }
        Ok(())
    }

    fn env_steps(
        steps: &[Step<EnvEntry>],
        config: &Configuration,
        lookup: impl Fn(&str) -> Option<String>,
        env: Environment,
    ) -> Environment {
        active(steps, config).fold(env, |env, entry| {
            let value = substitute(&entry.value, &lookup);
            debug!("{} {:?} {}", entry.name, entry.action, value);
            env.with_action(entry.action, &entry.name, value)
        })
    }
}

impl EnvironmentSetup for RecipeHooks {
    fn setup_environment(&self, ctx: &BuildContext<'_>, env: Environment) -> Result<Environment> {
        Ok(Self::env_steps(
            &self.environment,
            ctx.configuration,
            |key| ctx.lookup(key),
            env,
        ))
    }

    fn setup_dependent_environment(
        &self,
        ctx: &BuildContext<'_>,
        dependency: &DependencyInfo<'_>,
        env: Environment,
    ) -> Result<Environment> {
        // Placeholders describe this package as installed, not the dependent
        let lookup = |key: &str| match key {
            "name" => Some(dependency.configuration.name.clone()),
            "version" => Some(dependency.configuration.version.to_string()),
            "prefix" => Some(dependency.prefix.display().to_string()),
            _ => match key.strip_prefix("variant:") {
                Some(variant) => dependency
                    .configuration
                    .variant(variant)
                    .map(|v| v.to_string()),
                None => ctx.lookup(key),
            },
        };
        Ok(Self::env_steps(
            &self.dependent_environment,
            dependency.configuration,
            lookup,
            env,
        ))
    }
}

impl Edit for RecipeHooks {
    fn edit(&self, ctx: &BuildContext<'_>) -> Result<()> {
        let config = ctx.configuration;

        for copy in active(&self.copies, config) {
            let from = ctx.source_path(&copy.from);
            let to = ctx.source_path(&copy.to);
            if ctx.is_dry_run() {
                info!("[dry-run] copy {} -> {}", from.display(), to.display());
                continue;
            }
            copy_file(&from, &to)?;
        }

        for edit in active(&self.edits, config) {
            let path = ctx.source_path(&edit.file);
            let replacement = ctx.substitute(&edit.replacement);
            if ctx.is_dry_run() {
                info!(
                    "[dry-run] edit {}: '{}' -> '{}'",
                    path.display(),
                    edit.pattern,
                    replacement
                );
                continue;
            }
            if !filter_file(&path, &edit.pattern, &replacement)? {
                warn!(
                    "{}: pattern '{}' matched nothing in {}",
                    self.package,
                    edit.pattern,
                    path.display()
                );
            }
        }

        for append in active(&self.appends, config) {
            let path = ctx.source_path(&append.file);
            let lines: Vec<String> = append.lines.iter().map(|l| ctx.substitute(l)).collect();
            if ctx.is_dry_run() {
                info!("[dry-run] append {} lines to {}", lines.len(), path.display());
                continue;
            }
            append_lines(&path, &lines, append.create)?;
        }

        self.run_commands(ctx, CommandPhase::Edit)
    }
}

impl Configure for RecipeHooks {
    fn configure(&self, ctx: &BuildContext<'_>) -> Result<()> {
        if self.build_system == BuildSystem::Cmake {
            let args = active(&self.cmake_args, ctx.configuration)
                .flatten()
                .map(|a| ctx.substitute(a));
            let invocation = Invocation::new("cmake", ctx.build_dir())
                .arg(ctx.source_dir.display().to_string())
                .arg(format!("-DCMAKE_INSTALL_PREFIX={}", ctx.prefix.display()))
                .args(args);
            ctx.run(invocation)?;
        }

        self.run_commands(ctx, CommandPhase::Configure)
    }
}

impl Build for RecipeHooks {
    fn build(&self, ctx: &BuildContext<'_>) -> Result<()> {
        let targets: Vec<String> = active(&self.targets, ctx.configuration)
            .map(|t| ctx.substitute(t))
            .collect();

        // Generic packages only run make when they name a target
        if self.build_system != BuildSystem::Generic || !targets.is_empty() {
            ctx.run(self.make(ctx, targets))?;
        }

        self.run_commands(ctx, CommandPhase::Build)
    }
}

impl Install for RecipeHooks {
    fn install(&self, ctx: &BuildContext<'_>) -> Result<()> {
        if self.make_install && self.build_system != BuildSystem::Generic {
            ctx.run(self.make(ctx, vec![self.install_target.clone()]))?;
        }

        let work_dir = self.work_dir(ctx);
        for artifact in active(&self.install, ctx.configuration) {
            let from = work_dir.join(ctx.substitute(&artifact.from));
            let dest = ctx.prefix.join(ctx.substitute(&artifact.to));
            if ctx.is_dry_run() {
                info!("[dry-run] install {} -> {}", from.display(), dest.display());
                continue;
            }
            for source in expand_glob(&from)? {
                let Some(file_name) = source.file_name() else {
                    continue;
                };
                copy_file(&source, &dest.join(file_name))?;
            }
        }

        self.run_commands(ctx, CommandPhase::Install)
    }
}

// === File operations ===

fn io_error(action: &str, path: &Path, e: std::io::Error) -> Error {
    Error::IoError(format!("Failed to {} {}: {}", action, path.display(), e))
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error("create", parent, e))?;
    }
    debug!("Copying {} -> {}", from.display(), to.display());
    fs::copy(from, to).map_err(|e| io_error("copy", from, e))?;
    Ok(())
}

/// Replace `pattern` line by line; returns whether anything changed
fn filter_file(path: &Path, pattern: &Regex, replacement: &str) -> Result<bool> {
    let content = fs::read_to_string(path).map_err(|e| io_error("read", path, e))?;

    let edited: Vec<String> = content
        .split('\n')
        .map(|line| pattern.replace_all(line, NoExpand(replacement)).into_owned())
        .collect();
    let edited = edited.join("\n");

    if edited == content {
        return Ok(false);
    }

    debug!("Edited {}", path.display());
    fs::write(path, edited).map_err(|e| io_error("write", path, e))?;
    Ok(true)
}

fn append_lines(path: &Path, lines: &[String], create: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error("create", parent, e))?;
    }

    let mut text = String::new();
    if !create {
        let existing = match fs::read_to_string(path) {
            Ok(existing) => existing,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(io_error("read", path, e)),
        };
        if !existing.is_empty() && !existing.ends_with('\n') {
            text.push('\n');
        }
    }
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }

    let mut file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .append(!create)
        .truncate(create)
        .open(path)
        .map_err(|e| io_error("open", path, e))?;
    file.write_all(text.as_bytes())
        .map_err(|e| io_error("write", path, e))?;
    Ok(())
}

/// Files matching `path`, whose last component may be a glob pattern
fn expand_glob(path: &Path) -> Result<Vec<PathBuf>> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if !name.contains(['*', '?', '[']) {
        if !path.exists() {
            return Err(Error::NotFound(format!("build artifact {}", path.display())));
        }
        return Ok(vec![path.to_path_buf()]);
    }

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let pattern = Pattern::new(&name)
        .map_err(|e| Error::ParseError(format!("bad pattern {}: {}", name, e)))?;

    let mut matches = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| io_error("read", dir, e))? {
        let entry = entry.map_err(|e| io_error("read", dir, e))?;
        let candidate = entry.path();
        if candidate.is_file() && pattern.matches(&entry.file_name().to_string_lossy()) {
            matches.push(candidate);
        }
    }
    matches.sort();

    if matches.is_empty() {
        return Err(Error::NotFound(format!("no files match {}", path.display())));
    }
    Ok(matches)
}
