// src/repository/mod.rs

//! Recipe repositories
//!
//! A repository is a directory tree of `*.toml` recipes, loaded into a
//! registry of package specs keyed by name. Dependency targets that are not
//! in the repository (compilers, `mpi`, `cmake`, ...) are expected: they are
//! provided by the system or another repository, so they are reported as
//! warnings rather than errors.

use crate::configuration::Configuration;
use crate::error::{Error, Result};
use crate::recipe::{Recipe, RecipeGraph, parse_recipe_file, validate_recipe};
use crate::spec::PackageSpec;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// One loaded recipe and the `PackageSpec` declared from it
#[derive(Debug, Clone)]
pub struct RepositoryEntry {
    pub recipe: Recipe,
    pub spec: PackageSpec,
    /// Where the recipe was read from, if it came from disk
    pub path: Option<PathBuf>,
}

/// A name-indexed set of package specs
#[derive(Debug, Default)]
pub struct Repository {
    entries: BTreeMap<String, RepositoryEntry>,
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths of every `*.toml` file below `dir`, in path order
    ///
    /// Symlinks are followed. Entries that cannot be read, such as dangling
    /// links, are skipped with a warning.
    pub fn recipe_files(dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(Error::NotFound(format!(
                "recipe directory {}",
                dir.display()
            )));
        }

        Ok(WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
            .collect())
    }

    /// Load every `*.toml` recipe below `dir`
    ///
    /// A recipe that fails to parse or declare aborts the load; two
    /// recipes naming the same package is an error.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut repo = Self::new();

        for path in Self::recipe_files(dir)? {
            debug!("Loading recipe {}", path.display());
            let recipe = parse_recipe_file(&path)?;
            repo.add(recipe, Some(path))?;
        }

        info!("Loaded {} recipes from {}", repo.len(), dir.display());
        Ok(repo)
    }

    /// Validate and register a recipe
    pub fn add(&mut self, recipe: Recipe, path: Option<PathBuf>) -> Result<()> {
        let name = recipe.package.name.clone();
        let location = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<memory>".to_string())
        };

        if let Some(existing) = self.entries.get(&name) {
            return Err(Error::DuplicatePackage {
                name,
                first: location(&existing.path),
                second: location(&path),
            });
        }

        for warning in validate_recipe(&recipe)? {
            debug!("{}: {}", name, warning);
        }
        let spec = recipe.to_spec()?;

        self.entries.insert(name, RepositoryEntry { recipe, spec, path });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&PackageSpec> {
        self.entries.get(name).map(|e| &e.spec)
    }

    pub fn recipe(&self, name: &str) -> Option<&Recipe> {
        self.entries.get(name).map(|e| &e.recipe)
    }

    pub fn entry(&self, name: &str) -> Option<&RepositoryEntry> {
        self.entries.get(name)
    }

    /// Package names in alphabetical order
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RepositoryEntry> {
        self.entries.values()
    }

    /// Look up a spec, failing with `NotFound`
    pub fn require(&self, name: &str) -> Result<&PackageSpec> {
        self.get(name)
            .ok_or_else(|| Error::NotFound(format!("package '{}' is not in the repository", name)))
    }

    /// Dependency edges whose target is not in this repository
    ///
    /// Returns `(package, target)` pairs, each reported once and logged.
    pub fn unknown_targets(&self) -> Vec<(String, String)> {
        let mut unknown = BTreeSet::new();

        for entry in self.entries.values() {
            for dep in entry.spec.dependencies() {
                if !self.entries.contains_key(&dep.target) {
                    unknown.insert((entry.spec.name().to_string(), dep.target.clone()));
                }
            }
        }

        for (package, target) in &unknown {
            warn!("{} depends on '{}', which is not in the repository", package, target);
        }

        unknown.into_iter().collect()
    }

    /// Install order of a resolved configuration tree
    pub fn install_order(&self, configuration: &Configuration) -> Result<Vec<String>> {
        RecipeGraph::from_configuration(configuration).topological_sort()
    }

    /// Attach default configurations for the active in-repository dependencies
    ///
    /// This is a naive expansion for inspection and dry runs, not a resolver:
    /// each dependency gets its default configuration, constraints are not
    /// negotiated, and packages already on the current path are skipped.
    /// Edges of the result whose constraints the attached default does not
    /// meet are logged as warnings; see `unsatisfied_edges`.
    pub fn default_tree(&self, root: Configuration) -> Configuration {
        let mut path = BTreeSet::new();
        let tree = self.expand(root, &mut path);
        for (package, dep) in self.unsatisfied_edges(&tree) {
            warn!("{} requires '{}', which its default dependency does not satisfy", package, dep);
        }
        tree
    }

    /// Active dependency edges in `tree` that the attached child does not satisfy
    ///
    /// Returns `(package, dependency)` pairs, the dependency rendered the way
    /// it appears in the recipe. Edges with no attached child are not reported.
    pub fn unsatisfied_edges(&self, tree: &Configuration) -> Vec<(String, String)> {
        let mut unmet = Vec::new();
        self.collect_unsatisfied(tree, &mut unmet);
        unmet
    }

    fn collect_unsatisfied(&self, config: &Configuration, unmet: &mut Vec<(String, String)>) {
        if let Some(spec) = self.get(&config.name) {
            for dep in spec.active_dependencies(config) {
                let Some(child) = config.dependency(&dep.target) else {
                    continue;
                };
                if !dep.is_satisfied_by(child) {
                    unmet.push((config.name.clone(), dep.to_string()));
                }
            }
        }
        for child in config.dependencies.values() {
            self.collect_unsatisfied(child, unmet);
        }
    }

    fn expand(&self, mut config: Configuration, path: &mut BTreeSet<String>) -> Configuration {
        let Some(spec) = self.get(&config.name) else {
            return config;
        };
        path.insert(config.name.clone());

        let targets: Vec<String> = spec
            .active_dependencies(&config)
            .iter()
            .map(|d| d.target.clone())
            .collect();

        for target in targets {
            if path.contains(&target) || config.dependencies.contains_key(&target) {
                continue;
            }
            let Some(mut child) = self.get(&target).and_then(PackageSpec::default_configuration)
            else {
                continue;
            };
            child.compiler = config.compiler.clone();
            let child = self.expand(child, path);
            config.dependencies.insert(target, child);
        }

        path.remove(&config.name);
        config
    }

    /// Graph of active dependency edges reachable from `root`
    ///
    /// In-repository targets are followed with their default
    /// configuration; other targets are leaves. Unlike `default_tree`,
    /// cycles are kept so that ordering reports them.
    pub fn dependency_graph(&self, root: &Configuration) -> RecipeGraph {
        let mut graph = RecipeGraph::new();
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([root.clone()]);

        while let Some(config) = queue.pop_front() {
            if !seen.insert(config.name.clone()) {
                continue;
            }
            let Some(spec) = self.get(&config.name) else {
                graph.add_recipe(&config.name, &[]);
                continue;
            };

            let active = spec.active_dependencies(&config);
            let targets: Vec<&str> = active.iter().map(|d| d.target.as_str()).collect();
            graph.add_recipe(&config.name, &targets);

            for target in targets {
                if seen.contains(target) {
                    continue;
                }
                match self.get(target).and_then(PackageSpec::default_configuration) {
                    Some(child) => queue.push_back(child),
                    None => {
                        seen.insert(target.to_string());
                    }
                }
            }
        }

        graph
    }
}
