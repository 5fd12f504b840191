// src/recipe/graph.rs

//! Package dependency graph for install ordering
//!
//! Nodes are package names, edges point from a package to the packages it
//! needs. A resolved `Configuration` tree is flattened into the graph and
//! sorted so that every dependency comes before its dependents.
//!
//! # Example
//!
//! ```ignore
//! use hpcpkg::recipe::RecipeGraph;
//!
//! let mut graph = RecipeGraph::new();
//! graph.add_recipe("xgc-devel", &["adios2", "kokkos-cmake", "pspline"]);
//! graph.add_recipe("cabana", &["kokkos-cmake"]);
//!
//! let order = graph.topological_sort().unwrap();
//! // order: ["adios2", "kokkos-cmake", "cabana", "pspline", "xgc-devel"]
//! ```

use crate::configuration::Configuration;
use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};

/// A directed graph of package dependencies
///
/// Ordered maps keep the sort stable: among packages that are ready at the
/// same time, names come out alphabetically.
#[derive(Debug, Default)]
pub struct RecipeGraph {
    /// Key: package name, Value: packages it depends on
    edges: BTreeMap<String, BTreeSet<String>>,
    /// Key: package name, Value: packages that depend on it
    reverse_edges: BTreeMap<String, BTreeSet<String>>,
}

impl RecipeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph of a resolved configuration and everything it pulls in
    pub fn from_configuration(root: &Configuration) -> Self {
        let mut graph = Self::new();
        graph.add_configuration(root);
        graph
    }

    /// Add a package with its dependencies
    ///
    /// If the package already exists, this merges the dependencies.
    pub fn add_recipe(&mut self, name: &str, dependencies: &[&str]) {
        self.add_node(name);

        for dep in dependencies {
            self.add_node(dep);
            if let Some(deps) = self.edges.get_mut(name) {
                deps.insert(dep.to_string());
            }
            if let Some(dependents) = self.reverse_edges.get_mut(*dep) {
                dependents.insert(name.to_string());
            }
        }
    }

    /// Add every package of a configuration tree
    pub fn add_configuration(&mut self, root: &Configuration) {
        for config in root.walk() {
            let deps: Vec<&str> = config.dependencies.keys().map(String::as_str).collect();
            self.add_recipe(&config.name, &deps);
        }
    }

    fn add_node(&mut self, name: &str) {
        self.edges.entry(name.to_string()).or_default();
        self.reverse_edges.entry(name.to_string()).or_default();
    }

    pub fn recipe_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.edges.contains_key(name)
    }

    /// Direct dependencies of a package
    pub fn dependencies(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(name)
    }

    /// Direct dependents of a package
    pub fn dependents(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.reverse_edges.get(name)
    }

    /// Perform topological sort using Kahn's algorithm
    ///
    /// Returns the packages in install order (dependencies before
    /// dependents), or `DependencyCycle` naming one of the cycles.
    pub fn topological_sort(&self) -> Result<Vec<String>> {
        // In-degree here is the number of unmet prerequisites
        let mut in_degrees: BTreeMap<&str, usize> = self
            .edges
            .iter()
            .map(|(name, deps)| (name.as_str(), deps.len()))
            .collect();

        let mut ready: BTreeSet<&str> = in_degrees
            .iter()
            .filter(|&(_, deg)| *deg == 0)
            .map(|(name, _)| *name)
            .collect();

        let mut result = Vec::with_capacity(self.edges.len());

        while let Some(node) = ready.pop_first() {
            result.push(node.to_string());

            if let Some(dependents) = self.reverse_edges.get(node) {
                for dependent in dependents {
                    if let Some(deg) = in_degrees.get_mut(dependent.as_str()) {
                        *deg = deg.saturating_sub(1);
                        if *deg == 0 {
                            ready.insert(dependent.as_str());
                        }
                    }
                }
            }
        }

        if result.len() != self.edges.len() {
            let cycle = self.find_cycles().into_iter().next().unwrap_or_else(|| {
                self.edges
                    .keys()
                    .filter(|k| !result.contains(k))
                    .cloned()
                    .collect()
            });
            return Err(Error::DependencyCycle(cycle));
        }

        Ok(result)
    }

    /// Find cycles in the graph
    ///
    /// Each cycle lists its packages in edge order and repeats the first
    /// one at the end, e.g. `["a", "b", "a"]`.
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles = Vec::new();
        let mut visited = BTreeSet::new();
        let mut rec_stack = BTreeSet::new();
        let mut path = Vec::new();

        for start in self.edges.keys() {
            if !visited.contains(start) {
                self.find_cycles_dfs(start, &mut visited, &mut rec_stack, &mut path, &mut cycles);
            }
        }

        cycles
    }

    fn find_cycles_dfs(
        &self,
        node: &str,
        visited: &mut BTreeSet<String>,
        rec_stack: &mut BTreeSet<String>,
        path: &mut Vec<String>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        visited.insert(node.to_string());
        rec_stack.insert(node.to_string());
        path.push(node.to_string());

        if let Some(deps) = self.edges.get(node) {
            for dep in deps {
                if !visited.contains(dep) {
                    self.find_cycles_dfs(dep, visited, rec_stack, path, cycles);
                } else if rec_stack.contains(dep) {
                    if let Some(start) = path.iter().position(|x| x == dep) {
                        let mut cycle = path[start..].to_vec();
                        cycle.push(dep.clone());
                        cycles.push(cycle);
                    }
                }
            }
        }

        path.pop();
        rec_stack.remove(node);
    }
}
