// src/spec/dependency.rs

//! Dependency edges and conflicts

use crate::condition::Condition;
use crate::configuration::Configuration;
use crate::version::VersionRange;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use strum_macros::{AsRefStr, Display, EnumString};

/// When a dependency is needed
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DepType {
    Build,
    Link,
    Run,
    Test,
}

impl DepType {
    /// The set used when a recipe does not name any types
    pub fn default_set() -> BTreeSet<DepType> {
        BTreeSet::from([DepType::Build, DepType::Link])
    }
}

/// A conditional edge from the declaring package to `target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub target: String,
    /// Acceptable versions of the target; empty means any
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constraint: Vec<VersionRange>,
    /// Predicates the target's configuration must satisfy (`+mpi`, `cxxstd=11`)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variant_requirements: Vec<Condition>,
    /// Predicate over the declaring package deciding whether the edge exists
    pub when: Condition,
    pub types: BTreeSet<DepType>,
}

impl Dependency {
    /// Whether the edge applies to a candidate configuration of the declaring package
    pub fn is_active(&self, candidate: &Configuration) -> bool {
        self.when.evaluate(candidate)
    }

    /// Whether a chosen configuration of the target meets this edge's requirements
    pub fn is_satisfied_by(&self, chosen: &Configuration) -> bool {
        chosen.name == self.target
            && (self.constraint.is_empty()
                || self.constraint.iter().any(|r| r.contains(&chosen.version)))
            && self.variant_requirements.iter().all(|c| c.evaluate(chosen))
    }

    /// Set the dependency types, replacing the default
    pub fn with_types(&mut self, types: impl IntoIterator<Item = DepType>) -> &mut Self {
        self.types = types.into_iter().collect();
        self
    }

    pub fn is_build_only(&self) -> bool {
        self.types.iter().all(|t| *t == DepType::Build)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.target)?;
        if !self.constraint.is_empty() {
            let ranges: Vec<String> = self.constraint.iter().map(ToString::to_string).collect();
            write!(f, "@{}", ranges.join(","))?;
        }
        for requirement in &self.variant_requirements {
            write!(f, " {}", requirement)?;
        }
        Ok(())
    }
}

/// A predicate marking configurations invalid
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub condition: Condition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Conflict {
    pub fn applies_to(&self, candidate: &Configuration) -> bool {
        self.condition.evaluate(candidate)
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{}: {}", self.condition, msg),
            None => write!(f, "{}", self.condition),
        }
    }
}
