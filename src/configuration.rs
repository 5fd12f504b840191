// src/configuration.rs

//! Candidate and resolved configurations
//!
//! A `Configuration` is what a resolver hands back for one package: a
//! concrete version, a value for each variant, an optional compiler and
//! the configurations chosen for its dependencies. Conditions are evaluated
//! against it; it is never mutated during evaluation.

use crate::error::{Error, Result};
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The value assigned to one variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariantValue {
    Bool(bool),
    Single(String),
    Multi(BTreeSet<String>),
}

impl VariantValue {
    /// Parse a command-line value: `on`/`off`/`true`/`false`, a comma list, or a word
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "on" | "true" | "yes" => VariantValue::Bool(true),
            "off" | "false" | "no" => VariantValue::Bool(false),
            other if other.contains(',') => VariantValue::Multi(
                other
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(String::from)
                    .collect(),
            ),
            other => VariantValue::Single(other.to_string()),
        }
    }

    /// The boolean state, if this is a boolean value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            VariantValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether `value` is the assigned value (single) or one of them (multi)
    pub fn includes(&self, value: &str) -> bool {
        match self {
            VariantValue::Bool(b) => match value {
                "on" | "true" => *b,
                "off" | "false" => !*b,
                _ => false,
            },
            VariantValue::Single(v) => v == value,
            VariantValue::Multi(set) => set.contains(value),
        }
    }
}

impl fmt::Display for VariantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantValue::Bool(true) => write!(f, "on"),
            VariantValue::Bool(false) => write!(f, "off"),
            VariantValue::Single(v) => write!(f, "{}", v),
            VariantValue::Multi(set) => {
                let values: Vec<&str> = set.iter().map(String::as_str).collect();
                write!(f, "{}", values.join(","))
            }
        }
    }
}

/// A compiler selection such as `gcc@8.1.0`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compiler {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
}

impl Compiler {
    /// Parse `name` or `name@version`
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (name, version) = match s.split_once('@') {
            Some((name, version)) => (name, Some(Version::parse(version)?)),
            None => (s, None),
        };

        if name.is_empty() {
            return Err(Error::InvalidName {
                name: s.to_string(),
                reason: "compiler name is empty".to_string(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            version,
        })
    }
}

impl fmt::Display for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}@{}", self.name, v),
            None => write!(f, "{}", self.name),
        }
    }
}

/// One concrete configuration of a package and the dependencies it was resolved with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub name: String,
    pub version: Version,
    #[serde(default)]
    pub variants: BTreeMap<String, VariantValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler: Option<Compiler>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, Configuration>,
}

impl Configuration {
    /// Create a configuration with no variants, compiler or dependencies
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
            variants: BTreeMap::new(),
            compiler: None,
            dependencies: BTreeMap::new(),
        }
    }

    /// Return a copy with `variant` set to `value`
    pub fn with_variant(mut self, variant: impl Into<String>, value: VariantValue) -> Self {
        self.variants.insert(variant.into(), value);
        self
    }

    /// Return a copy using `compiler`
    pub fn with_compiler(mut self, compiler: Compiler) -> Self {
        self.compiler = Some(compiler);
        self
    }

    /// Return a copy that records `dependency` as a chosen dependency
    pub fn with_dependency(mut self, dependency: Configuration) -> Self {
        self.dependencies.insert(dependency.name.clone(), dependency);
        self
    }

    pub fn variant(&self, name: &str) -> Option<&VariantValue> {
        self.variants.get(name)
    }

    /// Whether a boolean variant is on; missing or non-boolean variants are off
    pub fn is_enabled(&self, name: &str) -> bool {
        self.variant(name).and_then(VariantValue::as_bool) == Some(true)
    }

    pub fn dependency(&self, name: &str) -> Option<&Configuration> {
        self.dependencies.get(name)
    }

    /// Walk this configuration and its dependencies, depth first, each name once
    pub fn walk(&self) -> Vec<&Configuration> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        let mut stack = vec![self];

        while let Some(config) = stack.pop() {
            if !seen.insert(config.name.as_str()) {
                continue;
            }
            out.push(config);
            for dep in config.dependencies.values().rev() {
                stack.push(dep);
            }
        }

        out
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)?;
        for (name, value) in &self.variants {
            match value {
                VariantValue::Bool(true) => write!(f, " +{}", name)?,
                VariantValue::Bool(false) => write!(f, " ~{}", name)?,
                other => write!(f, " {}={}", name, other)?,
            }
        }
        if let Some(compiler) = &self.compiler {
            write!(f, " %{}", compiler)?;
        }
        Ok(())
    }
}
