// src/spec/mod.rs

//! Package specification model
//!
//! A `PackageSpec` describes what can be built and under which conditions:
//! retrievable versions, build variants, conditional dependency edges and
//! conflicts. It is populated through the `declare_*` operations, each of
//! which validates its input immediately, and is read-only afterwards.
//!
//! Nothing here performs I/O. Resolvers query a spec with candidate
//! `Configuration`s as often as they like; every query is pure.

mod dependency;
mod source;
mod variant;

pub use dependency::{Conflict, DepType, Dependency};
pub use source::{GitReference, SourceLocator, VersionDecl};
pub use variant::{VariantDecl, VariantKind};

use crate::condition::{Condition, ConditionError};
use crate::configuration::{Configuration, VariantValue};
use crate::error::{Error, Result};
use crate::hash::Checksum;
use crate::version::{Version, VersionRange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};

/// Which generic workflow the package's hooks customize
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BuildSystem {
    /// Hand-edited makefiles driven by `make`
    Makefile,
    /// CMake configure, then `make` in the build directory
    Cmake,
    /// No implicit steps; the hooks do everything
    #[default]
    Generic,
}

/// Declarative description of one package
#[derive(Debug, Clone, Serialize)]
pub struct PackageSpec {
    name: String,
    pub summary: Option<String>,
    pub homepage: Option<String>,
    pub build_system: BuildSystem,
    /// Whether the build tool may run jobs in parallel
    pub parallel: bool,
    versions: Vec<VersionDecl>,
    variants: Vec<VariantDecl>,
    dependencies: Vec<Dependency>,
    conflicts: Vec<Conflict>,
}

/// Check a package or variant name: `[A-Za-z0-9][A-Za-z0-9_.-]*`
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let mut chars = name.chars();
    match chars.next() {
        None => return Err(invalid("name is empty")),
        Some(c) if !c.is_ascii_alphanumeric() => {
            return Err(invalid("must start with a letter or digit"));
        }
        Some(_) => {}
    }

    if let Some(c) = chars.find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))) {
        return Err(invalid(&format!("unexpected character '{}'", c)));
    }

    Ok(())
}

impl PackageSpec {
    /// Create an empty spec for `name`
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;

        Ok(Self {
            name,
            summary: None,
            homepage: None,
            build_system: BuildSystem::default(),
            parallel: true,
            versions: Vec::new(),
            variants: Vec::new(),
            dependencies: Vec::new(),
            conflicts: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn versions(&self) -> &[VersionDecl] {
        &self.versions
    }

    pub fn variants(&self) -> &[VariantDecl] {
        &self.variants
    }

    /// Dependency edges in declaration order
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn variant(&self, name: &str) -> Option<&VariantDecl> {
        self.variants.iter().find(|v| v.name == name)
    }

    pub fn version(&self, version: &Version) -> Option<&VersionDecl> {
        self.versions.iter().find(|d| d.version == *version)
    }

    // === Declarations ===

    /// Register a retrievable source version
    ///
    /// Fails with `DuplicateVersion` when the label is already declared.
    pub fn declare_version(
        &mut self,
        label: &str,
        locator: SourceLocator,
        integrity: Option<Checksum>,
    ) -> Result<&mut VersionDecl> {
        let field = format!("versions[{}]", self.versions.len());
        let version = Version::parse(label)?;

        if self.versions.iter().any(|d| d.version == version) {
            return Err(Error::DuplicateVersion {
                package: self.name.clone(),
                field,
                label: label.to_string(),
            });
        }

        self.versions.push(VersionDecl {
            version,
            locator,
            integrity,
            preferred: false,
        });
        let index = self.versions.len() - 1;
        Ok(&mut self.versions[index])
    }

    /// Register a build variant
    ///
    /// The default must have the shape of `kind` and, for enumerated and
    /// multi-valued variants, be drawn from `allowed_values`.
    pub fn declare_variant(
        &mut self,
        name: &str,
        kind: VariantKind,
        default: VariantValue,
        allowed_values: Option<Vec<String>>,
    ) -> Result<&mut VariantDecl> {
        validate_name(name)?;
        let field = format!("variants[{}]", name);

        if self.variant(name).is_some() {
            return Err(Error::DuplicateVariant {
                package: self.name.clone(),
                field,
                variant: name.to_string(),
            });
        }

        let invalid = |reason: String| Error::InvalidDefault {
            package: self.name.clone(),
            field: format!("{}.default", field),
            variant: name.to_string(),
            reason,
        };

        let allowed_values = match (kind, allowed_values) {
            (VariantKind::Boolean, None) => Vec::new(),
            (VariantKind::Boolean, Some(_)) => {
                return Err(invalid("boolean variants take no allowed values".to_string()));
            }
            (_, None) => return Err(invalid(format!("{} variant has no allowed values", kind))),
            (_, Some(values)) if values.is_empty() => {
                return Err(invalid(format!("{} variant has no allowed values", kind)));
            }
            (_, Some(values)) => values,
        };

        let decl = VariantDecl {
            name: name.to_string(),
            kind,
            default,
            allowed_values,
            description: None,
        };
        decl.check_value(&decl.default).map_err(invalid)?;

        self.variants.push(decl);
        let index = self.variants.len() - 1;
        Ok(&mut self.variants[index])
    }

    /// Register a conditional dependency edge
    ///
    /// The target is not looked up; only the condition's references to this
    /// package's own variants are checked.
    pub fn declare_dependency(
        &mut self,
        target: &str,
        constraint: Vec<VersionRange>,
        variant_requirements: Vec<Condition>,
        condition: Condition,
    ) -> Result<&mut Dependency> {
        let field = format!("depends[{}]", self.dependencies.len());
        validate_name(target)?;
        self.check_condition(&condition)
            .map_err(|e| Error::malformed(&self.name, format!("{}.when", field), e))?;

        self.dependencies.push(Dependency {
            target: target.to_string(),
            constraint,
            variant_requirements,
            when: condition,
            types: DepType::default_set(),
        });
        let index = self.dependencies.len() - 1;
        Ok(&mut self.dependencies[index])
    }

    /// Register a predicate that marks matching configurations invalid
    pub fn declare_conflict(&mut self, condition: Condition, message: Option<String>) -> Result<()> {
        let field = format!("conflicts[{}]", self.conflicts.len());
        self.check_condition(&condition)
            .map_err(|e| Error::malformed(&self.name, field, e))?;

        self.conflicts.push(Conflict { condition, message });
        Ok(())
    }

    /// Check a condition's own-variant atoms against the declared variants
    pub fn check_condition(&self, condition: &Condition) -> std::result::Result<(), ConditionError> {
        for (name, matches) in condition.own_variant_atoms() {
            let decl = self
                .variant(name)
                .ok_or_else(|| ConditionError::UnknownVariant(name.to_string()))?;
            decl.check_match(matches)?;
        }
        Ok(())
    }

    // === Queries ===

    /// Decide whether `condition` holds for `candidate`; pure and infallible
    pub fn evaluate_condition(&self, condition: &Condition, candidate: &Configuration) -> bool {
        condition.evaluate(candidate)
    }

    /// Edges whose activation condition holds, in declaration order
    pub fn active_dependencies(&self, candidate: &Configuration) -> Vec<&Dependency> {
        self.dependencies
            .iter()
            .filter(|d| d.is_active(candidate))
            .collect()
    }

    pub fn active_conflicts(&self, candidate: &Configuration) -> Vec<&Conflict> {
        self.conflicts
            .iter()
            .filter(|c| c.applies_to(candidate))
            .collect()
    }

    /// Whether no conflict applies to `candidate`
    pub fn is_valid(&self, candidate: &Configuration) -> bool {
        !self.conflicts.iter().any(|c| c.applies_to(candidate))
    }

    /// Structural check of a candidate: declared version, every variant
    /// declared, assigned, and holding an allowed value
    pub fn check_configuration(&self, candidate: &Configuration) -> Result<()> {
        let invalid = |reason: String| Error::InvalidConfiguration {
            package: self.name.clone(),
            reason,
        };

        if candidate.name != self.name {
            return Err(invalid(format!(
                "configuration is for '{}'",
                candidate.name
            )));
        }

        if self.version(&candidate.version).is_none() {
            return Err(invalid(format!(
                "version '{}' is not declared",
                candidate.version
            )));
        }

        for (name, value) in &candidate.variants {
            let decl = self
                .variant(name)
                .ok_or_else(|| invalid(format!("unknown variant '{}'", name)))?;
            decl.check_value(value)
                .map_err(|reason| invalid(format!("variant '{}': {}", name, reason)))?;
        }

        if let Some(missing) = self
            .variants
            .iter()
            .find(|v| !candidate.variants.contains_key(&v.name))
        {
            return Err(invalid(format!("variant '{}' is not assigned", missing.name)));
        }

        Ok(())
    }

    /// The version chosen when none is requested
    ///
    /// An explicitly preferred version wins, then the highest numeric
    /// release, then the first declared.
    pub fn preferred_version(&self) -> Option<&VersionDecl> {
        self.versions
            .iter()
            .find(|d| d.preferred)
            .or_else(|| {
                self.versions
                    .iter()
                    .filter(|d| d.version.is_numeric())
                    .max_by(|a, b| a.version.cmp(&b.version))
            })
            .or_else(|| self.versions.first())
    }

    /// The preferred version with every variant at its default
    pub fn default_configuration(&self) -> Option<Configuration> {
        let version = self.preferred_version()?.version.clone();
        let variants: BTreeMap<String, VariantValue> = self
            .variants
            .iter()
            .map(|v| (v.name.clone(), v.default.clone()))
            .collect();

        let mut config = Configuration::new(self.name.clone(), version);
        config.variants = variants;
        Some(config)
    }
}
