// src/recipe/convert.rs

//! Turning a parsed recipe into a `PackageSpec`
//!
//! Every declaration goes through the `PackageSpec::declare_*` operations,
//! so a recipe is held to the same rules as code that builds a spec by hand.
//! Errors name the package and the recipe field they came from.

use crate::condition::{Condition, parse_condition, parse_condition_any, parse_requirement};
use crate::configuration::VariantValue;
use crate::error::{Error, Result};
use crate::hash::{Checksum, HashAlgorithm};
use crate::recipe::format::{DefaultValue, OneOrMany, Recipe, VariantEntry, VersionEntry, When};
use crate::spec::{GitReference, PackageSpec, SourceLocator, VariantKind};
use std::collections::BTreeSet;
use tracing::debug;

impl Recipe {
    /// Build the package specification this recipe declares
    pub fn to_spec(&self) -> Result<PackageSpec> {
        let mut spec = PackageSpec::new(&self.package.name)?;
        spec.summary = self.package.summary.clone();
        spec.homepage = self.package.homepage.clone();
        spec.build_system = self.package.build_system;
        spec.parallel = self.package.parallel;

        for (i, entry) in self.versions.iter().enumerate() {
            let field = format!("versions[{}]", i);
            let locator = self.locator(entry, &field)?;
            let integrity = self.integrity(entry, &field)?;
            let decl = spec.declare_version(&entry.version, locator, integrity)?;
            if entry.preferred {
                decl.prefer();
            }
        }

        // Variants first: conditions below are checked against them
        for entry in &self.variants {
            let (kind, default) = variant_shape(entry);
            let decl = spec.declare_variant(&entry.name, kind, default, entry.values.clone())?;
            decl.description = entry.description.clone();
        }

        for (i, entry) in self.depends.iter().enumerate() {
            let requirement = parse_requirement(&entry.spec)
                .map_err(|e| Error::malformed(&self.package.name, format!("depends[{}].spec", i), e))?;
            let condition = parse_when(&spec, &entry.when, &format!("depends[{}].when", i))?;

            let dep = spec.declare_dependency(
                &requirement.target,
                requirement.versions,
                requirement.predicates,
                condition,
            )?;
            if let Some(types) = &entry.types {
                dep.with_types(types.to_vec());
            }
        }

        for (i, entry) in self.conflicts.iter().enumerate() {
            let field = format!("conflicts[{}]", i);
            let selection = parse_condition(&self.package.name, &entry.spec)
                .map_err(|e| Error::malformed(&self.package.name, format!("{}.spec", field), e))?;
            let when = parse_when(&spec, &entry.when, &format!("{}.when", field))?;
            spec.declare_conflict(Condition::all(vec![selection, when]), entry.msg.clone())?;
        }

        debug!(
            "Declared {}: {} versions, {} variants, {} dependencies, {} conflicts",
            spec.name(),
            spec.versions().len(),
            spec.variants().len(),
            spec.dependencies().len(),
            spec.conflicts().len()
        );

        Ok(spec)
    }

    fn invalid(&self, field: &str, reason: impl Into<String>) -> Error {
        Error::InvalidField {
            package: self.package.name.clone(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    fn locator(&self, entry: &VersionEntry, field: &str) -> Result<SourceLocator> {
        // The most specific reference wins
        let reference = entry
            .commit
            .clone()
            .map(GitReference::Commit)
            .or_else(|| entry.tag.clone().map(GitReference::Tag))
            .or_else(|| entry.branch.clone().map(GitReference::Branch));

        if let Some(reference) = reference {
            let url = entry
                .git
                .clone()
                .or_else(|| self.package.git.clone())
                .ok_or_else(|| self.invalid(field, "git reference without a repository URL"))?;

            return Ok(SourceLocator::Git {
                url,
                reference,
                submodules: entry.submodules,
            });
        }

        if entry.git.is_some() {
            return Err(self.invalid(field, "git URL without a branch, tag or commit"));
        }

        entry
            .url
            .clone()
            .or_else(|| self.archive_url(&entry.version))
            .map(SourceLocator::archive)
            .ok_or_else(|| self.invalid(field, "no archive URL and no package url template"))
    }

    fn integrity(&self, entry: &VersionEntry, field: &str) -> Result<Option<Checksum>> {
        let given: Vec<(Option<HashAlgorithm>, &String)> = [
            (Some(HashAlgorithm::Sha256), &entry.sha256),
            (Some(HashAlgorithm::Sha512), &entry.sha512),
            (Some(HashAlgorithm::Md5), &entry.md5),
            (None, &entry.checksum),
        ]
        .into_iter()
        .filter_map(|(algo, value)| value.as_ref().map(|v| (algo, v)))
        .collect();

        match given.as_slice() {
            [] => Ok(None),
            [(Some(algo), value)] => Checksum::new(*algo, value.as_str())
                .map(Some)
                .map_err(|e| self.invalid(field, e.to_string())),
            [(None, value)] => Checksum::parse_prefixed(value)
                .map(Some)
                .map_err(|e| self.invalid(field, e.to_string())),
            _ => Err(self.invalid(field, "more than one checksum given")),
        }
    }
}

/// Work out a variant's kind and default from how the recipe wrote it
fn variant_shape(entry: &VariantEntry) -> (VariantKind, VariantValue) {
    let kind = match (&entry.values, entry.multi) {
        (None, _) => VariantKind::Boolean,
        (Some(_), true) => VariantKind::Multi,
        (Some(_), false) => VariantKind::Enumerated,
    };

    let default = match (&entry.default, kind) {
        (DefaultValue::Bool(b), _) => VariantValue::Bool(*b),
        (DefaultValue::Single(v), VariantKind::Multi) => {
            VariantValue::Multi(BTreeSet::from([v.clone()]))
        }
        (DefaultValue::Single(v), _) => VariantValue::Single(v.clone()),
        (DefaultValue::List(values), _) => VariantValue::Multi(values.iter().cloned().collect()),
    };

    (kind, default)
}

/// Parse an optional `when` and check it against the package's declared variants
///
/// A missing `when` is `Always`; a list of strings is an alternation.
pub(crate) fn parse_when(spec: &PackageSpec, when: &When, field: &str) -> Result<Condition> {
    let condition = match when {
        None => return Ok(Condition::Always),
        Some(OneOrMany::One(s)) => parse_condition(spec.name(), s),
        Some(OneOrMany::Many(list)) => parse_condition_any(spec.name(), list),
    }
    .and_then(|c| spec.check_condition(&c).map(|_| c))
    .map_err(|e| Error::malformed(spec.name(), field, e))?;

    Ok(condition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::Configuration;
    use crate::recipe::parse_recipe;
    use crate::spec::DepType;
    use crate::version::Version;

    const KOKKOS: &str = r#"
[package]
name = "kokkos-cmake"
build_system = "cmake"
url = "https://github.com/kokkos/kokkos/archive/%(version)s.tar.gz"
git = "https://github.com/kokkos/kokkos.git"

[[versions]]
version = "develop"
branch = "develop"

[[versions]]
version = "2.9.00"
sha256 = "e0621197791ed3a381b4f02c78fa529f3cff3abb74d52157b4add17e8aa04bc4"

[[versions]]
version = "2.7.24"
checksum = "md5:64ec31e9fb16a4b2b4bcc3e2e7e2c3b1"

[[variants]]
name = "gpu_arch"
default = "none"
values = ["none", "Kepler30", "Pascal60", "Volta70"]

[[variants]]
name = "cuda"
default = false

[[depends]]
spec = "cmake@3.10:"
type = "build"

[[depends]]
spec = "cuda"
when = "+cuda"
type = ["build", "link", "run"]

[[conflicts]]
spec = "gpu_arch=Volta70"
when = "~cuda"
msg = "GPU architecture requires CUDA"

[[conflicts]]
spec = "+cuda"
when = "@:2.5.99"
"#;

    fn kokkos() -> PackageSpec {
        parse_recipe(KOKKOS).unwrap().to_spec().unwrap()
    }

    // === Versions ===

    #[test]
    fn test_version_locators() {
        let spec = kokkos();
        let versions = spec.versions();
        assert_eq!(versions.len(), 3);

        assert!(!versions[0].locator.is_archive());
        assert_eq!(versions[0].locator.url(), "https://github.com/kokkos/kokkos.git");
        assert!(versions[0].integrity.is_none());

        assert_eq!(
            versions[1].locator.url(),
            "https://github.com/kokkos/kokkos/archive/2.9.00.tar.gz"
        );
        assert_eq!(
            versions[1].integrity.as_ref().unwrap().algorithm,
            HashAlgorithm::Sha256
        );
        assert_eq!(
            versions[2].integrity.as_ref().unwrap().algorithm,
            HashAlgorithm::Md5
        );
        assert_eq!(spec.preferred_version().unwrap().label(), "2.9.00");
    }

    #[test]
    fn test_bad_checksum_names_field() {
        let content = KOKKOS.replace("e0621197", "zz");
        let err = parse_recipe(&content).unwrap().to_spec().unwrap_err();
        match err {
            Error::InvalidField { package, field, .. } => {
                assert_eq!(package, "kokkos-cmake");
                assert_eq!(field, "versions[1]");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_git_version_needs_url() {
        let content = r#"
[package]
name = "camtimers"

[[versions]]
version = "master"
branch = "master"
"#;
        let err = parse_recipe(content).unwrap().to_spec().unwrap_err();
        assert!(matches!(err, Error::InvalidField { ref field, .. } if field == "versions[0]"));
    }

    // === Dependencies ===

    #[test]
    fn test_dependency_types_and_conditions() {
        let spec = kokkos();
        let deps = spec.dependencies();
        assert_eq!(deps[0].target, "cmake");
        assert!(deps[0].is_build_only());
        assert_eq!(deps[1].types.len(), 3);
        assert!(deps[1].types.contains(&DepType::Run));

        let off = spec.default_configuration().unwrap();
        let on = off.clone().with_variant("cuda", VariantValue::Bool(true));
        assert_eq!(spec.active_dependencies(&off).len(), 1);
        assert_eq!(spec.active_dependencies(&on).len(), 2);
    }

    #[test]
    fn test_unknown_variant_in_when() {
        let content = KOKKOS.replace("when = \"+cuda\"", "when = \"+openmp\"");
        let err = parse_recipe(&content).unwrap().to_spec().unwrap_err();
        match err {
            Error::MalformedCondition { field, .. } => assert_eq!(field, "depends[1].when"),
            other => panic!("unexpected error: {other}"),
        }
    }

    // === Conflicts ===

    #[test]
    fn test_gpu_arch_conflict() {
        let spec = kokkos();
        let volta = spec
            .default_configuration()
            .unwrap()
            .with_variant("gpu_arch", VariantValue::Single("Volta70".into()));

        assert!(!spec.is_valid(&volta));
        assert_eq!(
            spec.active_conflicts(&volta)[0].message.as_deref(),
            Some("GPU architecture requires CUDA")
        );

        let with_cuda = volta.with_variant("cuda", VariantValue::Bool(true));
        assert!(spec.is_valid(&with_cuda));
    }

    #[test]
    fn test_old_versions_conflict_with_cuda() {
        let spec = kokkos();
        let old = Configuration::new("kokkos-cmake", Version::parse("2.5.00").unwrap())
            .with_variant("cuda", VariantValue::Bool(true))
            .with_variant("gpu_arch", VariantValue::Single("none".into()));
        assert!(!spec.is_valid(&old));
    }

    // === Variants ===

    #[test]
    fn test_multi_variant_string_default() {
        let entry = VariantEntry {
            name: "perf".into(),
            default: DefaultValue::Single("none".into()),
            values: Some(vec!["none".into(), "nvtx".into()]),
            multi: true,
            description: None,
        };
        let (kind, default) = variant_shape(&entry);
        assert_eq!(kind, VariantKind::Multi);
        assert!(default.includes("none"));
    }
}
