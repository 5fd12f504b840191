// src/recipe/format.rs

//! Recipe file format definitions
//!
//! Recipes are TOML files declaring one package: its versions, variants,
//! dependency edges, conflicts, and the declarative build hooks in
//! `[build]`. Conditions are written in the compact syntax understood by
//! `crate::condition` and are parsed when the recipe is turned into a
//! `PackageSpec`.

use crate::spec::{BuildSystem, DepType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

/// A complete recipe for one package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Package metadata
    pub package: PackageSection,

    /// Retrievable versions, in declaration order
    #[serde(default)]
    pub versions: Vec<VersionEntry>,

    /// Build variants
    #[serde(default)]
    pub variants: Vec<VariantEntry>,

    /// Dependency edges, in declaration order
    #[serde(default)]
    pub depends: Vec<DependsEntry>,

    /// Invalid-configuration predicates
    #[serde(default)]
    pub conflicts: Vec<ConflictEntry>,

    /// Declarative lifecycle hooks
    #[serde(default)]
    pub build: BuildSection,
}

impl Recipe {
    /// The archive URL of `version`, from the package-level `url` template
    pub fn archive_url(&self, version: &str) -> Option<String> {
        self.package.url.as_ref().map(|template| {
            substitute(template, |key| match key {
                "version" => Some(version.to_string()),
                "name" => Some(self.package.name.clone()),
                _ => None,
            })
        })
    }
}

/// Package metadata section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSection {
    /// Package name
    pub name: String,

    /// Short description
    #[serde(default)]
    pub summary: Option<String>,

    /// Homepage URL
    #[serde(default)]
    pub homepage: Option<String>,

    /// Which generic build workflow applies
    #[serde(default)]
    pub build_system: BuildSystem,

    /// Whether `make` may run parallel jobs (default: true)
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Archive URL template for checksum-only versions
    ///
    /// Supports `%(version)s` substitution.
    /// Example: `https://github.com/kokkos/kokkos/archive/%(version)s.tar.gz`
    #[serde(default)]
    pub url: Option<String>,

    /// Repository used by versions that only name a branch, tag or commit
    #[serde(default)]
    pub git: Option<String>,
}

fn default_true() -> bool {
    true
}

/// One `[[versions]]` entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version: String,

    /// Archive URL overriding the package template
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub sha512: Option<String>,
    #[serde(default)]
    pub md5: Option<String>,
    /// Prefixed checksum (`sha256:...`)
    #[serde(default)]
    pub checksum: Option<String>,

    /// Repository overriding the package-level `git`
    #[serde(default)]
    pub git: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub commit: Option<String>,
    #[serde(default)]
    pub submodules: bool,

    #[serde(default)]
    pub preferred: bool,
}

impl VersionEntry {
    pub fn is_git(&self) -> bool {
        self.branch.is_some() || self.tag.is_some() || self.commit.is_some()
    }

    pub fn has_checksum(&self) -> bool {
        self.sha256.is_some() || self.sha512.is_some() || self.md5.is_some() || self.checksum.is_some()
    }
}

/// A variant default as written: `true`, `"none"` or `["a", "b"]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Bool(bool),
    Single(String),
    List(Vec<String>),
}

/// One `[[variants]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantEntry {
    pub name: String,

    pub default: DefaultValue,

    /// Allowed values; absent for boolean variants
    #[serde(default)]
    pub values: Option<Vec<String>>,

    /// Whether several values may be chosen at once
    #[serde(default)]
    pub multi: bool,

    #[serde(default)]
    pub description: Option<String>,
}

/// A single string or a list of strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T: Clone> OneOrMany<T> {
    pub fn to_vec(&self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v.clone()],
            OneOrMany::Many(vs) => vs.clone(),
        }
    }
}

/// Activation condition: one condition string, or a list meaning "any of"
pub type When = Option<OneOrMany<String>>;

/// One `[[depends]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependsEntry {
    /// Target and requirements, e.g. `"hdf5@:1.8.19 +mpi +fortran"`
    pub spec: String,

    #[serde(default)]
    pub when: When,

    /// Dependency types (default: build and link)
    #[serde(default, rename = "type")]
    pub types: Option<OneOrMany<DepType>>,
}

/// One `[[conflicts]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictEntry {
    /// The conflicting selection, e.g. `"+cuda"` or `"gpu_arch=Volta70"`
    pub spec: String,

    #[serde(default)]
    pub when: When,

    #[serde(default)]
    pub msg: Option<String>,
}

/// Declarative lifecycle hooks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSection {
    /// Directory (relative to the source) where make and install run
    #[serde(default)]
    pub workdir: Option<String>,

    /// Makefile passed to make as `--makefile=`
    #[serde(default)]
    pub makefile: Option<String>,

    /// Extra arguments for every make invocation
    #[serde(default)]
    pub make_args: Vec<String>,

    /// Make targets for the build phase
    #[serde(default)]
    pub targets: Vec<TargetEntry>,

    /// Make target for the install phase (default: `install`)
    #[serde(default)]
    pub install_target: Option<String>,

    /// Whether the install phase runs `make <install_target>`
    ///
    /// Recipes that copy their artifacts with `[[build.install]]` turn
    /// this off.
    #[serde(default = "default_true")]
    pub make_install: bool,

    /// Environment variables for this package's build
    #[serde(default)]
    pub environment: Vec<EnvEntry>,

    /// Environment variables exported to packages that depend on this one
    #[serde(default)]
    pub dependent_environment: Vec<EnvEntry>,

    /// Files copied inside the source tree before editing
    #[serde(default)]
    pub copies: Vec<CopyEntry>,

    /// Regex substitutions applied to source files
    #[serde(default)]
    pub edits: Vec<EditEntry>,

    /// Lines appended to (or written into) source files
    #[serde(default)]
    pub appends: Vec<AppendEntry>,

    /// CMake cache arguments
    #[serde(default)]
    pub cmake_args: Vec<ArgsEntry>,

    /// Explicit commands, run after the build system's own steps
    #[serde(default)]
    pub commands: Vec<CommandEntry>,

    /// Artifacts copied into the install prefix
    #[serde(default)]
    pub install: Vec<InstallEntry>,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            workdir: None,
            makefile: None,
            make_args: Vec::new(),
            targets: Vec::new(),
            install_target: None,
            make_install: true,
            environment: Vec::new(),
            dependent_environment: Vec::new(),
            copies: Vec::new(),
            edits: Vec::new(),
            appends: Vec::new(),
            cmake_args: Vec::new(),
            commands: Vec::new(),
            install: Vec::new(),
        }
    }
}

impl BuildSection {
    pub fn install_target(&self) -> &str {
        self.install_target.as_deref().unwrap_or("install")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetEntry {
    pub target: String,
    #[serde(default)]
    pub when: When,
}

/// How an environment entry combines with an existing value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvAction {
    #[default]
    Set,
    /// `value:existing`
    Prepend,
    /// `existing:value`
    Append,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvEntry {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub action: EnvAction,
    #[serde(default)]
    pub when: When,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyEntry {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub when: When,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditEntry {
    /// File relative to the source directory
    pub file: String,
    /// Regular expression, matched per line (`(?m)`)
    pub pattern: String,
    pub replacement: String,
    /// Treat `pattern` as plain text
    #[serde(default)]
    pub literal: bool,
    #[serde(default)]
    pub when: When,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendEntry {
    pub file: String,
    pub lines: Vec<String>,
    /// Truncate the file first instead of appending
    #[serde(default)]
    pub create: bool,
    #[serde(default)]
    pub when: When,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgsEntry {
    pub args: Vec<String>,
    #[serde(default)]
    pub when: When,
}

/// Lifecycle phase an explicit command belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandPhase {
    Edit,
    Configure,
    Build,
    Install,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEntry {
    pub phase: CommandPhase,
    /// Program and arguments; `%(key)s` placeholders are substituted
    pub args: Vec<String>,
    /// Directory relative to the source directory (default: `workdir`)
    #[serde(default)]
    pub workdir: Option<String>,
    #[serde(default)]
    pub when: When,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallEntry {
    /// Source path; the file name may be a glob pattern (`*`, `?`, `[...]`)
    pub from: String,
    /// Directory relative to the install prefix
    pub to: String,
    #[serde(default)]
    pub when: When,
}

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%\(([A-Za-z0-9_.:\-]+)\)s").unwrap_or_else(|e| panic!("placeholder regex: {e}"))
});

/// Replace `%(key)s` placeholders using `lookup`
///
/// Unknown keys are left in place so the failing command shows them.
pub fn substitute(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures<'_>| {
            let key = &caps[1];
            match lookup(key) {
                Some(value) => value,
                None => {
                    debug!("No value for placeholder %({})s", key);
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RECIPE: &str = r#"
[package]
name = "cabana"
summary = "The Exascale Co-Design Center for Particle Applications Toolkit"
homepage = "https://github.com/ECP-copa/Cabana"
build_system = "cmake"
url = "https://github.com/ECP-copa/Cabana/archive/%(version)s.tar.gz"
git = "https://github.com/ECP-copa/Cabana.git"

[[versions]]
version = "develop"
branch = "master"

[[versions]]
version = "0.3.0"
sha256 = "fb67ab9aaf254b103ae0eb5cc913ddae3bf3cd0cf6010e9686e577a2981ca84f"

[[variants]]
name = "cuda"
default = false
description = "enable Cuda"

[[depends]]
spec = "cmake@3.9:"
type = "build"

[[depends]]
spec = "kokkos-cmake +cuda"
when = "+cuda"

[[build.cmake_args]]
args = ["-DCabana_ENABLE_TESTING=ON"]

[[build.environment]]
name = "NVCC_WRAPPER_DEFAULT_COMPILER"
value = "g++"
when = ["+cuda"]
"#;

    #[test]
    fn test_parse_recipe() {
        let recipe: Recipe = toml::from_str(SAMPLE_RECIPE).unwrap();

        assert_eq!(recipe.package.name, "cabana");
        assert_eq!(recipe.package.build_system, BuildSystem::Cmake);
        assert!(recipe.package.parallel);
        assert_eq!(recipe.versions.len(), 2);
        assert!(recipe.versions[0].is_git());
        assert!(recipe.versions[1].has_checksum());
        assert_eq!(recipe.variants[0].default, DefaultValue::Bool(false));
        assert_eq!(
            recipe.depends[0].types,
            Some(OneOrMany::One(DepType::Build))
        );
        assert_eq!(
            recipe.depends[1].when,
            Some(OneOrMany::One("+cuda".to_string()))
        );
        assert_eq!(
            recipe.build.environment[0].when,
            Some(OneOrMany::Many(vec!["+cuda".to_string()]))
        );
        assert_eq!(recipe.build.environment[0].action, EnvAction::Set);
    }

    #[test]
    fn test_parse_commands() {
        let content = r#"
[package]
name = "xgc-all"

[build]
make_install = false

[[build.commands]]
phase = "build"
args = ["make", "-f", "Makefile.theta", "es"]
when = "@gabriele,gitlab ~gpu"
"#;
        let recipe: Recipe = toml::from_str(content).unwrap();
        assert!(!recipe.build.make_install);
        assert_eq!(recipe.build.commands[0].phase, CommandPhase::Build);
        assert_eq!(recipe.build.commands[0].args.len(), 4);
        assert!(recipe.build.commands[0].workdir.is_none());
    }

    #[test]
    fn test_archive_url() {
        let recipe: Recipe = toml::from_str(SAMPLE_RECIPE).unwrap();
        assert_eq!(
            recipe.archive_url("0.3.0").unwrap(),
            "https://github.com/ECP-copa/Cabana/archive/0.3.0.tar.gz"
        );
    }

    #[test]
    fn test_minimal_recipe() {
        let minimal = r#"
[package]
name = "camtimers"

[[versions]]
version = "wdmapp"
git = "https://github.com/wdmapp/camtimers.git"
branch = "master"
"#;

        let recipe: Recipe = toml::from_str(minimal).unwrap();
        assert_eq!(recipe.package.build_system, BuildSystem::Generic);
        assert!(recipe.variants.is_empty());
        assert!(recipe.build.edits.is_empty());
        assert!(recipe.build.make_install);
        assert_eq!(recipe.build.install_target(), "install");
        assert!(recipe.archive_url("wdmapp").is_none());
    }

    #[test]
    fn test_variant_default_shapes() {
        let content = r#"
[package]
name = "p"

[[variants]]
name = "a"
default = true

[[variants]]
name = "b"
default = "none"
values = ["none", "nvtx"]

[[variants]]
name = "c"
default = ["70"]
values = ["60", "70"]
multi = true
"#;
        let recipe: Recipe = toml::from_str(content).unwrap();
        assert_eq!(recipe.variants[0].default, DefaultValue::Bool(true));
        assert_eq!(recipe.variants[1].default, DefaultValue::Single("none".into()));
        assert_eq!(recipe.variants[2].default, DefaultValue::List(vec!["70".into()]));
        assert!(recipe.variants[2].multi);
    }

    #[test]
    fn test_substitute() {
        let out = substitute("FC = %(dep:mpi)s/bin/mpif90 -o %(name)s", |key| match key {
            "dep:mpi" => Some("/opt/mpich".to_string()),
            "name" => Some("xgc".to_string()),
            _ => None,
        });
        assert_eq!(out, "FC = /opt/mpich/bin/mpif90 -o xgc");
    }

    #[test]
    fn test_substitute_keeps_unknown() {
        let out = substitute("-I%(dep:effis)s/include", |_| None);
        assert_eq!(out, "-I%(dep:effis)s/include");
    }
}
