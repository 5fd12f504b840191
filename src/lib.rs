// src/lib.rs

//! hpcpkg: package specifications for scientific software
//!
//! Describes how a family of HPC packages can be built, so that a resolver
//! can pick concrete configurations and a builder can drive each package
//! through a generic workflow.
//!
//! # Architecture
//!
//! - Specs: versions, variants, conditional dependencies and conflicts,
//!   declared once and queried purely (`spec`, `condition`)
//! - Configurations: the resolver's answer for one package and its
//!   dependencies (`configuration`)
//! - Recipes: TOML files declaring a spec and its build hooks (`recipe`),
//!   collected into a `Repository`
//! - Lifecycle: environment, edit, configure, build and install hooks run
//!   in a fixed order by the `Builder` (`lifecycle`)
//!
//! Resolution itself (choosing versions and variant values across a
//! dependency tree) is left to the caller.

pub mod condition;
pub mod configuration;
mod error;
pub mod hash;
pub mod lifecycle;
pub mod recipe;
pub mod repository;
pub mod settings;
pub mod spec;
pub mod version;

pub use condition::{Condition, ConditionError, parse_condition};
pub use configuration::{Compiler, Configuration, VariantValue};
pub use error::{Error, Result};
pub use hash::{Checksum, HashAlgorithm};
pub use lifecycle::{
    BuildContext, BuildReport, BuildRequest, Builder, CommandRunner, DryRunRunner, Environment,
    HookRegistry, PackageHooks, Phase, RecipeHooks, ShellRunner,
};
pub use recipe::{Recipe, RecipeGraph, parse_recipe, parse_recipe_file, validate_recipe};
pub use repository::Repository;
pub use settings::Settings;
pub use spec::{BuildSystem, Conflict, DepType, Dependency, PackageSpec, SourceLocator};
pub use version::{Version, VersionRange};
