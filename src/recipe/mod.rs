// src/recipe/mod.rs

//! Recipe files: the on-disk form of a package specification
//!
//! A recipe is a TOML document declaring one package. Loading it goes
//! through three steps:
//! - **parse**: TOML into the `Recipe` structs (`parse_recipe`)
//! - **declare**: `Recipe::to_spec()` feeds every entry through the
//!   `PackageSpec::declare_*` operations, parsing conditions once
//! - **validate**: `validate_recipe` additionally checks the `[build]`
//!   section and reports likely mistakes as warnings
//!
//! # Example Recipe
//!
//! ```toml
//! [package]
//! name = "cabana"
//! build_system = "cmake"
//! url = "https://github.com/ECP-copa/Cabana/archive/%(version)s.tar.gz"
//!
//! [[versions]]
//! version = "0.3.0"
//! sha256 = "fb67ab9aaf254b103ae0eb5cc913ddae3bf3cd0cf6010e9686e577a2981ca84f"
//!
//! [[variants]]
//! name = "cuda"
//! default = false
//!
//! [[depends]]
//! spec = "kokkos-cmake +cuda"
//! when = "+cuda"
//!
//! [[build.cmake_args]]
//! args = ["-DCabana_REQUIRE_CUDA=ON"]
//! when = "+cuda"
//! ```

mod convert;
mod format;
pub mod graph;
pub mod parser;

pub(crate) use convert::parse_when;
pub use format::{
    AppendEntry, ArgsEntry, BuildSection, CommandEntry, CommandPhase, ConflictEntry, CopyEntry,
    DefaultValue, DependsEntry, EditEntry, EnvAction, EnvEntry, InstallEntry, OneOrMany,
    PackageSection, Recipe, TargetEntry, VariantEntry, VersionEntry, When, substitute,
};
pub use graph::RecipeGraph;
pub use parser::{parse_recipe, parse_recipe_file, validate_recipe};
