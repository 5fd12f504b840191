// src/cli/mod.rs
//! CLI definitions for hpcpkg
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.
//!
//! Inspection:
//! - `info` - Show a package's versions, variants, dependencies and conflicts
//! - `check` - Load and validate every recipe in the repository
//! - `deps` / `order` - Active dependencies and install order of a configuration
//!
//! Building:
//! - `build` - Run a package's lifecycle hooks against an unpacked source tree
//! - `verify` - Check a downloaded archive against a checksum

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hpcpkg")]
#[command(author = "hpcpkg Contributors")]
#[command(version)]
#[command(about = "Package specifications and build hooks for scientific software", long_about = None)]
pub struct Cli {
    /// Recipe directory (overrides HPCPKG_REPO and the settings file)
    #[arg(long, global = true, value_name = "DIR")]
    pub repo: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Selects one configuration of a package; unset parts take their defaults
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigurationArgs {
    /// Version label (default: the preferred version)
    #[arg(long)]
    pub version: Option<String>,

    /// Variant assignment: name=value, +name or ~name (repeatable)
    #[arg(long = "variant", value_name = "NAME=VALUE", allow_hyphen_values = true)]
    pub variants: Vec<String>,

    /// Compiler, e.g. gcc@8.1.0 (default: from settings)
    #[arg(long)]
    pub compiler: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a package's declarations
    Info {
        /// Package name
        package: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Validate every recipe in the repository
    Check {
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// Show the active dependencies of a configuration
    Deps {
        /// Package name
        package: String,

        #[command(flatten)]
        configuration: ConfigurationArgs,

        /// Print the expanded configuration tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the install order of a configuration and its dependencies
    Order {
        /// Package name
        package: String,

        #[command(flatten)]
        configuration: ConfigurationArgs,
    },

    /// Run the build lifecycle of a package
    Build {
        /// Package name
        package: String,

        #[command(flatten)]
        configuration: ConfigurationArgs,

        /// Install prefix
        #[arg(long)]
        prefix: PathBuf,

        /// Unpacked source directory
        #[arg(long)]
        source: PathBuf,

        /// Install prefix of a dependency: name=path (repeatable)
        #[arg(long = "dep-prefix", value_name = "NAME=PATH")]
        dep_prefixes: Vec<String>,

        /// Parallel build jobs (default: from settings or the CPU count)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Show what would be run without running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Verify a file against a checksum
    Verify {
        /// File to hash
        file: PathBuf,

        /// Expected checksum: sha256:HEX, sha512:HEX, md5:HEX or bare SHA-256 hex
        checksum: String,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
