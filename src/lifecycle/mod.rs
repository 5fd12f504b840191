// src/lifecycle/mod.rs

//! Build lifecycle
//!
//! Building a resolved package runs five phases in a fixed order:
//!
//! 1. **environment**: direct dependencies contribute to the environment
//!    (`setup_dependent_environment`), then the package extends it
//! 2. **edit**: patch the unpacked sources
//! 3. **configure**: e.g. run `cmake`
//! 4. **build**: e.g. run `make`
//! 5. **install**: populate the install prefix
//!
//! Each phase is a hook trait with a no-op default. A package's hooks come
//! from the `HookRegistry`: hand-written `PackageHooks` registered by name,
//! otherwise the `RecipeHooks` compiled from its recipe. The `Builder`
//! threads one explicit `BuildContext` through the phases and stops at the
//! first failing hook. External commands go through a `CommandRunner`, so a
//! build can be rehearsed with `DryRunRunner`.

mod builder;
mod context;
mod environment;
pub mod hooks;
mod recipe_hooks;
mod runner;

pub use builder::{BuildReport, BuildRequest, Builder};
pub use context::{BUILD_DIR_NAME, BuildContext, DependencyInfo};
pub use environment::Environment;
pub use hooks::{
    Build, Configure, Edit, EnvironmentSetup, HookRegistry, Install, NoHooks, PackageHooks,
};
pub use recipe_hooks::RecipeHooks;
pub use runner::{CommandRunner, DryRunRunner, Invocation, ShellRunner};

use serde::Serialize;
use strum_macros::{Display, EnumString};

/// One stage of the build lifecycle
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Environment,
    Edit,
    Configure,
    Build,
    Install,
}

impl Phase {
    /// Every phase, in execution order
    pub const ALL: [Phase; 5] = [
        Phase::Environment,
        Phase::Edit,
        Phase::Configure,
        Phase::Build,
        Phase::Install,
    ];
}
