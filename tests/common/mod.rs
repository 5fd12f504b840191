// tests/common/mod.rs

//! Shared helpers for integration tests.

#![allow(dead_code)]

use hpcpkg::lifecycle::{CommandRunner, Invocation};
use hpcpkg::{Compiler, Configuration, PackageSpec, Repository, VariantValue, Version};
use std::path::PathBuf;
use std::sync::Mutex;

/// The recipes shipped with the crate
pub fn recipes_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("recipes")
}

pub fn bundled_repository() -> Repository {
    Repository::load_dir(&recipes_dir()).unwrap()
}

/// Default configuration of `spec` at `version`, with `variants` applied
pub fn configure(spec: &PackageSpec, version: &str, variants: &[(&str, &str)]) -> Configuration {
    let mut config = spec.default_configuration().unwrap();
    config.version = Version::parse(version).unwrap();
    for (name, value) in variants {
        config = config.with_variant(*name, VariantValue::parse(value));
    }
    config
}

pub fn with_gcc(config: Configuration) -> Configuration {
    config.with_compiler(Compiler::parse("gcc@8.1.0").unwrap())
}

/// Records commands without running them, but lets file operations happen
#[derive(Default)]
pub struct RecordingRunner {
    commands: Mutex<Vec<Invocation>>,
}

impl RecordingRunner {
    pub fn command_lines(&self) -> Vec<String> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .map(Invocation::command_line)
            .collect()
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.commands.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, invocation: &Invocation) -> hpcpkg::Result<()> {
        self.commands.lock().unwrap().push(invocation.clone());
        Ok(())
    }
}
