// src/lifecycle/runner.rs

//! External command execution for build hooks

use crate::error::{Error, Result};
use crate::lifecycle::Environment;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use tracing::{debug, info};

/// One external command: program, arguments, working directory, environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Export every variable of `env` to the command
    pub fn with_environment(mut self, env: &Environment) -> Self {
        self.env = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self
    }

    /// The command line, without environment
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(cd {} && {})", self.cwd.display(), self.command_line())
    }
}

/// Runs the external commands issued by lifecycle hooks
pub trait CommandRunner: Send + Sync {
    /// Run `invocation` to completion; a non-zero exit is an error
    fn run(&self, invocation: &Invocation) -> Result<()>;

    /// Whether commands and file changes are only being reported
    fn is_dry_run(&self) -> bool {
        false
    }
}

/// Runs commands as child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, invocation: &Invocation) -> Result<()> {
        debug!("Command: {}", invocation);
        ensure_dir(&invocation.cwd)?;

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .output()
            .map_err(|e| {
                Error::IoError(format!("Failed to run {}: {}", invocation.program, e))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines() {
            debug!("[{}] {}", invocation.program, line);
        }
        for line in stderr.lines() {
            debug!("[{} stderr] {}", invocation.program, line);
        }

        if !output.status.success() {
            return Err(Error::IoError(format!(
                "{} failed with exit code {:?}\nstderr: {}",
                invocation.command_line(),
                output.status.code(),
                stderr.trim_end()
            )));
        }

        Ok(())
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| {
            Error::IoError(format!("Failed to create {}: {}", dir.display(), e))
        })?;
    }
    Ok(())
}

/// Records commands instead of running them
#[derive(Debug, Default)]
pub struct DryRunRunner {
    recorded: Mutex<Vec<Invocation>>,
}

impl DryRunRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands received so far, in order
    pub fn commands(&self) -> Vec<Invocation> {
        self.recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl CommandRunner for DryRunRunner {
    fn run(&self, invocation: &Invocation) -> Result<()> {
        info!("[dry-run] {}", invocation);
        self.recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(invocation.clone());
        Ok(())
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_invocation_display() {
        let inv = Invocation::new("make", "/src/pspline")
            .arg("-j1")
            .args(["FC=mpif90"]);
        assert_eq!(inv.command_line(), "make -j1 FC=mpif90");
        assert_eq!(inv.to_string(), "(cd /src/pspline && make -j1 FC=mpif90)");
    }

    #[test]
    fn test_dry_run_records() {
        let runner = DryRunRunner::new();
        assert!(runner.is_dry_run());
        runner.run(&Invocation::new("cmake", "/build")).unwrap();
        runner.run(&Invocation::new("make", "/build")).unwrap();

        let programs: Vec<String> = runner.commands().into_iter().map(|i| i.program).collect();
        assert_eq!(programs, vec!["cmake", "make"]);
    }

    #[test]
    fn test_shell_runner_success_and_failure() {
        let dir = TempDir::new().unwrap();
        let runner = ShellRunner;
        assert!(!runner.is_dry_run());

        let ok = Invocation::new("sh", dir.path())
            .args(["-c", "echo \"$GREETING\" > out.txt"])
            .with_environment(&Environment::new().with_var("GREETING", "hello"));
        runner.run(&ok).unwrap();
        let written = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(written.trim(), "hello");

        let fail = Invocation::new("sh", dir.path()).args(["-c", "exit 3"]);
        match runner.run(&fail) {
            Err(Error::IoError(msg)) => assert!(msg.contains("Some(3)")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_shell_runner_creates_workdir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("build");
        ShellRunner
            .run(&Invocation::new("sh", &nested).args(["-c", "true"]))
            .unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_shell_runner_keeps_system_path() {
        let dir = TempDir::new().unwrap();
        let env = Environment::new().with_prepended("PATH", "/opt/kokkos/bin");

        // sh itself is found on the inherited entries
        let inv = Invocation::new("sh", dir.path())
            .args(["-c", "echo \"$PATH\" > path.txt; command -v ls > ls.txt"])
            .with_environment(&env);
        ShellRunner.run(&inv).unwrap();

        let path = std::fs::read_to_string(dir.path().join("path.txt")).unwrap();
        let entries: Vec<&str> = path.trim().split(':').collect();
        assert_eq!(entries[0], "/opt/kokkos/bin");
        assert!(entries.len() > 1);
        let ls = std::fs::read_to_string(dir.path().join("ls.txt")).unwrap();
        assert!(!ls.trim().is_empty());
    }
}
