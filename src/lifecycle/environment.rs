// src/lifecycle/environment.rs

//! Build environment variables, accumulated by value

use crate::recipe::EnvAction;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Separator used when prepending or appending to path-like variables
const PATH_SEPARATOR: char = ':';

/// A set of environment variables for one package's build
///
/// Every modifier consumes the environment and returns the extended one,
/// so hooks thread it through instead of mutating shared state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name`, replacing any previous value
    #[must_use]
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Put `value` in front of the existing value of `name`
    ///
    /// A variable not set here extends the value inherited from the process,
    /// so prepending to `PATH` keeps the system entries.
    #[must_use]
    pub fn with_prepended(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        let joined = match self.current(&name) {
            Some(existing) if !existing.is_empty() => {
                format!("{}{}{}", value, PATH_SEPARATOR, existing)
            }
            _ => value,
        };
        self.vars.insert(name, joined);
        self
    }

    /// Put `value` after the existing value of `name`, inherited or not
    #[must_use]
    pub fn with_appended(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        let joined = match self.current(&name) {
            Some(existing) if !existing.is_empty() => {
                format!("{}{}{}", existing, PATH_SEPARATOR, value)
            }
            _ => value,
        };
        self.vars.insert(name, joined);
        self
    }

    /// Apply one recipe environment action
    #[must_use]
    pub fn with_action(self, action: EnvAction, name: &str, value: String) -> Self {
        match action {
            EnvAction::Set => self.with_var(name, value),
            EnvAction::Prepend => self.with_prepended(name, value),
            EnvAction::Append => self.with_appended(name, value),
        }
    }

    fn current(&self, name: &str) -> Option<String> {
        self.vars
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.vars {
            writeln!(f, "{}={}", name, value)?;
        }
        Ok(())
    }
}
