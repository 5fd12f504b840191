// src/error.rs

//! Error types shared across the crate

use crate::condition::ConditionError;
use crate::hash::HashError;
use std::io;
use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A version label was declared twice for the same package
    #[error("{package}: duplicate version '{label}' in {field}")]
    DuplicateVersion {
        package: String,
        field: String,
        label: String,
    },

    /// A variant name was declared twice for the same package
    #[error("{package}: duplicate variant '{variant}' in {field}")]
    DuplicateVariant {
        package: String,
        field: String,
        variant: String,
    },

    /// A variant default is outside its allowed values or has the wrong shape
    #[error("{package}: invalid default for variant '{variant}' ({field}): {reason}")]
    InvalidDefault {
        package: String,
        field: String,
        variant: String,
        reason: String,
    },

    /// A condition could not be parsed or refers to something undeclared
    #[error("{package}: malformed condition in {field}: {source}")]
    MalformedCondition {
        package: String,
        field: String,
        #[source]
        source: ConditionError,
    },

    /// A package or variant name is not a valid identifier
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Invalid version label or version range
    #[error("invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    /// A recipe field holds a value that cannot be declared
    #[error("{package}: invalid {field}: {reason}")]
    InvalidField {
        package: String,
        field: String,
        reason: String,
    },

    /// A candidate configuration does not fit the package it claims to be
    #[error("{package}: invalid configuration: {reason}")]
    InvalidConfiguration { package: String, reason: String },

    /// Recipe file could not be parsed
    #[error("parse error: {0}")]
    ParseError(String),

    /// Two recipes in one repository declare the same package
    #[error("duplicate package '{name}' in {first} and {second}")]
    DuplicatePackage {
        name: String,
        first: String,
        second: String,
    },

    /// Requested item does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Archive checksum problems
    #[error("checksum error: {0}")]
    Checksum(#[from] HashError),

    /// Archive content does not match its declared checksum
    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// Dependency edges of a resolved configuration form a cycle
    #[error("circular dependency detected: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),

    /// A lifecycle hook failed; the remaining phases were not run
    #[error("{package}: {phase} phase failed: {message}")]
    HookFailed {
        package: String,
        phase: String,
        message: String,
    },

    /// Settings file problems
    #[error("settings error: {0}")]
    Settings(String),

    /// Wrapped I/O error with context
    #[error("I/O error: {0}")]
    IoError(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Build a `MalformedCondition` for a package field
    pub fn malformed(
        package: impl Into<String>,
        field: impl Into<String>,
        source: ConditionError,
    ) -> Self {
        Error::MalformedCondition {
            package: package.into(),
            field: field.into(),
            source,
        }
    }
}
