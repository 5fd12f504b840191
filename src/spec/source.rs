// src/spec/source.rs

//! Where a package version's sources come from

use crate::hash::Checksum;
use crate::version::Version;
use serde::Serialize;
use std::fmt;

/// A git reference pinned by a version declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GitReference {
    Branch(String),
    Tag(String),
    Commit(String),
}

impl fmt::Display for GitReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitReference::Branch(b) => write!(f, "branch {}", b),
            GitReference::Tag(t) => write!(f, "tag {}", t),
            GitReference::Commit(c) => write!(f, "commit {}", c),
        }
    }
}

/// How to retrieve the sources of one version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceLocator {
    /// A release archive, content-addressed by the version's checksum
    Archive { url: String },
    /// A version-control checkout
    Git {
        url: String,
        reference: GitReference,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        submodules: bool,
    },
}

impl SourceLocator {
    pub fn archive(url: impl Into<String>) -> Self {
        SourceLocator::Archive { url: url.into() }
    }

    pub fn git_branch(url: impl Into<String>, branch: impl Into<String>) -> Self {
        SourceLocator::Git {
            url: url.into(),
            reference: GitReference::Branch(branch.into()),
            submodules: false,
        }
    }

    pub fn is_archive(&self) -> bool {
        matches!(self, SourceLocator::Archive { .. })
    }

    pub fn url(&self) -> &str {
        match self {
            SourceLocator::Archive { url } | SourceLocator::Git { url, .. } => url,
        }
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocator::Archive { url } => write!(f, "{}", url),
            SourceLocator::Git {
                url,
                reference,
                submodules,
            } => {
                write!(f, "{} ({})", url, reference)?;
                if *submodules {
                    write!(f, " with submodules")?;
                }
                Ok(())
            }
        }
    }
}

/// One retrievable version of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionDecl {
    pub version: Version,
    pub locator: SourceLocator,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity: Option<Checksum>,
    /// Chosen by default over every other declared version
    pub preferred: bool,
}

impl VersionDecl {
    pub fn label(&self) -> &str {
        self.version.as_str()
    }

    /// Mark this version as the default choice
    pub fn prefer(&mut self) -> &mut Self {
        self.preferred = true;
        self
    }
}
