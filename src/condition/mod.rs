// src/condition/mod.rs

//! Typed activation conditions
//!
//! Dependencies, conflicts and build steps can be made conditional on the
//! package's own resolved version, variants, compiler, or on the
//! configuration chosen for one of its dependencies. Recipes write these in
//! the compact form (`@2.5: +cuda`, `%pgi`, `^adios2@:2.3.99`); the parser
//! turns that text into a `Condition` once, at declaration time, and only
//! the tree is evaluated afterwards.

mod parser;

pub use parser::{Requirement, parse_condition, parse_condition_any, parse_requirement};

use crate::configuration::{Configuration, VariantValue};
use crate::version::VersionRange;
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// What a variant atom requires of the variant's value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VariantMatch {
    /// `+name`
    Enabled,
    /// `~name` or `-name`
    Disabled,
    /// `name=a,b`: the value is one of these (single) or contains all of them (multi)
    Values(Vec<String>),
}

/// A boolean predicate over a configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Condition {
    /// Always holds
    #[default]
    Always,
    Variant {
        name: String,
        matches: VariantMatch,
    },
    /// The configuration's version lies in the range
    Version(VersionRange),
    /// The configuration is built with this compiler, optionally in one of these ranges
    Compiler {
        name: String,
        versions: Vec<VersionRange>,
    },
    /// The named dependency was chosen and its configuration satisfies `condition`
    Dependency {
        name: String,
        condition: Box<Condition>,
    },
    /// Every child holds; empty is true
    All(Vec<Condition>),
    /// At least one child holds; empty is false
    Any(Vec<Condition>),
}

impl Condition {
    pub fn enabled(name: impl Into<String>) -> Self {
        Condition::Variant {
            name: name.into(),
            matches: VariantMatch::Enabled,
        }
    }

    pub fn disabled(name: impl Into<String>) -> Self {
        Condition::Variant {
            name: name.into(),
            matches: VariantMatch::Disabled,
        }
    }

    pub fn value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Condition::Variant {
            name: name.into(),
            matches: VariantMatch::Values(vec![value.into()]),
        }
    }

    pub fn version(range: VersionRange) -> Self {
        Condition::Version(range)
    }

    /// Conjunction, collapsing trivial cases
    pub fn all(mut children: Vec<Condition>) -> Self {
        children.retain(|c| *c != Condition::Always);
        match children.len() {
            0 => Condition::Always,
            1 => children.remove(0),
            _ => Condition::All(children),
        }
    }

    /// Alternation, collapsing the single-child case
    pub fn any(mut children: Vec<Condition>) -> Self {
        if children.len() == 1 {
            children.remove(0)
        } else {
            Condition::Any(children)
        }
    }

    pub fn is_always(&self) -> bool {
        matches!(self, Condition::Always)
    }

    /// Decide whether the condition holds for `config`
    ///
    /// Missing variants and dependencies make their atoms false. This never
    /// fails and has no side effects.
    pub fn evaluate(&self, config: &Configuration) -> bool {
        match self {
            Condition::Always => true,
            Condition::Variant { name, matches } => match config.variant(name) {
                Some(value) => variant_matches(value, matches),
                None => false,
            },
            Condition::Version(range) => range.contains(&config.version),
            Condition::Compiler { name, versions } => {
                config.compiler.as_ref().is_some_and(|compiler| {
                    compiler.name == *name
                        && (versions.is_empty()
                            || compiler
                                .version
                                .as_ref()
                                .is_some_and(|v| versions.iter().any(|r| r.contains(v))))
                })
            }
            Condition::Dependency { name, condition } => config
                .dependency(name)
                .is_some_and(|dep| condition.evaluate(dep)),
            Condition::All(children) => children.iter().all(|c| c.evaluate(config)),
            Condition::Any(children) => children.iter().any(|c| c.evaluate(config)),
        }
    }

    /// Variant atoms that refer to the package itself (not inside `^dep` predicates)
    pub fn own_variant_atoms(&self) -> Vec<(&str, &VariantMatch)> {
        let mut out = Vec::new();
        self.collect_own_variants(&mut out);
        out
    }

    fn collect_own_variants<'a>(&'a self, out: &mut Vec<(&'a str, &'a VariantMatch)>) {
        match self {
            Condition::Variant { name, matches } => out.push((name.as_str(), matches)),
            Condition::All(children) | Condition::Any(children) => {
                for child in children {
                    child.collect_own_variants(out);
                }
            }
            Condition::Always
            | Condition::Version(_)
            | Condition::Compiler { .. }
            | Condition::Dependency { .. } => {}
        }
    }
}

fn variant_matches(value: &VariantValue, matches: &VariantMatch) -> bool {
    match (matches, value) {
        (VariantMatch::Enabled, VariantValue::Bool(b)) => *b,
        (VariantMatch::Disabled, VariantValue::Bool(b)) => !*b,
        // `+x` / `~x` on a non-boolean variant never matches
        (VariantMatch::Enabled | VariantMatch::Disabled, _) => false,
        (VariantMatch::Values(wanted), VariantValue::Multi(set)) => {
            wanted.iter().all(|w| set.contains(w))
        }
        (VariantMatch::Values(wanted), value) => wanted.iter().any(|w| value.includes(w)),
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Always => write!(f, "always"),
            Condition::Variant { name, matches } => match matches {
                VariantMatch::Enabled => write!(f, "+{}", name),
                VariantMatch::Disabled => write!(f, "~{}", name),
                VariantMatch::Values(values) => write!(f, "{}={}", name, values.join(",")),
            },
            Condition::Version(range) => write!(f, "@{}", range),
            Condition::Compiler { name, versions } => {
                write!(f, "%{}", name)?;
                if !versions.is_empty() {
                    let list: Vec<String> = versions.iter().map(ToString::to_string).collect();
                    write!(f, "@{}", list.join(","))?;
                }
                Ok(())
            }
            Condition::Dependency { name, condition } => {
                write!(f, "^{}", name)?;
                match condition.as_ref() {
                    Condition::Always => Ok(()),
                    Condition::Version(range) => write!(f, "@{}", range),
                    inner => write!(f, " {}", inner),
                }
            }
            Condition::All(children) => {
                let parts: Vec<String> = children
                    .iter()
                    .map(|c| match c {
                        Condition::Any(_) => format!("({})", c),
                        _ => c.to_string(),
                    })
                    .collect();
                write!(f, "{}", parts.join(" "))
            }
            Condition::Any(children) => {
                let parts: Vec<String> = children.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(" | "))
            }
        }
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Problems found while reading or checking a condition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    #[error("empty condition")]
    Empty,

    #[error("expected a name after '{0}'")]
    MissingName(char),

    #[error("unexpected '{token}' at offset {offset}")]
    UnexpectedToken { token: String, offset: usize },

    #[error("bad version '{input}': {reason}")]
    BadVersion { input: String, reason: String },

    #[error("unknown variant '{0}'")]
    UnknownVariant(String),

    #[error("variant '{variant}' does not allow value '{value}'")]
    DisallowedValue { variant: String, value: String },

    #[error("variant '{0}' is not boolean")]
    NotBoolean(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::Compiler;
    use crate::version::Version;

    fn config(version: &str) -> Configuration {
        Configuration::new("xgc-devel", Version::parse(version).unwrap())
    }

    fn range(s: &str) -> VersionRange {
        VersionRange::parse(s).unwrap()
    }

    // === Atoms ===

    #[test]
    fn test_variant_enabled_and_disabled() {
        let on = config("master").with_variant("cuda", VariantValue::Bool(true));
        let off = config("master").with_variant("cuda", VariantValue::Bool(false));

        assert!(Condition::enabled("cuda").evaluate(&on));
        assert!(!Condition::enabled("cuda").evaluate(&off));
        assert!(Condition::disabled("cuda").evaluate(&off));
        assert!(!Condition::disabled("cuda").evaluate(&on));
    }

    #[test]
    fn test_missing_variant_is_false() {
        let c = config("master");
        assert!(!Condition::enabled("cuda").evaluate(&c));
        assert!(!Condition::disabled("cuda").evaluate(&c));
        assert!(!Condition::value("cuda", "none").evaluate(&c));
    }

    #[test]
    fn test_variant_value_single_and_multi() {
        let single = config("1.0").with_variant("cuda", VariantValue::Single("Volta70".into()));
        assert!(Condition::value("cuda", "Volta70").evaluate(&single));
        assert!(!Condition::value("cuda", "none").evaluate(&single));

        let multi = config("1.0").with_variant("arch", VariantValue::parse("70,80"));
        assert!(Condition::value("arch", "70").evaluate(&multi));
        let both = Condition::Variant {
            name: "arch".into(),
            matches: VariantMatch::Values(vec!["70".into(), "60".into()]),
        };
        assert!(!both.evaluate(&multi));
    }

    #[test]
    fn test_version_atom() {
        let cond = Condition::version(range("2.5.00:2.7.00"));
        assert!(cond.evaluate(&config("2.6.0")));
        assert!(!cond.evaluate(&config("2.7.24")));
    }

    #[test]
    fn test_compiler_atom() {
        let pgi = config("1.0").with_compiler(Compiler::parse("pgi@19.4").unwrap());
        let gcc = config("1.0").with_compiler(Compiler::parse("gcc").unwrap());
        let none = config("1.0");

        let any_pgi = Condition::Compiler {
            name: "pgi".into(),
            versions: vec![],
        };
        assert!(any_pgi.evaluate(&pgi));
        assert!(!any_pgi.evaluate(&gcc));
        assert!(!any_pgi.evaluate(&none));

        let old_pgi = Condition::Compiler {
            name: "pgi".into(),
            versions: vec![range(":18")],
        };
        assert!(!old_pgi.evaluate(&pgi));
    }

    #[test]
    fn test_dependency_atom() {
        let adios = Configuration::new("adios2", Version::parse("2.4.0").unwrap());
        let c = config("1.0").with_dependency(adios);

        let old_adios = Condition::Dependency {
            name: "adios2".into(),
            condition: Box::new(Condition::version(range(":2.3.99"))),
        };
        let new_adios = Condition::Dependency {
            name: "adios2".into(),
            condition: Box::new(Condition::version(range("2.4.0:"))),
        };
        assert!(!old_adios.evaluate(&c));
        assert!(new_adios.evaluate(&c));
        assert!(!new_adios.evaluate(&config("1.0")));
    }

    // === Combinators ===

    #[test]
    fn test_conjunction_truth_table() {
        let a = Condition::enabled("openacc");
        let b = Condition::value("cuda", "none");
        let both = Condition::all(vec![a.clone(), b.clone()]);

        for openacc in [true, false] {
            for cuda in ["none", "Volta70"] {
                let c = config("1.0")
                    .with_variant("openacc", VariantValue::Bool(openacc))
                    .with_variant("cuda", VariantValue::Single(cuda.into()));
                assert_eq!(both.evaluate(&c), a.evaluate(&c) && b.evaluate(&c));
            }
        }
    }

    #[test]
    fn test_alternation_truth_table() {
        let a = Condition::version(range("gabriele"));
        let b = Condition::version(range("gitlab"));
        let either = Condition::any(vec![a.clone(), b.clone()]);

        for version in ["gabriele", "gitlab", "suchyta"] {
            let c = config(version);
            assert_eq!(either.evaluate(&c), a.evaluate(&c) || b.evaluate(&c));
        }
        assert!(either.evaluate(&config("gitlab")));
        assert!(!either.evaluate(&config("suchyta")));
    }

    #[test]
    fn test_empty_combinators() {
        let c = config("1.0");
        assert!(Condition::All(vec![]).evaluate(&c));
        assert!(!Condition::Any(vec![]).evaluate(&c));
        assert_eq!(Condition::all(vec![]), Condition::Always);
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let cond = Condition::all(vec![
            Condition::enabled("cuda"),
            Condition::version(range(":2.0")),
        ]);
        let c = config("1.5").with_variant("cuda", VariantValue::Bool(true));
        let first = cond.evaluate(&c);
        for _ in 0..100 {
            assert_eq!(cond.evaluate(&c), first);
        }
    }

    // === Helpers ===

    #[test]
    fn test_own_variant_atoms_skip_dependencies() {
        let cond = Condition::all(vec![
            Condition::enabled("cuda"),
            Condition::Dependency {
                name: "kokkos".into(),
                condition: Box::new(Condition::enabled("openmp")),
            },
        ]);
        let atoms = cond.own_variant_atoms();
        assert_eq!(atoms.len(), 1);
        assert_eq!(atoms[0].0, "cuda");
    }

    #[test]
    fn test_display() {
        let cond = Condition::all(vec![
            Condition::version(range("2.5:")),
            Condition::enabled("cuda"),
            Condition::disabled("openmp"),
            Condition::Dependency {
                name: "adios2".into(),
                condition: Box::new(Condition::version(range(":2.3.99"))),
            },
        ]);
        assert_eq!(cond.to_string(), "@2.5: +cuda ~openmp ^adios2@:2.3.99");
    }
}
