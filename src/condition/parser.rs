// src/condition/parser.rs

//! Parser for the compact condition syntax used in recipes
//!
//! Grammar (whitespace separates atoms, adjacent atoms are conjoined):
//!
//! ```text
//! condition  := [name] atom* ('^' name atom*)*
//! atom       := '+' variant | ('~' | '-') variant | variant '=' values
//!             | '@' versions | '%' compiler ['@' versions]
//! versions   := range (',' range)*        alternation
//! ```
//!
//! A leading bare name equal to the package being declared is dropped; any
//! other leading name starts a dependency predicate, as `^` does.

use super::{Condition, ConditionError, VariantMatch};
use crate::version::{VersionRange, parse_version_list};

/// A dependency target with the version ranges and predicates it must satisfy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub target: String,
    pub versions: Vec<VersionRange>,
    pub predicates: Vec<Condition>,
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.src[start..self.pos]
    }

    /// Peek past whitespace without consuming it
    fn next_significant(&self) -> Option<char> {
        self.src[self.pos..].chars().find(|c| !c.is_whitespace())
    }

    fn unexpected(&self) -> ConditionError {
        ConditionError::UnexpectedToken {
            token: self.peek().map(String::from).unwrap_or_default(),
            offset: self.pos,
        }
    }
}

/// Package, variant and compiler names
fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_')
}

fn is_version_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '+' | '~' | '%' | '^')
}

/// Parse a condition written for package `package`
///
/// # Examples
///
/// - `"+cuda"` → cuda enabled
/// - `"@2.5.00:2.7.00 +cuda"` → version in range and cuda enabled
/// - `"xgc-devel@gabriele,gitlab"` (for `xgc-devel`) → version gabriele or gitlab
/// - `"^adios2@:2.3.99"` → dependency adios2 at or below 2.3.99
pub fn parse_condition(package: &str, input: &str) -> Result<Condition, ConditionError> {
    let mut scanner = Scanner::new(input);
    scanner.skip_whitespace();
    if scanner.peek().is_none() {
        return Err(ConditionError::Empty);
    }

    let mut own = Vec::new();
    let mut dependencies = Vec::new();

    if let Some(name) = leading_name(&mut scanner) {
        let atoms = parse_atoms(&mut scanner)?;
        if name == package {
            own.extend(atoms);
        } else {
            dependencies.push(dependency(name, atoms));
        }
    } else {
        own.extend(parse_atoms(&mut scanner)?);
    }

    while scanner.peek() == Some('^') {
        scanner.bump();
        let name = scanner.take_while(is_name_char);
        if name.is_empty() {
            return Err(ConditionError::MissingName('^'));
        }
        let atoms = parse_atoms(&mut scanner)?;
        dependencies.push(dependency(name, atoms));
    }

    own.extend(dependencies);
    Ok(Condition::all(own))
}

/// Parse several alternative conditions; the result holds if any of them does
pub fn parse_condition_any<S: AsRef<str>>(
    package: &str,
    inputs: &[S],
) -> Result<Condition, ConditionError> {
    if inputs.is_empty() {
        return Err(ConditionError::Empty);
    }

    let alternatives = inputs
        .iter()
        .map(|s| parse_condition(package, s.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Condition::any(alternatives))
}

/// Parse a dependency requirement such as `"hdf5@1.8: +mpi +fortran"`
pub fn parse_requirement(input: &str) -> Result<Requirement, ConditionError> {
    let mut scanner = Scanner::new(input);
    scanner.skip_whitespace();
    if scanner.peek().is_none() {
        return Err(ConditionError::Empty);
    }

    let target = scanner.take_while(is_name_char);
    if target.is_empty() {
        return Err(scanner.unexpected());
    }

    let mut versions = Vec::new();
    let mut predicates = Vec::new();

    while !matches!(scanner.next_significant(), None | Some('^')) {
        scanner.skip_whitespace();
        let offset = scanner.pos;
        match parse_atom(&mut scanner)? {
            Condition::Version(range) if versions.is_empty() => versions.push(range),
            Condition::Any(alternatives)
                if versions.is_empty()
                    && alternatives.iter().all(|a| matches!(a, Condition::Version(_))) =>
            {
                versions.extend(alternatives.into_iter().filter_map(|a| match a {
                    Condition::Version(range) => Some(range),
                    _ => None,
                }));
            }
            Condition::Version(_) | Condition::Any(_) => {
                return Err(ConditionError::UnexpectedToken {
                    token: "@".to_string(),
                    offset,
                });
            }
            other => predicates.push(other),
        }
    }
    scanner.skip_whitespace();

    if scanner.peek().is_some() {
        return Err(scanner.unexpected());
    }

    Ok(Requirement {
        target: target.to_string(),
        versions,
        predicates,
    })
}

fn dependency(name: &str, atoms: Vec<Condition>) -> Condition {
    Condition::Dependency {
        name: name.to_string(),
        condition: Box::new(Condition::all(atoms)),
    }
}

/// Consume a leading bare package name, unless it is really `key=value`
fn leading_name<'a>(scanner: &mut Scanner<'a>) -> Option<&'a str> {
    if !scanner.peek().is_some_and(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    let start = scanner.pos;
    let name = scanner.take_while(is_name_char);
    if scanner.peek() == Some('=') {
        scanner.pos = start;
        return None;
    }
    Some(name)
}

/// Parse atoms up to the end of input or the next `^`
fn parse_atoms(scanner: &mut Scanner<'_>) -> Result<Vec<Condition>, ConditionError> {
    let mut atoms = Vec::new();
    loop {
        match scanner.next_significant() {
            None | Some('^') => {
                scanner.skip_whitespace();
                return Ok(atoms);
            }
            Some(_) => {
                scanner.skip_whitespace();
                atoms.push(parse_atom(scanner)?);
            }
        }
    }
}

fn parse_atom(scanner: &mut Scanner<'_>) -> Result<Condition, ConditionError> {
    match scanner.peek() {
        Some(sigil @ ('+' | '~' | '-')) => {
            scanner.bump();
            let name = scanner.take_while(is_name_char);
            if name.is_empty() {
                return Err(ConditionError::MissingName(sigil));
            }
            Ok(if sigil == '+' {
                Condition::enabled(name)
            } else {
                Condition::disabled(name)
            })
        }
        Some('@') => {
            scanner.bump();
            let ranges = parse_versions(scanner)?;
            Ok(Condition::any(
                ranges.into_iter().map(Condition::Version).collect(),
            ))
        }
        Some('%') => {
            scanner.bump();
            let name = scanner.take_while(is_name_char);
            if name.is_empty() {
                return Err(ConditionError::MissingName('%'));
            }
            let versions = if scanner.peek() == Some('@') {
                scanner.bump();
                parse_versions(scanner)?
            } else {
                Vec::new()
            };
            Ok(Condition::Compiler {
                name: name.to_string(),
                versions,
            })
        }
        Some(c) if c.is_ascii_alphanumeric() => {
            let name = scanner.take_while(is_name_char);
            if scanner.peek() != Some('=') {
                return Err(scanner.unexpected());
            }
            scanner.bump();
            let raw = scanner.take_while(|c| !c.is_whitespace() && !matches!(c, '^' | '%'));
            let values: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .collect();
            if values.is_empty() {
                return Err(ConditionError::MissingName('='));
            }
            Ok(Condition::Variant {
                name: name.to_string(),
                matches: VariantMatch::Values(values),
            })
        }
        _ => Err(scanner.unexpected()),
    }
}

fn parse_versions(scanner: &mut Scanner<'_>) -> Result<Vec<VersionRange>, ConditionError> {
    let text = scanner.take_while(is_version_char);
    let ranges = parse_version_list(text).map_err(|e| ConditionError::BadVersion {
        input: text.to_string(),
        reason: e.to_string(),
    })?;
    if ranges.is_empty() {
        return Err(ConditionError::BadVersion {
            input: text.to_string(),
            reason: "no version given".to_string(),
        });
    }
    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::{Compiler, Configuration, VariantValue};
    use crate::version::Version;

    fn cfg(name: &str, version: &str) -> Configuration {
        Configuration::new(name, Version::parse(version).unwrap())
    }

    fn range(s: &str) -> VersionRange {
        VersionRange::parse(s).unwrap()
    }

    // === Atoms ===

    #[test]
    fn test_parse_variant_sigils() {
        assert_eq!(parse_condition("p", "+cuda").unwrap(), Condition::enabled("cuda"));
        assert_eq!(parse_condition("p", "~cuda").unwrap(), Condition::disabled("cuda"));
        assert_eq!(parse_condition("p", "-cuda").unwrap(), Condition::disabled("cuda"));
        assert_eq!(
            parse_condition("p", "cuda=Volta70").unwrap(),
            Condition::value("cuda", "Volta70")
        );
    }

    #[test]
    fn test_parse_adjacent_atoms_without_spaces() {
        let cond = parse_condition("kokkos-cmake", "+cuda~openmp").unwrap();
        assert_eq!(
            cond,
            Condition::All(vec![Condition::enabled("cuda"), Condition::disabled("openmp")])
        );
    }

    #[test]
    fn test_parse_hyphenated_variant_names() {
        assert_eq!(
            parse_condition("kittie", "+fine-time").unwrap(),
            Condition::enabled("fine-time")
        );
        assert_eq!(
            parse_condition("kittie", "~python-prefix").unwrap(),
            Condition::disabled("python-prefix")
        );
    }

    #[test]
    fn test_parse_version_atoms() {
        assert_eq!(
            parse_condition("p", "@2.5.00:2.7.00").unwrap(),
            Condition::Version(range("2.5.00:2.7.00"))
        );
        assert_eq!(
            parse_condition("p", "@:2.0.99").unwrap(),
            Condition::Version(range(":2.0.99"))
        );
        assert_eq!(
            parse_condition("p", "@0.1.0-rc0").unwrap(),
            Condition::Version(range("0.1.0-rc0"))
        );
    }

    #[test]
    fn test_parse_version_list_is_alternation() {
        let cond = parse_condition("gene-all", "@gabriele,gitlab").unwrap();
        assert_eq!(
            cond,
            Condition::Any(vec![
                Condition::Version(range("gabriele")),
                Condition::Version(range("gitlab")),
            ])
        );
        assert!(cond.evaluate(&cfg("gene-all", "gitlab")));
        assert!(!cond.evaluate(&cfg("gene-all", "master")));
    }

    #[test]
    fn test_parse_compiler() {
        assert_eq!(
            parse_condition("p", "%pgi").unwrap(),
            Condition::Compiler {
                name: "pgi".into(),
                versions: vec![]
            }
        );
        let cond = parse_condition("p", "%gcc@8:").unwrap();
        let c = cfg("p", "1.0").with_compiler(Compiler::parse("gcc@9.2.0").unwrap());
        assert!(cond.evaluate(&c));
    }

    // === Package names ===

    #[test]
    fn test_parse_own_name_is_ignored() {
        let cond = parse_condition("xgc-devel", "xgc-devel@gabriele +effis").unwrap();
        assert_eq!(
            cond,
            Condition::All(vec![
                Condition::Version(range("gabriele")),
                Condition::enabled("effis"),
            ])
        );
    }

    #[test]
    fn test_parse_other_leading_name_is_dependency() {
        let cond = parse_condition("kittie", "effis@kittie").unwrap();
        assert_eq!(
            cond,
            Condition::Dependency {
                name: "effis".into(),
                condition: Box::new(Condition::Version(range("kittie"))),
            }
        );
    }

    #[test]
    fn test_parse_caret_dependency() {
        let cond = parse_condition("xgc-devel", "+adios2 ^adios2@:2.3.99").unwrap();
        let with_old = cfg("xgc-devel", "master")
            .with_variant("adios2", VariantValue::Bool(true))
            .with_dependency(cfg("adios2", "2.3.1"));
        let with_new = cfg("xgc-devel", "master")
            .with_variant("adios2", VariantValue::Bool(true))
            .with_dependency(cfg("adios2", "2.5.0"));
        assert!(cond.evaluate(&with_old));
        assert!(!cond.evaluate(&with_new));
    }

    #[test]
    fn test_parse_caret_atoms_bind_to_dependency() {
        let cond = parse_condition("p", "^kokkos +cuda ^cabana").unwrap();
        assert_eq!(
            cond,
            Condition::All(vec![
                Condition::Dependency {
                    name: "kokkos".into(),
                    condition: Box::new(Condition::enabled("cuda")),
                },
                Condition::Dependency {
                    name: "cabana".into(),
                    condition: Box::new(Condition::Always),
                },
            ])
        );
    }

    #[test]
    fn test_parse_leading_key_value_is_not_a_name() {
        assert_eq!(
            parse_condition("p", "cuda_arch=70").unwrap(),
            Condition::value("cuda_arch", "70")
        );
    }

    #[test]
    fn test_parse_any_of_strings() {
        let cond = parse_condition_any("p", &["+cuda", "+openacc"]).unwrap();
        let only_acc = cfg("p", "1.0")
            .with_variant("cuda", VariantValue::Bool(false))
            .with_variant("openacc", VariantValue::Bool(true));
        assert!(cond.evaluate(&only_acc));
        assert!(parse_condition_any::<&str>("p", &[]).is_err());
    }

    // === Errors ===

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_condition("p", "   "), Err(ConditionError::Empty));
        assert_eq!(parse_condition("p", "+"), Err(ConditionError::MissingName('+')));
        assert_eq!(parse_condition("p", "^"), Err(ConditionError::MissingName('^')));
        assert_eq!(parse_condition("p", "%@1.0"), Err(ConditionError::MissingName('%')));
        assert!(matches!(
            parse_condition("p", "@"),
            Err(ConditionError::BadVersion { .. })
        ));
        assert!(matches!(
            parse_condition("p", "@3.0:2.0"),
            Err(ConditionError::BadVersion { .. })
        ));
        assert!(matches!(
            parse_condition("p", "+cuda stray"),
            Err(ConditionError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            parse_condition("p", "+cuda (x)"),
            Err(ConditionError::UnexpectedToken { .. })
        ));
        assert_eq!(parse_condition("p", "cuda="), Err(ConditionError::MissingName('=')));
    }

    // === Requirements ===

    #[test]
    fn test_parse_requirement() {
        let req = parse_requirement("hdf5@1.8: +mpi +fortran").unwrap();
        assert_eq!(req.target, "hdf5");
        assert_eq!(req.versions, vec![range("1.8:")]);
        assert_eq!(
            req.predicates,
            vec![Condition::enabled("mpi"), Condition::enabled("fortran")]
        );
    }

    #[test]
    fn test_parse_requirement_plain_and_list() {
        let req = parse_requirement("mpi").unwrap();
        assert_eq!(req.target, "mpi");
        assert!(req.versions.is_empty());
        assert!(req.predicates.is_empty());

        let req = parse_requirement("adios2@2.4.0,2.5.0 cuda_arch=70").unwrap();
        assert_eq!(req.versions.len(), 2);
        assert_eq!(req.predicates, vec![Condition::value("cuda_arch", "70")]);
    }

    #[test]
    fn test_parse_requirement_errors() {
        assert_eq!(parse_requirement(""), Err(ConditionError::Empty));
        assert!(parse_requirement("+cuda").is_err());
        assert!(parse_requirement("hdf5@1.8 @1.10").is_err());
        assert!(parse_requirement("hdf5 ^zlib").is_err());
    }

    #[test]
    fn test_repeated_version_reports_position() {
        assert_eq!(
            parse_requirement("hdf5@1.8 @1.10"),
            Err(ConditionError::UnexpectedToken {
                token: "@".to_string(),
                offset: 9,
            })
        );
        assert_eq!(
            parse_requirement("pfunit@3.3: +mpi @4:"),
            Err(ConditionError::UnexpectedToken {
                token: "@".to_string(),
                offset: 17,
            })
        );
    }
}
