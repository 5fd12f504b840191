// src/spec/variant.rs

//! Build variants: named, user-selectable build options

use crate::condition::{ConditionError, VariantMatch};
use crate::configuration::VariantValue;
use serde::Serialize;
use std::collections::BTreeSet;
use strum_macros::{Display, EnumString};

/// The shape of a variant's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VariantKind {
    /// on or off
    Boolean,
    /// exactly one of the allowed values
    Enumerated,
    /// a subset of the allowed values
    Multi,
}

/// A declared variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantDecl {
    pub name: String,
    pub kind: VariantKind,
    pub default: VariantValue,
    /// Empty for boolean variants
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl VariantDecl {
    pub fn allows(&self, value: &str) -> bool {
        match self.kind {
            VariantKind::Boolean => matches!(value, "on" | "off" | "true" | "false"),
            VariantKind::Enumerated | VariantKind::Multi => {
                self.allowed_values.iter().any(|v| v == value)
            }
        }
    }

    /// Check that `value` is a legal assignment for this variant
    pub fn check_value(&self, value: &VariantValue) -> Result<(), String> {
        match (self.kind, value) {
            (VariantKind::Boolean, VariantValue::Bool(_)) => Ok(()),
            (VariantKind::Boolean, other) => Err(format!("expected on or off, got '{}'", other)),
            (VariantKind::Enumerated, VariantValue::Single(v)) => {
                if self.allows(v) {
                    Ok(())
                } else {
                    Err(format!(
                        "'{}' is not one of {}",
                        v,
                        self.allowed_values.join(", ")
                    ))
                }
            }
            (VariantKind::Enumerated, other) => {
                Err(format!("expected a single value, got '{}'", other))
            }
            (VariantKind::Multi, VariantValue::Multi(set)) => self.check_subset(set),
            (VariantKind::Multi, VariantValue::Single(v)) => {
                self.check_subset(&BTreeSet::from([v.clone()]))
            }
            (VariantKind::Multi, VariantValue::Bool(_)) => {
                Err("expected a list of values, got a boolean".to_string())
            }
        }
    }

    fn check_subset(&self, set: &BTreeSet<String>) -> Result<(), String> {
        match set.iter().find(|v| !self.allows(v)) {
            Some(bad) => Err(format!(
                "'{}' is not one of {}",
                bad,
                self.allowed_values.join(", ")
            )),
            None => Ok(()),
        }
    }

    /// Check a condition atom that refers to this variant
    pub(crate) fn check_match(&self, matches: &VariantMatch) -> Result<(), ConditionError> {
        match matches {
            VariantMatch::Enabled | VariantMatch::Disabled => {
                if self.kind == VariantKind::Boolean {
                    Ok(())
                } else {
                    Err(ConditionError::NotBoolean(self.name.clone()))
                }
            }
            VariantMatch::Values(values) => match values.iter().find(|v| !self.allows(v)) {
                Some(bad) => Err(ConditionError::DisallowedValue {
                    variant: self.name.clone(),
                    value: bad.clone(),
                }),
                None => Ok(()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enumerated() -> VariantDecl {
        VariantDecl {
            name: "cuda".to_string(),
            kind: VariantKind::Enumerated,
            default: VariantValue::Single("none".to_string()),
            allowed_values: vec!["Volta70".into(), "Turing75".into(), "none".into()],
            description: None,
        }
    }

    #[test]
    fn test_kind_strings() {
        assert_eq!(VariantKind::Enumerated.to_string(), "enumerated");
        assert_eq!("multi".parse::<VariantKind>().unwrap(), VariantKind::Multi);
    }

    #[test]
    fn test_check_value_enumerated() {
        let v = enumerated();
        assert!(v.check_value(&VariantValue::Single("Volta70".into())).is_ok());
        assert!(v.check_value(&VariantValue::Single("Pascal60".into())).is_err());
        assert!(v.check_value(&VariantValue::Bool(true)).is_err());
    }

    #[test]
    fn test_check_value_multi() {
        let mut v = enumerated();
        v.kind = VariantKind::Multi;
        assert!(v.check_value(&VariantValue::parse("Volta70,Turing75")).is_ok());
        assert!(v.check_value(&VariantValue::parse("Volta70,Kepler30")).is_err());
        assert!(v.check_value(&VariantValue::Single("none".into())).is_ok());
    }

    #[test]
    fn test_check_match() {
        let v = enumerated();
        assert_eq!(
            v.check_match(&VariantMatch::Enabled),
            Err(ConditionError::NotBoolean("cuda".into()))
        );
        assert!(v.check_match(&VariantMatch::Values(vec!["none".into()])).is_ok());
        assert!(matches!(
            v.check_match(&VariantMatch::Values(vec!["sm_70".into()])),
            Err(ConditionError::DisallowedValue { .. })
        ));
    }
}
