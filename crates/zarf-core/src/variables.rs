//! Package variables and constants

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationErrors;
use crate::package::is_false;

/// Variable and constant names: uppercase letters, digits and underscores
pub static VARIABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9_]+$").expect("valid variable name regex"));

/// How a variable's value is rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    #[default]
    Raw,
    File,
}

/// A variable that can be set by an action or by the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub name: String,

    /// Hide the value from logs and prompts
    #[serde(default, skip_serializing_if = "is_false")]
    pub sensitive: bool,

    /// Indent multi-line values to match the template's indentation
    #[serde(default, skip_serializing_if = "is_false")]
    pub auto_indent: bool,

    /// Regex the value must match
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pattern: String,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub var_type: Option<VariableType>,
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        if !VARIABLE_NAME.is_match(&self.name) {
            errs.push(format!(
                "variable name {:?} must be all uppercase and contain no special characters except _",
                self.name
            ));
        }
        errs.into_result()
    }
}

/// A variable declared at package level that may prompt the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractiveVariable {
    #[serde(flatten)]
    pub variable: Variable,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default: String,

    /// Ask the user for a value at deploy time
    #[serde(default, skip_serializing_if = "is_false")]
    pub prompt: bool,
}

impl InteractiveVariable {
    pub fn name(&self) -> &str {
        &self.variable.name
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        self.variable.validate()
    }
}

/// A fixed value baked into the package at build time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constant {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub auto_indent: bool,

    /// Regex the value must match
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pattern: String,
}

impl Constant {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        if !VARIABLE_NAME.is_match(&self.name) {
            errs.push(format!(
                "constant name {:?} must be all uppercase and contain no special characters except _",
                self.name
            ));
        }

        if !self.pattern.is_empty() {
            match Regex::new(&self.pattern) {
                Ok(re) if !re.is_match(&self.value) => errs.push(format!(
                    "provided value for constant {:?} does not match pattern {:?}",
                    self.name, self.pattern
                )),
                Ok(_) => {}
                Err(e) => errs.push(format!(
                    "constant {:?} has an invalid pattern {:?}: {}",
                    self.name, self.pattern, e
                )),
            }
        }
        errs.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_name() {
        assert!(Variable::new("DOMAIN_NAME_2").validate().is_ok());

        let err = Variable::new("not_uppercase").validate().unwrap_err();
        assert_eq!(err.messages().len(), 1);
        assert!(err.messages()[0].contains("not_uppercase"));
    }

    #[test]
    fn test_constant_pattern() {
        let good = Constant {
            name: "GOOD".to_string(),
            value: "good_val".to_string(),
            pattern: "^good_val$".to_string(),
            ..Default::default()
        };
        assert!(good.validate().is_ok());

        let bad = Constant {
            name: "BAD".to_string(),
            value: "bad_val".to_string(),
            pattern: "^good_val$".to_string(),
            ..Default::default()
        };
        let err = bad.validate().unwrap_err();
        assert!(err.messages()[0].contains("does not match pattern"));
    }

    #[test]
    fn test_interactive_variable_flattened() {
        let yaml = r#"
name: REPLICAS
default: "3"
prompt: true
sensitive: true
type: raw
"#;
        let var: InteractiveVariable = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(var.name(), "REPLICAS");
        assert_eq!(var.default, "3");
        assert!(var.prompt);
        assert!(var.variable.sensitive);
        assert_eq!(var.variable.var_type, Some(VariableType::Raw));
    }
}
