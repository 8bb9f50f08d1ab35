//! Package template placeholders
//!
//! Placeholders look like `###ZARF_PKG_VAR_NAME###`. They are discovered and
//! substituted over the structured YAML value of a component (mapping keys
//! and string scalars), never over serialized text.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;

use zarf_core::Component;

use crate::error::{ComposeError, Result};

/// Current package template prefix
pub const VARIABLE_PREFIX: &str = "###ZARF_PKG_VAR_";

/// Deprecated package template prefix, still honored
pub const DEPRECATED_TEMPLATE_PREFIX: &str = "###ZARF_PKG_TMPL_";

pub const TEMPLATE_SUFFIX: &str = "###";

/// Replaced by the enclosing component's name
pub const COMPONENT_NAME_PLACEHOLDER: &str = "###ZARF_COMPONENT_NAME###";

static KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z0-9_]+").expect("valid key regex"));

/// Whether a string contains a package template placeholder of either syntax
pub fn contains_placeholder(s: &str) -> bool {
    s.contains(VARIABLE_PREFIX) || s.contains(DEPRECATED_TEMPLATE_PREFIX)
}

/// Keys of every `prefix + KEY + suffix` placeholder in a component
pub fn find_placeholders(component: &Component, prefix: &str, suffix: &str) -> Result<BTreeSet<String>> {
    let value = to_value(component)?;
    Ok(find_in_value(&value, prefix, suffix))
}

/// Keys of every `prefix + KEY + suffix` placeholder in a YAML value
pub fn find_in_value(value: &Value, prefix: &str, suffix: &str) -> BTreeSet<String> {
    let pattern = format!(
        "{}({}){}",
        regex::escape(prefix),
        KEY.as_str(),
        regex::escape(suffix)
    );
    let mut keys = BTreeSet::new();
    // escaped literals around a fixed class always compile
    if let Ok(re) = Regex::new(&pattern) {
        visit_strings(value, &mut |s: &str| {
            for caps in re.captures_iter(s) {
                keys.insert(caps[1].to_string());
            }
        });
    }
    keys
}

/// Replace placeholders in a component; keys of `mappings` are full placeholders
pub fn substitute_placeholders(component: &mut Component, mappings: &IndexMap<String, String>) -> Result<()> {
    if mappings.is_empty() {
        return Ok(());
    }
    let mut value = to_value(component)?;
    substitute_in_value(&mut value, mappings);
    *component = serde_yaml::from_value(value).map_err(|source| ComposeError::Template {
        name: component.name.clone(),
        source,
    })?;
    Ok(())
}

/// Replace `###ZARF_COMPONENT_NAME###` with the component's own name
pub fn reload_component_name(component: &mut Component) -> Result<()> {
    let mut mappings = IndexMap::new();
    mappings.insert(COMPONENT_NAME_PLACEHOLDER.to_string(), component.name.clone());
    substitute_placeholders(component, &mappings)
}

/// Full placeholder -> value map for user-supplied variables under one prefix
pub fn placeholder_mappings(prefix: &str, variables: &IndexMap<String, String>) -> IndexMap<String, String> {
    variables
        .iter()
        .map(|(key, value)| (format!("{}{}{}", prefix, key, TEMPLATE_SUFFIX), value.clone()))
        .collect()
}

/// Replace placeholders in every mapping key and string scalar of a value
pub fn substitute_in_value(value: &mut Value, mappings: &IndexMap<String, String>) {
    match value {
        Value::String(s) => {
            if let Some(replaced) = replace_all(s, mappings) {
                *s = replaced;
            }
        }
        Value::Sequence(items) => {
            for item in items {
                substitute_in_value(item, mappings);
            }
        }
        Value::Mapping(map) => {
            let entries = std::mem::take(map);
            let mut rebuilt = Mapping::with_capacity(entries.len());
            for (mut key, mut val) in entries {
                substitute_in_value(&mut key, mappings);
                substitute_in_value(&mut val, mappings);
                rebuilt.insert(key, val);
            }
            *map = rebuilt;
        }
        Value::Tagged(tagged) => substitute_in_value(&mut tagged.value, mappings),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

fn replace_all(s: &str, mappings: &IndexMap<String, String>) -> Option<String> {
    if !s.contains(TEMPLATE_SUFFIX) {
        return None;
    }
    let mut out = s.to_string();
    for (placeholder, replacement) in mappings {
        if out.contains(placeholder.as_str()) {
            out = out.replace(placeholder.as_str(), replacement);
        }
    }
    (out != s).then_some(out)
}

fn visit_strings(value: &Value, f: &mut impl FnMut(&str)) {
    match value {
        Value::String(s) => f(s.as_str()),
        Value::Sequence(items) => {
            for item in items {
                visit_strings(item, f);
            }
        }
        Value::Mapping(map) => {
            for (k, v) in map {
                visit_strings(k, f);
                visit_strings(v, f);
            }
        }
        Value::Tagged(tagged) => visit_strings(&tagged.value, f),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

fn to_value(component: &Component) -> Result<Value> {
    serde_yaml::to_value(component).map_err(|source| ComposeError::Template {
        name: component.name.clone(),
        source,
    })
}
