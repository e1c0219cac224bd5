//! Class → declarations assembly.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::color::normalize_property_value;
use crate::selector::decode_class_selector;
use crate::stylesheet::{StyleRule, Stylesheet};
use crate::variables::{is_unresolved, resolve_value, ScopedVariables, VariableTable};

/// Custom properties with this prefix are compiler internals, never inlined
pub const RESERVED_PREFIX: &str = "--tw-";

/// Property → fully resolved value, in first-declared order
pub type StyleDeclarations = IndexMap<String, String>;

/// Class → its declarations. A class with no surviving declarations is
/// present with an empty map; a class that was not found is absent.
pub type ClassStyleMap = IndexMap<String, StyleDeclarations>;

/// Key style of emitted property names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PropertyCase {
    /// `background-color`
    #[default]
    Kebab,
    /// `backgroundColor`
    Camel,
}

/// Build the style map for every single-class rule in `sheet`
pub fn assemble(sheet: &Stylesheet, vars: &VariableTable) -> ClassStyleMap {
    let mut map = ClassStyleMap::new();

    for rule in sheet.style_rules() {
        let classes: Vec<String> = rule
            .selector_list()
            .into_iter()
            .filter_map(decode_class_selector)
            .collect();
        if classes.is_empty() {
            continue;
        }
        if is_conditional_only(rule) {
            log::debug!("Skipping {} (only nested conditional rules)", rule.selectors);
            continue;
        }

        let declarations = resolve_rule(rule, vars);
        for class in classes {
            let entry = map.entry(class).or_default();
            for (property, value) in &declarations {
                entry.insert(property.clone(), value.clone());
            }
        }
    }

    map
}

/// A rule whose styles all live in nested rules (`&:first-child { .. }`,
/// `@media print { .. }`) applies only under a condition and never inlines
fn is_conditional_only(rule: &StyleRule) -> bool {
    rule.block.declarations.is_empty() && !rule.block.rules.is_empty()
}

/// Resolve one rule's declarations against its own custom properties first,
/// then the table. Unresolvable and reserved declarations are dropped.
fn resolve_rule(rule: &StyleRule, vars: &VariableTable) -> StyleDeclarations {
    let local: IndexMap<String, String> = rule
        .block
        .declarations
        .iter()
        .filter(|d| d.is_custom_property())
        .map(|d| (d.property.clone(), d.value.clone()))
        .collect();
    let scope = ScopedVariables { local: &local, global: vars };

    let mut resolved = StyleDeclarations::new();
    for declaration in &rule.block.declarations {
        if declaration.property.starts_with(RESERVED_PREFIX) {
            continue;
        }

        let value = resolve_value(&declaration.value, &scope);
        if is_unresolved(&value) {
            log::debug!(
                "Dropping {}: {} (unresolved variable) from {}",
                declaration.property,
                declaration.value,
                rule.selectors
            );
            continue;
        }

        let value = normalize_property_value(&declaration.property, &value);
        resolved.insert(declaration.property.clone(), value);
    }

    resolved
}

/// `background-color` → `backgroundColor`, `-webkit-box` → `WebkitBox`.
/// Custom properties are returned unchanged.
pub fn to_camel_case(property: &str) -> String {
    if property.starts_with("--") {
        return property.to_string();
    }

    let mut out = String::with_capacity(property.len());
    let mut upper = false;
    for (index, ch) in property.chars().enumerate() {
        if ch == '-' {
            upper = index > 0 || property.len() > 1;
            continue;
        }
        if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Re-key declarations for the requested property case
pub fn with_case(declarations: &StyleDeclarations, case: PropertyCase) -> StyleDeclarations {
    match case {
        PropertyCase::Kebab => declarations.clone(),
        PropertyCase::Camel => declarations
            .iter()
            .map(|(property, value)| (to_camel_case(property), value.clone()))
            .collect(),
    }
}
