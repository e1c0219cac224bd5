//! Custom property extraction and `var()` substitution.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::stylesheet::{matching_paren, Stylesheet};

/// Upper bound on substitution passes; guarantees termination on cycles
pub const MAX_SUBSTITUTION_PASSES: usize = 16;

/// Self-referencing values can double in size each pass; stop growing past this
const MAX_VALUE_LEN: usize = 64 * 1024;

/// `calc(<number><unit> * <number>)`, the only calc() shape evaluated
static CALC_MULTIPLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"calc\(\s*(-?(?:\d+\.?\d*|\.\d+))(rem|px|em|%)\s*\*\s*(-?(?:\d+\.?\d*|\.\d+))\s*\)")
        .expect("calc pattern is valid")
});

/// Anything that can answer "what is the raw value of `--name`"
pub trait VariableLookup {
    fn lookup(&self, name: &str) -> Option<&str>;
}

/// Custom property name → raw value. The first writer for a name wins; later
/// inserts and merges never overwrite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableTable {
    entries: IndexMap<String, String>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the name is already present. Returns whether it was added.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return false;
        }
        self.entries.insert(name, value.into());
        true
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Add every entry of `other` whose name is not present yet
    pub fn merge(&mut self, other: &VariableTable) {
        for (name, value) in &other.entries {
            self.insert(name.clone(), value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Collect theme-level custom properties from compiled CSS.
    ///
    /// Sources, in priority order: `:root`/`:host` rules, `@theme` blocks,
    /// then `@property` initial values.
    pub fn extract(sheet: &Stylesheet) -> Self {
        let mut table = Self::new();

        for rule in sheet.style_rules() {
            let is_root = rule
                .selector_list()
                .iter()
                .any(|selector| matches!(*selector, ":root" | ":host"));
            if !is_root {
                continue;
            }
            for declaration in rule.block.declarations.iter().filter(|d| d.is_custom_property()) {
                table.insert(declaration.property.clone(), declaration.value.clone());
            }
        }

        for theme in sheet.at_rules("theme") {
            if let Some(block) = &theme.block {
                for declaration in block.declarations.iter().filter(|d| d.is_custom_property()) {
                    table.insert(declaration.property.clone(), declaration.value.clone());
                }
            }
        }

        for property in sheet.at_rules("property") {
            let name = property.prelude.trim();
            if !name.starts_with("--") {
                continue;
            }
            let initial = property
                .block
                .as_ref()
                .and_then(|block| block.declarations.iter().find(|d| d.property == "initial-value"));
            if let Some(initial) = initial {
                table.insert(name.to_string(), initial.value.clone());
            }
        }

        table
    }

    /// Parse `css` and extract its variables
    pub fn from_css(css: &str) -> Self {
        Self::extract(&Stylesheet::parse(css))
    }
}

impl VariableLookup for VariableTable {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name)
    }
}

/// Rule-local custom properties layered over a table
pub struct ScopedVariables<'a> {
    pub local: &'a IndexMap<String, String>,
    pub global: &'a VariableTable,
}

impl VariableLookup for ScopedVariables<'_> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.local
            .get(name)
            .map(String::as_str)
            .or_else(|| self.global.get(name))
    }
}

/// Whether a value still references a variable after resolution
pub fn is_unresolved(value: &str) -> bool {
    value.contains("var(")
}

/// Substitute every `var()` in `value`, following chains up to
/// [`MAX_SUBSTITUTION_PASSES`], then evaluate `calc(<length> * N)`.
///
/// Unknown variables without a fallback are left in place, so callers can
/// detect them with [`is_unresolved`]. On cyclic input the partially
/// substituted string is returned.
pub fn resolve_value(value: &str, vars: &impl VariableLookup) -> String {
    let mut current = value.to_string();

    for _ in 0..MAX_SUBSTITUTION_PASSES {
        if !current.contains("var(") {
            break;
        }
        let (next, changed) = substitute_pass(&current, vars);
        current = next;
        if !changed || current.len() > MAX_VALUE_LEN {
            break;
        }
    }

    evaluate_calc(&current)
}

/// One left-to-right pass replacing each outermost `var()` once
fn substitute_pass(value: &str, vars: &impl VariableLookup) -> (String, bool) {
    let mut out = String::with_capacity(value.len());
    let mut cursor = 0;
    let mut changed = false;

    while let Some(found) = value[cursor..].find("var(") {
        let start = cursor + found;
        let open = start + "var".len();

        // `somevar(` is a different function
        let preceded_by_ident = value[..start]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || c == '-' || c == '_');
        if preceded_by_ident {
            out.push_str(&value[cursor..=open]);
            cursor = open + 1;
            continue;
        }

        let Some(close) = matching_paren(value, open) else {
            break;
        };
        out.push_str(&value[cursor..start]);

        let inner = &value[open + 1..close];
        let (name, fallback) = match first_top_level_comma(inner) {
            Some(comma) => (inner[..comma].trim(), Some(inner[comma + 1..].trim())),
            None => (inner.trim(), None),
        };

        match vars.lookup(name).or(fallback) {
            Some(replacement) => {
                out.push_str(replacement);
                changed = true;
            }
            None => out.push_str(&value[start..=close]),
        }
        cursor = close + 1;
    }

    out.push_str(&value[cursor..]);
    (out, changed)
}

fn first_top_level_comma(text: &str) -> Option<usize> {
    let mut depth = 0i32;
    for (index, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => return Some(index),
            _ => {}
        }
    }
    None
}

/// Evaluate `calc(<number><unit> * <number>)` occurrences; every other calc()
/// is left as literal text
pub fn evaluate_calc(value: &str) -> String {
    if !value.contains("calc(") {
        return value.to_string();
    }

    CALC_MULTIPLY
        .replace_all(value, |caps: &regex::Captures| {
            let base: f64 = caps[1].parse().unwrap_or(0.0);
            let factor: f64 = caps[3].parse().unwrap_or(0.0);
            format!("{}{}", format_number(base * factor), &caps[2])
        })
        .into_owned()
}

/// Format without float noise: at most four decimals, no trailing zeros
pub(crate) fn format_number(number: f64) -> String {
    let formatted = format!("{:.4}", number);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}
