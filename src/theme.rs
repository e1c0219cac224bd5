use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::color::normalize_color;
use crate::variables::{is_unresolved, resolve_value, VariableTable};

/// Shade steps of a color ramp
pub const SHADES: [u16; 11] = [50, 100, 200, 300, 400, 500, 600, 700, 800, 900, 950];

/// Semantic key whose base color drives the text/background/border variables
pub const NEUTRAL_KEY: &str = "neutral";

/// Fixed semantic variables as (name, neutral shade or `None` for white)
const SEMANTIC_SURFACES: &[(&str, Option<u16>)] = &[
    ("--ui-text-dimmed", Some(400)),
    ("--ui-text-muted", Some(500)),
    ("--ui-text-toned", Some(600)),
    ("--ui-text", Some(700)),
    ("--ui-text-highlighted", Some(900)),
    ("--ui-text-inverted", None),
    ("--ui-bg", None),
    ("--ui-bg-muted", Some(50)),
    ("--ui-bg-elevated", Some(100)),
    ("--ui-bg-accented", Some(200)),
    ("--ui-bg-inverted", Some(900)),
    ("--ui-border", Some(200)),
    ("--ui-border-muted", Some(200)),
    ("--ui-border-accented", Some(300)),
    ("--ui-border-inverted", Some(900)),
];

/// Synthesize variables for a semantic → base color map such as
/// `{primary: "indigo"}`: a full `--color-primary-*` ramp aliasing the base
/// ramp, `--ui-primary`, and the fixed text/background/border set derived
/// from the neutral color.
pub fn expand_theme_overrides(overrides: &IndexMap<String, String>) -> VariableTable {
    let mut table = VariableTable::new();

    for (semantic, base) in overrides {
        let (semantic, base) = (semantic.trim(), base.trim());
        if semantic.is_empty() || base.is_empty() || semantic == base {
            continue;
        }
        for shade in SHADES {
            table.insert(
                format!("--color-{}-{}", semantic, shade),
                format!("var(--color-{}-{})", base, shade),
            );
        }
        table.insert(format!("--ui-{}", semantic), format!("var(--color-{}-500)", base));
    }

    let neutral = overrides
        .get(NEUTRAL_KEY)
        .map(|base| base.trim())
        .filter(|base| !base.is_empty())
        .unwrap_or(NEUTRAL_KEY);
    for (name, shade) in SEMANTIC_SURFACES {
        let value = match shade {
            Some(shade) => format!("var(--color-{}-{})", neutral, shade),
            None => "var(--color-white)".to_string(),
        };
        table.insert(*name, value);
    }

    table
}

/// One `--color-*` family: either a single color or a shade ramp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorEntry {
    Single(String),
    Scale(IndexMap<String, String>),
}

/// Theme facts derived from custom property naming conventions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeMetadata {
    /// `--font-<name>` → resolved font stack (weights excluded)
    pub font_vars: IndexMap<String, String>,

    /// `--breakpoint-<name>` → width in px
    pub breakpoints: IndexMap<String, f64>,

    /// `--color-<name>[-<shade>]` → hex
    pub colors: IndexMap<String, ColorEntry>,
}

impl ThemeMetadata {
    pub fn from_variables(vars: &VariableTable) -> Self {
        let mut metadata = Self::default();

        for (name, raw) in vars.iter() {
            let value = resolve_value(raw, vars);
            if is_unresolved(&value) {
                continue;
            }

            if let Some(font) = name.strip_prefix("--font-") {
                if !font.starts_with("weight-") && !font.is_empty() {
                    metadata.font_vars.insert(font.to_string(), value);
                }
            } else if let Some(breakpoint) = name.strip_prefix("--breakpoint-") {
                if let Some(px) = length_to_px(&value) {
                    metadata.breakpoints.insert(breakpoint.to_string(), px);
                }
            } else if let Some(color) = name.strip_prefix("--color-") {
                let hex = normalize_color(&value);
                if hex.starts_with('#') {
                    metadata.add_color(color, hex);
                }
            }
        }

        metadata
    }

    fn add_color(&mut self, name: &str, hex: String) {
        let split = name
            .rsplit_once('-')
            .filter(|(_, shade)| !shade.is_empty() && shade.bytes().all(|b| b.is_ascii_digit()));

        let Some((family, shade)) = split else {
            match self.colors.get_mut(name) {
                Some(ColorEntry::Scale(scale)) => {
                    scale.entry("DEFAULT".to_string()).or_insert(hex);
                }
                Some(ColorEntry::Single(_)) => {}
                None => {
                    self.colors.insert(name.to_string(), ColorEntry::Single(hex));
                }
            }
            return;
        };

        let entry = self
            .colors
            .entry(family.to_string())
            .or_insert_with(|| ColorEntry::Scale(IndexMap::new()));
        if let ColorEntry::Single(single) = entry {
            let mut scale = IndexMap::new();
            scale.insert("DEFAULT".to_string(), std::mem::take(single));
            *entry = ColorEntry::Scale(scale);
        }
        if let ColorEntry::Scale(scale) = entry {
            scale.entry(shade.to_string()).or_insert(hex);
        }
    }
}

/// `40rem` → 640, `768px` → 768, `48em` → 768
fn length_to_px(value: &str) -> Option<f64> {
    let value = value.trim();
    let (number, factor) = if let Some(n) = value.strip_suffix("px") {
        (n, 1.0)
    } else if let Some(n) = value.strip_suffix("rem") {
        (n, 16.0)
    } else if let Some(n) = value.strip_suffix("em") {
        (n, 16.0)
    } else {
        return None;
    };
    number.trim().parse::<f64>().ok().map(|n| n * factor)
}

/// Metadata describing when and from what a theme report was produced
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stylesheet: Option<String>,
    pub variable_count: usize,
}

/// Theme metadata wrapped with provenance, as written by the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeReport {
    pub metadata: ReportMetadata,
    pub theme: ThemeMetadata,
}

impl ThemeReport {
    pub fn new(vars: &VariableTable, stylesheet: Option<String>) -> Self {
        Self {
            metadata: ReportMetadata {
                version: env!("CARGO_PKG_VERSION").to_string(),
                generated_at: Utc::now(),
                stylesheet,
                variable_count: vars.len(),
            },
            theme: ThemeMetadata::from_variables(vars),
        }
    }

    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
