use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::compiler::CompilerKind;
use crate::errors::{InlinerError, Result};
use crate::styles::PropertyCase;

/// Inliner configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InlinerConfig {
    /// CSS entry stylesheet; imports are inlined relative to it
    pub stylesheet: Option<PathBuf>,

    /// Semantic color name → base color name, e.g. `primary: indigo`
    pub theme: IndexMap<String, String>,

    /// Which class compiler to run
    pub compiler: CompilerKind,

    /// Emit tailwind-rs preflight rules in compiled output; unset means off
    pub preflight: Option<bool>,

    /// Extra directory searched for `node_modules` when resolving bare imports
    pub root: Option<PathBuf>,

    /// Key style of resolved property names
    pub property_case: PropertyCase,
}

impl InlinerConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = read_config(path)?;
        serde_yaml::from_str(&content).map_err(|e| InlinerError::ConfigError {
            message: format!("Failed to parse YAML config: {}", e),
        })
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = read_config(path)?;
        serde_json::from_str(&content).map_err(|e| InlinerError::ConfigError {
            message: format!("Failed to parse JSON config: {}", e),
        })
    }

    /// Load configuration from a file (auto-detect format)
    pub fn from_file(path: &Path) -> Result<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(InlinerError::ConfigError {
                message: format!(
                    "Unsupported config file format: {}. Use .yaml, .yml, or .json",
                    path.display()
                ),
            }),
        }
    }

    /// Whether the compiler should emit preflight rules
    pub fn preflight_enabled(&self) -> bool {
        self.preflight.unwrap_or(false)
    }

    /// Layer `other` over `self`: fields `other` sets win, theme maps union
    pub fn merge(mut self, other: Self) -> Self {
        let defaults = Self::default();

        if other.stylesheet.is_some() {
            self.stylesheet = other.stylesheet;
        }
        self.theme.extend(other.theme);
        if other.compiler != defaults.compiler {
            self.compiler = other.compiler;
        }
        if other.preflight.is_some() {
            self.preflight = other.preflight;
        }
        if other.root.is_some() {
            self.root = other.root;
        }
        if other.property_case != defaults.property_case {
            self.property_case = other.property_case;
        }

        self
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| InlinerError::ConfigError {
        message: format!("Failed to read config file {}: {}", path.display(), e),
    })
}
