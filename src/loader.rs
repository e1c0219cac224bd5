//! Stylesheet loading with `@import` inlining.
//!
//! `./` and `../` specifiers resolve against the importing file, bare package
//! names resolve to the package's entry stylesheet, and anything else goes
//! through `node_modules` lookup. Unresolvable or unreadable imports inline
//! as nothing.

use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::stylesheet::{import_layer, import_target, Stylesheet};

/// Resolves and inlines stylesheet imports
#[derive(Debug, Clone, Default)]
pub struct StylesheetLoader {
    /// Extra directory searched for `node_modules` after the importer's ancestors
    root: Option<PathBuf>,
}

impl StylesheetLoader {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    /// Read `entry` and inline its imports recursively. An unreadable entry
    /// yields an empty stylesheet.
    pub fn load(&self, entry: &Path) -> String {
        let mut visited = HashSet::new();
        self.inline(entry, &mut visited).unwrap_or_default()
    }

    fn inline(&self, path: &Path, visited: &mut HashSet<PathBuf>) -> Option<String> {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if !visited.insert(key) {
            log::debug!("Import cycle cut at {}", path.display());
            return Some(String::new());
        }

        let css = match fs::read_to_string(path) {
            Ok(css) => css,
            Err(e) => {
                log::warn!("Could not read stylesheet {}: {}", path.display(), e);
                return None;
            }
        };

        let sheet = Stylesheet::parse(&css);
        let imports = sheet.imports();
        if imports.is_empty() {
            return Some(css);
        }

        let mut out = String::with_capacity(css.len());
        let mut cursor = 0;
        for import in imports {
            out.push_str(&css[cursor..import.range.start]);
            cursor = import.range.end;

            let Some(specifier) = import_target(&import.prelude) else {
                log::debug!("Skipping @import without a target: {}", import.prelude);
                continue;
            };
            let inlined = match self.resolve(&specifier, path) {
                Some(target) => self.inline(&target, visited).unwrap_or_default(),
                None => {
                    log::debug!("Unresolved import {:?} from {}", specifier, path.display());
                    String::new()
                }
            };

            match import_layer(&import.prelude) {
                Some(layer) => out.push_str(&format!("@layer {} {{\n{}\n}}\n", layer, inlined)),
                None => {
                    out.push_str(&inlined);
                    out.push('\n');
                }
            }
        }
        out.push_str(&css[cursor..]);

        Some(out)
    }

    /// Resolve an import specifier relative to the importing file
    pub fn resolve(&self, specifier: &str, importer: &Path) -> Option<PathBuf> {
        if specifier.contains("://") {
            return None;
        }

        if specifier.starts_with("./") || specifier.starts_with("../") {
            let base = importer.parent().unwrap_or_else(|| Path::new("."));
            return existing(base.join(specifier));
        }

        let path = Path::new(specifier);
        if path.is_absolute() {
            return existing(path.to_path_buf());
        }

        let (package, subpath) = split_package(specifier);
        let package_dir = self.find_package(package, importer)?;
        match subpath {
            None => package_entry(&package_dir),
            Some(subpath) => existing(package_dir.join(subpath))
                .or_else(|| existing(package_dir.join(format!("{}.css", subpath)))),
        }
    }

    fn find_package(&self, package: &str, importer: &Path) -> Option<PathBuf> {
        let start = importer.parent().map(Path::to_path_buf);
        let ancestors = start
            .iter()
            .flat_map(|dir| dir.ancestors().map(Path::to_path_buf).collect::<Vec<_>>())
            .chain(self.root.clone());

        for dir in ancestors {
            let candidate = dir.join("node_modules").join(package);
            if candidate.is_dir() {
                return Some(candidate);
            }
        }
        None
    }
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}

/// `@scope/pkg/sub.css` → (`@scope/pkg`, `sub.css`)
fn split_package(specifier: &str) -> (&str, Option<&str>) {
    let boundary = if specifier.starts_with('@') {
        specifier
            .match_indices('/')
            .nth(1)
            .map(|(index, _)| index)
    } else {
        specifier.find('/')
    };

    match boundary {
        Some(index) => (&specifier[..index], Some(&specifier[index + 1..])),
        None => (specifier, None),
    }
}

/// Entry stylesheet of a package: `style`, then `exports["."].style`, then
/// `index.css`
fn package_entry(package_dir: &Path) -> Option<PathBuf> {
    let manifest = fs::read_to_string(package_dir.join("package.json"))
        .ok()
        .and_then(|text| serde_json::from_str::<Value>(&text).ok());

    if let Some(manifest) = manifest {
        let declared = manifest
            .get("style")
            .and_then(Value::as_str)
            .or_else(|| {
                manifest
                    .get("exports")
                    .and_then(|exports| exports.get("."))
                    .and_then(|dot| dot.get("style"))
                    .and_then(Value::as_str)
            });
        if let Some(found) = declared.and_then(|entry| existing(package_dir.join(entry))) {
            return Some(found);
        }
    }

    existing(package_dir.join("index.css"))
}
