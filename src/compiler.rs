use serde::{Deserialize, Serialize};
use tailwind_rs::TailwindBuilder;

use crate::errors::{InlinerError, Result};

/// A utility-class compiler: turns a stylesheet source plus a class batch
/// into CSS covering exactly those classes and the theme-level custom
/// properties they rely on.
pub trait ClassCompiler: Send + Sync {
    fn compile(&self, stylesheet: &str, classes: &[String]) -> Result<String>;

    /// Short name used in log output
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> ClassCompiler for F
where
    F: Fn(&str, &[String]) -> Result<String> + Send + Sync,
{
    fn compile(&self, stylesheet: &str, classes: &[String]) -> Result<String> {
        self(stylesheet, classes)
    }
}

/// Selects a built-in compiler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CompilerKind {
    /// tailwind-rs utility generation on top of the stylesheet
    #[default]
    Tailwind,
    /// The stylesheet as-is; classes must already be defined in it
    Plain,
}

/// Compiles utilities with tailwind-rs and appends them to the stylesheet
#[derive(Debug, Clone, Default)]
pub struct TailwindRsCompiler {
    /// Emit tailwind-rs preflight (reset) rules
    pub preflight: bool,
}

impl TailwindRsCompiler {
    pub fn new(preflight: bool) -> Self {
        Self { preflight }
    }
}

impl ClassCompiler for TailwindRsCompiler {
    fn compile(&self, stylesheet: &str, classes: &[String]) -> Result<String> {
        let mut builder = TailwindBuilder::default();
        builder.preflight.disable = !self.preflight;

        for class in classes {
            // unknown classes are not an error; they just produce no rule
            if let Err(e) = builder.trace(class, false) {
                log::debug!("tailwind-rs could not trace {}: {}", class, e);
            }
        }

        let bundle = builder
            .bundle()
            .map_err(|e| InlinerError::CompilerError(e.to_string()))?;

        let mut css = String::with_capacity(stylesheet.len() + bundle.len() + 1);
        css.push_str(stylesheet);
        css.push('\n');
        css.push_str(&bundle);
        Ok(css)
    }

    fn name(&self) -> &str {
        "tailwind-rs"
    }
}

/// Returns the stylesheet unchanged, for projects whose CSS already contains
/// every utility it uses
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCssCompiler;

impl ClassCompiler for PlainCssCompiler {
    fn compile(&self, stylesheet: &str, _classes: &[String]) -> Result<String> {
        Ok(stylesheet.to_string())
    }

    fn name(&self) -> &str {
        "plain"
    }
}

/// Build the compiler a [`CompilerKind`] names
pub fn compiler_for(kind: CompilerKind, preflight: bool) -> std::sync::Arc<dyn ClassCompiler> {
    match kind {
        CompilerKind::Tailwind => std::sync::Arc::new(TailwindRsCompiler::new(preflight)),
        CompilerKind::Plain => std::sync::Arc::new(PlainCssCompiler),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_compiler_passes_through() {
        let css = PlainCssCompiler.compile(".a{color:red}", &["a".to_string()]).unwrap();
        assert_eq!(css, ".a{color:red}");
    }

    #[test]
    fn test_closure_compiler() {
        let compiler = |sheet: &str, classes: &[String]| -> Result<String> {
            Ok(format!("{}/* {} */", sheet, classes.join(",")))
        };
        assert_eq!(compiler.compile("x", &["a".into(), "b".into()]).unwrap(), "x/* a,b */");
        assert_eq!(ClassCompiler::name(&compiler), "custom");
    }

    #[test]
    fn test_tailwind_compiler_keeps_stylesheet() {
        let compiler = TailwindRsCompiler::new(false);
        let css = compiler
            .compile(":root { --brand: red; }", &["p-4".to_string(), "not-a-utility-xyz".to_string()])
            .unwrap();
        assert!(css.starts_with(":root { --brand: red; }"));
    }

    #[test]
    fn test_compiler_kind_serde() {
        let kind: CompilerKind = serde_json::from_str("\"plain\"").unwrap();
        assert_eq!(kind, CompilerKind::Plain);
        assert_eq!(CompilerKind::default(), CompilerKind::Tailwind);
    }
}
