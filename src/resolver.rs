use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::{CachedStylesheet, ClassResolution, StyleCache};
use crate::compiler::{compiler_for, ClassCompiler};
use crate::config::InlinerConfig;
use crate::filter::{filter_classes, unique_bases};
use crate::loader::StylesheetLoader;
use crate::rewriter::{rewrite_markup, Rewrite};
use crate::scanner::scan_template;
use crate::source_map::build_source_map;
use crate::styles::{assemble, with_case, ClassStyleMap, PropertyCase};
use crate::stylesheet::Stylesheet;
use crate::theme::{expand_theme_overrides, ThemeMetadata};
use crate::variables::VariableTable;

/// Rewritten template plus its source map
pub struct TemplateOutput {
    pub rewrite: Rewrite,
    pub source_map: sourcemap::SourceMap,
}

/// Resolves utility classes to inline declarations for one stylesheet.
///
/// Resolution is best-effort: compiler failures, unreadable stylesheets and
/// unresolvable values are logged and leave the affected classes out of the
/// result.
pub struct StyleResolver {
    config: InlinerConfig,
    compiler: Arc<dyn ClassCompiler>,
    cache: Arc<StyleCache>,
    loader: StylesheetLoader,
}

impl StyleResolver {
    pub fn new(config: InlinerConfig, compiler: Arc<dyn ClassCompiler>, cache: Arc<StyleCache>) -> Self {
        let loader = StylesheetLoader::new(config.root.clone());
        Self {
            config,
            compiler,
            cache,
            loader,
        }
    }

    /// Resolver using the compiler the config names and a fresh cache
    pub fn from_config(config: InlinerConfig) -> Self {
        let compiler = compiler_for(config.compiler, config.preflight_enabled());
        Self::new(config, compiler, Arc::new(StyleCache::new()))
    }

    pub fn config(&self) -> &InlinerConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<StyleCache> {
        &self.cache
    }

    /// Invalidate every cached stylesheet and resolution
    pub fn clear(&self) {
        self.cache.clear();
    }

    fn cache_key(&self) -> PathBuf {
        self.config.stylesheet.clone().unwrap_or_default()
    }

    fn entry(&self) -> Arc<CachedStylesheet> {
        self.cache.get_or_compute(&self.cache_key(), |generation| {
            let source = match &self.config.stylesheet {
                Some(path) => self.loader.load(path),
                None => String::new(),
            };

            let base = match self.compiler.compile(&source, &[]) {
                Ok(css) => css,
                Err(e) => {
                    log::warn!("{} failed on the base stylesheet: {}", self.compiler.name(), e);
                    source.clone()
                }
            };

            let mut variables = VariableTable::from_css(&base);
            if !self.config.theme.is_empty() {
                variables.merge(&expand_theme_overrides(&self.config.theme));
            }
            log::debug!("Loaded {} theme variables (generation {})", variables.len(), generation);

            CachedStylesheet::new(source, variables, generation)
        })
    }

    /// Theme variables of the current stylesheet
    pub fn variables(&self) -> VariableTable {
        self.entry().variables.clone()
    }

    /// Resolve classes to their declarations, keyed by the names given.
    /// Interactive and dark-mode classes and classes the compiler does not
    /// know are absent from the result.
    ///
    /// Property names are always kebab-case here; use
    /// [`resolve_classes_cased`](Self::resolve_classes_cased) for camelCase
    /// output under `PropertyCase::Camel`.
    pub fn resolve_classes<S: AsRef<str>>(&self, classes: &[S]) -> ClassStyleMap {
        let requests = filter_classes(classes);
        let entry = self.entry();

        let missing: Vec<String> = unique_bases(&requests)
            .into_iter()
            .filter(|base| entry.memoized(base).is_none())
            .collect();
        if !missing.is_empty() {
            self.compile_batch(&entry, &missing);
        }

        let mut resolved = ClassStyleMap::new();
        for request in &requests {
            if let Some(ClassResolution::Resolved(declarations)) = entry.memoized(&request.base) {
                resolved.insert(request.original.clone(), declarations);
            }
        }
        resolved
    }

    /// Like [`resolve_classes`](Self::resolve_classes) with property names in
    /// the configured case
    pub fn resolve_classes_cased<S: AsRef<str>>(&self, classes: &[S]) -> ClassStyleMap {
        let resolved = self.resolve_classes(classes);
        match self.config.property_case {
            PropertyCase::Kebab => resolved,
            case => resolved
                .into_iter()
                .map(|(class, declarations)| (class, with_case(&declarations, case)))
                .collect(),
        }
    }

    fn compile_batch(&self, entry: &CachedStylesheet, bases: &[String]) {
        let css = match self.compiler.compile(&entry.source, bases) {
            Ok(css) => css,
            Err(e) => {
                log::warn!("{} failed for {} classes: {}", self.compiler.name(), bases.len(), e);
                return;
            }
        };

        let sheet = Stylesheet::parse(&css);
        let mut variables = entry.variables.clone();
        variables.merge(&VariableTable::extract(&sheet));
        let assembled = assemble(&sheet, &variables);

        for base in bases {
            let resolution = match assembled.get(base) {
                Some(declarations) => ClassResolution::Resolved(declarations.clone()),
                None => {
                    log::debug!("No rule for {}", base);
                    ClassResolution::NotFound
                }
            };
            entry.memoize(base, resolution);
        }
    }

    /// Scan a template and resolve everything it references
    pub fn resolve_template(&self, source: &str) -> ClassStyleMap {
        let classes: Vec<String> = scan_template(source).into_iter().collect();
        self.resolve_classes(&classes)
    }

    /// Inline resolved classes into a template. `None` when nothing changes.
    pub fn rewrite_template(&self, source: &str, file_name: &str) -> Option<TemplateOutput> {
        let styles = self.resolve_template(source);
        if styles.is_empty() {
            return None;
        }

        let rewrite = rewrite_markup(source, &styles)?;
        let source_map = build_source_map(source, &rewrite, file_name);
        Some(TemplateOutput { rewrite, source_map })
    }

    /// `{fontVars, breakpoints, colors}` of the current theme
    pub fn theme_metadata(&self) -> ThemeMetadata {
        ThemeMetadata::from_variables(&self.entry().variables)
    }
}
