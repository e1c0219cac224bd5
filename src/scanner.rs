use indexmap::IndexSet;
use std::path::Path;
use std::sync::Arc;
use swc_core::common::{FileName, Globals, SourceMap, GLOBALS};
use swc_core::ecma::ast::*;
use swc_core::ecma::parser::{parse_file_as_expr, EsSyntax, Syntax};
use swc_core::ecma::visit::{Visit, VisitWith};

use crate::errors::{InlinerError, Result};
use crate::markup;

/// Attribute names carrying a dynamic class binding
pub const CLASS_BINDINGS: &[&str] = &[":class", "v-bind:class"];

/// Characters that mark a token as templated rather than a literal class
const NON_STATIC_MARKERS: &[char] = &['{', '}', '$', '<', '>', '"', '\''];

/// Whether a class token is a plain literal
pub fn is_static_token(token: &str) -> bool {
    !token.is_empty() && !token.contains(NON_STATIC_MARKERS)
}

/// Literal class tokens of a static `class` attribute value
pub fn static_class_tokens(value: &str) -> impl Iterator<Item = &str> {
    value.split_whitespace().filter(|token| is_static_token(token))
}

/// Visitor collecting class names from a `:class` binding expression.
///
/// Only values that end up as class names are read: string literals, static
/// template text, object keys, both ternary branches and the right side of
/// `&&`/`||`/`??`. Conditions, call arguments and member accesses are not.
#[derive(Default)]
pub struct ClassBindingVisitor {
    pub classes: Vec<String>,
}

impl ClassBindingVisitor {
    fn push_tokens(&mut self, text: &str) {
        self.classes
            .extend(static_class_tokens(text).map(str::to_string));
    }
}

impl Visit for ClassBindingVisitor {
    fn visit_str(&mut self, node: &Str) {
        self.push_tokens(&node.value);
    }

    /// Static template text; tokens glued to an `${...}` are partial names
    fn visit_tpl(&mut self, node: &Tpl) {
        let last = node.quasis.len().saturating_sub(1);
        for (index, quasi) in node.quasis.iter().enumerate() {
            let text: &str = match &quasi.cooked {
                Some(cooked) => &**cooked,
                None => &*quasi.raw,
            };
            let tokens: Vec<&str> = text.split_whitespace().collect();
            let glued_front = index > 0 && !text.starts_with(char::is_whitespace);
            let glued_back = index < last && !text.ends_with(char::is_whitespace);

            for (position, token) in tokens.iter().enumerate() {
                if (position == 0 && glued_front) || (position + 1 == tokens.len() && glued_back) {
                    continue;
                }
                if is_static_token(token) {
                    self.classes.push(token.to_string());
                }
            }
        }
    }

    fn visit_object_lit(&mut self, node: &ObjectLit) {
        for prop in &node.props {
            let PropOrSpread::Prop(prop) = prop else { continue };
            match &**prop {
                Prop::KeyValue(kv) => match &kv.key {
                    PropName::Str(key) => self.push_tokens(&key.value),
                    PropName::Ident(key) => self.push_tokens(&key.sym),
                    _ => {}
                },
                Prop::Shorthand(ident) => self.push_tokens(&ident.sym),
                _ => {}
            }
        }
    }

    fn visit_cond_expr(&mut self, node: &CondExpr) {
        node.cons.visit_with(self);
        node.alt.visit_with(self);
    }

    fn visit_bin_expr(&mut self, node: &BinExpr) {
        if matches!(
            node.op,
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr | BinaryOp::NullishCoalescing
        ) {
            node.right.visit_with(self);
        }
    }

    fn visit_call_expr(&mut self, _node: &CallExpr) {}

    fn visit_member_expr(&mut self, _node: &MemberExpr) {}
}

/// Class names a `:class` expression can produce. Unparsable expressions
/// yield nothing.
pub fn scan_class_binding(expression: &str) -> Vec<String> {
    let source_map = Arc::new(SourceMap::default());
    let source_file = source_map.new_source_file(
        FileName::Custom("class-binding".to_string()).into(),
        expression.to_string(),
    );

    let parsed = GLOBALS.set(&Globals::new(), || {
        parse_file_as_expr(
            &source_file,
            Syntax::Es(EsSyntax::default()),
            EsVersion::latest(),
            None,
            &mut vec![],
        )
    });

    match parsed {
        Ok(expr) => {
            let mut visitor = ClassBindingVisitor::default();
            expr.visit_with(&mut visitor);
            visitor.classes
        }
        Err(e) => {
            log::debug!("Ignoring unparsable class binding {:?}: {:?}", expression, e);
            Vec::new()
        }
    }
}

/// Candidate classes of a template: static `class` tokens plus everything the
/// `:class` bindings can produce. An unparsable template yields an empty set.
pub fn scan_template(source: &str) -> IndexSet<String> {
    let mut classes = IndexSet::new();
    let Some(document) = markup::parse(source) else {
        log::debug!("Template could not be tokenized; no classes scanned");
        return classes;
    };

    for element in &document.elements {
        for attribute in &element.attributes {
            let Some(value) = attribute.value.as_deref() else { continue };
            if attribute.name == "class" {
                classes.extend(static_class_tokens(value).map(str::to_string));
            } else if CLASS_BINDINGS.contains(&attribute.name.as_str()) {
                classes.extend(scan_class_binding(value));
            }
        }
    }

    classes
}

/// Read and scan a template file
pub fn scan_file(path: &Path) -> Result<IndexSet<String>> {
    let source = std::fs::read_to_string(path).map_err(|e| InlinerError::TemplateError {
        path: path.display().to_string(),
        message: format!("Failed to read file: {}", e),
    })?;
    Ok(scan_template(&source))
}

/// Scan many templates in parallel, merging into one set
pub fn scan_files_parallel(paths: &[std::path::PathBuf]) -> Result<IndexSet<String>> {
    use rayon::prelude::*;

    let results: std::result::Result<Vec<_>, _> =
        paths.par_iter().map(|path| scan_file(path)).collect();

    let mut classes = IndexSet::new();
    for file_classes in results? {
        classes.extend(file_classes);
    }
    Ok(classes)
}
