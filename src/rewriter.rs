use std::ops::Range;

use crate::markup::{self, Attribute, Element};
use crate::styles::{ClassStyleMap, StyleDeclarations};
use crate::stylesheet::{parse_declaration, split_top_level};

/// One text replacement in the original source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub range: Range<usize>,
    pub replacement: String,
}

/// Rewritten markup and the edits that produced it, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub code: String,
    pub edits: Vec<Edit>,
}

/// What one element contributes to a rewrite
struct StyleCollector<'a> {
    element: &'a Element,
    class_attr: &'a Attribute,
    class_value: Range<usize>,
    classes: Vec<&'a str>,
    style_attr: Option<&'a Attribute>,
}

impl<'a> StyleCollector<'a> {
    fn new(source: &'a str, element: &'a Element) -> Option<Self> {
        let class_attr = element.attribute("class")?;
        let class_value = class_attr.value_range.clone()?;
        let classes: Vec<&str> = source[class_value.clone()].split_whitespace().collect();
        if classes.is_empty() {
            return None;
        }

        Some(Self {
            element,
            class_attr,
            class_value,
            classes,
            style_attr: element.attribute("style"),
        })
    }

    /// Edits for this element, or nothing when none of its classes resolved
    fn edits(&self, source: &str, styles: &ClassStyleMap) -> Vec<Edit> {
        let mut compiled = StyleDeclarations::new();
        let mut unresolved = Vec::new();
        for class in &self.classes {
            match styles.get(*class) {
                Some(declarations) => {
                    for (property, value) in declarations {
                        compiled.insert(property.clone(), value.clone());
                    }
                }
                None => unresolved.push(*class),
            }
        }
        if unresolved.len() == self.classes.len() {
            return Vec::new();
        }

        let existing = self
            .style_attr
            .and_then(|attr| attr.value.as_deref())
            .map(parse_inline_style)
            .unwrap_or_default();
        for (property, value) in existing {
            compiled.insert(property, value);
        }
        let style = format_style(&compiled);

        let mut edits = Vec::new();
        let keep_class = !unresolved.is_empty();

        if keep_class {
            edits.push(Edit {
                range: self.class_value.clone(),
                replacement: unresolved.join(" "),
            });
        }

        match self.style_attr {
            // the whole attribute is rewritten so the value always sits in
            // double quotes, whatever quoting the original used
            Some(attr) => {
                if !keep_class {
                    edits.push(removal(source, self.class_attr));
                }
                edits.push(Edit {
                    range: attr.range.clone(),
                    replacement: format!("style=\"{}\"", style),
                });
            }
            None if style.is_empty() => {
                if !keep_class {
                    edits.push(removal(source, self.class_attr));
                }
            }
            None if keep_class => edits.push(Edit {
                range: self.class_attr.range.end..self.class_attr.range.end,
                replacement: format!(" style=\"{}\"", style),
            }),
            None => edits.push(Edit {
                range: self.class_attr.range.clone(),
                replacement: format!("style=\"{}\"", style),
            }),
        }

        log::debug!(
            "Inlined {} of {} classes on <{}>",
            self.classes.len() - unresolved.len(),
            self.classes.len(),
            self.element.tag
        );
        edits
    }
}

/// Remove an attribute together with the whitespace before it
fn removal(source: &str, attr: &Attribute) -> Edit {
    let start = source[..attr.range.start].trim_end().len();
    Edit {
        range: start..attr.range.end,
        replacement: String::new(),
    }
}

/// `prop: value; prop2: value2`, with double quotes turned into single
/// quotes so the text fits a double-quoted attribute
pub fn format_style(declarations: &StyleDeclarations) -> String {
    declarations
        .iter()
        .map(|(property, value)| format!("{}: {}", property, value))
        .collect::<Vec<_>>()
        .join("; ")
        .replace('"', "'")
}

/// Parse a literal `style` attribute value
pub fn parse_inline_style(style: &str) -> StyleDeclarations {
    split_top_level(style, ';')
        .into_iter()
        .filter_map(parse_declaration)
        .map(|declaration| (declaration.property, declaration.value))
        .collect()
}

/// Replace resolved classes on every element with an inline `style`.
///
/// Per element, declarations of later classes override earlier ones and an
/// existing literal `style` wins over both. Fully resolved elements lose
/// their `class` attribute; partially resolved ones keep only the
/// unresolved tokens. Returns `None` when nothing changes or the markup
/// cannot be tokenized.
pub fn rewrite_markup(source: &str, styles: &ClassStyleMap) -> Option<Rewrite> {
    let document = markup::parse(source)?;

    let mut edits: Vec<Edit> = document
        .elements
        .iter()
        .filter_map(|element| StyleCollector::new(source, element))
        .flat_map(|collector| collector.edits(source, styles))
        .collect();
    if edits.is_empty() {
        return None;
    }
    edits.sort_by_key(|edit| (edit.range.start, edit.range.end));

    // back to front so earlier offsets stay valid
    let mut code = source.to_string();
    for edit in edits.iter().rev() {
        code.replace_range(edit.range.clone(), &edit.replacement);
    }

    Some(Rewrite { code, edits })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn styles(entries: &[(&str, &[(&str, &str)])]) -> ClassStyleMap {
        entries
            .iter()
            .map(|(class, decls)| {
                let decls = decls.iter().map(|(p, v)| (p.to_string(), v.to_string())).collect();
                (class.to_string(), decls)
            })
            .collect()
    }

    #[test]
    fn test_partial_resolution_keeps_unresolved() {
        let map = styles(&[("flex", &[("display", "flex")])]);
        let out = rewrite_markup(r#"<div class="flex hover:bg-blue-500">x</div>"#, &map).unwrap();
        insta::assert_snapshot!(out.code, @r#"<div class="hover:bg-blue-500" style="display: flex">x</div>"#);
    }

    #[test]
    fn test_full_resolution_replaces_class() {
        let map = styles(&[("p-4", &[("padding", "1rem")]), ("m-0", &[("margin", "0")])]);
        let out = rewrite_markup(r#"<p id="a" class="p-4 m-0">x</p>"#, &map).unwrap();
        insta::assert_snapshot!(out.code, @r#"<p id="a" style="padding: 1rem; margin: 0">x</p>"#);
    }

    #[test]
    fn test_existing_style_wins_and_later_class_wins() {
        let map = styles(&[
            ("text-red", &[("color", "#ff0000")]),
            ("text-blue", &[("color", "#0000ff")]),
            ("p-1", &[("padding", "0.25rem")]),
        ]);
        let out = rewrite_markup(r#"<span class="text-red text-blue p-1" style="padding: 3px">x</span>"#, &map).unwrap();
        insta::assert_snapshot!(out.code, @r#"<span style="color: #0000ff; padding: 3px">x</span>"#);
    }

    #[test]
    fn test_quotes_escaped() {
        let map = styles(&[("font-x", &[("font-family", "\"Inter\", sans-serif")])]);
        let out = rewrite_markup(r#"<b class="font-x"></b>"#, &map).unwrap();
        assert_eq!(out.code, r#"<b style="font-family: 'Inter', sans-serif"></b>"#);
    }

    #[test]
    fn test_single_quoted_existing_style() {
        let map = styles(&[("flex", &[("display", "flex")])]);
        let out = rewrite_markup(r#"<p class="flex" style='font-family: "A B"'>x</p>"#, &map).unwrap();
        assert_eq!(out.code, r#"<p style="display: flex; font-family: 'A B'">x</p>"#);

        let reparsed = markup::parse(&out.code).unwrap();
        let style = reparsed.elements[0].attribute("style").unwrap();
        assert_eq!(style.value.as_deref(), Some("display: flex; font-family: 'A B'"));
    }

    #[test]
    fn test_unquoted_existing_style() {
        let map = styles(&[("flex", &[("display", "flex")]), ("m-0", &[("margin", "0")])]);
        let out = rewrite_markup(r#"<p class="flex m-0" style=color:red>x</p>"#, &map).unwrap();
        assert_eq!(out.code, r#"<p style="display: flex; margin: 0; color: red">x</p>"#);

        let out = rewrite_markup(r#"<p class="flex grid" style=color:red>x</p>"#, &map).unwrap();
        assert_eq!(out.code, r#"<p class="grid" style="display: flex; color: red">x</p>"#);
    }

    #[test]
    fn test_nested_elements_and_offsets() {
        let map = styles(&[("a", &[("top", "0")]), ("b", &[("left", "0")])]);
        let source = "<div class=\"a\">\n  <span class=\"b c\"/>\n</div>";
        let out = rewrite_markup(source, &map).unwrap();
        assert_eq!(out.code, "<div style=\"top: 0\">\n  <span class=\"c\" style=\"left: 0\"/>\n</div>");
        assert_eq!(out.edits.len(), 3);
        assert!(out.edits.windows(2).all(|w| w[0].range.start <= w[1].range.start));
    }

    #[test]
    fn test_zero_declaration_class_removed() {
        let map = styles(&[("from-red", &[])]);
        let out = rewrite_markup(r#"<i class="from-red"></i>"#, &map).unwrap();
        assert_eq!(out.code, "<i></i>");
    }

    #[test]
    fn test_no_transform_cases() {
        let map = styles(&[("flex", &[("display", "flex")])]);
        assert!(rewrite_markup(r#"<div class="grid">x</div>"#, &map).is_none());
        assert!(rewrite_markup(r#"<div :class="'flex'">x</div>"#, &map).is_none());
        assert!(rewrite_markup("<div>plain</div>", &map).is_none());
        assert!(rewrite_markup(r#"<div class="flex"#, &map).is_none());
    }

    #[test]
    fn test_parse_inline_style() {
        let parsed = parse_inline_style("color: red; background: url(a;b.png); ;bad");
        assert_eq!(parsed.get("color").map(String::as_str), Some("red"));
        assert_eq!(parsed.get("background").map(String::as_str), Some("url(a;b.png)"));
        assert_eq!(parsed.len(), 2);
    }
}
