//! A small CSS rule tree built on `cssparser`.
//!
//! Only the structure the resolver needs is kept: qualified rules with their
//! raw selector text, at-rules with their raw prelude, and declarations as
//! `property: value` text. Values are never tokenized further here; `var()`
//! substitution and color handling work on the raw value text.

use cssparser::{ParseError, Parser, ParserInput, SourcePosition, Token};
use std::ops::Range;

/// A single `property: value` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

impl Declaration {
    /// Whether this declares a custom property (`--name`)
    pub fn is_custom_property(&self) -> bool {
        self.property.starts_with("--")
    }
}

/// Contents of a `{ ... }` block: declarations and nested rules
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub declarations: Vec<Declaration>,
    pub rules: Vec<CssRule>,
}

/// A qualified rule such as `.flex { display: flex }`
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    /// Raw selector list text, still CSS-escaped
    pub selectors: String,
    pub block: Block,
}

impl StyleRule {
    /// Split the selector list on top-level commas
    pub fn selector_list(&self) -> Vec<&str> {
        split_top_level(&self.selectors, ',')
    }
}

/// An at-rule such as `@layer utilities { ... }` or `@import "x";`
#[derive(Debug, Clone, PartialEq)]
pub struct AtRule {
    pub name: String,
    pub prelude: String,
    pub block: Option<Block>,
    /// Byte range of the whole rule in the parsed source
    pub range: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CssRule {
    Style(StyleRule),
    At(AtRule),
}

/// Parsed stylesheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stylesheet {
    pub rules: Vec<CssRule>,
}

impl Stylesheet {
    /// Parse CSS text. Malformed input yields whatever rules could be recovered.
    pub fn parse(css: &str) -> Self {
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        let block = parse_block_contents(&mut parser);
        Self { rules: block.rules }
    }

    /// Style rules that apply unconditionally: top-level ones and those nested
    /// in `@layer` blocks. Rules under `@media`, `@supports` and friends are
    /// conditional and skipped.
    pub fn style_rules(&self) -> Vec<&StyleRule> {
        let mut out = Vec::new();
        collect_style_rules(&self.rules, &mut out);
        out
    }

    /// At-rules with the given name, searching through `@layer` blocks
    pub fn at_rules(&self, name: &str) -> Vec<&AtRule> {
        let mut out = Vec::new();
        collect_at_rules(&self.rules, name, &mut out);
        out
    }

    /// Top-level `@import` rules in source order
    pub fn imports(&self) -> Vec<&AtRule> {
        self.rules
            .iter()
            .filter_map(|rule| match rule {
                CssRule::At(at) if at.name.eq_ignore_ascii_case("import") => Some(at),
                _ => None,
            })
            .collect()
    }
}

fn collect_style_rules<'a>(rules: &'a [CssRule], out: &mut Vec<&'a StyleRule>) {
    for rule in rules {
        match rule {
            CssRule::Style(style) => out.push(style),
            CssRule::At(at) if at.name.eq_ignore_ascii_case("layer") => {
                if let Some(block) = &at.block {
                    collect_style_rules(&block.rules, out);
                }
            }
            CssRule::At(_) => {}
        }
    }
}

fn collect_at_rules<'a>(rules: &'a [CssRule], name: &str, out: &mut Vec<&'a AtRule>) {
    for rule in rules {
        if let CssRule::At(at) = rule {
            if at.name.eq_ignore_ascii_case(name) {
                out.push(at);
            } else if at.name.eq_ignore_ascii_case("layer") {
                if let Some(block) = &at.block {
                    collect_at_rules(&block.rules, name, out);
                }
            }
        }
    }
}

enum Terminator {
    Semicolon,
    Block,
    End,
}

fn parse_block_contents(parser: &mut Parser<'_, '_>) -> Block {
    let mut block = Block::default();

    loop {
        parser.skip_whitespace();
        let start = parser.position();
        let first = match parser.next() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        match first {
            Token::Semicolon | Token::CurlyBracketBlock => continue,
            Token::AtKeyword(name) => {
                let rule = parse_at_rule(parser, name.to_string(), start);
                block.rules.push(CssRule::At(rule));
            }
            _ => {
                let (end, terminator) = consume_until_terminator(parser);
                let text = parser.slice(start..end).trim();
                match terminator {
                    Terminator::Block => {
                        let nested = parse_nested(parser);
                        block.rules.push(CssRule::Style(StyleRule {
                            selectors: text.to_string(),
                            block: nested,
                        }));
                    }
                    Terminator::Semicolon | Terminator::End => {
                        if let Some(declaration) = parse_declaration(text) {
                            block.declarations.push(declaration);
                        }
                    }
                }
            }
        }
    }

    block
}

fn parse_at_rule(parser: &mut Parser<'_, '_>, name: String, start: SourcePosition) -> AtRule {
    let prelude_start = parser.position();
    let (prelude_end, terminator) = consume_until_terminator(parser);
    let prelude = parser.slice(prelude_start..prelude_end).trim().to_string();
    let block = match terminator {
        Terminator::Block => Some(parse_nested(parser)),
        Terminator::Semicolon | Terminator::End => None,
    };

    AtRule {
        name,
        prelude,
        block,
        range: start.byte_index()..parser.position().byte_index(),
    }
}

fn parse_nested<'i>(parser: &mut Parser<'i, '_>) -> Block {
    parser
        .parse_nested_block(|nested| Ok::<_, ParseError<'i, ()>>(parse_block_contents(nested)))
        .unwrap_or_default()
}

/// Advance past the next `;` or `{}` block at this nesting level.
/// Returns the position just before the terminator.
fn consume_until_terminator(parser: &mut Parser<'_, '_>) -> (SourcePosition, Terminator) {
    loop {
        let before = parser.position();
        match parser.next() {
            Ok(Token::Semicolon) => return (before, Terminator::Semicolon),
            Ok(Token::CurlyBracketBlock) => return (before, Terminator::Block),
            Ok(_) => {}
            Err(_) => return (parser.position(), Terminator::End),
        }
    }
}

/// Parse `property: value [!important]` text
pub fn parse_declaration(text: &str) -> Option<Declaration> {
    let (property, value) = text.split_once(':')?;
    let property = property.trim();
    if property.is_empty() || property.contains(char::is_whitespace) {
        return None;
    }

    let (value, important) = strip_important(value.trim());
    Some(Declaration {
        property: property.to_string(),
        value: value.to_string(),
        important,
    })
}

fn strip_important(value: &str) -> (&str, bool) {
    if let Some(bang) = value.rfind('!') {
        if value[bang + 1..].trim().eq_ignore_ascii_case("important") {
            return (value[..bang].trim_end(), true);
        }
    }
    (value, false)
}

/// Extract the URL from an `@import` prelude (`"x.css"`, `url(x.css)`,
/// `url("x.css") layer(base)`)
pub fn import_target(prelude: &str) -> Option<String> {
    let mut input = ParserInput::new(prelude);
    let mut parser = Parser::new(&mut input);
    let token = parser.next().ok()?.clone();

    match token {
        Token::QuotedString(value) | Token::UnquotedUrl(value) => Some(value.to_string()),
        Token::Function(ref name) if name.eq_ignore_ascii_case("url") => parser
            .parse_nested_block(|nested| {
                let value = nested.expect_string()?.to_string();
                Ok::<_, ParseError<'_, ()>>(value)
            })
            .ok(),
        _ => None,
    }
}

/// Extract the layer name from an `@import` prelude's `layer(name)` part
pub fn import_layer(prelude: &str) -> Option<String> {
    let start = prelude.find("layer(")?;
    let open = start + "layer".len();
    let close = matching_paren(prelude, open)?;
    let name = prelude[open + 1..close].trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Index of the `)` matching the `(` at `open`, skipping quoted strings
pub(crate) fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for (offset, ch) in text[open..].char_indices() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on `separator` where it is not nested in parens, brackets or quotes
pub(crate) fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut last = 0;

    for (index, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
            continue;
        }
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            c if c == separator && depth == 0 => {
                parts.push(text[last..index].trim());
                last = index + ch.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(text[last..].trim());
    parts.retain(|part| !part.is_empty());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_rule() {
        let sheet = Stylesheet::parse(".flex { display: flex; }");
        let rules = sheet.style_rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].selectors, ".flex");
        assert_eq!(rules[0].block.declarations[0].property, "display");
        assert_eq!(rules[0].block.declarations[0].value, "flex");
    }

    #[test]
    fn test_last_declaration_without_semicolon() {
        let sheet = Stylesheet::parse(".a{color:red;margin:0 auto}");
        let decls = &sheet.style_rules()[0].block.declarations;
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[1].value, "0 auto");
    }

    #[test]
    fn test_layer_rules_are_visible() {
        let css = r#"
            @layer theme { :root, :host { --color-red-500: oklch(63.7% 0.237 25.331); } }
            @layer utilities { .p-4 { padding: calc(var(--spacing) * 4); } }
            @media (width >= 40rem) { .sm\:p-2 { padding: 1rem; } }
        "#;
        let sheet = Stylesheet::parse(css);
        let selectors: Vec<&str> = sheet.style_rules().iter().map(|r| r.selectors.as_str()).collect();
        assert_eq!(selectors, vec![":root, :host", ".p-4"]);
    }

    #[test]
    fn test_nested_rules_inside_style_rule() {
        let css = ".bg-red-500\\/50 { background-color: red; @supports (color: lab(0 0 0)) { background-color: blue; } }";
        let sheet = Stylesheet::parse(css);
        let rule = sheet.style_rules()[0];
        assert_eq!(rule.block.declarations.len(), 1);
        assert_eq!(rule.block.rules.len(), 1);
    }

    #[test]
    fn test_important_is_stripped() {
        let decl = parse_declaration("color: red !important").unwrap();
        assert_eq!(decl.value, "red");
        assert!(decl.important);
    }

    #[test]
    fn test_value_keeps_functions() {
        let sheet = Stylesheet::parse(".x { background-image: linear-gradient(to right, var(--a), var(--b, red)); }");
        let decl = &sheet.style_rules()[0].block.declarations[0];
        assert_eq!(decl.value, "linear-gradient(to right, var(--a), var(--b, red))");
    }

    #[test]
    fn test_imports() {
        let css = "@import \"tailwindcss\";\n@import url('./theme.css') layer(theme);\n.a { color: red }";
        let sheet = Stylesheet::parse(css);
        let imports = sheet.imports();
        assert_eq!(imports.len(), 2);
        assert_eq!(import_target(&imports[0].prelude).as_deref(), Some("tailwindcss"));
        assert_eq!(import_target(&imports[1].prelude).as_deref(), Some("./theme.css"));
        assert_eq!(import_layer(&imports[1].prelude).as_deref(), Some("theme"));
        assert_eq!(&css[imports[0].range.clone()], "@import \"tailwindcss\";");
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(split_top_level("a, b(c, d), e", ','), vec!["a", "b(c, d)", "e"]);
        assert_eq!(split_top_level(".a\\,b, .c", ','), vec![".a\\,b", ".c"]);
    }

    #[test]
    fn test_matching_paren() {
        let text = "calc((1 + 2) * 3) rest";
        assert_eq!(matching_paren(text, 4), Some(16));
        assert_eq!(matching_paren("var(--a", 3), None);
    }
}
