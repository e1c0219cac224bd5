//! Minimal component-template tokenizer.
//!
//! Produces the start tags of a template in document order with their
//! attributes and byte ranges, which is all the scanner and rewriter read.
//! Text, `{{ ... }}` interpolations, comments and the bodies of raw-text
//! elements (`script`, `style`, `textarea`, `title`) are skipped.

use std::ops::Range;

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    /// Value without quotes; `None` for bare attributes like `disabled`
    pub value: Option<String>,
    /// Whole attribute, from the first byte of the name to the closing quote
    pub range: Range<usize>,
    /// Value bytes, excluding quotes
    pub value_range: Option<Range<usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<Attribute>,
    /// `<` through `>` of the start tag
    pub tag_range: Range<usize>,
    pub self_closing: bool,
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }
}

/// Start tags of a template in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub elements: Vec<Element>,
}

/// Tokenize `source`. Returns `None` when a tag, quoted attribute value or
/// comment is left unterminated.
pub fn parse(source: &str) -> Option<Document> {
    let mut tokenizer = Tokenizer { source, bytes: source.as_bytes(), pos: 0 };
    let mut document = Document::default();

    while tokenizer.pos < tokenizer.bytes.len() {
        let rest = &source[tokenizer.pos..];
        if rest.starts_with("{{") {
            tokenizer.pos = match rest.find("}}") {
                Some(close) => tokenizer.pos + close + 2,
                None => tokenizer.bytes.len(),
            };
        } else if rest.starts_with("<!--") {
            let close = rest.find("-->")?;
            tokenizer.pos += close + 3;
        } else if rest.starts_with("<!") || rest.starts_with("<?") || rest.starts_with("</") {
            let close = rest.find('>')?;
            tokenizer.pos += close + 1;
        } else if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            let element = tokenizer.start_tag()?;
            let tag = element.tag.to_ascii_lowercase();
            let self_closing = element.self_closing;
            document.elements.push(element);
            if !self_closing && RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
                tokenizer.skip_raw_text(&tag);
            }
        } else {
            tokenizer.pos += rest.chars().next().map_or(1, char::len_utf8);
        }
    }

    Some(document)
}

struct Tokenizer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl Tokenizer<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, keep: impl Fn(u8) -> bool) -> Range<usize> {
        let start = self.pos;
        while self.peek().is_some_and(&keep) {
            self.pos += 1;
        }
        start..self.pos
    }

    fn start_tag(&mut self) -> Option<Element> {
        let tag_start = self.pos;
        self.pos += 1;
        let name = self.take_while(|b| !b.is_ascii_whitespace() && b != b'>' && b != b'/');
        let tag = self.source[name].to_string();
        let mut attributes = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek()? {
                b'>' => {
                    self.pos += 1;
                    return Some(Element {
                        tag,
                        attributes,
                        tag_range: tag_start..self.pos,
                        self_closing: false,
                    });
                }
                b'/' if self.bytes.get(self.pos + 1) == Some(&b'>') => {
                    self.pos += 2;
                    return Some(Element {
                        tag,
                        attributes,
                        tag_range: tag_start..self.pos,
                        self_closing: true,
                    });
                }
                b'/' => self.pos += 1,
                _ => attributes.push(self.attribute()?),
            }
        }
    }

    fn attribute(&mut self) -> Option<Attribute> {
        let name_range = self.take_while(|b| {
            !b.is_ascii_whitespace() && b != b'=' && b != b'>' && b != b'/'
        });
        if name_range.is_empty() {
            // stray `=` and the like
            self.pos += 1;
            return Some(Attribute {
                name: String::new(),
                value: None,
                range: name_range.start..self.pos,
                value_range: None,
            });
        }
        let name = self.source[name_range.clone()].to_string();

        let after_name = self.pos;
        self.skip_whitespace();
        if self.peek() != Some(b'=') {
            self.pos = after_name;
            return Some(Attribute { name, value: None, range: name_range, value_range: None });
        }
        self.pos += 1;
        self.skip_whitespace();

        let value_range = match self.peek()? {
            quote @ (b'"' | b'\'') => {
                self.pos += 1;
                let start = self.pos;
                let len = self.source[start..].find(quote as char)?;
                self.pos = start + len + 1;
                start..start + len
            }
            _ => self.take_while(|b| !b.is_ascii_whitespace() && b != b'>'),
        };

        Some(Attribute {
            name,
            value: Some(self.source[value_range.clone()].to_string()),
            range: name_range.start..self.pos,
            value_range: Some(value_range),
        })
    }

    fn skip_raw_text(&mut self, tag: &str) {
        let closing = format!("</{}", tag);
        let rest = self.source[self.pos..].to_ascii_lowercase();
        self.pos = match rest.find(&closing) {
            Some(offset) => self.pos + offset,
            None => self.bytes.len(),
        };
    }
}
