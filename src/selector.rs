//! Decoding of compiler-emitted class selectors.
//!
//! Utility compilers escape class names per the CSS identifier rules, so
//! `md:p-4` arrives as `.md\:p-4` and `2xl:flex` as `.\32 xl\:flex`. Only
//! simple single-class selectors are accepted; anything that is still
//! compound after decoding maps to no class.

/// Decode a selector such as `.w-1\/2` into the class name `w-1/2`.
///
/// Returns `None` when the selector is not a single class: a missing leading
/// `.`, raw whitespace, combinators (`>`, `+`, `~`), a second class, an id,
/// an attribute selector or an unescaped pseudo-class marker.
pub fn decode_class_selector(selector: &str) -> Option<String> {
    let body = selector.trim().strip_prefix('.')?;
    let mut decoded = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                let next = *chars.peek()?;
                if next.is_ascii_hexdigit() {
                    let mut code = 0u32;
                    let mut digits = 0;
                    while digits < 6 {
                        match chars.peek().and_then(|c| c.to_digit(16)) {
                            Some(digit) => {
                                code = code * 16 + digit;
                                digits += 1;
                                chars.next();
                            }
                            None => break,
                        }
                    }
                    // one whitespace character terminates a hex escape
                    if matches!(chars.peek(), Some(c) if c.is_whitespace()) {
                        chars.next();
                    }
                    decoded.push(hex_escape_char(code));
                } else {
                    decoded.push(next);
                    chars.next();
                }
            }
            c if c.is_whitespace() => return None,
            '>' | '+' | '~' | ':' | '.' | '#' | '[' | ',' | '*' => return None,
            c => decoded.push(c),
        }
    }

    (!decoded.is_empty()).then_some(decoded)
}

fn hex_escape_char(code: u32) -> char {
    match code {
        0 => char::REPLACEMENT_CHARACTER,
        0xD800..=0xDFFF => char::REPLACEMENT_CHARACTER,
        _ => char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER),
    }
}

/// Escape a class name the way utility compilers emit it, returning the
/// selector with its leading `.`.
pub fn escape_class_name(class: &str) -> String {
    let mut escaped = String::with_capacity(class.len() + 8);
    escaped.push('.');

    for (index, ch) in class.chars().enumerate() {
        let leading_digit = index == 0 && ch.is_ascii_digit();
        let digit_after_dash = index == 1 && ch.is_ascii_digit() && class.starts_with('-');
        if leading_digit || digit_after_dash {
            escaped.push_str(&format!("\\{:x} ", ch as u32));
        } else if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii() {
            escaped.push(ch);
        } else {
            escaped.push('\\');
            escaped.push(ch);
        }
    }

    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_class() {
        assert_eq!(decode_class_selector(".flex").as_deref(), Some("flex"));
        assert_eq!(decode_class_selector(".bg-blue-500").as_deref(), Some("bg-blue-500"));
    }

    #[test]
    fn test_single_char_escapes() {
        assert_eq!(decode_class_selector(".w-1\\/2").as_deref(), Some("w-1/2"));
        assert_eq!(decode_class_selector(".md\\:p-4").as_deref(), Some("md:p-4"));
        assert_eq!(decode_class_selector(".p-0\\.5").as_deref(), Some("p-0.5"));
        assert_eq!(decode_class_selector(".text-\\[\\#1a73e8\\]").as_deref(), Some("text-[#1a73e8]"));
    }

    #[test]
    fn test_hex_escapes() {
        assert_eq!(decode_class_selector(".\\32 xl\\:flex").as_deref(), Some("2xl:flex"));
        assert_eq!(decode_class_selector(".\\31 0").as_deref(), Some("10"));
        assert_eq!(decode_class_selector(".a\\2f b").as_deref(), Some("a/b"));
    }

    #[test]
    fn test_compound_selectors_rejected() {
        assert_eq!(decode_class_selector(".hover\\:bg-blue-500:hover"), None);
        assert_eq!(decode_class_selector(".space-x-4 > :not(:last-child)"), None);
        assert_eq!(decode_class_selector(".a.b"), None);
        assert_eq!(decode_class_selector(".a + .b"), None);
        assert_eq!(decode_class_selector(".a~.b"), None);
        assert_eq!(decode_class_selector("div"), None);
        assert_eq!(decode_class_selector(":root"), None);
        assert_eq!(decode_class_selector("."), None);
    }

    #[test]
    fn test_escape_decode_round_trip() {
        for class in ["flex", "md:p-4", "w-1/2", "p-0.5", "2xl:flex", "-mt-2", "a_b", "1", "-9x"] {
            let selector = escape_class_name(class);
            assert_eq!(decode_class_selector(&selector).as_deref(), Some(class), "selector {}", selector);
        }
    }
}
