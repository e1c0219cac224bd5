//! Decides which scanned classes can be resolved statically.

use indexmap::IndexMap;

/// Breakpoint variants stripped down to the bare utility
pub const RESPONSIVE_VARIANTS: &[&str] = &["sm", "md", "lg", "xl", "2xl"];

/// Substrings marking a variant that depends on user interaction
const INTERACTIVE_MARKERS: &[&str] = &["hover", "focus", "active"];

/// What to do with a single class token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassDisposition {
    /// Compile this utility; the original name aliases it
    Resolve(String),
    /// Interaction-state variant, left as a literal class
    Interactive,
    /// `dark:` variant, left as a literal class
    DarkMode,
}

/// A class to compile together with the name it was requested under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRequest {
    pub original: String,
    pub base: String,
}

/// Split a class into its variants and the utility, ignoring `:` inside
/// arbitrary-value brackets (`bg-[url(a:b)]`)
pub fn split_variants(class: &str) -> (Vec<&str>, &str) {
    let mut variants = Vec::new();
    let mut depth = 0i32;
    let mut last = 0;

    for (index, ch) in class.char_indices() {
        match ch {
            '[' | '(' => depth += 1,
            ']' | ')' => depth -= 1,
            ':' if depth == 0 => {
                variants.push(&class[last..index]);
                last = index + 1;
            }
            _ => {}
        }
    }

    (variants, &class[last..])
}

pub fn classify(class: &str) -> ClassDisposition {
    let (variants, _) = split_variants(class);

    if variants
        .iter()
        .any(|variant| INTERACTIVE_MARKERS.iter().any(|marker| variant.contains(marker)))
    {
        return ClassDisposition::Interactive;
    }
    if variants.iter().any(|variant| *variant == "dark") {
        return ClassDisposition::DarkMode;
    }

    // responsive prefixes are only stripped from the front
    let mut rest = class;
    loop {
        let Some((head, tail)) = rest.split_once(':') else { break };
        if !RESPONSIVE_VARIANTS.contains(&head) || tail.is_empty() {
            break;
        }
        rest = tail;
    }

    ClassDisposition::Resolve(rest.to_string())
}

/// Filter and deduplicate scanned classes, keeping first-seen order
pub fn filter_classes<I, S>(classes: I) -> Vec<ClassRequest>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut requests: IndexMap<String, String> = IndexMap::new();

    for class in classes {
        let class = class.as_ref().trim();
        if class.is_empty() || requests.contains_key(class) {
            continue;
        }
        match classify(class) {
            ClassDisposition::Resolve(base) => {
                requests.insert(class.to_string(), base);
            }
            disposition => log::debug!("Skipping {} ({:?})", class, disposition),
        }
    }

    requests
        .into_iter()
        .map(|(original, base)| ClassRequest { original, base })
        .collect()
}

/// Distinct base utilities of a request list, in order
pub fn unique_bases(requests: &[ClassRequest]) -> Vec<String> {
    let mut seen = indexmap::IndexSet::new();
    for request in requests {
        seen.insert(request.base.clone());
    }
    seen.into_iter().collect()
}
