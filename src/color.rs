//! Color normalization to sRGB hex.
//!
//! `oklch()`/`oklab()` colors are converted through OKLab into sRGB. Colors
//! outside the sRGB gamut are brought inside by reducing chroma at constant
//! lightness and hue (binary search), never by clamping channels, which would
//! shift the hue. Everything else the `csscolorparser` crate understands is
//! converted directly.

use crate::stylesheet::{matching_paren, split_top_level};

/// Properties whose whole value is a single color
const SINGLE_COLOR_PROPERTIES: &[&str] = &[
    "color",
    "background-color",
    "border-color",
    "outline-color",
    "fill",
    "stroke",
    "text-decoration-color",
    "caret-color",
    "accent-color",
];

/// Properties that may carry gradients; only `oklch()` sub-expressions are
/// rewritten in place
const GRADIENT_PROPERTIES: &[&str] = &["background-image", "background"];

/// Values left untouched even though a color parser would accept some of them
const PASSTHROUGH_KEYWORDS: &[&str] = &[
    "transparent",
    "currentcolor",
    "inherit",
    "initial",
    "unset",
    "revert",
    "revert-layer",
    "none",
];

const GAMUT_EPSILON: f64 = 2e-4;
const GAMUT_SEARCH_STEPS: usize = 24;

/// A color in gamma-encoded sRGB, channels in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Srgb {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Srgb {
    /// Format as `#rrggbb`, or `#rrggbbaa` when not fully opaque
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = [self.red, self.green, self.blue, self.alpha].map(to_byte);
        if a == u8::MAX {
            format!("#{:02x}{:02x}{:02x}", r, g, b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
        }
    }

    fn from_rgba8(channels: [u8; 4]) -> Self {
        let [r, g, b, a] = channels.map(|c| f64::from(c) / 255.0);
        Self { red: r, green: g, blue: b, alpha: a }
    }
}

fn to_byte(channel: f64) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// An OKLCH color; lightness in `0..=1`, hue in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Oklch {
    pub lightness: f64,
    pub chroma: f64,
    pub hue: f64,
    pub alpha: f64,
}

impl Oklch {
    /// Convert to sRGB, reducing chroma until the color fits the gamut
    pub fn to_srgb_gamut_mapped(&self) -> Srgb {
        let alpha = self.alpha.clamp(0.0, 1.0);
        if self.lightness >= 1.0 {
            return Srgb { red: 1.0, green: 1.0, blue: 1.0, alpha };
        }
        if self.lightness <= 0.0 {
            return Srgb { red: 0.0, green: 0.0, blue: 0.0, alpha };
        }

        let chroma = self.chroma.max(0.0);
        let linear = if in_gamut(linear_srgb(self.lightness, chroma, self.hue)) {
            linear_srgb(self.lightness, chroma, self.hue)
        } else {
            let mut low = 0.0;
            let mut high = chroma;
            for _ in 0..GAMUT_SEARCH_STEPS {
                let mid = (low + high) / 2.0;
                if in_gamut(linear_srgb(self.lightness, mid, self.hue)) {
                    low = mid;
                } else {
                    high = mid;
                }
            }
            linear_srgb(self.lightness, low, self.hue)
        };

        Srgb {
            red: gamma_encode(linear[0]).clamp(0.0, 1.0),
            green: gamma_encode(linear[1]).clamp(0.0, 1.0),
            blue: gamma_encode(linear[2]).clamp(0.0, 1.0),
            alpha,
        }
    }
}

fn linear_srgb(lightness: f64, chroma: f64, hue: f64) -> [f64; 3] {
    let radians = hue.to_radians();
    let a = chroma * radians.cos();
    let b = chroma * radians.sin();

    let l_ = lightness + 0.396_337_777_4 * a + 0.215_803_757_3 * b;
    let m_ = lightness - 0.105_561_345_8 * a - 0.063_854_172_8 * b;
    let s_ = lightness - 0.089_484_177_5 * a - 1.291_485_548_0 * b;

    let l = l_ * l_ * l_;
    let m = m_ * m_ * m_;
    let s = s_ * s_ * s_;

    [
        4.076_741_662_1 * l - 3.307_711_591_3 * m + 0.230_969_929_2 * s,
        -1.268_438_004_6 * l + 2.609_757_401_1 * m - 0.341_319_396_5 * s,
        -0.004_196_086_3 * l - 0.703_418_614_7 * m + 1.707_614_701_0 * s,
    ]
}

fn in_gamut(linear: [f64; 3]) -> bool {
    linear
        .iter()
        .all(|channel| (-GAMUT_EPSILON..=1.0 + GAMUT_EPSILON).contains(channel))
}

fn gamma_encode(channel: f64) -> f64 {
    if channel <= 0.003_130_8 {
        12.92 * channel
    } else {
        1.055 * channel.powf(1.0 / 2.4) - 0.055
    }
}

/// Whether `property` carries a color this module rewrites
pub fn is_color_property(property: &str) -> bool {
    SINGLE_COLOR_PROPERTIES.contains(&property)
        || (property.starts_with("border-") && property.ends_with("-color"))
        || GRADIENT_PROPERTIES.contains(&property)
}

/// Normalize the value of a declaration. Non-color properties, values still
/// holding `var()` and unparseable colors come back unchanged.
pub fn normalize_property_value(property: &str, value: &str) -> String {
    if value.contains("var(") {
        return value.to_string();
    }
    if GRADIENT_PROPERTIES.contains(&property) {
        return substitute_oklch(value);
    }
    if is_color_property(property) {
        return normalize_color(value);
    }
    value.to_string()
}

/// Convert a single CSS color to hex. Pure: the same input always yields the
/// same output; anything unparseable is returned as given.
pub fn normalize_color(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.contains("var(") || PASSTHROUGH_KEYWORDS.iter().any(|k| trimmed.eq_ignore_ascii_case(k)) {
        return value.to_string();
    }

    match parse_color(trimmed) {
        Some(color) => color.to_hex(),
        None => value.to_string(),
    }
}

/// Replace each `oklch(...)` inside a larger value (typically a gradient)
/// with its hex form, keeping the surrounding text verbatim
pub fn substitute_oklch(value: &str) -> String {
    let lower = value.to_ascii_lowercase();
    let mut out = String::with_capacity(value.len());
    let mut cursor = 0;

    while let Some(found) = lower[cursor..].find("oklch(") {
        let start = cursor + found;
        let open = start + "oklch".len();
        let Some(close) = matching_paren(value, open) else {
            break;
        };
        out.push_str(&value[cursor..start]);
        let expression = &value[start..=close];
        match parse_color(expression) {
            Some(color) => out.push_str(&color.to_hex()),
            None => out.push_str(expression),
        }
        cursor = close + 1;
    }

    out.push_str(&value[cursor..]);
    out
}

/// Parse any supported color into sRGB
pub fn parse_color(value: &str) -> Option<Srgb> {
    let value = value.trim();
    if let Some((name, args)) = split_function(value) {
        match name.as_str() {
            "oklch" => return parse_oklch(args).map(|c| c.to_srgb_gamut_mapped()),
            "oklab" => return parse_oklab(args).map(|c| c.to_srgb_gamut_mapped()),
            "color-mix" => return parse_color_mix(args),
            _ => {}
        }
    }

    let parsed: csscolorparser::Color = value.parse().ok()?;
    Some(Srgb::from_rgba8(parsed.to_rgba8()))
}

/// Split `name(args)` into a lower-cased name and the argument text
fn split_function(value: &str) -> Option<(String, &str)> {
    let open = value.find('(')?;
    let close = matching_paren(value, open)?;
    if close != value.len() - 1 {
        return None;
    }
    let name = value[..open].trim().to_ascii_lowercase();
    Some((name, &value[open + 1..close]))
}

/// Split color function arguments into channel components and optional alpha
fn components(args: &str) -> Option<(Vec<&str>, Option<&str>)> {
    let (channels, alpha) = match args.split_once('/') {
        Some((channels, alpha)) => (channels, Some(alpha.trim())),
        None => (args, None),
    };
    let parts: Vec<&str> = channels
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .collect();
    (parts.len() == 3).then_some((parts, alpha))
}

fn parse_number(raw: &str, percent_reference: f64) -> Option<f64> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("none") {
        return Some(0.0);
    }
    let (number, scale) = match raw.strip_suffix('%') {
        Some(number) => (number, percent_reference / 100.0),
        None => (raw, 1.0),
    };
    if !number.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '.' | '-' | '+')) {
        return None;
    }
    let parsed: f64 = number.parse().ok()?;
    parsed.is_finite().then_some(parsed * scale)
}

fn parse_hue(raw: &str) -> Option<f64> {
    let raw = raw.trim().to_ascii_lowercase();
    let (number, factor) = if let Some(n) = raw.strip_suffix("deg") {
        (n, 1.0)
    } else if let Some(n) = raw.strip_suffix("grad") {
        (n, 0.9)
    } else if let Some(n) = raw.strip_suffix("rad") {
        (n, 180.0 / std::f64::consts::PI)
    } else if let Some(n) = raw.strip_suffix("turn") {
        (n, 360.0)
    } else {
        (raw.as_str(), 1.0)
    };
    parse_number(number, 1.0).map(|hue| (hue * factor).rem_euclid(360.0))
}

fn parse_alpha(raw: Option<&str>) -> Option<f64> {
    match raw {
        Some(raw) => parse_number(raw, 1.0).map(|a| a.clamp(0.0, 1.0)),
        None => Some(1.0),
    }
}

fn parse_oklch(args: &str) -> Option<Oklch> {
    let (parts, alpha) = components(args)?;
    Some(Oklch {
        lightness: parse_number(parts[0], 1.0)?,
        chroma: parse_number(parts[1], 0.4)?,
        hue: parse_hue(parts[2])?,
        alpha: parse_alpha(alpha)?,
    })
}

fn parse_oklab(args: &str) -> Option<Oklch> {
    let (parts, alpha) = components(args)?;
    let lightness = parse_number(parts[0], 1.0)?;
    let a = parse_number(parts[1], 0.4)?;
    let b = parse_number(parts[2], 0.4)?;
    Some(Oklch {
        lightness,
        chroma: a.hypot(b),
        hue: b.atan2(a).to_degrees().rem_euclid(360.0),
        alpha: parse_alpha(alpha)?,
    })
}

/// `color-mix(in <space>, <color> [p%], transparent [q%])`, the shape utility
/// compilers emit for opacity modifiers. Other mixes are not evaluated.
fn parse_color_mix(args: &str) -> Option<Srgb> {
    let parts = split_top_level(args, ',');
    if parts.len() != 3 || !parts[0].trim_start().starts_with("in ") {
        return None;
    }

    let (first, first_pct) = mix_operand(parts[1])?;
    let (second, second_pct) = mix_operand(parts[2])?;

    let (color, color_pct, other_pct) = if second.eq_ignore_ascii_case("transparent") {
        (first, first_pct, second_pct)
    } else if first.eq_ignore_ascii_case("transparent") {
        (second, second_pct, first_pct)
    } else {
        return None;
    };

    let (color_pct, other_pct) = match (color_pct, other_pct) {
        (Some(c), Some(o)) => (c, o),
        (Some(c), None) => (c, 1.0 - c),
        (None, Some(o)) => (1.0 - o, o),
        (None, None) => (0.5, 0.5),
    };
    let total = color_pct + other_pct;
    if total <= 0.0 {
        return None;
    }

    let mut mixed = parse_color(color)?;
    mixed.alpha = (mixed.alpha * color_pct / total.max(1.0)).clamp(0.0, 1.0);
    Some(mixed)
}

fn mix_operand(operand: &str) -> Option<(&str, Option<f64>)> {
    let operand = operand.trim();
    if let Some((color, pct)) = operand.rsplit_once(char::is_whitespace) {
        if pct.ends_with('%') && !color.trim().is_empty() {
            return Some((color.trim(), Some(parse_number(pct, 1.0)?.clamp(0.0, 1.0))));
        }
    }
    Some((operand, None))
}
