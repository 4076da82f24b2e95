//! Heuristics that decide whether channel values are already in output units.
//!
//! A channel whose values all pass the predicate for its scale is left unscaled.
//! Non-finite numbers are never output-like.

use css_color_parser::Color;
use trellis_common::{RawValue, ScaleName};

const COLOR_KEYWORDS: &[&str] = &["currentcolor", "none", "transparent", "inherit"];

/// Symbol names understood by the symbol scale's palettes
pub const SYMBOL_NAMES: &[&str] = &[
    "asterisk", "circle", "cross", "diamond", "diamond2", "hexagon", "plus", "square",
    "square2", "star", "times", "triangle", "triangle2", "wye",
];

/// A CSS color string, color keyword, or CSS variable reference
pub fn is_color_like(value: &RawValue) -> bool {
    let Some(s) = value.as_str() else {
        return false;
    };
    let s = s.trim();
    if s.is_empty() {
        return false;
    }
    let lower = s.to_ascii_lowercase();
    COLOR_KEYWORDS.contains(&lower.as_str())
        || lower.starts_with("var(--")
        || lower.starts_with("url(")
        || s.parse::<Color>().is_ok()
}

/// A finite number within [0, 1]
pub fn is_opacity_like(value: &RawValue) -> bool {
    match value {
        RawValue::Number(v) => v.is_finite() && (0.0..=1.0).contains(v),
        _ => false,
    }
}

/// A known symbol name, case-insensitively
pub fn is_symbol_like(value: &RawValue) -> bool {
    value
        .as_str()
        .map(|s| SYMBOL_NAMES.contains(&s.trim().to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Whether a single value is already in the output units of `scale`
pub fn looks_like_output(scale: ScaleName, value: &RawValue) -> bool {
    match scale {
        ScaleName::Color => is_color_like(value),
        ScaleName::Opacity => is_opacity_like(value),
        ScaleName::Symbol => is_symbol_like(value),
        _ => false,
    }
}

/// Whether every non-null value is already output-like. An all-null channel is
/// not considered output-like.
pub fn all_look_like_output<'a>(
    scale: ScaleName,
    values: impl IntoIterator<Item = &'a RawValue>,
) -> bool {
    let mut any = false;
    for value in values.into_iter().filter(|v| !v.is_null()) {
        if !looks_like_output(scale, value) {
            return false;
        }
        any = true;
    }
    any
}
