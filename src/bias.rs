//! Bias label normalization.
//!
//! Datasets tag outlets with camelCase categories (`leanLeft`, `farRight`, ...)
//! and rate articles on a 0..4 scale. Everything is folded onto a signed
//! five-point scale in [-2, 2]. All functions are total: anything that cannot
//! be read degrades to the center value.

use serde_json::Value;

pub const MIN_BIAS: i8 = -2;
pub const MAX_BIAS: i8 = 2;
pub const CENTER: i8 = 0;

/// Display buckets, index = value + 2.
pub const CATEGORIES: [&str; 5] = ["Left", "Center-Left", "Center", "Center-Right", "Right"];

/// Legend labels of the seven-point outlet rating, index = rating + 3.
pub const RATING_LABELS: [&str; 7] = [
    "Far Left",
    "Left",
    "Lean Left",
    "Center",
    "Lean Right",
    "Right",
    "Far Right",
];

const BIAS_COLORS: [&str; 5] = ["#08305B", "#2272B2", "#D0D1D5", "#FB6A4A", "#A50F15"];
const RATING_COLORS: [&str; 7] = [
    "#0072B2", "#56B4E9", "#92C5DE", "#D0D1D5", "#F4A582", "#CA0020", "#D01719",
];
const UNKNOWN_COLOR: &str = "#999";

fn fold(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Categorical tag or display label -> [-2, 2]. Unknown labels map to center.
pub fn to_numeric(label: &str) -> i8 {
    known_numeric(label).unwrap_or(CENTER)
}

/// Like [`to_numeric`] but None for labels outside the known tag set.
pub fn known_numeric(label: &str) -> Option<i8> {
    match fold(label).as_str() {
        "farleft" | "left" => Some(-2),
        "leanleft" | "centerleft" => Some(-1),
        "center" | "unknown" => Some(0),
        "leanright" | "centerright" => Some(1),
        "right" | "farright" => Some(2),
        _ => None,
    }
}

/// Numeric bias -> display bucket. Rounds to the nearest bucket and clamps.
pub fn to_display_label(value: f64) -> &'static str {
    CATEGORIES[bucket_index(value)]
}

fn bucket_index(value: f64) -> usize {
    if !value.is_finite() {
        return (CENTER - MIN_BIAS) as usize;
    }
    let clamped = value.round().clamp(MIN_BIAS as f64, MAX_BIAS as f64) as i8;
    (clamped - MIN_BIAS) as usize
}

/// Seven-point outlet rating in [-3, 3], kept for the timeline legend.
pub fn outlet_rating(label: &str) -> i8 {
    match fold(label).as_str() {
        "farleft" => -3,
        "left" => -2,
        "leanleft" | "centerleft" => -1,
        "leanright" | "centerright" => 1,
        "right" => 2,
        "farright" => 3,
        _ => 0,
    }
}

pub fn rating_label(rating: i8) -> &'static str {
    RATING_LABELS[(rating.clamp(-3, 3) + 3) as usize]
}

pub fn rating_color(rating: i8) -> &'static str {
    if !(-3..=3).contains(&rating) {
        return UNKNOWN_COLOR;
    }
    RATING_COLORS[(rating + 3) as usize]
}

/// Five-point color; out-of-range values get the neutral gray.
pub fn bias_color(value: i8) -> &'static str {
    if !(MIN_BIAS..=MAX_BIAS).contains(&value) {
        return UNKNOWN_COLOR;
    }
    BIAS_COLORS[(value - MIN_BIAS) as usize]
}

/// Article bias arrives on 0..4, as a number or a numeric string.
/// Returns the value shifted onto [-2, 2], or None when it is not numeric.
pub fn article_bias(raw: &Value) -> Option<f64> {
    let v = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_leading_float(s)?,
        _ => return None,
    };
    if v.is_finite() {
        Some(v - 2.0)
    } else {
        None
    }
}

/// Accepts the longest numeric prefix ("3.5abc" -> 3.5), as lenient
/// browser-side parsing did for these fields.
fn parse_leading_float(s: &str) -> Option<f64> {
    let s = s.trim();
    let mut end = 0;
    for (i, _) in s.char_indices().skip(1).chain(std::iter::once((s.len(), ' '))) {
        if s[..i].parse::<f64>().is_ok() {
            end = i;
        }
    }
    if end == 0 {
        return None;
    }
    s[..end].parse().ok()
}
