//! Built-in filters and widgets.
//!
//! | Name | Kind | Output |
//! |------|------|--------|
//! | `fixed` | filter | number with two decimals (`3` → `3.00`) |
//! | `integer` | filter | leading integer of a number or numeric string (`"12px"` → `12`) |
//! | `json` | filter | compact JSON |
//! | `slug` | filter | lower-case, non-word runs collapsed to `-` |
//! | `test` | widget | its scope and keyword arguments as pretty JSON |

use serde_json::Value;

use super::loose;
use super::registry::{Registry, WidgetArgs};

pub(crate) fn register_builtins(registry: &mut Registry) {
    registry
        .register_filter("fixed", fixed)
        .register_filter("integer", integer)
        .register_filter("json", json)
        .register_filter("slug", slug)
        .register_widget("test", |args: WidgetArgs| async move {
            serde_json::to_string_pretty(&args.to_value()).map_err(anyhow::Error::from)
        });
}

/// Two-decimal fixed notation. Non-numeric input prints `NaN`.
pub fn fixed(value: &Value) -> String {
    let number = loose::to_number(Some(value));
    if number.is_nan() {
        return "NaN".to_string();
    }
    format!("{number:.2}")
}

/// Leading integer of the value's text, or `NaN` when there is none.
pub fn integer(value: &Value) -> String {
    let text = loose::to_text(value);
    let trimmed = text.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    if end == 0 {
        return "NaN".to_string();
    }
    let digits = digits[..end].trim_start_matches('0');
    match digits {
        "" => "0".to_string(),
        digits => format!("{sign}{digits}"),
    }
}

/// Compact JSON.
pub fn json(value: &Value) -> String {
    value.to_string()
}

/// URL-friendly slug: `"  Hello, World! "` → `"hello-world-"`.
pub fn slug(value: &Value) -> String {
    let text = loose::to_text(value).to_lowercase();
    let mut slug = String::with_capacity(text.len());
    for c in text.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug
}
