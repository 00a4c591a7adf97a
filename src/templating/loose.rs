//! Loose value semantics for conditionals and text output.
//!
//! Template data comes from JSON frontmatter and TOML config, where authors
//! routinely mix `"18"` and `18`. Conditionals therefore compare values the way
//! a dynamically typed scripting language would: numbers and numeric strings are
//! equal, booleans count as 0/1, and relational operators fall back to numeric
//! comparison unless both sides are strings.
//!
//! Every function takes `Option<&Value>`, where `None` is "undefined" (the path
//! did not resolve) and `Some(Value::Null)` is an explicit `null`.

use serde_json::Value;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

/// Comparison operators accepted by `{%IF left OP right%}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CompareOp {
    /// Parse an operator token. Two-character operators must be checked first
    /// by the caller's scanner; this only maps exact text.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "==" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            "<" => Some(Self::Lt),
            ">" => Some(Self::Gt),
            "<=" => Some(Self::Le),
            ">=" => Some(Self::Ge),
            _ => None,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
        };
        f.write_str(text)
    }
}

/// Truth test used by `{%IF path%}`.
///
/// Undefined, `null`, `false`, the empty string and the empty array are false.
/// Everything else is true, including `0` and `{}`.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

/// Evaluate `left OP right`.
pub fn compare(op: CompareOp, left: Option<&Value>, right: Option<&Value>) -> bool {
    match op {
        CompareOp::Eq => loose_eq(left, right),
        CompareOp::Ne => !loose_eq(left, right),
        CompareOp::Lt => relation(left, right).is_some_and(Ordering::is_lt),
        CompareOp::Gt => relation(left, right).is_some_and(Ordering::is_gt),
        CompareOp::Le => relation(left, right).is_some_and(Ordering::is_le),
        CompareOp::Ge => relation(left, right).is_some_and(Ordering::is_ge),
    }
}

/// Render a value as template output text.
///
/// Integral numbers print without a fractional part, arrays join their elements
/// with `,` (null elements print empty), and objects print as
/// `[object Object]`.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => match number.as_f64() {
            Some(float) if number.is_f64() => format_number(float),
            _ => number.to_string(),
        },
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_text(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Numeric conversion used by loose equality and relational comparison.
///
/// Undefined and objects are NaN, `null` is 0, booleans are 0/1, strings are
/// parsed after trimming (blank is 0, garbage is NaN).
pub fn to_number(value: Option<&Value>) -> f64 {
    match value {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(flag)) => f64::from(u8::from(*flag)),
        Some(Value::Number(number)) => number.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(text)) => parse_number(text),
        Some(array @ Value::Array(_)) => parse_number(&to_text(array)),
        Some(Value::Object(_)) => f64::NAN,
    }
}

fn format_number(float: f64) -> String {
    if float == 0.0 {
        // -0 prints as 0
        return "0".to_string();
    }
    if float.is_nan() {
        return "NaN".to_string();
    }
    if float.is_infinite() {
        return if float > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    float.to_string()
}

fn parse_number(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    // Rust accepts "inf" and "nan" spellings that templates never mean as numbers.
    let numeric = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
    if !numeric {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

/// Primitive form of a value: arrays and objects collapse to their text.
enum Primitive<'a> {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Text(Cow<'a, str>),
}

fn to_primitive(value: Option<&Value>) -> Primitive<'_> {
    match value {
        None => Primitive::Undefined,
        Some(Value::Null) => Primitive::Null,
        Some(Value::Bool(flag)) => Primitive::Bool(*flag),
        Some(Value::Number(number)) => Primitive::Number(number.as_f64().unwrap_or(f64::NAN)),
        Some(Value::String(text)) => Primitive::Text(Cow::Borrowed(text)),
        Some(other) => Primitive::Text(Cow::Owned(to_text(other))),
    }
}

fn primitive_number(primitive: &Primitive<'_>) -> f64 {
    match primitive {
        Primitive::Undefined => f64::NAN,
        Primitive::Null => 0.0,
        Primitive::Bool(flag) => f64::from(u8::from(*flag)),
        Primitive::Number(number) => *number,
        Primitive::Text(text) => parse_number(text),
    }
}

/// Loose equality.
///
/// Two containers compare structurally. A container against a primitive is
/// compared through its text form.
pub fn loose_eq(left: Option<&Value>, right: Option<&Value>) -> bool {
    match (left, right) {
        (None | Some(Value::Null), None | Some(Value::Null)) => true,
        (None | Some(Value::Null), _) | (_, None | Some(Value::Null)) => false,
        (Some(a @ (Value::Array(_) | Value::Object(_))), Some(b @ (Value::Array(_) | Value::Object(_)))) => {
            a == b
        }
        _ => primitive_eq(&to_primitive(left), &to_primitive(right)),
    }
}

fn primitive_eq(left: &Primitive<'_>, right: &Primitive<'_>) -> bool {
    match (left, right) {
        (Primitive::Text(a), Primitive::Text(b)) => a == b,
        (Primitive::Bool(a), Primitive::Bool(b)) => a == b,
        _ => primitive_number(left) == primitive_number(right),
    }
}

/// Relational ordering; `None` when either side is not comparable (NaN).
fn relation(left: Option<&Value>, right: Option<&Value>) -> Option<Ordering> {
    let left = to_primitive(left);
    let right = to_primitive(right);
    if let (Primitive::Text(a), Primitive::Text(b)) = (&left, &right) {
        return Some(a.as_ref().cmp(b.as_ref()));
    }
    primitive_number(&left).partial_cmp(&primitive_number(&right))
}
