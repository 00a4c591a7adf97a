//! Scope values and dot-path resolution.
//!
//! A scope is any `serde_json::Value`. Paths are dot separated (`page.title`,
//! `items.0.name`); empty segments pass through, so `""` and `"."` both name the
//! root. Resolution never fails loudly: a missing level simply yields `None`,
//! which the directive processor treats as "undefined".

use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use super::registry::Filter;

/// Resolve `path` against `scope`.
///
/// Returns `None` when any level is missing. `Some(Value::Null)` means the key
/// exists and holds `null`, which is not the same as undefined. Arrays accept
/// numeric segments, and arrays and strings expose a computed `length`.
///
/// ```rust
/// use serde_json::json;
/// use xhtpress::templating::scope::resolve;
///
/// let scope = json!({"a": {"b": {"c": 5}}});
/// assert_eq!(resolve("a.b.c", &scope).as_deref(), Some(&json!(5)));
/// assert_eq!(resolve("a.x.c", &scope), None);
/// assert_eq!(resolve("", &scope).as_deref(), Some(&scope));
/// ```
pub fn resolve<'a>(path: &str, scope: &'a Value) -> Option<Cow<'a, Value>> {
    let mut current = scope;
    let mut segments = path.trim().split('.').filter(|segment| !segment.is_empty()).peekable();

    while let Some(segment) = segments.next() {
        match child(current, segment) {
            Some(next) => current = next,
            None => {
                // `length` is computed, so nothing can be looked up beneath it.
                let length = length_of(current, segment)?;
                return segments.peek().is_none().then_some(Cow::Owned(length));
            }
        }
    }

    Some(Cow::Borrowed(current))
}

fn child<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|index| items.get(index)),
        _ => None,
    }
}

fn length_of(value: &Value, segment: &str) -> Option<Value> {
    if segment != "length" {
        return None;
    }
    match value {
        Value::Array(items) => Some(Value::from(items.len())),
        Value::String(text) => Some(Value::from(text.encode_utf16().count())),
        _ => None,
    }
}

/// Wrap a bare string or number as `{"value": scalar}`.
///
/// Iteration binds each element as the new scope; boxing lets a body address a
/// scalar element uniformly as `{{value}}`. Other values are returned as-is.
pub fn boxed(value: Cow<'_, Value>) -> Cow<'_, Value> {
    match value.as_ref() {
        Value::String(_) | Value::Number(_) => {
            let mut map = Map::with_capacity(1);
            map.insert("value".to_string(), value.into_owned());
            Cow::Owned(Value::Object(map))
        }
        _ => value,
    }
}

/// Data for one render call plus callables that live in the scope itself.
///
/// A `{{ path | name }}` whose `name` matches a scope function calls that
/// function in preference to a registered filter of the same name. Scope
/// functions are not visible inside iteration bodies, whose scope is the
/// current element.
#[derive(Clone, Default)]
pub struct Scope {
    data: Value,
    functions: HashMap<String, Filter>,
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("Scope").field("data", &self.data).field("functions", &names).finish()
    }
}

impl Scope {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            functions: HashMap::new(),
        }
    }

    /// Attach a scope-local function.
    pub fn with_function<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), std::sync::Arc::new(function));
        self
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn function(&self, name: &str) -> Option<&Filter> {
        self.functions.get(name)
    }

    pub(crate) fn functions(&self) -> &HashMap<String, Filter> {
        &self.functions
    }
}

impl From<Value> for Scope {
    fn from(data: Value) -> Self {
        Self::new(data)
    }
}
