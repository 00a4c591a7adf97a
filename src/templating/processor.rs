//! Directive interpreter.
//!
//! [`process_segment`] tokenizes a template, builds the directive tree and walks
//! it against a scope. Includes are not handled here; by the time text reaches
//! this module the engine has already inlined them.
//!
//! # Scope levels
//!
//! Rendering keeps a chain of levels, innermost first. The root level holds the
//! caller's scope. Every iteration pass pushes a level for the current element.
//! A conditional is evaluated from the innermost level outwards, but its body
//! always renders against the chain the conditional appears in, so a loop body
//! guarded by an outer flag still sees the element first.
//!
//! - `{%EACH%}` resolves only in the innermost level.
//! - `{{variable}}` tries each level from the innermost outwards and keeps its
//!   source text when no level defines it.
//! - A false `{%IF%}` in a preserving level (iteration bodies, or a root called
//!   with `preserve = true`) is retried one level further out. It emits its
//!   source text when the chain runs out and nothing when it reaches a level
//!   that does not preserve.

use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;

use super::lexer::tokenize;
use super::loose;
use super::parser::{Condition, Node, Operand, parse};
use super::registry::{Filter, Registry};
use super::scope::{Scope, boxed, resolve};

/// Render `text` against `scope`.
///
/// With `preserve` set, a conditional that is false at the top level is left in
/// the output as written instead of being removed.
///
/// ```rust
/// use serde_json::json;
/// use xhtpress::templating::{Registry, Scope, process_segment};
///
/// let registry = Registry::with_builtins();
/// let scope = Scope::new(json!({"items": [1, 2, 3], "price": 3}));
///
/// assert_eq!(
///     process_segment("{%EACH items%}[{{value}}]{%ENDEACH%}", &scope, &registry, false),
///     "[1][2][3]"
/// );
/// assert_eq!(process_segment("{{price|fixed}}", &scope, &registry, false), "3.00");
/// assert_eq!(process_segment("{{missing}}", &scope, &registry, false), "{{missing}}");
/// ```
pub fn process_segment(text: &str, scope: &Scope, registry: &Registry, preserve: bool) -> String {
    if !text.contains('{') {
        return text.to_string();
    }

    let nodes = parse(text, tokenize(text));
    let data = boxed(Cow::Borrowed(scope.data()));
    let root = Level {
        data: &data,
        functions: Some(scope.functions()),
        preserve,
        parent: None,
    };

    let mut output = String::with_capacity(text.len());
    Interpreter {
        registry,
    }
    .render(&nodes, &root, &mut output);
    output
}

#[derive(Clone, Copy)]
struct Level<'a> {
    data: &'a Value,
    functions: Option<&'a HashMap<String, Filter>>,
    preserve: bool,
    parent: Option<&'a Level<'a>>,
}

impl<'a> Level<'a> {
    /// This level followed by its ancestors.
    fn chain(&self) -> impl Iterator<Item = &Level<'a>> {
        std::iter::successors(Some(self), |level| level.parent)
    }
}

struct Interpreter<'r> {
    registry: &'r Registry,
}

impl Interpreter<'_> {
    fn render(&self, nodes: &[Node<'_>], level: &Level<'_>, out: &mut String) {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Variable {
                    path,
                    filter,
                    raw,
                } => self.render_variable(path, *filter, raw, level, out),
                Node::Each {
                    path,
                    body,
                } => self.render_each(path, body, level, out),
                Node::If {
                    condition,
                    body,
                    raw,
                } => self.render_if(condition, body, raw, level, out),
            }
        }
    }

    fn render_variable(
        &self,
        path: &str,
        filter: Option<&str>,
        raw: &str,
        level: &Level<'_>,
        out: &mut String,
    ) {
        for frame in level.chain() {
            let Some(value) = resolve(path, frame.data) else {
                continue;
            };
            if value.is_null() {
                return;
            }

            let function = filter.and_then(|name| {
                let found = frame
                    .functions
                    .and_then(|functions| functions.get(name))
                    .or_else(|| self.registry.filter(name));
                if found.is_none() {
                    tracing::trace!("Unknown filter '{}' on '{}', substituting raw value", name, path);
                }
                found
            });
            match function {
                Some(function) => out.push_str(&function(value.as_ref())),
                None => out.push_str(&loose::to_text(&value)),
            }
            return;
        }

        out.push_str(raw);
    }

    fn render_each(&self, path: &str, body: &[Node<'_>], level: &Level<'_>, out: &mut String) {
        let Some(target) = resolve(path, level.data) else {
            return;
        };

        match target.as_ref() {
            Value::Array(items) => {
                for item in items {
                    self.render_element(Cow::Borrowed(item), body, level, out);
                }
            }
            Value::String(text) => {
                for c in text.chars() {
                    self.render_element(Cow::Owned(Value::String(c.to_string())), body, level, out);
                }
            }
            Value::Object(map) => {
                for key in map.keys() {
                    self.render_element(Cow::Owned(Value::String(key.clone())), body, level, out);
                }
            }
            _ => {}
        }
    }

    fn render_element(
        &self,
        element: Cow<'_, Value>,
        body: &[Node<'_>],
        parent: &Level<'_>,
        out: &mut String,
    ) {
        let element = boxed(element);
        let level = Level {
            data: &element,
            functions: None,
            preserve: true,
            parent: Some(parent),
        };
        self.render(body, &level, out);
    }

    fn render_if(
        &self,
        condition: &Condition<'_>,
        body: &[Node<'_>],
        raw: &str,
        level: &Level<'_>,
        out: &mut String,
    ) {
        for (depth, frame) in level.chain().enumerate() {
            if holds(condition, frame.data) {
                if depth == 0 {
                    let body_level = Level {
                        data: frame.data,
                        functions: frame.functions,
                        preserve: false,
                        parent: Some(frame),
                    };
                    self.render(body, &body_level, out);
                } else {
                    // Held further out: the body still looks up the innermost level first.
                    self.render(body, level, out);
                }
                return;
            }
            if !frame.preserve {
                return;
            }
        }

        out.push_str(raw);
    }
}

fn holds(condition: &Condition<'_>, data: &Value) -> bool {
    match condition {
        Condition::Truthy(path) => loose::is_truthy(resolve(path, data).as_deref()),
        Condition::Compare {
            left,
            op,
            right,
        } => {
            let left_value = resolve(left, data);
            let right_value = match right {
                Operand::Literal(value) => Some(Cow::Borrowed(value)),
                Operand::Invalid => None,
                Operand::LeftPath => left_value.clone(),
            };
            loose::compare(*op, left_value.as_deref(), right_value.as_deref())
        }
    }
}
