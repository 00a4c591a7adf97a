//! Asynchronous widget pass.
//!
//! Runs over text that has already been through the directive processor and
//! replaces markers such as `{{$ gallery size="3" $}}` with the output of the
//! registered widget of that name.
//!
//! All markers are collected up front with their byte ranges. Every registered
//! widget is invoked in order of appearance and the invocations run
//! concurrently; results are spliced back by position once all of them have
//! finished, so a slow widget early in the page still lands in its own slot.
//! Markers naming an unregistered widget stay in the output unchanged.

use futures::future::try_join_all;
use regex::Regex;
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::{Arc, OnceLock};

use super::error::TemplateError;
use super::registry::{Registry, Widget, WidgetArgs};
use super::scope::Scope;

struct Patterns {
    marker: Regex,
    argument: Regex,
}

fn patterns() -> Option<&'static Patterns> {
    static PATTERNS: OnceLock<Option<Patterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some(Patterns {
                marker: Regex::new(r#"(?i)\{\{\$\s*([a-z0-9_.]*)\s*([\w =":./]+)?\$\}\}"#).ok()?,
                argument: Regex::new(r#"\s*(\w+)="([\w .\-/:]+?)"\s*"#).ok()?,
            })
        })
        .as_ref()
}

struct Invocation {
    range: Range<usize>,
    name: String,
    widget: Arc<dyn Widget>,
    args: BTreeMap<String, String>,
}

/// Replace every registered widget marker in `text`.
///
/// # Errors
///
/// Returns [`TemplateError::Widget`] for the first widget that fails. No partial
/// output is produced in that case.
pub async fn resolve_widgets(
    text: &str,
    scope: &Scope,
    registry: &Registry,
) -> Result<String, TemplateError> {
    let Some(patterns) = patterns() else {
        return Ok(text.to_string());
    };

    let mut invocations = Vec::new();
    for captures in patterns.marker.captures_iter(text) {
        let Some(marker) = captures.get(0) else {
            continue;
        };
        let name = captures.get(1).map_or("", |m| m.as_str());
        let Some(widget) = registry.widget(name) else {
            tracing::debug!("No widget registered as '{}', leaving marker in place", name);
            continue;
        };

        let mut args = BTreeMap::new();
        if let Some(list) = captures.get(2) {
            for argument in patterns.argument.captures_iter(list.as_str()) {
                args.insert(argument[1].to_string(), argument[2].to_string());
            }
        }

        invocations.push(Invocation {
            range: marker.range(),
            name: name.to_string(),
            widget,
            args,
        });
    }

    if invocations.is_empty() {
        return Ok(text.to_string());
    }

    tracing::debug!("Dispatching {} widget invocation(s)", invocations.len());
    let scope = Arc::new(scope.data().clone());
    let pending = invocations.iter().map(|invocation| {
        let future = invocation.widget.call(WidgetArgs {
            scope: Arc::clone(&scope),
            args: invocation.args.clone(),
        });
        let name = invocation.name.clone();
        async move {
            future.await.map_err(|source| TemplateError::Widget {
                name,
                source: source.into(),
            })
        }
    });
    let outputs = try_join_all(pending).await?;

    let mut output = String::with_capacity(text.len());
    let mut last = 0;
    for (invocation, replacement) in invocations.iter().zip(outputs) {
        output.push_str(&text[last..invocation.range.start]);
        output.push_str(&replacement);
        last = invocation.range.end;
    }
    output.push_str(&text[last..]);

    Ok(output)
}
