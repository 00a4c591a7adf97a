//! Named filters and widgets.
//!
//! A [`Registry`] is owned by whoever builds the engine and shared with it
//! through an `Arc`. Register everything before rendering starts; later
//! registrations under the same name replace earlier ones.
//!
//! - **Filters** are synchronous `Fn(&Value) -> String` transformations applied
//!   by `{{ path | name }}`.
//! - **Widgets** are asynchronous handlers invoked by `{{$ name key="value" $}}`
//!   markers during the widget pass.
//!
//! ```rust
//! use serde_json::json;
//! use xhtpress::templating::{Registry, WidgetArgs};
//!
//! let mut registry = Registry::with_builtins();
//! registry.register_filter("upper", |value: &serde_json::Value| {
//!     value.as_str().unwrap_or_default().to_uppercase()
//! });
//! registry.register_widget("greeting", |args: WidgetArgs| async move {
//!     Ok(format!("Hello, {}!", args.get("name").unwrap_or("stranger")))
//! });
//!
//! assert!(registry.has_filter("upper"));
//! assert!(registry.has_filter("fixed"));
//! assert!(registry.has_widget("greeting"));
//! ```

use futures::future::BoxFuture;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::filters;

/// A synchronous value-to-text transformation.
pub type Filter = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// The future a widget returns.
pub type WidgetFuture = BoxFuture<'static, anyhow::Result<String>>;

/// What a widget receives: the page scope and the marker's keyword arguments.
#[derive(Debug, Clone)]
pub struct WidgetArgs {
    pub scope: Arc<Value>,
    pub args: BTreeMap<String, String>,
}

impl WidgetArgs {
    /// A keyword argument by name.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.args.get(key).map(String::as_str)
    }

    /// `{"scope": …, key: value, …}` as one JSON object.
    pub fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(self.args.len() + 1);
        map.insert("scope".to_string(), self.scope.as_ref().clone());
        for (key, value) in &self.args {
            map.insert(key.clone(), Value::String(value.clone()));
        }
        Value::Object(map)
    }
}

/// An asynchronous widget handler.
///
/// Implemented for any `Fn(WidgetArgs) -> impl Future<Output = anyhow::Result<String>>`.
pub trait Widget: Send + Sync {
    fn call(&self, args: WidgetArgs) -> WidgetFuture;
}

impl<F, Fut> Widget for F
where
    F: Fn(WidgetArgs) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
{
    fn call(&self, args: WidgetArgs) -> WidgetFuture {
        Box::pin(self(args))
    }
}

#[derive(Clone, Default)]
pub struct Registry {
    filters: HashMap<String, Filter>,
    widgets: HashMap<String, Arc<dyn Widget>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut filters: Vec<&String> = self.filters.keys().collect();
        let mut widgets: Vec<&String> = self.widgets.keys().collect();
        filters.sort();
        widgets.sort();
        f.debug_struct("Registry").field("filters", &filters).field("widgets", &widgets).finish()
    }
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in filters (`fixed`, `integer`, `json`,
    /// `slug`) and the `test` widget.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        filters::register_builtins(&mut registry);
        registry
    }

    pub fn register_filter<F>(&mut self, name: impl Into<String>, filter: F) -> &mut Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        self.filters.insert(name.into(), Arc::new(filter));
        self
    }

    pub fn register_widget<F, Fut>(&mut self, name: impl Into<String>, widget: F) -> &mut Self
    where
        F: Fn(WidgetArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        self.register_widget_handler(name, Arc::new(widget))
    }

    /// Register a handler that implements [`Widget`] directly.
    pub fn register_widget_handler(
        &mut self,
        name: impl Into<String>,
        widget: Arc<dyn Widget>,
    ) -> &mut Self {
        self.widgets.insert(name.into(), widget);
        self
    }

    pub fn filter(&self, name: &str) -> Option<&Filter> {
        self.filters.get(name)
    }

    pub fn widget(&self, name: &str) -> Option<Arc<dyn Widget>> {
        self.widgets.get(name).cloned()
    }

    pub fn has_filter(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    pub fn has_widget(&self, name: &str) -> bool {
        self.widgets.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_later_registration_overwrites() {
        let mut registry = Registry::new();
        registry.register_filter("f", |_: &Value| "first".to_string());
        registry.register_filter("f", |_: &Value| "second".to_string());

        let filter = registry.filter("f").unwrap();
        assert_eq!(filter(&json!(null)), "second");
    }

    #[test]
    fn test_widget_args_to_value() {
        let args = WidgetArgs {
            scope: Arc::new(json!({"id": "home"})),
            args: BTreeMap::from([("size".to_string(), "3".to_string())]),
        };

        assert_eq!(args.get("size"), Some("3"));
        assert_eq!(args.to_value(), json!({"scope": {"id": "home"}, "size": "3"}));
    }

    #[tokio::test]
    async fn test_closure_widget() {
        let mut registry = Registry::new();
        registry.register_widget("echo", |args: WidgetArgs| async move {
            Ok(args.get("text").unwrap_or_default().to_string())
        });

        let widget = registry.widget("echo").unwrap();
        let output = widget
            .call(WidgetArgs {
                scope: Arc::new(json!({})),
                args: BTreeMap::from([("text".to_string(), "hi".to_string())]),
            })
            .await
            .unwrap();
        assert_eq!(output, "hi");
        assert!(registry.widget("missing").is_none());
    }
}
