//! The xhtpress template language.
//!
//! Templates are plain text with four kinds of markup:
//!
//! - **Variables**: `{{ path }}` or `{{ path | filter }}`. Paths are dotted
//!   (`page.title`, `items.0`, `items.length`). A variable whose path does not
//!   resolve anywhere stays in the output exactly as written; `null` renders
//!   as nothing.
//! - **Iteration**: `{%EACH path%} … {%ENDEACH%}` renders its body once per
//!   array element, string character or object key. Objects bind as the scope
//!   of the body; strings and numbers are reachable as `{{value}}`.
//! - **Conditionals**: `{%IF path%} … {%ENDIF%}` and
//!   `{%IF path <op> operand%} … {%ENDIF%}` with `==`, `!=`, `<`, `>`, `<=` or
//!   `>=`. The closing `%` may be left off either tag (`{%IF a}…{%ENDIF}`).
//! - **Includes**: `{% partial %}` inlines another template; `{% $path %}` takes
//!   the template name from the scope.
//!
//! A separate asynchronous pass replaces widget markers such as
//! `{{$ gallery size="3" $}}` with the output of registered widget handlers
//! (see [`resolve_widgets`]).
//!
//! # Layout
//!
//! - [`scope`] - dotted-path lookup and the render scope
//! - [`loose`] - truthiness, comparison and text conversion of JSON values
//! - `lexer` / `parser` - tokens and the directive tree
//! - [`processor`] - the directive interpreter
//! - [`registry`] / [`filters`] - named filters and widgets, plus the built-ins
//! - [`widgets`] - the widget pass
//! - [`engine`] - file and literal templates, includes and the template cache
//! - [`error`] - [`TemplateError`]

pub mod engine;
pub mod error;
pub mod filters;
pub(crate) mod lexer;
pub mod loose;
pub(crate) mod parser;
pub mod processor;
pub mod registry;
pub mod scope;
pub mod widgets;


pub use engine::{MAX_INCLUDE_DEPTH, Template, TemplateEngine, TemplateEngineBuilder, TemplateRef};
pub use error::TemplateError;
pub use processor::process_segment;
pub use registry::{Filter, Registry, Widget, WidgetArgs};
pub use scope::Scope;
pub use widgets::resolve_widgets;
