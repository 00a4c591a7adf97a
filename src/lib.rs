//! xhtpress - static pages from content files and xht templates
//!
//! Each file in a content directory becomes one page. A file carries an
//! optional JSON frontmatter block and a body; the page's template renders the
//! body together with site-wide settings from `xhtpress.toml`.
//!
//! # Core Modules
//!
//! - [`templating`] - the template language: variables and filters, `EACH`/`IF`
//!   directives, includes, widgets and the [`TemplateEngine`](templating::TemplateEngine)
//! - [`cache`] - the bounded, least-recently-used store behind the template
//!   cache, with eviction listeners
//! - [`content`] - content files: frontmatter, file metadata and page scopes
//! - [`builder`] - concurrent site builds
//! - [`config`] - `xhtpress.toml`
//! - [`cli`] - the `xhtpress` command
//! - [`core`] - error types and user-facing error reporting
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use xhtpress::templating::{Registry, Scope, process_segment};
//!
//! let registry = Registry::with_builtins();
//! let scope = Scope::new(json!({
//!     "title": "Fruit",
//!     "items": [{"name": "apple", "price": 1.5}, {"name": "pear", "price": 2}],
//! }));
//!
//! let html = process_segment(
//!     "<h1>{{title}}</h1>{%EACH items%}<p>{{name}}: {{price|fixed}}</p>{%ENDEACH%}",
//!     &scope,
//!     &registry,
//!     false,
//! );
//! assert_eq!(html, "<h1>Fruit</h1><p>apple: 1.50</p><p>pear: 2.00</p>");
//! ```

pub mod builder;
pub mod cache;
pub mod cli;
pub mod config;
pub mod content;
pub mod core;
pub mod templating;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
