//! Template loading, include expansion and the render entry points.
//!
//! A [`TemplateEngine`] owns the template cache and shares a [`Registry`] with
//! its caller. Rendering a template happens in two phases:
//!
//! 1. **Includes.** Every `{% name %}` / `{% $path %}` tag in the template source
//!    is replaced by the fully processed output of the named template, using the
//!    same scope. Names resolve against the including template's directory.
//! 2. **Directives.** The expanded text goes through
//!    [`process_segment`](super::process_segment) against the scope.
//!
//! Because includes are inlined before directives run, a partial placed inside
//! an iteration body sees the element scope for anything it left unresolved.
//!
//! File-backed templates are cached under their absolute, normalized path and
//! read from disk only on a miss. Literal templates are never cached.
//!
//! ```rust,no_run
//! use serde_json::json;
//! use std::sync::Arc;
//! use xhtpress::templating::{Registry, Scope, TemplateEngine};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let engine = TemplateEngine::builder()
//!     .template_dir("tmpl")
//!     .cache_size(8)
//!     .registry(Arc::new(Registry::with_builtins()))
//!     .build()?;
//!
//! let scope = Scope::new(json!({"page": {"title": "Home"}}));
//! let html = engine.render_page("page", &scope).await?;
//! # Ok(())
//! # }
//! ```

use anyhow::Context;
use std::borrow::Cow;
use std::ffi::OsString;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::error::TemplateError;
use super::lexer::{TokenKind, tokenize};
use super::processor::process_segment;
use super::registry::Registry;
use super::scope::{Scope, resolve};
use super::widgets::resolve_widgets;
use crate::cache::{BoundedCache, EvictionListener};
use crate::config::RenderConfig;
use crate::core::file_error;

/// Maximum include nesting. Deeper chains are almost always a cycle.
pub const MAX_INCLUDE_DEPTH: usize = 10;

/// Extension appended to template names that do not carry one.
pub const DEFAULT_EXTENSION: &str = "xht";

/// Number of file-backed templates kept in memory.
pub const DEFAULT_CACHE_SIZE: usize = 8;

/// Template source plus the directory its includes resolve against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    base_dir: PathBuf,
    path: Option<PathBuf>,
}

impl Template {
    /// A template that exists only for one render call.
    pub fn literal(source: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            base_dir: base_dir.into(),
            path: None,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// The file this template was read from, `None` for literals.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn name(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => "<literal template>".to_string(),
        }
    }
}

/// How a caller names a template.
///
/// A leading `:` marks a file path; anything else is template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateRef {
    File(PathBuf),
    Literal(String),
}

impl TemplateRef {
    pub fn parse(reference: &str) -> Self {
        match reference.strip_prefix(':') {
            Some(path) => Self::File(PathBuf::from(path)),
            None => Self::Literal(reference.to_string()),
        }
    }
}

/// Builder for [`TemplateEngine`].
#[derive(Debug)]
pub struct TemplateEngineBuilder {
    cache_size: usize,
    template_dir: PathBuf,
    literal_base_dir: Option<PathBuf>,
    default_extension: String,
    registry: Option<Arc<Registry>>,
}

impl Default for TemplateEngineBuilder {
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_CACHE_SIZE,
            template_dir: PathBuf::from("tmpl"),
            literal_base_dir: None,
            default_extension: DEFAULT_EXTENSION.to_string(),
            registry: None,
        }
    }
}

impl TemplateEngineBuilder {
    pub fn cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }

    /// Directory that [`TemplateEngine::render`] names resolve against.
    pub fn template_dir(mut self, template_dir: impl Into<PathBuf>) -> Self {
        self.template_dir = template_dir.into();
        self
    }

    /// Directory that includes inside literal templates resolve against.
    /// Defaults to the template directory.
    pub fn literal_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.literal_base_dir = Some(base_dir.into());
        self
    }

    pub fn default_extension(mut self, extension: impl Into<String>) -> Self {
        self.default_extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the engine. Relative directories are taken from the current
    /// working directory now, not at render time.
    ///
    /// # Errors
    ///
    /// Fails when the cache size is zero or the working directory cannot be
    /// determined.
    pub fn build(self) -> anyhow::Result<TemplateEngine> {
        let mut cache = BoundedCache::new(self.cache_size)
            .context("Failed to create the template cache")?;
        cache.set_listener(|id: &str, _: &Arc<Template>| {
            tracing::debug!("Evicted template '{}' from cache", id);
        });

        let working_dir =
            std::env::current_dir().context("Failed to determine the working directory")?;
        let template_dir = normalize_path(&working_dir.join(&self.template_dir));
        let literal_base_dir = match self.literal_base_dir {
            Some(dir) => normalize_path(&working_dir.join(dir)),
            None => template_dir.clone(),
        };

        Ok(TemplateEngine {
            cache: Mutex::new(cache),
            registry: self.registry.unwrap_or_else(|| Arc::new(Registry::with_builtins())),
            working_dir,
            template_dir,
            literal_base_dir,
            default_extension: self.default_extension,
        })
    }
}

/// Loads, caches and renders templates.
///
/// The cache lock is only held around lookups and inserts, so one engine can
/// serve concurrent renders.
pub struct TemplateEngine {
    cache: Mutex<BoundedCache<Arc<Template>>>,
    registry: Arc<Registry>,
    working_dir: PathBuf,
    template_dir: PathBuf,
    literal_base_dir: PathBuf,
    default_extension: String,
}

impl fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateEngine")
            .field("template_dir", &self.template_dir)
            .field("literal_base_dir", &self.literal_base_dir)
            .field("default_extension", &self.default_extension)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl TemplateEngine {
    pub fn builder() -> TemplateEngineBuilder {
        TemplateEngineBuilder::default()
    }

    /// Engine configured from the site's render settings.
    pub fn new(config: &RenderConfig, registry: Arc<Registry>) -> anyhow::Result<Self> {
        let mut builder = Self::builder()
            .cache_size(config.cache_size)
            .template_dir(&config.template_dir)
            .default_extension(&config.default_extension)
            .registry(registry);
        if let Some(dir) = &config.literal_base_dir {
            builder = builder.literal_base_dir(dir);
        }
        builder.build()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    /// Replace the listener told about templates evicted from the cache.
    pub fn set_eviction_listener<L>(&self, listener: L)
    where
        L: EvictionListener<Arc<Template>> + 'static,
    {
        self.lock_cache().set_listener(listener);
    }

    /// Cache keys from least- to most-recently-used.
    pub fn cached_templates(&self) -> Vec<String> {
        self.lock_cache().ids().map(str::to_string).collect()
    }

    /// Resolve a reference to a template. File references hit the cache.
    pub fn load(&self, reference: &TemplateRef) -> Result<Arc<Template>, TemplateError> {
        match reference {
            TemplateRef::File(path) => self.load_file(path),
            TemplateRef::Literal(source) => {
                Ok(Arc::new(Template::literal(source.as_str(), &self.literal_base_dir)))
            }
        }
    }

    /// Load a file-backed template, reading it only on a cache miss.
    ///
    /// Relative paths resolve against the working directory captured when the
    /// engine was built. A name without an extension gets the default one.
    pub fn load_file(&self, path: &Path) -> Result<Arc<Template>, TemplateError> {
        let resolved = normalize_path(&self.working_dir.join(self.with_extension(path)));
        let key = resolved.to_string_lossy().into_owned();

        if let Some(template) = self.lock_cache().get(&key) {
            tracing::debug!("Template cache hit: {}", key);
            return Ok(Arc::clone(template));
        }

        tracing::debug!("Loading template from {}", resolved.display());
        let source = file_error::read_to_string(&resolved, "loading template").map_err(|source| {
            TemplateError::Load {
                path: resolved.clone(),
                source,
            }
        })?;

        let template = Arc::new(Template {
            source,
            base_dir: resolved.parent().map(Path::to_path_buf).unwrap_or_default(),
            path: Some(resolved),
        });
        self.lock_cache().set(key, Arc::clone(&template));
        Ok(template)
    }

    /// Expand includes, then run directives against `scope`.
    pub fn process(&self, template: &Template, scope: &Scope) -> Result<String, TemplateError> {
        self.process_at_depth(template, scope, 0)
    }

    /// Render the named template from the template directory.
    pub fn render(&self, name: &str, scope: &Scope) -> Result<String, TemplateError> {
        let template = self.load_file(&self.template_dir.join(name))?;
        self.process(&template, scope)
    }

    /// Render a `:path` or literal reference.
    pub fn render_ref(&self, reference: &TemplateRef, scope: &Scope) -> Result<String, TemplateError> {
        let template = self.load(reference)?;
        self.process(&template, scope)
    }

    /// [`render`](Self::render) followed by the widget pass.
    pub async fn render_page(&self, name: &str, scope: &Scope) -> Result<String, TemplateError> {
        let text = self.render(name, scope)?;
        resolve_widgets(&text, scope, &self.registry).await
    }

    fn process_at_depth(
        &self,
        template: &Template,
        scope: &Scope,
        depth: usize,
    ) -> Result<String, TemplateError> {
        let expanded = self.expand_includes(template, scope, depth)?;
        Ok(process_segment(&expanded, scope, &self.registry, false))
    }

    fn expand_includes<'t>(
        &self,
        template: &'t Template,
        scope: &Scope,
        depth: usize,
    ) -> Result<Cow<'t, str>, TemplateError> {
        let source = template.source();
        if !source.contains("{%") {
            return Ok(Cow::Borrowed(source));
        }

        let tokens = tokenize(source);
        if !tokens.iter().any(|token| matches!(token.kind, TokenKind::Include { .. })) {
            return Ok(Cow::Borrowed(source));
        }
        if depth >= MAX_INCLUDE_DEPTH {
            return Err(TemplateError::IncludeDepth {
                max: MAX_INCLUDE_DEPTH,
                template: template.name(),
            });
        }

        let mut output = String::with_capacity(source.len());
        for token in tokens {
            let TokenKind::Include {
                path,
                dynamic,
            } = token.kind
            else {
                output.push_str(token.raw);
                continue;
            };

            let name = if dynamic {
                include_name(path, scope).ok_or_else(|| TemplateError::IncludeUnresolved {
                    path: path.to_string(),
                    template: template.name(),
                })?
            } else {
                path.to_string()
            };

            tracing::debug!("Including '{}' from {}", name, template.name());
            let included = self.load_file(&template.base_dir.join(name))?;
            output.push_str(&self.process_at_depth(&included, scope, depth + 1)?);
        }

        Ok(Cow::Owned(output))
    }

    fn with_extension<'p>(&self, path: &'p Path) -> Cow<'p, Path> {
        let has_extension = path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| {
            (3..=4).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphabetic())
        });
        if has_extension {
            return Cow::Borrowed(path);
        }

        let mut name = OsString::from(path.as_os_str());
        name.push(".");
        name.push(&self.default_extension);
        Cow::Owned(PathBuf::from(name))
    }

    fn lock_cache(&self) -> MutexGuard<'_, BoundedCache<Arc<Template>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn include_name(path: &str, scope: &Scope) -> Option<String> {
    match resolve(path, scope.data())?.as_ref() {
        serde_json::Value::String(name) if !name.trim().is_empty() => Some(name.trim().to_string()),
        _ => None,
    }
}

/// Lexically normalize a path, dropping `.` and folding `..`.
fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                }
            }
            c => components.push(c),
        }
    }

    components.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_ref_parse() {
        assert_eq!(TemplateRef::parse(":tmpl/page"), TemplateRef::File(PathBuf::from("tmpl/page")));
        assert_eq!(TemplateRef::parse("Hi {{name}}"), TemplateRef::Literal("Hi {{name}}".into()));
        assert_eq!(TemplateRef::parse(""), TemplateRef::Literal(String::new()));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize_path(Path::new("/../a")), PathBuf::from("/a"));
    }

    #[test]
    fn test_default_extension_is_appended() {
        let engine = TemplateEngine::builder().build().unwrap();
        assert_eq!(engine.with_extension(Path::new("page")), Path::new("page.xht"));
        assert_eq!(engine.with_extension(Path::new("page.html")), Path::new("page.html"));
        assert_eq!(engine.with_extension(Path::new("v1.2")), Path::new("v1.2.xht"));
        assert_eq!(engine.with_extension(Path::new("a.b")), Path::new("a.b.xht"));
    }

    #[test]
    fn test_zero_cache_size_is_rejected() {
        let error = TemplateEngine::builder().cache_size(0).build().unwrap_err();
        assert!(error.chain().any(|cause| cause.downcast_ref::<crate::cache::CacheError>().is_some()));
    }
}
