//! Site configuration.
//!
//! Settings come from `xhtpress.toml` in the site root (override with
//! `--config` or `XHTPRESS_CONFIG`). Every field has a default, so an empty
//! file, or no file at all when the default location is used, yields a working
//! configuration.
//!
//! ```toml
//! content_dir = "content"
//! template_dir = "tmpl"
//! output_dir = "www"
//! cache_size = 8
//! default_template = "page"
//! widgets = ["test"]
//!
//! [site]
//! name = "My Site"
//! base_url = "https://example.com"
//!
//! [page]
//! template = "page"
//! author = "Jane Doe"
//! ```
//!
//! The whole configuration is visible to templates. `site` and any keys not
//! listed above land at the top level of every page scope, and `page` supplies
//! defaults that each content file's frontmatter overrides.
//!
//! Relative directories resolve against the directory holding the
//! configuration file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::core::XhtError;
use crate::templating::engine::{DEFAULT_CACHE_SIZE, DEFAULT_EXTENSION};

/// File name looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "xhtpress.toml";

fn default_content_dir() -> PathBuf {
    PathBuf::from("content")
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("tmpl")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("www")
}

fn default_output_extension() -> String {
    "html".to_string()
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

const fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

fn default_template() -> String {
    "page".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Directory whose files become pages, one page per file.
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,

    /// Directory that page template names resolve against.
    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,

    /// Directory rendered pages are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Extension of written pages, without the dot.
    #[serde(default = "default_output_extension")]
    pub output_extension: String,

    /// Extension appended to template names that have none.
    #[serde(default = "default_extension")]
    pub default_extension: String,

    /// Number of parsed templates kept in memory.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// Template used by pages whose frontmatter and `page` table name none.
    #[serde(default = "default_template")]
    pub default_template: String,

    /// Widgets the site expects to be registered.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub widgets: Vec<String>,

    /// Site-wide values, exposed to templates as `site.*`.
    #[serde(default)]
    pub site: Map<String, Value>,

    /// Page defaults, merged under each page's frontmatter.
    #[serde(default)]
    pub page: Map<String, Value>,

    /// Any other top-level keys, exposed to templates unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,

    /// Directory relative paths resolve against.
    #[serde(skip)]
    pub root: PathBuf,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            content_dir: default_content_dir(),
            template_dir: default_template_dir(),
            output_dir: default_output_dir(),
            output_extension: default_output_extension(),
            default_extension: default_extension(),
            cache_size: default_cache_size(),
            default_template: default_template(),
            widgets: Vec::new(),
            site: Map::new(),
            page: Map::new(),
            extra: Map::new(),
            root: PathBuf::from("."),
        }
    }
}

/// The settings a [`TemplateEngine`](crate::templating::TemplateEngine) needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    pub template_dir: PathBuf,
    pub default_extension: String,
    pub cache_size: usize,
    pub literal_base_dir: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            template_dir: default_template_dir(),
            default_extension: default_extension(),
            cache_size: default_cache_size(),
            literal_base_dir: None,
        }
    }
}

impl SiteConfig {
    /// Load from `path`, or from `xhtpress.toml` in the working directory.
    ///
    /// An explicit path must exist. A missing default file yields the default
    /// configuration rooted at the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`XhtError::ConfigNotFound`] for a missing explicit file, and any
    /// error from [`load_from`](Self::load_from).
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(XhtError::ConfigNotFound {
                        path: path.display().to_string(),
                    }
                    .into());
                }
                Self::load_from(path).await
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from(default_path).await
                } else {
                    tracing::debug!("No {} found, using default configuration", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load and validate a specific configuration file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, is not valid TOML for this schema, or
    /// holds values rejected by [`validate`](Self::validate).
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

        let mut config: Self =
            toml::from_str(&content).map_err(|error| XhtError::ConfigParseError {
                file: path.display().to_string(),
                reason: error.message().to_string(),
            })?;

        config.root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        config.validate()?;

        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Reject values the builder cannot work with.
    pub fn validate(&self) -> Result<()> {
        let problem = if self.cache_size == 0 {
            Some("`cache_size` must be at least 1")
        } else if self.output_extension.trim().is_empty() {
            Some("`output_extension` must not be empty")
        } else if self.default_template.trim().is_empty() {
            Some("`default_template` must not be empty")
        } else {
            None
        };

        match problem {
            Some(reason) => Err(XhtError::ConfigValidationError {
                reason: reason.to_string(),
            }
            .into()),
            None => Ok(()),
        }
    }

    /// `path` resolved against the configuration root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    pub fn content_path(&self) -> PathBuf {
        self.resolve(&self.content_dir)
    }

    pub fn template_path(&self) -> PathBuf {
        self.resolve(&self.template_dir)
    }

    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.output_dir)
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            template_dir: self.template_path(),
            default_extension: self.default_extension.clone(),
            cache_size: self.cache_size,
            literal_base_dir: None,
        }
    }

    /// The configuration as template data: every setting plus `site`, `page`
    /// and the extra keys, all at the top level.
    pub fn globals(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(error) => {
                tracing::warn!("Configuration could not be exposed to templates: {}", error);
                Map::new()
            }
        }
    }
}
