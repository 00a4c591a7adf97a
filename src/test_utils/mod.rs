//! Test helpers shared by unit and integration tests.
//!
//! Available under `cfg(test)` and, for the `tests/` suites, through the
//! `test-utils` feature.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::{DEFAULT_CONFIG_FILE, SiteConfig};

static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests, once per process.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, tests run
/// without a subscriber.
///
/// ```rust,no_run
/// xhtpress::test_utils::init_test_logging(Some(tracing::Level::DEBUG));
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// A throwaway site in a temporary directory.
///
/// Starts with empty `content/` and `tmpl/` directories and no configuration
/// file. The directory is removed when the fixture is dropped.
pub struct SiteFixture {
    temp_dir: TempDir,
}

impl SiteFixture {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new().context("Failed to create temp dir")?;
        std::fs::create_dir_all(temp_dir.path().join("content"))?;
        std::fs::create_dir_all(temp_dir.path().join("tmpl"))?;
        Ok(Self {
            temp_dir,
        })
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.root().join(DEFAULT_CONFIG_FILE)
    }

    pub fn output_path(&self, name: &str) -> PathBuf {
        self.root().join("www").join(name)
    }

    /// Write `xhtpress.toml`.
    pub fn config(&self, toml: &str) -> Result<&Self> {
        self.write(DEFAULT_CONFIG_FILE, toml)
    }

    /// Write a file under `content/`.
    pub fn content(&self, name: &str, text: &str) -> Result<&Self> {
        self.write(&format!("content/{name}"), text)
    }

    /// Write a file under `tmpl/`.
    pub fn template(&self, name: &str, text: &str) -> Result<&Self> {
        self.write(&format!("tmpl/{name}"), text)
    }

    /// Write any file relative to the site root, creating parent directories.
    pub fn write(&self, relative: &str, text: &str) -> Result<&Self> {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(self)
    }

    pub fn read_output(&self, name: &str) -> Result<String> {
        let path = self.output_path(name);
        std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
    }

    /// Load the configuration the way the CLI does, from the fixture root.
    pub async fn load_config(&self) -> Result<SiteConfig> {
        let path = self.config_path();
        if path.exists() {
            SiteConfig::load(Some(path.as_path())).await
        } else {
            Ok(SiteConfig {
                root: self.root().to_path_buf(),
                ..SiteConfig::default()
            })
        }
    }
}
