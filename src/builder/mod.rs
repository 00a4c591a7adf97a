//! Site builds.
//!
//! [`SiteBuilder`] turns every regular file in the content directory into one
//! page: load the file ([`Content::load`]), build its scope, render the page's
//! template, run the widget pass and write `<output_dir>/<id>.<output_extension>`.
//!
//! Pages are independent, so they are built concurrently and share one
//! [`TemplateEngine`] (and therefore one template cache). The first page that
//! fails aborts the build.

use anyhow::{Context, Result};
use futures::future::try_join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use walkdir::WalkDir;

use crate::config::SiteConfig;
use crate::content::Content;
use crate::core::XhtError;
use crate::core::file_error::{FileOperation, FileResultExt};
use crate::templating::{Registry, Scope, TemplateEngine};

/// What a finished build produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub output_dir: PathBuf,
    /// Written pages, in content file order.
    pub pages: Vec<PathBuf>,
    pub duration: Duration,
}

impl BuildReport {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[derive(Debug)]
pub struct SiteBuilder {
    config: SiteConfig,
    engine: TemplateEngine,
}

impl SiteBuilder {
    /// Create a builder whose engine uses `registry`.
    ///
    /// Widgets listed under `widgets` in the configuration but missing from the
    /// registry are reported; their markers will stay in the output.
    pub fn new(config: SiteConfig, registry: Arc<Registry>) -> Result<Self> {
        for name in &config.widgets {
            if !registry.has_widget(name) {
                tracing::warn!("Widget '{}' is listed in the configuration but not registered", name);
            }
        }

        let engine = TemplateEngine::new(&config.render_config(), registry)
            .context("Failed to create the template engine")?;

        Ok(Self {
            config,
            engine,
        })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn engine(&self) -> &TemplateEngine {
        &self.engine
    }

    /// Regular files directly inside the content directory, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`XhtError::ContentDirNotFound`] when the directory is missing.
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        let content_dir = self.config.content_path();
        if !content_dir.is_dir() {
            return Err(XhtError::ContentDirNotFound {
                path: content_dir.display().to_string(),
            }
            .into());
        }

        let files = WalkDir::new(&content_dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect();

        Ok(files)
    }

    /// Build every page.
    pub async fn build(&self) -> Result<BuildReport> {
        let start = Instant::now();
        let files = self.discover()?;
        let output_dir = self.config.output_path();

        tokio::fs::create_dir_all(&output_dir).await.with_file_context(
            FileOperation::CreateDir,
            &output_dir,
            "creating output directory",
        )?;

        tracing::info!(
            "Building {} page(s) from {}",
            files.len(),
            self.config.content_path().display()
        );

        let pages = try_join_all(files.iter().map(|path| self.build_page(path, &output_dir)))
            .await
            .context("Site build failed")?;

        let report = BuildReport {
            output_dir,
            pages,
            duration: start.elapsed(),
        };
        tracing::info!(
            "Wrote {} page(s) to {} in {:.2?}",
            report.page_count(),
            report.output_dir.display(),
            report.duration
        );
        Ok(report)
    }

    /// Render one content file and write the result. Returns the output path.
    pub async fn build_page(&self, path: &Path, output_dir: &Path) -> Result<PathBuf> {
        let content = Content::load(path).await?;
        let data = content.scope(&self.config);

        let template = content
            .template_name(&data, &self.config)
            .ok_or_else(|| XhtError::InvalidTemplateReference {
                id: content.id.clone(),
                reason: "`page.template` must be a string".to_string(),
            })?
            .to_string();

        tracing::debug!("Rendering '{}' with template '{}'", content.id, template);
        let scope = Scope::new(data);
        let html = self
            .engine
            .render_page(&template, &scope)
            .await
            .with_context(|| format!("Failed to render '{}'", path.display()))?;

        let output = output_dir.join(format!("{}.{}", content.id, self.config.output_extension));
        tokio::fs::write(&output, html).await.with_file_context(
            FileOperation::Write,
            &output,
            "writing page",
        )?;

        tracing::debug!("Wrote {}", output.display());
        Ok(output)
    }
}
