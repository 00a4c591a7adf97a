//! `xhtpress render`

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use super::CliConfig;
use crate::config::{RenderConfig, SiteConfig};
use crate::templating::{Registry, Scope, TemplateEngine, TemplateRef, resolve_widgets};

#[derive(Args, Debug)]
pub struct RenderCommand {
    /// Template name (relative to the template directory), `:path` for a file
    /// path, or template text with `--inline`
    pub(super) template: String,

    /// JSON file holding the scope
    #[arg(short, long)]
    pub(super) data: Option<PathBuf>,

    /// Treat TEMPLATE as template text
    #[arg(long)]
    pub(super) inline: bool,

    /// Leave widget markers in the output
    #[arg(long)]
    pub(super) no_widgets: bool,
}

impl RenderCommand {
    pub async fn execute(self, cli: &CliConfig, registry: Arc<Registry>) -> Result<()> {
        let render_config = match &cli.config_path {
            Some(path) => SiteConfig::load(Some(path.as_path())).await?.render_config(),
            None => match SiteConfig::load(None).await {
                Ok(config) => config.render_config(),
                Err(error) => {
                    tracing::warn!("Ignoring unusable configuration: {:#}", error);
                    RenderConfig::default()
                }
            },
        };

        let scope = Scope::new(self.load_data().await?);
        let engine = TemplateEngine::new(&render_config, Arc::clone(&registry))?;

        let reference = if self.inline {
            TemplateRef::Literal(self.template.clone())
        } else {
            match TemplateRef::parse(&self.template) {
                TemplateRef::Literal(name) => {
                    TemplateRef::File(render_config.template_dir.join(name))
                }
                file => file,
            }
        };

        let mut output = engine.render_ref(&reference, &scope)?;
        if !self.no_widgets {
            output = resolve_widgets(&output, &scope, &registry).await?;
        }

        print!("{output}");
        Ok(())
    }

    async fn load_data(&self) -> Result<Value> {
        let Some(path) = &self.data else {
            return Ok(Value::Object(serde_json::Map::new()));
        };

        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read scope data from {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Scope data in {} is not valid JSON", path.display()))
    }
}
