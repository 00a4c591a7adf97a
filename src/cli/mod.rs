//! Command-line interface for xhtpress.
//!
//! # Commands
//!
//! - `build` - render every content file into the output directory
//! - `render` - render a single template against a JSON scope and print it
//!
//! # Global Options
//!
//! - `--verbose` - debug logging
//! - `--quiet` - errors only
//! - `--config` - path to the site configuration (also `XHTPRESS_CONFIG`)
//!
//! ```bash
//! # Build the site described by ./xhtpress.toml
//! xhtpress build
//!
//! # Try a template against some data
//! xhtpress render page --data page.json
//! xhtpress render --inline '{%EACH items%}{{value}} {%ENDEACH%}' --data list.json
//! ```
//!
//! Logging goes to stderr through `tracing`; `RUST_LOG` overrides the level the
//! flags pick.

mod build;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::templating::Registry;

/// Settings derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// `None` disables logging entirely.
    pub log_level: Option<String>,
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Install the global tracing subscriber. Safe to call more than once.
    pub fn init_logging(&self) {
        let Some(level) = &self.log_level else {
            return;
        };

        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(format!("xhtpress={level}"))
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

#[derive(Parser)]
#[command(
    name = "xhtpress",
    about = "Render a directory of content files through xht templates",
    version,
    author,
    long_about = "xhtpress builds static pages from content files with JSON frontmatter and \
                  templates using variables, filters, EACH/IF directives, includes and widgets."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the site configuration file
    #[arg(short, long, global = true, env = "XHTPRESS_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every page of the site
    Build(build::BuildCommand),

    /// Render one template and print the result
    Render(render::RenderCommand),
}

impl Cli {
    /// Run the selected command with the built-in filters and widgets.
    pub async fn execute(self) -> Result<()> {
        self.execute_with_registry(Arc::new(Registry::with_builtins())).await
    }

    /// Run the selected command with a caller-supplied registry.
    pub async fn execute_with_registry(self, registry: Arc<Registry>) -> Result<()> {
        let config = self.build_config();
        config.init_logging();

        match self.command {
            Commands::Build(cmd) => cmd.execute(&config, registry).await,
            Commands::Render(cmd) => cmd.execute(&config, registry).await,
        }
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("warn".to_string())
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
        }
    }
}
