//! `xhtpress build`

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::sync::Arc;

use super::CliConfig;
use crate::builder::SiteBuilder;
use crate::config::SiteConfig;
use crate::templating::Registry;

#[derive(Args, Debug)]
pub struct BuildCommand {
    /// List every written page
    #[arg(long)]
    list: bool,
}

impl BuildCommand {
    pub async fn execute(self, cli: &CliConfig, registry: Arc<Registry>) -> Result<()> {
        let config = SiteConfig::load(cli.config_path.as_deref()).await?;
        let builder = SiteBuilder::new(config, registry)?;
        let report = builder.build().await?;

        if cli.log_level.is_none() {
            return Ok(());
        }

        if self.list {
            for page in &report.pages {
                println!("  {} {}", "wrote".cyan(), page.display());
            }
        }
        println!(
            "{} {} page(s) to {} in {:.2?}",
            "Built".green().bold(),
            report.page_count(),
            report.output_dir.display(),
            report.duration
        );
        Ok(())
    }
}
