//! Command definitions and the glue from parsed flags to a pipeline run.
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use harvest_common::ScrapeTarget;
use harvest_config::{HarvestConfig, HarvestConfigLoader};
use harvest_llm::ensure_llm_ready;
use harvest_llm::extractor::{ExtractionOptions, ExtractionOrchestrator};
use harvest_web::{Pipeline, PipelineSettings, RemoteBrowserScraper};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

const DEFAULT_CONFIG_FILE: &str = "harvest.yaml";

/// Scrape a rendered web page and extract what you ask for.
#[derive(Debug, Parser)]
#[command(name = "harvest", version)]
pub struct Cli {
    #[command(flatten)]
    pub shared: SharedArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct SharedArgs {
    /// YAML configuration file. Defaults to `harvest.yaml` when it exists.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// WebDriver endpoint of the remote browser service.
    #[arg(long, env = "SBR_WEBDRIVER", global = true)]
    pub endpoint: Option<String>,

    /// Characters per chunk sent to the extraction service.
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,

    /// Also write the result to this file.
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Print the full report as JSON instead of plain text.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the normalized text of a page.
    Scrape {
        /// Absolute http(s) URL to scrape.
        url: String,
    },
    /// Scrape a page and extract information from it.
    Extract {
        /// Absolute http(s) URL to scrape.
        url: String,

        /// What to extract, in plain words.
        #[arg(short, long)]
        instruction: String,

        /// Chunk requests allowed in flight at once.
        #[arg(long)]
        concurrency: Option<usize>,
    },
}

/// Merge the configuration file, `HARVEST__*` variables and flags.
pub fn load_config(cli: &Cli) -> Result<HarvestConfig> {
    let loader = match &cli.shared.config {
        Some(path) => HarvestConfigLoader::new().with_file(path),
        None => HarvestConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    let mut cfg = loader.load().context("loading configuration")?;

    if let Some(endpoint) = &cli.shared.endpoint {
        cfg.browser.endpoint = endpoint.clone();
    }
    if let Some(chunk_size) = cli.shared.chunk_size {
        cfg.extraction.chunk_size = chunk_size;
    }
    if let Command::Extract {
        concurrency: Some(concurrency),
        ..
    } = &cli.command
    {
        cfg.extraction.concurrency = *concurrency;
    }
    Ok(cfg)
}

pub async fn run(cli: Cli, cfg: HarvestConfig, cancel: CancellationToken) -> Result<()> {
    let settings = PipelineSettings {
        browser: cfg.browser.clone(),
        chunk_size: cfg.extraction.chunk_size,
    };
    let scraper = Arc::new(RemoteBrowserScraper);

    let rendered = match cli.command {
        Command::Scrape { url } => {
            let target = ScrapeTarget::parse(&url)?;
            let pipeline = Pipeline::scrape_only(scraper, settings)?;
            let page = pipeline.scrape_text(&target, &cancel).await?;

            if cli.shared.json {
                serde_json::to_string_pretty(&page)?
            } else {
                page.text
            }
        }
        Command::Extract {
            url, instruction, ..
        } => {
            let target = ScrapeTarget::parse(&url)?;
            let client = ensure_llm_ready(&cfg.extraction.llm)?;
            let orchestrator = ExtractionOrchestrator::new(client)
                .with_options(ExtractionOptions::from(&cfg.extraction));
            let pipeline = Pipeline::new(scraper, orchestrator, settings)?;
            let report = pipeline.run(&target, &instruction, &cancel).await?;

            let stats = &report.extraction.stats;
            info!(
                run_id = %report.run_id,
                attempted = stats.attempted,
                succeeded = stats.succeeded,
                failed = stats.failed,
                "extraction complete"
            );
            if cli.shared.json {
                serde_json::to_string_pretty(&report)?
            } else {
                report.extraction.text
            }
        }
    };

    println!("{rendered}");
    if let Some(path) = &cli.shared.output {
        tokio::fs::write(path, &rendered)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "result saved");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn extract_parses_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "harvest",
            "extract",
            "https://example.com",
            "-i",
            "extract emails",
            "--chunk-size",
            "1200",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.shared.chunk_size, Some(1200));
        assert!(cli.shared.json);
        match cli.command {
            Command::Extract {
                url, instruction, ..
            } => {
                assert_eq!(url, "https://example.com");
                assert_eq!(instruction, "extract emails");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn extract_requires_an_instruction() {
        assert!(Cli::try_parse_from(["harvest", "extract", "https://example.com"]).is_err());
    }
}
