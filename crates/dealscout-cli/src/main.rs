mod output;
mod scrape;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "dealscout")]
#[command(about = "Scrape deal listings from storefront pages into JSON")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch listing pages and extract deal records.
    Scrape {
        /// Pages to scrape. When omitted, the targets file is used.
        urls: Vec<String>,

        /// Targets file (overrides `DEALSCOUT_TARGETS_PATH`).
        #[arg(long)]
        targets: Option<PathBuf>,

        /// Output directory (overrides `DEALSCOUT_OUTPUT_DIR`).
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write one file per source domain instead of one combined file.
        #[arg(long)]
        split_by_domain: bool,

        /// Fetch attempts per URL (overrides `DEALSCOUT_MAX_ATTEMPTS`).
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        max_attempts: Option<u32>,
    },
    /// Validate and list the configured targets.
    Targets {
        /// Targets file (overrides `DEALSCOUT_TARGETS_PATH`).
        #[arg(long)]
        targets: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = dealscout_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Commands::Scrape {
            urls,
            targets,
            output,
            split_by_domain,
            max_attempts,
        } => {
            let options = scrape::ScrapeOptions {
                urls,
                targets_path: targets,
                output_dir: output,
                split_by_domain,
                max_attempts,
            };
            scrape::run_scrape(&config, options).await?;
        }
        Commands::Targets { targets } => {
            scrape::run_list_targets(&config, targets.as_deref())?;
        }
    }

    Ok(())
}
