//! Catalog Ingest
//!
//! Batch ingestion: every image in a directory is captioned, turned into
//! generated content and ingested. A failing image is logged and skipped.

use std::path::PathBuf;

use clap::Parser;
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::{Environment, FromEnv};
use domain_catalog::{CatalogConfig, build_services};
use eyre::Result;
use tracing::info;

mod runner;

use runner::IngestRunner;

#[derive(Parser)]
#[command(name = "catalog-ingest")]
#[command(about = "Caption, describe and ingest every image in a directory")]
struct Cli {
    /// Directory holding the product images
    #[arg(default_value = "ingestion_images")]
    dir: PathBuf,

    /// Stop after this many images
    #[arg(short, long)]
    limit: Option<usize>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let environment = Environment::from_env();
    init_tracing(&environment);

    let config = CatalogConfig::from_env()?;
    let (catalog, _) = build_services(&config).await?;

    info!(dir = %cli.dir.display(), "Starting batch ingestion");
    let summary = IngestRunner::new(catalog)
        .run(&cli.dir, cli.limit)
        .await?;

    info!(
        "Ingestion complete: {} ingested, {} inconsistent, {} failed in {} ms",
        summary.ingested(),
        summary.inconsistent(),
        summary.failed(),
        summary.duration_ms
    );

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for item in &summary.items {
            println!("{}", item);
        }
    }

    Ok(())
}
