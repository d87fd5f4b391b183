//! Batch ingestion over a directory of images

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use domain_catalog::{CatalogService, IngestionReport};
use eyre::{Result, WrapErr};
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// What happened to one image
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Ingested { product_id: Uuid },
    /// Saved to the catalog store but missing from at least one index
    Inconsistent { report: IngestionReport },
    Failed { stage: String, error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub image: PathBuf,
    pub caption: Option<String>,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

impl fmt::Display for ItemReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.image.display();
        match &self.outcome {
            ItemOutcome::Ingested { product_id } => write!(f, "ok    {} -> {}", name, product_id),
            ItemOutcome::Inconsistent { report } => {
                let step = report
                    .first_failure()
                    .map(|(step, msg)| format!("{}: {}", step, msg))
                    .unwrap_or_default();
                write!(f, "part  {} ({})", name, step)
            }
            ItemOutcome::Failed { stage, error } => {
                write!(f, "fail  {} ({}: {})", name, stage, error)
            }
        }
    }
}

/// Result of an ingestion run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub items: Vec<ItemReport>,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl RunSummary {
    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|item| pred(&item.outcome)).count()
    }

    pub fn ingested(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Ingested { .. }))
    }

    pub fn inconsistent(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Inconsistent { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed { .. }))
    }
}

pub struct IngestRunner {
    catalog: CatalogService,
}

impl IngestRunner {
    pub fn new(catalog: CatalogService) -> Self {
        Self { catalog }
    }

    /// Ingest every image in `dir`, in file name order.
    ///
    /// Only an unreadable directory fails the run; per-image errors are
    /// recorded in the summary.
    pub async fn run(&self, dir: &Path, limit: Option<usize>) -> Result<RunSummary> {
        let start = std::time::Instant::now();
        let timestamp = Utc::now();

        let mut images = list_images(dir).await?;
        if let Some(limit) = limit {
            images.truncate(limit);
        }
        info!(count = images.len(), "Found images");

        let mut items = Vec::with_capacity(images.len());
        for image in images {
            items.push(self.ingest_one(image).await);
        }

        Ok(RunSummary {
            items,
            duration_ms: start.elapsed().as_millis() as u64,
            timestamp,
        })
    }

    #[instrument(skip(self), fields(image = %image.display()))]
    async fn ingest_one(&self, image: PathBuf) -> ItemReport {
        let failed = |image: PathBuf, caption: Option<String>, stage: &str, error: String| {
            error!(stage, %error, "Skipping image");
            ItemReport {
                image,
                caption,
                outcome: ItemOutcome::Failed {
                    stage: stage.to_string(),
                    error,
                },
            }
        };

        let uri = image.to_string_lossy().into_owned();
        let caption = match self.catalog.caption(&uri).await {
            Ok(caption) => caption,
            Err(e) => return failed(image, None, "caption", e.to_string()),
        };

        let content = match self.catalog.generate_content(&caption).await {
            Ok(content) => content,
            Err(e) => return failed(image, Some(caption), "generate", e.to_string()),
        };

        let report = self.catalog.ingest_with_report(content, &image).await;
        let failure = report
            .first_failure()
            .map(|(step, msg)| (step.to_string(), msg.to_string()));
        let outcome = match (report.product_id, failure) {
            (Some(product_id), None) => {
                info!(%product_id, "Ingested");
                ItemOutcome::Ingested { product_id }
            }
            (Some(_), Some(_)) => {
                warn!("Product saved but not fully indexed");
                ItemOutcome::Inconsistent { report }
            }
            (None, failure) => {
                let (stage, error) = failure
                    .unwrap_or_else(|| ("ingest".to_string(), "no product saved".to_string()));
                return failed(image, Some(caption), &stage, error);
            }
        };

        ItemReport {
            image,
            caption: Some(caption),
            outcome,
        }
    }
}

/// Regular, non-hidden files directly under `dir`, sorted by name
async fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .wrap_err_with(|| format!("Failed to read image directory {}", dir.display()))?;

    let mut images = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !hidden && entry.file_type().await?.is_file() {
            images.push(entry.path());
        }
    }
    images.sort();
    Ok(images)
}
