use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::DEFAULT_CALL_TIMEOUT;
use crate::blob::BlobStore;
use crate::error::{CatalogError, CatalogResult, with_timeout};
use crate::index::ProductIndex;
use crate::llm::{Captioner, ContentGenerator};
use crate::models::{Content, IndexedDocument, IngestStep, IngestionReport, Product, StepStatus};
use crate::repository::CatalogRepository;

/// Write side of the catalog: ingestion plus the lookups it needs.
///
/// Ingestion is a saga over four independent stores. Nothing is rolled back;
/// a product whose record was saved but whose index write failed stays
/// visible to tag search and the home screen only.
#[derive(Clone)]
pub struct CatalogService {
    repository: Arc<dyn CatalogRepository>,
    blobs: Arc<dyn BlobStore>,
    uploads: Arc<dyn BlobStore>,
    text_index: Arc<dyn ProductIndex>,
    image_index: Arc<dyn ProductIndex>,
    captioner: Arc<dyn Captioner>,
    generator: Arc<dyn ContentGenerator>,
    call_timeout: Duration,
}

impl CatalogService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repository: Arc<dyn CatalogRepository>,
        blobs: Arc<dyn BlobStore>,
        uploads: Arc<dyn BlobStore>,
        text_index: Arc<dyn ProductIndex>,
        image_index: Arc<dyn ProductIndex>,
        captioner: Arc<dyn Captioner>,
        generator: Arc<dyn ContentGenerator>,
    ) -> Self {
        Self {
            repository,
            blobs,
            uploads,
            text_index,
            image_index,
            captioner,
            generator,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    async fn call<T>(
        &self,
        component: &str,
        fut: impl Future<Output = CatalogResult<T>>,
    ) -> CatalogResult<T> {
        with_timeout(component, self.call_timeout, fut).await
    }

    /// Store the image, save the record and index it in both modalities.
    ///
    /// Fails with `InconsistentWrite` when the record was saved but an index
    /// write was not; earlier failures are returned as-is.
    #[instrument(skip(self, content), fields(title = %content.title))]
    pub async fn ingest(&self, content: Content, image_source: &Path) -> CatalogResult<Uuid> {
        let (report, first_error) = self.run_saga(content, image_source).await;

        match (report.product_id, first_error) {
            (Some(product_id), None) => Ok(product_id),
            (Some(product_id), Some(err)) if report.is_inconsistent() => {
                let (step, message) = report
                    .first_failure()
                    .map(|(step, msg)| (step, msg.to_string()))
                    .unwrap_or((IngestStep::IndexImage, err.to_string()));
                Err(CatalogError::InconsistentWrite {
                    product_id,
                    step,
                    message,
                })
            }
            (_, Some(err)) => Err(err),
            (None, None) => Err(CatalogError::Internal(
                "ingestion finished without a product id".to_string(),
            )),
        }
    }

    /// Saga form of [`ingest`](Self::ingest): every step's outcome, never an error
    #[instrument(skip(self, content), fields(title = %content.title))]
    pub async fn ingest_with_report(&self, content: Content, image_source: &Path) -> IngestionReport {
        self.run_saga(content, image_source).await.0
    }

    async fn run_saga(
        &self,
        content: Content,
        image_source: &Path,
    ) -> (IngestionReport, Option<CatalogError>) {
        let mut report = IngestionReport::new();

        if let Err(e) = content.validate() {
            let err = CatalogError::Validation(e.to_string());
            report.record(IngestStep::ValidateContent, StepStatus::Failed(err.to_string()));
            return (report, Some(err));
        }
        report.record(IngestStep::ValidateContent, StepStatus::Succeeded);

        let image_id = match self.call("blob store", self.blobs.save(image_source)).await {
            Ok(image_id) => image_id,
            Err(e) => {
                report.record(IngestStep::StoreImage, StepStatus::Failed(e.to_string()));
                return (report, Some(e));
            }
        };
        report.image_id = Some(image_id);
        report.record(IngestStep::StoreImage, StepStatus::Succeeded);

        let product = Product::new(content, image_id);
        if let Err(e) = self
            .call("catalog store", self.repository.save(&product))
            .await
        {
            report.record(IngestStep::SaveRecord, StepStatus::Failed(e.to_string()));
            return (report, Some(e));
        }
        report.product_id = Some(product.id);
        report.record(IngestStep::SaveRecord, StepStatus::Succeeded);

        let mut first_error = None;

        let text = self
            .call(
                "text index",
                self.text_index.add(IndexedDocument::text(&product)),
            )
            .await;
        Self::settle(&mut report, &mut first_error, IngestStep::IndexText, text);

        let image = async {
            let uri = self.blobs.get_uri(image_id).await?;
            self.image_index
                .add(IndexedDocument::image(product.id, uri))
                .await
        };
        let image = self.call("image index", image).await;
        Self::settle(&mut report, &mut first_error, IngestStep::IndexImage, image);

        if report.is_inconsistent() {
            if let Some((step, message)) = report.first_failure() {
                warn!(
                    event = "inconsistent_write",
                    product_id = %product.id,
                    %step,
                    error = message,
                    "Product saved but not fully indexed"
                );
            }
        } else {
            info!(product_id = %product.id, %image_id, "Ingested product");
        }

        (report, first_error)
    }

    fn settle(
        report: &mut IngestionReport,
        first_error: &mut Option<CatalogError>,
        step: IngestStep,
        result: CatalogResult<()>,
    ) {
        match result {
            Ok(()) => report.record(step, StepStatus::Succeeded),
            Err(e) => {
                report.record(step, StepStatus::Failed(e.to_string()));
                first_error.get_or_insert(e);
            }
        }
    }

    /// One-line description of the image at `image_uri`
    #[instrument(skip(self))]
    pub async fn caption(&self, image_uri: &str) -> CatalogResult<String> {
        self.call("captioner", self.captioner.caption(image_uri))
            .await
    }

    /// Generate product Content from a one-line description
    #[instrument(skip(self))]
    pub async fn generate_content(&self, description: &str) -> CatalogResult<Content> {
        let description = description.trim();
        if description.is_empty() {
            return Err(CatalogError::Validation(
                "description must not be empty".to_string(),
            ));
        }

        self.call("content generator", self.generator.generate(description))
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: Uuid) -> CatalogResult<Option<Product>> {
        self.call("catalog store", self.repository.get(product_id))
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_image_uri(&self, image_id: Uuid) -> CatalogResult<String> {
        self.call("blob store", self.blobs.get_uri(image_id)).await
    }

    /// Stage an upload until it is ingested or searched with
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn stage_upload(&self, file_name: &str, bytes: &[u8]) -> CatalogResult<Uuid> {
        self.call("upload store", self.uploads.save_bytes(file_name, bytes))
            .await
    }

    #[instrument(skip(self))]
    pub async fn staged_upload_uri(&self, temp_image_id: Uuid) -> CatalogResult<String> {
        self.call("upload store", self.uploads.get_uri(temp_image_id))
            .await
    }
}
