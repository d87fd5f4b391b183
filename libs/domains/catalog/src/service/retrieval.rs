use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::DEFAULT_CALL_TIMEOUT;
use crate::blob::BlobStore;
use crate::error::{CatalogError, CatalogResult, with_timeout};
use crate::index::{DEFAULT_TOP_K, ProductIndex};
use crate::llm::AnswerGenerator;
use crate::models::Product;
use crate::repository::CatalogRepository;

/// Ids sampled from the catalog store for the home screen
pub const HOME_SCREEN_SAMPLE: u64 = 100;
/// Products drawn, with replacement, for the home screen
pub const HOME_SCREEN_SIZE: usize = 6;

/// Draw `n` ids uniformly with replacement. Empty input draws nothing.
pub fn draw_with_replacement<R: Rng>(ids: &[Uuid], n: usize, rng: &mut R) -> Vec<Uuid> {
    if ids.is_empty() {
        return vec![];
    }
    (0..n).map(|_| ids[rng.random_range(0..ids.len())]).collect()
}

/// Keep the first occurrence of each product id, preserving order
fn dedup_by_id(products: impl IntoIterator<Item = Product>) -> Vec<Product> {
    let mut seen = HashSet::new();
    products
        .into_iter()
        .filter(|p| seen.insert(p.id))
        .collect()
}

/// Read side of the catalog. Every operation is side-effect free.
#[derive(Clone)]
pub struct RetrievalService {
    repository: Arc<dyn CatalogRepository>,
    blobs: Arc<dyn BlobStore>,
    text_index: Arc<dyn ProductIndex>,
    image_index: Arc<dyn ProductIndex>,
    answerer: Arc<dyn AnswerGenerator>,
    call_timeout: Duration,
}

impl RetrievalService {
    pub fn new(
        repository: Arc<dyn CatalogRepository>,
        blobs: Arc<dyn BlobStore>,
        text_index: Arc<dyn ProductIndex>,
        image_index: Arc<dyn ProductIndex>,
        answerer: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            repository,
            blobs,
            text_index,
            image_index,
            answerer,
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

    async fn resolve(&self, ids: &[Uuid]) -> CatalogResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        self.call("catalog store", self.repository.get_many(ids))
            .await
    }

    #[instrument(skip(self))]
    pub async fn search_by_tag(
        &self,
        tag: &str,
        limit: u64,
        skip: u64,
    ) -> CatalogResult<Vec<Product>> {
        self.call(
            "catalog store",
            self.repository.filter_by_tag(tag, limit, skip),
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn search_by_text(&self, query: &str) -> CatalogResult<Vec<Product>> {
        let ids = self
            .call("text index", self.text_index.search(query, DEFAULT_TOP_K))
            .await?;
        let products = self.resolve(&ids).await?;

        debug!(hits = ids.len(), resolved = products.len(), "Text search");
        Ok(products)
    }

    /// Text search plus a generated answer grounded on the hits' content
    #[instrument(skip(self))]
    pub async fn search_by_text_with_answer(
        &self,
        query: &str,
    ) -> CatalogResult<(String, Vec<Product>)> {
        let products = self.search_by_text(query).await?;
        let context: Vec<String> = products
            .iter()
            .map(|p| p.content.content.clone())
            .collect();

        let answer = self
            .call("answer generator", self.answerer.answer(query, &context))
            .await?;
        Ok((answer, products))
    }

    #[instrument(skip(self))]
    pub async fn search_by_image(&self, image_uri: &str) -> CatalogResult<Vec<Product>> {
        let ids = self
            .call("image index", self.image_index.search(image_uri, DEFAULT_TOP_K))
            .await?;
        let products = self.resolve(&ids).await?;

        debug!(hits = ids.len(), resolved = products.len(), "Image search");
        Ok(products)
    }

    /// Union of text and image neighbours of a product, each id once.
    ///
    /// Text hits come first, then image hits, in first-seen order. The seed
    /// itself is included if an index returns it. An unknown seed yields `[]`.
    #[instrument(skip(self))]
    pub async fn find_similar(&self, product_id: Uuid) -> CatalogResult<Vec<Product>> {
        let Some(seed) = self
            .call("catalog store", self.repository.get(product_id))
            .await?
        else {
            return Ok(vec![]);
        };

        let by_text = self.search_by_text(&seed.content.content).await?;

        let by_image = match self
            .call("blob store", self.blobs.get_uri(seed.image_id))
            .await
        {
            Ok(uri) => self.search_by_image(&uri).await?,
            Err(CatalogError::ImageNotFound(image_id)) => {
                debug!(%image_id, "Seed image missing, skipping image neighbours");
                vec![]
            }
            Err(e) => return Err(e),
        };

        Ok(dedup_by_id(by_text.into_iter().chain(by_image)))
    }

    /// Six products drawn with replacement from up to 100 known ids.
    /// Repeats are expected and kept.
    #[instrument(skip(self))]
    pub async fn home_screen(&self) -> CatalogResult<Vec<Product>> {
        let known = self
            .call("catalog store", self.repository.list_ids(HOME_SCREEN_SAMPLE))
            .await?;
        let drawn = {
            let mut rng = rand::rng();
            draw_with_replacement(&known, HOME_SCREEN_SIZE, &mut rng)
        };
        self.resolve(&drawn).await
    }
}
