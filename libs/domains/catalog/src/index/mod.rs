//! Similarity indexes keyed by product id.
//!
//! An index pairs an [`Embedder`] (payload to vector) with a [`VectorStore`]
//! (id to vector, nearest-neighbour lookup). The text and image indexes are
//! the same [`EmbeddingIndex`] with different embedders.
//!
//! ```text
//! add(id, payload)  ──► Embedder::embed ──► VectorStore::insert
//! search(query, k)  ──► Embedder::embed ──► VectorStore::nearest ──► [id]
//! ```

mod memory;
mod qdrant;

pub use memory::InMemoryVectorStore;
pub use qdrant::{QdrantConfig, QdrantVectorStore};

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{IndexedDocument, Modality};

/// Results returned by a search when the caller does not ask for a count
pub const DEFAULT_TOP_K: usize = 4;

/// Add-only similarity index over products
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductIndex: Send + Sync {
    fn modality(&self) -> Modality;

    /// Index a document. An id already present is `DuplicateId`.
    async fn add(&self, document: IndexedDocument) -> CatalogResult<()>;

    /// Ids of the `k` nearest documents, best first. No score cut-off.
    async fn search(&self, query: &str, k: usize) -> CatalogResult<Vec<Uuid>>;
}

/// Maps a payload (text, or an image URI) into a vector
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, payload: &str) -> CatalogResult<Vec<f32>>;
}

/// Stores vectors by id and answers nearest-neighbour queries
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn contains(&self, id: Uuid) -> CatalogResult<bool>;

    /// Insert a new vector. An id already present is `DuplicateId`.
    async fn insert(&self, id: Uuid, vector: Vec<f32>, payload: &str) -> CatalogResult<()>;

    async fn nearest(&self, vector: Vec<f32>, k: usize) -> CatalogResult<Vec<Uuid>>;
}

/// A [`ProductIndex`] composed of an embedder and a vector store
pub struct EmbeddingIndex {
    modality: Modality,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl EmbeddingIndex {
    pub fn new(modality: Modality, embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            modality,
            embedder,
            store,
        }
    }

    fn target(&self) -> String {
        format!("{} index", self.modality)
    }
}

#[async_trait]
impl ProductIndex for EmbeddingIndex {
    fn modality(&self) -> Modality {
        self.modality
    }

    #[instrument(skip(self, document), fields(modality = %self.modality, id = %document.id))]
    async fn add(&self, document: IndexedDocument) -> CatalogResult<()> {
        // Checked before embedding to avoid a wasted model call
        if self.store.contains(document.id).await? {
            return Err(CatalogError::DuplicateId {
                target: self.target(),
                id: document.id,
            });
        }

        let vector = self.embedder.embed(&document.payload).await?;
        self.store.insert(document.id, vector, &document.payload).await?;

        debug!("Indexed document");
        Ok(())
    }

    #[instrument(skip(self, query), fields(modality = %self.modality))]
    async fn search(&self, query: &str, k: usize) -> CatalogResult<Vec<Uuid>> {
        if k == 0 {
            return Ok(vec![]);
        }

        let vector = self.embedder.embed(query).await?;
        let ids = self.store.nearest(vector, k).await?;

        debug!(hits = ids.len(), "Searched index");
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    fn index(embedder: MockEmbedder, store: MockVectorStore) -> EmbeddingIndex {
        EmbeddingIndex::new(Modality::Text, Arc::new(embedder), Arc::new(store))
    }

    #[tokio::test]
    async fn test_add_embeds_and_inserts() {
        let id = Uuid::new_v4();
        let mut embedder = MockEmbedder::new();
        embedder
            .expect_embed()
            .with(eq("red shoe"))
            .times(1)
            .returning(|_| Ok(vec![1.0, 0.0]));

        let mut store = MockVectorStore::new();
        store.expect_contains().with(eq(id)).returning(|_| Ok(false));
        store
            .expect_insert()
            .withf(move |got, vector, payload| {
                *got == id && vector == &vec![1.0, 0.0] && payload == "red shoe"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        index(embedder, store)
            .add(IndexedDocument {
                id,
                payload: "red shoe".into(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_add_duplicate_is_rejected_without_embedding() {
        let id = Uuid::new_v4();
        let mut embedder = MockEmbedder::new();
        embedder.expect_embed().never();

        let mut store = MockVectorStore::new();
        store.expect_contains().returning(|_| Ok(true));
        store.expect_insert().never();

        let err = index(embedder, store)
            .add(IndexedDocument {
                id,
                payload: "red shoe".into(),
            })
            .await
            .unwrap_err();

        assert!(
            matches!(err, CatalogError::DuplicateId { ref target, id: got } if target == "text index" && got == id)
        );
    }

    #[tokio::test]
    async fn test_search_with_zero_k_short_circuits() {
        let mut embedder = MockEmbedder::new();
        embedder.expect_embed().never();
        let store = MockVectorStore::new();

        let ids = index(embedder, store).search("shoe", 0).await.unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn test_search_passes_k_through() {
        let hit = Uuid::new_v4();
        let mut embedder = MockEmbedder::new();
        embedder.expect_embed().returning(|_| Ok(vec![0.5, 0.5]));

        let mut store = MockVectorStore::new();
        store
            .expect_nearest()
            .withf(|_, k| *k == DEFAULT_TOP_K)
            .returning(move |_, _| Ok(vec![hit]));

        let ids = index(embedder, store)
            .search("shoe", DEFAULT_TOP_K)
            .await
            .unwrap();
        assert_eq!(ids, vec![hit]);
    }
}
