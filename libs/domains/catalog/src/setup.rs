//! Builds the services from a [`CatalogConfig`], picking a concrete backend
//! for every collaborator.

use std::sync::Arc;

use tracing::info;

use crate::blob::{BlobStore, FileBlobStore};
use crate::config::CatalogConfig;
use crate::embedding::{ClipEmbedder, OllamaEmbedder, OpenAIEmbedder, TextEmbeddingProvider};
use crate::error::{CatalogError, CatalogResult};
use crate::index::{
    Embedder, EmbeddingIndex, InMemoryVectorStore, ProductIndex, QdrantVectorStore, VectorStore,
};
use crate::llm::OllamaClient;
use crate::models::Modality;
use crate::postgres::PgCatalogRepository;
use crate::repository::{CatalogRepository, InMemoryCatalogRepository};
use crate::service::{CatalogService, RetrievalService};

/// Connect every store and return the write and read services sharing them
pub async fn build_services(
    config: &CatalogConfig,
) -> CatalogResult<(CatalogService, RetrievalService)> {
    let repository = catalog_store(config).await?;

    let blobs: Arc<dyn BlobStore> = Arc::new(FileBlobStore::open(&config.image_dir).await?);
    let uploads: Arc<dyn BlobStore> =
        Arc::new(FileBlobStore::open(&config.temp_image_dir).await?);

    let text_embedder = text_embedder(config)?;
    let image_embedder: Arc<dyn Embedder> = Arc::new(ClipEmbedder::new(&config.clip));

    let text_index: Arc<dyn ProductIndex> = Arc::new(EmbeddingIndex::new(
        Modality::Text,
        text_embedder,
        vector_store(config, &config.text_collection)?,
    ));
    let image_index: Arc<dyn ProductIndex> = Arc::new(EmbeddingIndex::new(
        Modality::Image,
        image_embedder,
        vector_store(config, &config.image_collection)?,
    ));

    let ollama = Arc::new(OllamaClient::new(config.ollama.clone()));

    let catalog = CatalogService::new(
        repository.clone(),
        blobs.clone(),
        uploads,
        text_index.clone(),
        image_index.clone(),
        ollama.clone(),
        ollama.clone(),
    )
    .with_call_timeout(config.call_timeout);

    let retrieval = RetrievalService::new(repository, blobs, text_index, image_index, ollama)
        .with_call_timeout(config.call_timeout);

    Ok((catalog, retrieval))
}

async fn catalog_store(config: &CatalogConfig) -> CatalogResult<Arc<dyn CatalogRepository>> {
    match &config.database_url {
        Some(url) => {
            let repository = PgCatalogRepository::connect(url).await?;
            repository.init_schema().await?;
            info!("Catalog store: postgres");
            Ok(Arc::new(repository))
        }
        None => {
            info!("Catalog store: in-memory, DATABASE_URL not set");
            Ok(Arc::new(InMemoryCatalogRepository::new()))
        }
    }
}

fn vector_store(config: &CatalogConfig, collection: &str) -> CatalogResult<Arc<dyn VectorStore>> {
    match &config.qdrant {
        Some(qdrant) => {
            info!(collection, url = %qdrant.url, "Vector store: qdrant");
            Ok(Arc::new(QdrantVectorStore::new(qdrant, collection)?))
        }
        None => {
            info!(collection, "Vector store: in-memory, QDRANT_URL not set");
            Ok(Arc::new(InMemoryVectorStore::new(collection)))
        }
    }
}

fn text_embedder(config: &CatalogConfig) -> CatalogResult<Arc<dyn Embedder>> {
    info!(provider = %config.embedding_provider, "Text embeddings");
    match config.embedding_provider {
        TextEmbeddingProvider::Ollama => Ok(Arc::new(OllamaEmbedder::new(&config.ollama))),
        TextEmbeddingProvider::OpenAI => {
            let openai = config.openai.clone().ok_or_else(|| {
                CatalogError::Validation("OPENAI_API_KEY is required for openai embeddings".into())
            })?;
            Ok(Arc::new(OpenAIEmbedder::new(openai)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::embedding::ClipConfig;
    use crate::llm::OllamaConfig;

    fn local_config(dir: &std::path::Path) -> CatalogConfig {
        CatalogConfig {
            image_dir: dir.join("store"),
            temp_image_dir: dir.join("temp"),
            database_url: None,
            qdrant: None,
            text_collection: "text".to_string(),
            image_collection: "images".to_string(),
            embedding_provider: TextEmbeddingProvider::Ollama,
            ollama: OllamaConfig::default(),
            openai: None,
            clip: ClipConfig {
                url: "http://localhost:8100".to_string(),
            },
            call_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_local_services_start_with_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let (catalog, retrieval) = build_services(&local_config(dir.path())).await.unwrap();

        assert!(dir.path().join("store").is_dir());
        assert!(dir.path().join("temp").is_dir());
        assert!(catalog.get_product(uuid::Uuid::new_v4()).await.unwrap().is_none());
        assert!(retrieval.home_screen().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_openai_without_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = local_config(dir.path());
        config.embedding_provider = TextEmbeddingProvider::OpenAI;

        let err = build_services(&config).await.err().unwrap();
        assert!(matches!(err, CatalogError::Validation(_)));
    }
}
