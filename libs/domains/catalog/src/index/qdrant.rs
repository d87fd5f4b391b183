use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_parse};
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    self, CreateCollectionBuilder, Distance, GetPointsBuilder, PointId, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use tokio::sync::OnceCell;
use tracing::info;
use uuid::Uuid;

use super::VectorStore;
use crate::error::{CatalogError, CatalogResult};

/// Qdrant connection configuration
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl QdrantConfig {
    pub fn new(url: String) -> Self {
        Self {
            url,
            api_key: None,
            timeout_secs: 30,
        }
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// `None` unless `QDRANT_URL` is set
    pub fn from_env_optional() -> Result<Option<Self>, ConfigError> {
        match env_optional("QDRANT_URL") {
            Some(_) => Self::from_env().map(Some),
            None => Ok(None),
        }
    }
}

impl FromEnv for QdrantConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env_or_default("QDRANT_URL", "http://localhost:6334"),
            api_key: env_optional("QDRANT_API_KEY"),
            timeout_secs: env_parse("QDRANT_TIMEOUT_SECS", 30u64)?,
        })
    }
}

/// One Qdrant collection used as a [`VectorStore`].
///
/// The collection is created with cosine distance on the first insert, sized
/// to the first vector seen.
///
/// Qdrant has no insert-if-absent, so the duplicate check in
/// [`EmbeddingIndex::add`](super::EmbeddingIndex::add) is a `contains` read
/// followed by an upsert. Two concurrent adds of one id would both pass the
/// check and the later upsert wins. Ingestion only adds freshly minted UUIDv7
/// product ids, so this race does not occur there.
pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
    ready: OnceCell<()>,
}

const PAYLOAD_KEY: &str = "payload";

impl QdrantVectorStore {
    pub fn new(config: &QdrantConfig, collection: impl Into<String>) -> CatalogResult<Self> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(api_key) = &config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        builder = builder.timeout(Duration::from_secs(config.timeout_secs));

        let client = builder
            .build()
            .map_err(|e| CatalogError::upstream("vector store", format!("Failed to build client: {}", e)))?;

        Ok(Self::from_client(client, collection))
    }

    pub fn from_client(client: Qdrant, collection: impl Into<String>) -> Self {
        Self {
            client,
            collection: collection.into(),
            ready: OnceCell::new(),
        }
    }

    async fn exists(&self) -> CatalogResult<bool> {
        if self.ready.initialized() {
            return Ok(true);
        }
        Ok(self.client.collection_exists(&self.collection).await?)
    }

    async fn ensure_collection(&self, dimension: usize) -> CatalogResult<()> {
        self.ready
            .get_or_try_init(|| async {
                if !self.client.collection_exists(&self.collection).await? {
                    self.client
                        .create_collection(
                            CreateCollectionBuilder::new(&self.collection).vectors_config(
                                VectorParamsBuilder::new(dimension as u64, Distance::Cosine),
                            ),
                        )
                        .await?;
                    info!(collection = %self.collection, dimension, "Created collection");
                }
                Ok::<_, CatalogError>(())
            })
            .await?;
        Ok(())
    }
}

fn point_id_to_uuid(point_id: &PointId) -> CatalogResult<Uuid> {
    match &point_id.point_id_options {
        Some(qdrant::point_id::PointIdOptions::Uuid(uuid_str)) => Uuid::parse_str(uuid_str)
            .map_err(|e| CatalogError::MalformedResponse(format!("Invalid point id: {}", e))),
        Some(qdrant::point_id::PointIdOptions::Num(num)) => Ok(Uuid::from_u128(*num as u128)),
        None => Err(CatalogError::MalformedResponse(
            "Missing point id".to_string(),
        )),
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn contains(&self, id: Uuid) -> CatalogResult<bool> {
        if !self.exists().await? {
            return Ok(false);
        }

        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(&self.collection, vec![PointId::from(id.to_string())])
                    .with_payload(false)
                    .with_vectors(false),
            )
            .await?;

        Ok(!response.result.is_empty())
    }

    async fn insert(&self, id: Uuid, vector: Vec<f32>, payload: &str) -> CatalogResult<()> {
        self.ensure_collection(vector.len()).await?;

        let payload: HashMap<String, QdrantValue> = HashMap::from([(
            PAYLOAD_KEY.to_string(),
            QdrantValue::from(payload.to_string()),
        )]);
        let point = PointStruct::new(PointId::from(id.to_string()), vector, payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]).wait(true))
            .await?;

        Ok(())
    }

    async fn nearest(&self, vector: Vec<f32>, k: usize) -> CatalogResult<Vec<Uuid>> {
        if !self.exists().await? {
            return Ok(vec![]);
        }

        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector, k as u64).with_payload(false),
            )
            .await?;

        results
            .result
            .into_iter()
            .map(|point| {
                point
                    .id
                    .as_ref()
                    .map(point_id_to_uuid)
                    .transpose()?
                    .ok_or_else(|| CatalogError::MalformedResponse("Missing point id".to_string()))
            })
            .collect()
    }
}
