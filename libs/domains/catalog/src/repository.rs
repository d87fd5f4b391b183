use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::models::Product;

/// Repository trait for Product records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Persist a new product. An existing id is `DuplicateId`.
    async fn save(&self, product: &Product) -> CatalogResult<()>;

    /// Get a product by ID
    async fn get(&self, id: Uuid) -> CatalogResult<Option<Product>>;

    /// Resolve `ids` in the given order, silently dropping unknown ids.
    /// Repeated ids resolve once per occurrence.
    async fn get_many(&self, ids: &[Uuid]) -> CatalogResult<Vec<Product>>;

    /// Products with any tag containing `tag`, in insertion order
    async fn filter_by_tag(&self, tag: &str, limit: u64, skip: u64)
    -> CatalogResult<Vec<Product>>;

    /// Up to `limit` known product ids
    async fn list_ids(&self, limit: u64) -> CatalogResult<Vec<Uuid>>;
}

/// Reorder fetched records to match `ids`, dropping misses
pub(crate) fn resolve_in_order(ids: &[Uuid], found: HashMap<Uuid, Product>) -> Vec<Product> {
    ids.iter().filter_map(|id| found.get(id).cloned()).collect()
}

#[derive(Debug, Default)]
struct CatalogState {
    order: Vec<Uuid>,
    products: HashMap<Uuid, Product>,
}

/// In-memory implementation of CatalogRepository (for development/testing).
///
/// Append-only: insertion order is the iteration order for tag filtering and
/// id listing.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalogRepository {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn save(&self, product: &Product) -> CatalogResult<()> {
        let mut state = self.state.write().await;

        if state.products.contains_key(&product.id) {
            return Err(CatalogError::DuplicateId {
                target: "catalog store".to_string(),
                id: product.id,
            });
        }

        state.order.push(product.id);
        state.products.insert(product.id, product.clone());

        tracing::info!(product_id = %product.id, "Saved product");
        Ok(())
    }

    async fn get(&self, id: Uuid) -> CatalogResult<Option<Product>> {
        let state = self.state.read().await;
        Ok(state.products.get(&id).cloned())
    }

    async fn get_many(&self, ids: &[Uuid]) -> CatalogResult<Vec<Product>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }

    async fn filter_by_tag(
        &self,
        tag: &str,
        limit: u64,
        skip: u64,
    ) -> CatalogResult<Vec<Product>> {
        let state = self.state.read().await;

        Ok(state
            .order
            .iter()
            .filter_map(|id| state.products.get(id))
            .filter(|p| p.content.has_tag_containing(tag))
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_ids(&self, limit: u64) -> CatalogResult<Vec<Uuid>> {
        let state = self.state.read().await;
        Ok(state.order.iter().take(limit as usize).copied().collect())
    }
}
