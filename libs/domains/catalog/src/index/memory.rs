use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::VectorStore;
use crate::error::{CatalogError, CatalogResult};

/// Brute-force cosine store (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryVectorStore {
    name: String,
    entries: Arc<RwLock<Vec<(Uuid, Vec<f32>)>>>,
}

impl InMemoryVectorStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Arc::default(),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn contains(&self, id: Uuid) -> CatalogResult<bool> {
        Ok(self.entries.read().await.iter().any(|(got, _)| *got == id))
    }

    async fn insert(&self, id: Uuid, vector: Vec<f32>, _payload: &str) -> CatalogResult<()> {
        let mut entries = self.entries.write().await;

        if entries.iter().any(|(got, _)| *got == id) {
            return Err(CatalogError::DuplicateId {
                target: self.name.clone(),
                id,
            });
        }
        let dimension = entries.first().map(|(_, first)| first.len());
        if dimension.is_some_and(|dim| dim != vector.len()) {
            return Err(CatalogError::Internal(format!(
                "{} holds {}-dimensional vectors, got {}",
                self.name,
                dimension.unwrap_or_default(),
                vector.len()
            )));
        }

        entries.push((id, vector));
        Ok(())
    }

    async fn nearest(&self, vector: Vec<f32>, k: usize) -> CatalogResult<Vec<Uuid>> {
        let entries = self.entries.read().await;

        let mut scored: Vec<(Uuid, f32)> = entries
            .iter()
            .map(|(id, stored)| (*id, cosine(&vector, stored)))
            .collect();
        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        Ok(scored.into_iter().take(k).map(|(id, _)| id).collect())
    }
}
