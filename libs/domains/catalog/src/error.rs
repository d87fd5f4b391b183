use std::future::Future;
use std::time::Duration;

use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;
use uuid::Uuid;

use crate::models::IngestStep;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product not found: {0}")]
    NotFound(Uuid),

    #[error("Image not found: {0}")]
    ImageNotFound(Uuid),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{id} already exists in {target}")]
    DuplicateId { target: String, id: Uuid },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("{component} unavailable: {message}")]
    UpstreamUnavailable { component: String, message: String },

    #[error("{component} timed out after {}s", .after.as_secs())]
    Timeout { component: String, after: Duration },

    #[error("Product {product_id} partially written, {step} failed: {message}")]
    InconsistentWrite {
        product_id: Uuid,
        step: IngestStep,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl CatalogError {
    pub fn upstream(component: impl Into<String>, message: impl ToString) -> Self {
        CatalogError::UpstreamUnavailable {
            component: component.into(),
            message: message.to_string(),
        }
    }

    /// Whether the same call may succeed if repeated unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CatalogError::UpstreamUnavailable { .. } | CatalogError::Timeout { .. }
        )
    }
}

/// Run `call` under a deadline, mapping expiry to [`CatalogError::Timeout`].
pub async fn with_timeout<T, F>(component: &str, limit: Duration, call: F) -> CatalogResult<T>
where
    F: Future<Output = CatalogResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(CatalogError::Timeout {
            component: component.to_string(),
            after: limit,
        }),
    }
}

impl From<sea_orm::DbErr> for CatalogError {
    fn from(err: sea_orm::DbErr) -> Self {
        CatalogError::upstream("catalog store", err)
    }
}

impl From<qdrant_client::QdrantError> for CatalogError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        CatalogError::upstream("vector store", err)
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return CatalogError::MalformedResponse(err.to_string());
        }
        let component = err
            .url()
            .and_then(|url| url.host_str())
            .map(|host| format!("model server {}", host))
            .unwrap_or_else(|| "model server".to_string());
        CatalogError::upstream(component, err)
    }
}

/// Convert CatalogError to AppError for standardized HTTP error responses
impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(id) => AppError::NotFound(format!("Product {} not found", id)),
            CatalogError::ImageNotFound(id) => {
                AppError::NotFound(format!("Image {} not found", id))
            }
            CatalogError::Validation(msg) => AppError::BadRequest(msg),
            err @ CatalogError::DuplicateId { .. } => AppError::Conflict(err.to_string()),
            CatalogError::MalformedResponse(msg) => AppError::MalformedUpstreamResponse(msg),
            err @ CatalogError::UpstreamUnavailable { .. } => {
                AppError::UpstreamUnavailable(err.to_string())
            }
            err @ CatalogError::Timeout { .. } => AppError::UpstreamTimeout(err.to_string()),
            err @ CatalogError::InconsistentWrite { .. } => {
                AppError::InternalServerError(err.to_string())
            }
            CatalogError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
