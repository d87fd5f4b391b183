use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use strum::Display;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Generated text describing a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct Content {
    /// Short product title
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Free-form description, may contain markdown
    #[validate(length(min = 1))]
    pub content: String,
    /// Display-ordered tags
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Content {
    pub fn new(title: impl Into<String>, content: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            tags,
        }
    }

    /// True if any tag contains `needle` (case-sensitive)
    pub fn has_tag_containing(&self, needle: &str) -> bool {
        self.tags.iter().any(|tag| tag.contains(needle))
    }
}

/// A catalog entry.
///
/// Equality and hashing consider `id` only, so a stale copy of a product is
/// the same entity as a fresh one.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub content: Content,
    /// Blob store reference for the product image
    pub image_id: Uuid,
}

impl Product {
    /// Create a product with a freshly minted, time-ordered id
    pub fn new(content: Content, image_id: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            content,
            image_id,
        }
    }
}

impl PartialEq for Product {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Product {}

impl Hash for Product {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Text,
    Image,
}

/// A document as handed to an index: the product id plus the modality payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedDocument {
    pub id: Uuid,
    pub payload: String,
}

impl IndexedDocument {
    pub fn text(product: &Product) -> Self {
        Self {
            id: product.id,
            payload: product.content.content.clone(),
        }
    }

    pub fn image(product_id: Uuid, image_uri: impl Into<String>) -> Self {
        Self {
            id: product_id,
            payload: image_uri.into(),
        }
    }
}

/// Steps of the ingestion saga, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IngestStep {
    ValidateContent,
    StoreImage,
    SaveRecord,
    IndexText,
    IndexImage,
}

impl IngestStep {
    pub const ALL: [IngestStep; 5] = [
        IngestStep::ValidateContent,
        IngestStep::StoreImage,
        IngestStep::SaveRecord,
        IngestStep::IndexText,
        IngestStep::IndexImage,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed(String),
    Skipped,
}

/// Per-step outcome of one ingestion. Nothing in it is ever rolled back.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub product_id: Option<Uuid>,
    pub image_id: Option<Uuid>,
    pub steps: Vec<(IngestStep, StepStatus)>,
}

impl IngestionReport {
    pub fn new() -> Self {
        Self {
            product_id: None,
            image_id: None,
            steps: IngestStep::ALL
                .iter()
                .map(|step| (*step, StepStatus::Skipped))
                .collect(),
        }
    }

    pub fn record(&mut self, step: IngestStep, status: StepStatus) {
        if let Some(entry) = self.steps.iter_mut().find(|(s, _)| *s == step) {
            entry.1 = status;
        }
    }

    pub fn status(&self, step: IngestStep) -> &StepStatus {
        self.steps
            .iter()
            .find(|(s, _)| *s == step)
            .map(|(_, status)| status)
            .unwrap_or(&StepStatus::Skipped)
    }

    pub fn is_complete(&self) -> bool {
        self.steps
            .iter()
            .all(|(_, status)| *status == StepStatus::Succeeded)
    }

    pub fn first_failure(&self) -> Option<(IngestStep, &str)> {
        self.steps.iter().find_map(|(step, status)| match status {
            StepStatus::Failed(msg) => Some((*step, msg.as_str())),
            _ => None,
        })
    }

    /// The record exists in the catalog store but at least one index missed it
    pub fn is_inconsistent(&self) -> bool {
        *self.status(IngestStep::SaveRecord) == StepStatus::Succeeded && !self.is_complete()
    }
}

impl Default for IngestionReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Product as returned over HTTP, with a fetchable image link
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub content: Content,
    pub image_id: Uuid,
    /// Absolute URL serving the product image
    pub image_uri: String,
}

impl ProductResponse {
    pub fn from_product(product: Product, public_url: &str) -> Self {
        let image_uri = image_url(public_url, product.image_id);
        Self {
            id: product.id,
            content: product.content,
            image_id: product.image_id,
            image_uri,
        }
    }
}

pub fn image_url(public_url: &str, image_id: Uuid) -> String {
    format!("{}/api/v1/image?id={}", public_url, image_id)
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductsWithAnswer {
    /// Generated answer grounded on the retrieved products
    pub answer: String,
    pub products: Vec<ProductResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CaptionedImage {
    /// Staged upload, pass back as `temp_image_id` when creating the product
    pub temp_image_id: Uuid,
    pub caption: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatedProduct {
    pub product_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductIdQuery {
    pub product_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ImageIdQuery {
    pub id: Uuid,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TempImageQuery {
    pub temp_image_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    #[validate(length(min = 1, max = 1000))]
    pub query: String,
}

#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CaptionQuery {
    #[validate(length(min = 1, max = 1000))]
    pub caption: String,
}

/// Tag filter with pagination
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TagQuery {
    /// Substring matched against each stored tag
    #[validate(length(min = 1, max = 100))]
    pub tag: String,
    /// Maximum number of results
    #[serde(default = "default_tag_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u64,
    /// Number of results to skip
    #[serde(default)]
    pub skip: u64,
}

/// Multipart body of the upload endpoints, for the API docs
#[derive(Debug, ToSchema)]
pub struct ImageUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

fn default_tag_limit() -> u64 {
    10
}
