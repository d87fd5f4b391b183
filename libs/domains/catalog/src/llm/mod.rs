//! Language and vision model collaborators.
//!
//! The services only see the traits here. [`OllamaClient`] implements all
//! three against a local Ollama server.

mod ollama;

pub use ollama::{OllamaClient, OllamaConfig};

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{CatalogError, CatalogResult};
use crate::models::Content;

/// Number of tags every generated Content must carry
pub const GENERATED_TAG_COUNT: usize = 5;

/// Describes an image in one line
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Captioner: Send + Sync {
    async fn caption(&self, image_uri: &str) -> CatalogResult<String>;
}

/// Produces product Content from a one-line description
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, description: &str) -> CatalogResult<Content>;
}

/// Answers a question using only the supplied context documents
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn answer(&self, question: &str, context: &[String]) -> CatalogResult<String>;
}

/// Wire shape the generator must return, nothing more and nothing less
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GeneratedContent {
    title: String,
    content: String,
    tags: Vec<String>,
}

/// Validate raw generator output into [`Content`].
///
/// Missing or extra fields, blank text, or a tag count other than
/// [`GENERATED_TAG_COUNT`] are `MalformedResponse`.
pub fn parse_generated_content(raw: &str) -> CatalogResult<Content> {
    let generated: GeneratedContent = serde_json::from_str(raw)
        .map_err(|e| CatalogError::MalformedResponse(format!("generator output: {}", e)))?;

    let title = generated.title.trim();
    if title.is_empty() {
        return Err(CatalogError::MalformedResponse(
            "generator returned an empty title".to_string(),
        ));
    }
    if generated.content.trim().is_empty() {
        return Err(CatalogError::MalformedResponse(
            "generator returned empty content".to_string(),
        ));
    }
    if generated.tags.len() != GENERATED_TAG_COUNT {
        return Err(CatalogError::MalformedResponse(format!(
            "expected {} tags, got {}",
            GENERATED_TAG_COUNT,
            generated.tags.len()
        )));
    }
    if generated.tags.iter().any(|tag| tag.trim().is_empty()) {
        return Err(CatalogError::MalformedResponse(
            "generator returned a blank tag".to_string(),
        ));
    }

    Ok(Content {
        title: title.to_string(),
        content: generated.content,
        tags: generated
            .tags
            .into_iter()
            .map(|tag| tag.trim().to_string())
            .collect(),
    })
}
