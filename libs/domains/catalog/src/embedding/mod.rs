//! Embedders for the text and image indexes.

mod clip;
mod ollama;
mod openai;

pub use clip::{ClipConfig, ClipEmbedder};
pub use ollama::OllamaEmbedder;
pub use openai::{OpenAIConfig, OpenAIEmbedder};

use serde::Deserialize;
use strum::{Display, EnumString};

/// Backend used for text embeddings, selected by `EMBEDDING_PROVIDER`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum TextEmbeddingProvider {
    #[default]
    Ollama,
    OpenAI,
}
