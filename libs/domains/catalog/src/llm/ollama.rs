use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use core_config::{ConfigError, FromEnv, env_or_default};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AnswerGenerator, Captioner, ContentGenerator, parse_generated_content};
use crate::blob::read_image;
use crate::error::{CatalogError, CatalogResult};
use crate::models::Content;

const GENERATOR_PROMPT: &str = r#"Given a one line description of a product, generate mock data for an e-commerce site.
Make up dimensions and metrics if the description does not give them.

Respond with a single JSON object of exactly this shape:
{
  "title": "title for the product",
  "content": "product details such as description, features and dimensions, with headings and highlighting in markdown",
  "tags": ["exactly 5 relevant tags for search"]
}"#;

const CAPTION_PROMPT: &str =
    "Describe the product in this image in one short line. Reply with the description only.";

/// Ollama server settings
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub chat_model: String,
    pub caption_model: String,
    pub embed_model: String,
}

impl OllamaConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            chat_model: "llama3.2".to_string(),
            caption_model: "llava".to_string(),
            embed_model: "nomic-embed-text".to_string(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self::new("http://localhost:11434")
    }
}

impl FromEnv for OllamaConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            base_url: env_or_default("OLLAMA_URL", &defaults.base_url)
                .trim_end_matches('/')
                .to_string(),
            chat_model: env_or_default("OLLAMA_CHAT_MODEL", &defaults.chat_model),
            caption_model: env_or_default("OLLAMA_CAPTION_MODEL", &defaults.caption_model),
            embed_model: env_or_default("OLLAMA_EMBED_MODEL", &defaults.embed_model),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    num_predict: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    images: Vec<String>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Captioning, content generation and answering against one Ollama server
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    config: OllamaConfig,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> CatalogResult<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}{}", self.config.base_url, path))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CatalogError::upstream(
                "ollama",
                format!("{} returned {}: {}", path, status, error_text),
            ));
        }

        Ok(response.json().await?)
    }

    async fn chat(&self, system: &str, user: &str, format: Option<&str>) -> CatalogResult<String> {
        let request = ChatRequest {
            model: &self.config.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            format,
            stream: false,
            options: ChatOptions { num_predict: 1024 },
        };

        let response: ChatResponse = self.post("/api/chat", &request).await?;
        Ok(response.message.content)
    }
}

#[async_trait]
impl Captioner for OllamaClient {
    async fn caption(&self, image_uri: &str) -> CatalogResult<String> {
        let image = read_image(image_uri).await?;
        let request = GenerateRequest {
            model: &self.config.caption_model,
            prompt: CAPTION_PROMPT,
            images: vec![BASE64.encode(image)],
            stream: false,
        };

        let response: GenerateResponse = self.post("/api/generate", &request).await?;
        let caption = response.response.trim().to_string();
        if caption.is_empty() {
            return Err(CatalogError::MalformedResponse(
                "captioner returned an empty caption".to_string(),
            ));
        }

        debug!(%caption, "Captioned image");
        Ok(caption)
    }
}

#[async_trait]
impl ContentGenerator for OllamaClient {
    async fn generate(&self, description: &str) -> CatalogResult<Content> {
        let raw = self.chat(GENERATOR_PROMPT, description, Some("json")).await?;
        parse_generated_content(&raw)
    }
}

#[async_trait]
impl AnswerGenerator for OllamaClient {
    async fn answer(&self, question: &str, context: &[String]) -> CatalogResult<String> {
        let system = format!(
            "Answer the user's question based only on the provided context.\n\n<context>\n{}\n</context>",
            context.join("\n\n")
        );
        self.chat(&system, question, None).await
    }
}
