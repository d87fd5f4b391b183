use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use core_config::{ConfigError, FromEnv, env_or_default};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::blob::read_image;
use crate::error::{CatalogError, CatalogResult};
use crate::index::Embedder;

/// Location of the CLIP image embedding service
#[derive(Debug, Clone)]
pub struct ClipConfig {
    pub url: String,
}

impl FromEnv for ClipConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env_or_default("CLIP_URL", "http://localhost:8100")
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

/// Image embeddings from a CLIP HTTP service.
///
/// Payloads are blob store URIs; the image bytes are read locally and posted
/// base64-encoded to `{url}/embed`, which answers `{"embedding": [..]}`.
pub struct ClipEmbedder {
    client: Client,
    url: String,
}

impl ClipEmbedder {
    pub fn new(config: &ClipConfig) -> Self {
        Self {
            client: Client::new(),
            url: config.url.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ClipRequest {
    image: String,
}

#[derive(Debug, Deserialize)]
struct ClipResponse {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for ClipEmbedder {
    async fn embed(&self, payload: &str) -> CatalogResult<Vec<f32>> {
        let image = read_image(payload).await?;

        let response = self
            .client
            .post(format!("{}/embed", self.url))
            .json(&ClipRequest {
                image: BASE64.encode(image),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CatalogError::upstream(
                "clip",
                format!("embed returned {}: {}", status, error_text),
            ));
        }

        let body: ClipResponse = response.json().await?;
        if body.embedding.is_empty() {
            return Err(CatalogError::MalformedResponse(
                "clip returned an empty embedding".to_string(),
            ));
        }
        Ok(body.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, routing::post};
    use serde_json::{Value, json};

    #[tokio::test]
    async fn test_embed_posts_base64_image() {
        let app = Router::new().route(
            "/embed",
            post(|Json(body): Json<Value>| async move {
                let decoded = BASE64.decode(body["image"].as_str().unwrap()).unwrap();
                assert_eq!(decoded, b"png-bytes");
                Json(json!({ "embedding": [0.25, 0.75] }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("shoe.png");
        tokio::fs::write(&image, b"png-bytes").await.unwrap();

        let embedder = ClipEmbedder::new(&ClipConfig {
            url: format!("http://{}", addr),
        });
        let vector = embedder.embed(image.to_str().unwrap()).await.unwrap();
        assert_eq!(vector, vec![0.25, 0.75]);
    }

    #[tokio::test]
    async fn test_missing_image_is_validation_error() {
        let embedder = ClipEmbedder::new(&ClipConfig {
            url: "http://127.0.0.1:9".to_string(),
        });
        let err = embedder.embed("/no/such/image.png").await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }
}
