//! Settings for wiring the catalog services

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_parse};

use crate::embedding::{ClipConfig, OpenAIConfig, TextEmbeddingProvider};
use crate::index::QdrantConfig;
use crate::llm::OllamaConfig;

/// Everything needed to build the catalog and retrieval services
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Root of the permanent image store
    pub image_dir: PathBuf,
    /// Root for uploads awaiting ingestion
    pub temp_image_dir: PathBuf,
    /// Postgres catalog store; in-memory when unset
    pub database_url: Option<String>,
    /// Qdrant vector stores; in-memory when unset
    pub qdrant: Option<QdrantConfig>,
    pub text_collection: String,
    pub image_collection: String,
    pub embedding_provider: TextEmbeddingProvider,
    pub ollama: OllamaConfig,
    /// Present when `OPENAI_API_KEY` is set
    pub openai: Option<OpenAIConfig>,
    pub clip: ClipConfig,
    pub call_timeout: Duration,
}

impl FromEnv for CatalogConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let embedding_provider = match env_optional("EMBEDDING_PROVIDER") {
            Some(raw) => TextEmbeddingProvider::from_str(&raw).map_err(|_| {
                ConfigError::UnknownVariant {
                    key: "EMBEDDING_PROVIDER".to_string(),
                    value: raw.clone(),
                    expected: "ollama, openai".to_string(),
                }
            })?,
            None => TextEmbeddingProvider::default(),
        };

        let openai = match env_optional("OPENAI_API_KEY") {
            Some(_) => Some(OpenAIConfig::from_env()?),
            None => None,
        };

        if embedding_provider == TextEmbeddingProvider::OpenAI && openai.is_none() {
            return Err(ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()));
        }

        let call_timeout_secs: u64 = env_parse("CALL_TIMEOUT_SECS", 30)?;
        if call_timeout_secs == 0 {
            return Err(ConfigError::ParseError {
                key: "CALL_TIMEOUT_SECS".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            image_dir: env_or_default("IMAGE_DIR", "./store").into(),
            temp_image_dir: env_or_default("TEMP_IMAGE_DIR", "./temp_images").into(),
            database_url: env_optional("DATABASE_URL"),
            qdrant: QdrantConfig::from_env_optional()?,
            text_collection: env_or_default("TEXT_COLLECTION", "product_text"),
            image_collection: env_or_default("IMAGE_COLLECTION", "product_images"),
            embedding_provider,
            ollama: OllamaConfig::from_env()?,
            openai,
            clip: ClipConfig::from_env()?,
            call_timeout: Duration::from_secs(call_timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 12] = [
        "IMAGE_DIR",
        "TEMP_IMAGE_DIR",
        "DATABASE_URL",
        "QDRANT_URL",
        "TEXT_COLLECTION",
        "IMAGE_COLLECTION",
        "EMBEDDING_PROVIDER",
        "OPENAI_API_KEY",
        "OLLAMA_URL",
        "CLIP_URL",
        "CALL_TIMEOUT_SECS",
        "QDRANT_TIMEOUT_SECS",
    ];

    /// Every catalog variable unset except the given overrides
    fn env_with(
        overrides: &[(&'static str, &'static str)],
    ) -> Vec<(&'static str, Option<&'static str>)> {
        VARS.iter()
            .map(|key| {
                let value = overrides.iter().find(|(k, _)| k == key).map(|(_, v)| *v);
                (*key, value)
            })
            .collect()
    }

    #[test]
    fn test_defaults_use_local_backends() {
        temp_env::with_vars(env_with(&[]), || {
            let config = CatalogConfig::from_env().unwrap();
            assert_eq!(config.image_dir, PathBuf::from("./store"));
            assert_eq!(config.temp_image_dir, PathBuf::from("./temp_images"));
            assert!(config.database_url.is_none());
            assert!(config.qdrant.is_none());
            assert!(config.openai.is_none());
            assert_eq!(config.text_collection, "product_text");
            assert_eq!(config.image_collection, "product_images");
            assert_eq!(config.embedding_provider, TextEmbeddingProvider::Ollama);
            assert_eq!(config.call_timeout, Duration::from_secs(30));
        });
    }

    #[test]
    fn test_remote_backends_from_env() {
        let vars = env_with(&[
            ("DATABASE_URL", "postgres://localhost/catalog"),
            ("QDRANT_URL", "http://qdrant:6334"),
            ("EMBEDDING_PROVIDER", "OpenAI"),
            ("OPENAI_API_KEY", "sk-test"),
            ("CALL_TIMEOUT_SECS", "5"),
        ]);
        temp_env::with_vars(vars, || {
            let config = CatalogConfig::from_env().unwrap();
            assert_eq!(
                config.database_url.as_deref(),
                Some("postgres://localhost/catalog")
            );
            assert_eq!(config.qdrant.unwrap().url, "http://qdrant:6334");
            assert_eq!(config.embedding_provider, TextEmbeddingProvider::OpenAI);
            assert!(config.openai.is_some());
            assert_eq!(config.call_timeout, Duration::from_secs(5));
        });
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let vars = env_with(&[("EMBEDDING_PROVIDER", "vertex")]);
        temp_env::with_vars(vars, || {
            let err = CatalogConfig::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::UnknownVariant { .. }));
        });
    }

    #[test]
    fn test_openai_provider_requires_key() {
        let vars = env_with(&[("EMBEDDING_PROVIDER", "openai")]);
        temp_env::with_vars(vars, || {
            let err = CatalogConfig::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "OPENAI_API_KEY"));
        });
    }

    #[test]
    fn test_bad_timeout_is_a_parse_error() {
        let vars = env_with(&[("CALL_TIMEOUT_SECS", "soon")]);
        temp_env::with_vars(vars, || {
            let err = CatalogConfig::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::ParseError { .. }));
        });
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let vars = env_with(&[("CALL_TIMEOUT_SECS", "0")]);
        temp_env::with_vars(vars, || {
            let err = CatalogConfig::from_env().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::ParseError { ref key, .. } if key == "CALL_TIMEOUT_SECS"
            ));
        });
    }
}
