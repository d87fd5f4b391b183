//! Catalog Domain
//!
//! Multimodal product catalog: products are ingested from an image plus
//! generated content, then retrieved by tag, text, image or similarity.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints under /api/v1
//! └──────┬──────┘
//!        │
//! ┌──────▼──────────────────────┐
//! │ CatalogService              │  ← ingestion saga, captioning, generation
//! │ RetrievalService            │  ← tag/text/image/similar/home screen
//! └──────┬──────────────────────┘
//!        │
//! ┌──────▼──────┬─────────────┬──────────────┬───────────┐
//! │ Repository  │  BlobStore  │ ProductIndex │    LLM    │
//! │ (sea-orm /  │  (files)    │ (embedder +  │ (ollama)  │
//! │  in-memory) │             │  vectors)    │           │
//! └─────────────┴─────────────┴──────────────┴───────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use core_config::FromEnv;
//! use domain_catalog::{CatalogConfig, CatalogState, build_services, handlers};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CatalogConfig::from_env()?;
//! let (catalog, retrieval) = build_services(&config).await?;
//!
//! let router = handlers::router(CatalogState {
//!     catalog,
//!     retrieval,
//!     public_url: "http://localhost:8000".to_string(),
//! });
//! # Ok(())
//! # }
//! ```

pub mod blob;
pub mod config;
pub mod embedding;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod index;
pub mod llm;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod setup;

// Re-export commonly used types
pub use blob::{BlobStore, FileBlobStore};
pub use config::CatalogConfig;
pub use error::{CatalogError, CatalogResult};
pub use handlers::{ApiDoc, CatalogState};
pub use index::{Embedder, EmbeddingIndex, InMemoryVectorStore, ProductIndex, VectorStore};
pub use llm::{AnswerGenerator, Captioner, ContentGenerator};
pub use models::{
    Content, IngestStep, IngestionReport, Modality, Product, ProductResponse, StepStatus,
};
pub use postgres::PgCatalogRepository;
pub use repository::{CatalogRepository, InMemoryCatalogRepository};
pub use service::{CatalogService, RetrievalService};
pub use setup::build_services;
