//! # Axum Helpers
//!
//! Shared HTTP plumbing for the workspace's axum services.
//!
//! - **[`errors`]**: [`AppError`] and the JSON [`ErrorResponse`] body with
//!   stable [`ErrorCode`]s
//! - **[`extractors`]**: validated JSON, JSON-rejecting query params and
//!   single-image multipart uploads
//! - **[`server`]**: router assembly (Swagger UI, tracing, CORS), health
//!   endpoint and graceful shutdown

pub mod errors;
pub mod extractors;
pub mod server;

pub use errors::{AppError, ErrorCode, ErrorResponse};
pub use extractors::{ImageUpload, QueryParams, ValidatedJson};
pub use server::{create_router, health_router, serve, shutdown_signal};
