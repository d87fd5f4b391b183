//! Server infrastructure: router assembly, health endpoints and graceful
//! shutdown.
//!
//! ```ignore
//! use axum_helpers::server::{create_router, health_router, serve};
//!
//! let router = create_router::<ApiDoc>(api_routes, "/api/v1")?
//!     .merge(health_router("catalog-api", env!("CARGO_PKG_VERSION")));
//! serve(router, &config.server).await?;
//! ```

pub mod app;
pub mod health;
pub mod shutdown;

pub use app::{cors_layer_from_env, create_router, serve};
pub use health::{HealthResponse, health_router};
pub use shutdown::shutdown_signal;
