//! Catalog API - REST server for product ingestion and retrieval

use axum_helpers::server::{create_router, health_router, serve};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_catalog::{ApiDoc, CatalogState, build_services, handlers};
use tracing::info;

mod config;

use config::Config;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!(
        image_dir = %config.catalog.image_dir.display(),
        embeddings = %config.catalog.embedding_provider,
        "Building catalog services"
    );
    let (catalog, retrieval) = build_services(&config.catalog).await?;

    let api_routes = handlers::router(CatalogState {
        catalog,
        retrieval,
        public_url: config.server.public_url.clone(),
    });
    let router = create_router::<ApiDoc>(api_routes, "/api/v1")?;
    let app = router.merge(health_router("catalog-api", env!("CARGO_PKG_VERSION")));

    serve(app, &config.server).await?;

    info!("Catalog API shutdown complete");
    Ok(())
}
