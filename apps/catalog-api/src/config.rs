//! Configuration for Catalog API

use core_config::{FromEnv, server::ServerConfig};
use domain_catalog::CatalogConfig;

pub use core_config::Environment;

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: Environment,
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        Ok(Self {
            environment: Environment::from_env(),
            server: ServerConfig::from_env()?,
            catalog: CatalogConfig::from_env()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        temp_env::with_vars(
            [
                ("APP_ENV", Some("production")),
                ("PORT", Some("9100")),
                ("PUBLIC_URL", Some("https://shop.example.com/")),
                ("DATABASE_URL", None),
                ("QDRANT_URL", None),
                ("EMBEDDING_PROVIDER", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert!(config.environment.is_production());
                assert_eq!(config.server.port, 9100);
                assert_eq!(config.server.public_url, "https://shop.example.com");
                assert!(config.catalog.database_url.is_none());
            },
        );
    }

    #[test]
    fn test_invalid_port_fails() {
        temp_env::with_var("PORT", Some("http"), || {
            assert!(Config::from_env().is_err());
        });
    }
}
