use crate::{ConfigError, FromEnv, env_optional, env_or_default, env_parse};
use std::net::Ipv4Addr;

/// HTTP listener settings and the externally visible base URL
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL clients use to reach this server, used to build resource links
    pub public_url: String,
}

impl ServerConfig {
    pub fn new(host: String, port: u16) -> Self {
        let public_url = format!("http://localhost:{}", port);
        Self {
            host,
            port,
            public_url,
        }
    }

    pub fn with_public_url(mut self, public_url: impl Into<String>) -> Self {
        self.public_url = public_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Bind address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FromEnv for ServerConfig {
    /// - `HOST`: defaults to 0.0.0.0
    /// - `PORT`: defaults to 8000
    /// - `PUBLIC_URL`: defaults to `http://localhost:{PORT}`
    fn from_env() -> Result<Self, ConfigError> {
        let host = env_or_default("HOST", &Ipv4Addr::UNSPECIFIED.to_string());
        let port = env_parse("PORT", 8000u16)?;

        let config = Self::new(host, port);
        Ok(match env_optional("PUBLIC_URL") {
            Some(url) => config.with_public_url(url),
            None => config,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(Ipv4Addr::UNSPECIFIED.to_string(), 8000)
    }
}
