//! Service configuration
//!
//! Configuration is layered: built-in defaults, an optional `config/*.toml`
//! file selected by `RUN_MODE`, then `TERRIER_`-prefixed environment
//! variables (`TERRIER_DATABASE__URL`, `TERRIER_BACKEND__KIND`, ...).

use serde::Deserialize;
use std::net::{SocketAddr, ToSocketAddrs};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub database: DatabaseConfig,
    pub remote: RemoteConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; `*` means any.
    pub cors_origins: Vec<String>,
}

/// Which search backend the process talks to. Selected once at startup; the
/// query compiler itself never branches on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Postgres,
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub kind: BackendKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_min_size: u32,
    pub pool_max_size: u32,
    pub pool_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the SQL-over-HTTP JSON API, e.g. `https://datastore.example.org`.
    pub url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter, overridable with `RUST_LOG`.
    pub level: String,
    /// Emit JSON-formatted log lines.
    pub json: bool,
    /// When set, also log to daily-rotated files in this directory.
    pub directory: Option<String>,
    pub file_prefix: String,
}

impl Config {
    /// Load configuration from defaults, optional file, and environment.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "default".to_string());

        let config = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("server.cors_origins", vec!["*".to_string()])?
            .set_default("backend.kind", "postgres")?
            .set_default("database.url", "")?
            .set_default("database.pool_min_size", 1)?
            .set_default("database.pool_max_size", 10)?
            .set_default("database.pool_timeout_seconds", 30)?
            .set_default("remote.url", "")?
            .set_default("remote.timeout_seconds", 30)?
            .set_default("logging.level", "info,sqlx=warn")?
            .set_default("logging.json", false)?
            .set_default("logging.file_prefix", "terrier")?
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TERRIER").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Reject configurations that cannot serve a single request.
    pub fn validate(&self) -> Result<(), String> {
        match self.backend.kind {
            BackendKind::Postgres => {
                if self.database.url.is_empty() {
                    return Err("backend.kind = postgres requires database.url".to_string());
                }
            }
            BackendKind::Remote => {
                if self.remote.url.is_empty() {
                    return Err("backend.kind = remote requires remote.url".to_string());
                }
                url::Url::parse(&self.remote.url)
                    .map_err(|e| format!("remote.url is not a valid URL: {e}"))?;
            }
        }
        if self.database.pool_max_size < self.database.pool_min_size {
            return Err("database.pool_max_size must be >= database.pool_min_size".to_string());
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.to_socket_addrs()?
            .next()
            .ok_or_else(|| anyhow::anyhow!("cannot resolve listen address {addr}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
                cors_origins: vec!["*".to_string()],
            },
            backend: BackendConfig {
                kind: BackendKind::Postgres,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/terrier".to_string(),
                pool_min_size: 1,
                pool_max_size: 10,
                pool_timeout_seconds: 30,
            },
            remote: RemoteConfig {
                url: String::new(),
                timeout_seconds: 30,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
                directory: None,
                file_prefix: "terrier".to_string(),
            },
        }
    }

    #[test]
    fn postgres_backend_requires_database_url() {
        let mut config = base_config();
        config.database.url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn remote_backend_requires_parsable_url() {
        let mut config = base_config();
        config.backend.kind = BackendKind::Remote;
        config.remote.url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.remote.url = "https://datastore.example.org".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn socket_addr_resolves() {
        let config = base_config();
        assert_eq!(
            config.socket_addr().unwrap(),
            "127.0.0.1:8000".parse().unwrap()
        );
    }
}
