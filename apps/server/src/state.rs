//! Shared application state

use crate::config::{BackendKind, Config};
use crate::search::{PostgresBackend, RemoteBackend, SearchBackend, SearchEngine};
use std::sync::Arc;

/// Process-wide state: the configuration and the search engine owning the
/// backend handle (connection pool or HTTP client), constructed once at
/// startup and cloned into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<SearchEngine>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let backend: Arc<dyn SearchBackend> = match config.backend.kind {
            BackendKind::Postgres => {
                tracing::info!("Using the postgres search backend");
                Arc::new(PostgresBackend::connect(&config.database).await?)
            }
            BackendKind::Remote => {
                tracing::info!(url = %config.remote.url, "Using the remote search backend");
                Arc::new(RemoteBackend::new(&config.remote)?)
            }
        };

        Ok(Self {
            config: Arc::new(config),
            engine: Arc::new(SearchEngine::new(backend)),
        })
    }
}
