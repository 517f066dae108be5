use crate::config::{AppConfig, ServerConfig};
use crate::db::{MemoryStore, PgStore, Store};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let store = connect_store(&config).await?;
        Ok(Self { store, config })
    }

    pub fn from_parts(store: Arc<dyn Store>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    /// State backed by a fresh in-memory store, for tests.
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            database_url: "memory://".into(),
            db_max_connections: 1,
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 0,
            },
            enable_global_error_logging: false,
        });
        Self {
            store: Arc::new(MemoryStore::new()),
            config,
        }
    }
}

/// Opens the configured store. A failed migration aborts startup.
async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Store>> {
    if config.uses_memory_store() {
        tracing::warn!("using in-memory store; data is lost on shutdown");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let pg = PgStore::connect(config).await?;
    pg.migrate().await?;
    Ok(Arc::new(pg))
}
