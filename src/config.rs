use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub server: ServerConfig,
    /// Log every error response through the global error handler.
    pub enable_global_error_logging: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let server = ServerConfig {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("APP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(5000),
        };
        let db_max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let enable_global_error_logging = std::env::var("ENABLE_GLOBAL_ERROR_LOGGING")
            .map(|v| v == "true")
            .unwrap_or(false);
        Ok(Self {
            database_url,
            db_max_connections,
            server,
            enable_global_error_logging,
        })
    }

    /// `memory://` selects the in-process store instead of PostgreSQL.
    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with("memory:")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> AppConfig {
        AppConfig {
            database_url: url.into(),
            db_max_connections: 1,
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 5000,
            },
            enable_global_error_logging: false,
        }
    }

    #[test]
    fn memory_url_selects_memory_store() {
        assert!(config("memory://").uses_memory_store());
        assert!(!config("postgres://postgres@localhost/courses").uses_memory_store());
    }
}
