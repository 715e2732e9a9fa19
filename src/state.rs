use crate::config::AppConfig;
use crate::db;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = db::connect(&config).await?;
        Ok(Self::from_parts(db, config))
    }

    pub fn from_parts(db: SqlitePool, config: Arc<AppConfig>) -> Self {
        Self { db, config }
    }

    /// Migrated in-memory store with a fixed test configuration.
    #[cfg(test)]
    pub async fn fake() -> Self {
        let db = db::connect_in_memory()
            .await
            .expect("in-memory database should open");
        Self::from_parts(db, Arc::new(test_config()))
    }
}

#[cfg(test)]
pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        max_connections: 1,
        session: crate::config::SessionConfig {
            secret: "test-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
            cookie_name: "session".into(),
            cookie_secure: false,
        },
    }
}
