use std::sync::Arc;

use crate::{
    auth::{
        jwt::JwtKeys,
        password::{self, HashLimiter},
    },
    config::AppConfig,
    db::{PgStore, Store},
    memory::MemoryStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
    pub keys: JwtKeys,
    pub hasher: HashLimiter,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        tokio::task::spawn_blocking(password::prepare_dummy_hash).await?;

        let store: Arc<dyn Store> = match config.database_url.as_deref() {
            Some(url) => {
                let pg = PgStore::connect(&config, url).await?;
                // Run migrations if present
                if let Err(e) = pg.migrate().await {
                    tracing::warn!(error = %e, "migration failed; continuing");
                }
                Arc::new(pg)
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory store, data is lost on exit");
                Arc::new(MemoryStore::default())
            }
        };
        Ok(Self::from_parts(store, Arc::new(config)))
    }

    pub fn from_parts(store: Arc<dyn Store>, config: Arc<AppConfig>) -> Self {
        // One key set for both login and the gate.
        let keys = JwtKeys::new(&config.jwt);
        let hasher = HashLimiter::new(config.hash_concurrency, config.request_timeout);
        Self {
            store,
            config,
            keys,
            hasher,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let config = AppConfig::from_lookup(|key| match key {
            "JWT_SECRET" => Some("test-secret-that-is-long-enough-000".into()),
            _ => None,
        })
        .expect("test config");
        Self::from_parts(Arc::new(MemoryStore::default()), Arc::new(config))
    }
}
