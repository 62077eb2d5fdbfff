use std::sync::Arc;

use tower_sessions_sqlx_store::PostgresStore;
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    db::{self, fixture::FixtureRepository, live::LiveRepository, Connection, Repository},
    session::SessionBackend,
};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub sessions: SessionBackend,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        Ok(Self::from_config(config).await)
    }

    /// Connect to the database once. A reachable database gets migrations and the
    /// Postgres session store; otherwise the fixture dataset and in-memory
    /// sessions are served.
    pub async fn from_config(config: AppConfig) -> Self {
        let (repo, sessions): (Arc<dyn Repository>, SessionBackend) =
            match db::connect(&config.database).await {
                Connection::Live(pool) => {
                    if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
                        warn!(error = %e, "migration failed; continuing with existing schema");
                    }
                    let store = PostgresStore::new(pool.clone());
                    if let Err(e) = store.migrate().await {
                        warn!(error = %e, "session table migration failed");
                    }
                    (
                        Arc::new(LiveRepository::new(pool)),
                        SessionBackend::Postgres(store),
                    )
                }
                Connection::Unavailable => {
                    info!("serving fixture data; writes are not persisted");
                    (Arc::new(FixtureRepository::new()), SessionBackend::memory())
                }
            };

        if let Err(e) = sessions.purge_expired().await {
            warn!(error = %e, "could not purge expired sessions");
        }

        Self::from_parts(repo, sessions, Arc::new(config))
    }

    pub fn from_parts(
        repo: Arc<dyn Repository>,
        sessions: SessionBackend,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            repo,
            sessions,
            config,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let config = AppConfig::from_lookup(|_| None).expect("default config");
        Self::from_parts(
            Arc::new(FixtureRepository::new()),
            SessionBackend::memory(),
            Arc::new(config),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DataMode;

    #[tokio::test]
    async fn unreachable_database_falls_back_to_fixtures() {
        let config = AppConfig::from_lookup(|k| match k {
            "DB_HOST" => Some("127.0.0.1".into()),
            "DB_PORT" => Some("1".into()),
            "DB_CONNECT_TIMEOUT_SECS" => Some("1".into()),
            _ => None,
        })
        .unwrap();
        assert!(!config.database.demo_mode);

        let state = AppState::from_config(config).await;
        assert_eq!(state.repo.mode(), DataMode::Demo);
        assert!(matches!(state.sessions, SessionBackend::Memory(_)));
        assert_eq!(state.repo.fetch_all("SELECT * FROM properties", &[]).await.len(), 6);
    }
}
