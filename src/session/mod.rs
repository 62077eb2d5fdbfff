//! Server-side sessions on `tower-sessions`. The cookie carries only the
//! session id; the signed-in identity lives in the store under
//! [`IDENTITY_KEY`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::Duration;
use tower_sessions::{
    cookie::SameSite,
    session::{Error, Id, Record},
    session_store, ExpiredDeletion, Expiry, MemoryStore, SessionManagerLayer, SessionStore,
};
use tower_sessions_sqlx_store::PostgresStore;
use tracing::error;

use crate::auth::repo_types::Role;
use crate::config::SessionConfig;

pub const IDENTITY_KEY: &str = "estatehub.identity";

/// Identity stored for an authenticated session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: i64,
    pub user_name: String,
    pub user_email: String,
    pub user_role: Role,
}

/// Record storage picked at startup: the Postgres store when the database
/// answered, process memory otherwise.
#[derive(Debug, Clone)]
pub enum SessionBackend {
    Memory(MemoryStore),
    Postgres(PostgresStore),
}

impl SessionBackend {
    pub fn memory() -> Self {
        SessionBackend::Memory(MemoryStore::default())
    }

    /// Memory records expire on read and need no sweep.
    pub async fn purge_expired(&self) -> session_store::Result<()> {
        match self {
            SessionBackend::Memory(_) => Ok(()),
            SessionBackend::Postgres(store) => store.delete_expired().await,
        }
    }
}

#[async_trait]
impl SessionStore for SessionBackend {
    async fn save(&self, record: &Record) -> session_store::Result<()> {
        match self {
            SessionBackend::Memory(store) => store.save(record).await,
            SessionBackend::Postgres(store) => store.save(record).await,
        }
    }

    async fn load(&self, id: &Id) -> session_store::Result<Option<Record>> {
        match self {
            SessionBackend::Memory(store) => store.load(id).await,
            SessionBackend::Postgres(store) => store.load(id).await,
        }
    }

    async fn delete(&self, id: &Id) -> session_store::Result<()> {
        match self {
            SessionBackend::Memory(store) => store.delete(id).await,
            SessionBackend::Postgres(store) => store.delete(id).await,
        }
    }
}

/// Cookie and expiry policy for the session middleware.
pub fn layer(store: SessionBackend, config: &SessionConfig) -> SessionManagerLayer<SessionBackend> {
    SessionManagerLayer::new(store)
        .with_name(config.cookie_name.clone())
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_secure(config.secure_cookie)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(config.ttl_minutes)))
}

/// Per-request session context: `Anonymous` until an identity is attached.
#[derive(Debug, Clone)]
pub struct Session {
    handle: tower_sessions::Session,
    identity: Option<SessionData>,
}

impl Session {
    pub fn anonymous(handle: tower_sessions::Session) -> Self {
        Self {
            handle,
            identity: None,
        }
    }

    /// A context whose identity was read back from the store.
    pub fn restored(handle: tower_sessions::Session, identity: SessionData) -> Self {
        Self {
            handle,
            identity: Some(identity),
        }
    }

    /// Read the identity back from the request's record. A store failure is
    /// logged and the request proceeds anonymously.
    pub async fn load(handle: tower_sessions::Session) -> Self {
        match handle.get::<SessionData>(IDENTITY_KEY).await {
            Ok(Some(identity)) => Self::restored(handle, identity),
            Ok(None) => Self::anonymous(handle),
            Err(e) => {
                error!(error = %e, "session record unreadable; treating request as anonymous");
                Self::anonymous(handle)
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn identity(&self) -> Option<&SessionData> {
        self.identity.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.identity.as_ref().map(|i| i.user_role)
    }

    /// Issue a fresh session id, then store the identity under it. The
    /// previous id no longer resolves.
    pub(crate) async fn establish(&mut self, identity: SessionData) -> Result<(), Error> {
        self.handle.cycle_id().await?;
        self.handle.insert(IDENTITY_KEY, &identity).await?;
        self.identity = Some(identity);
        Ok(())
    }

    /// Drop the identity and the stored record. `true` when someone was
    /// signed in.
    pub(crate) async fn clear(&mut self) -> Result<bool, Error> {
        let was_signed_in = self.identity.take().is_some();
        self.handle.flush().await?;
        Ok(was_signed_in)
    }

    #[cfg(test)]
    pub(crate) fn handle(&self) -> &tower_sessions::Session {
        &self.handle
    }

    /// Anonymous context over a private in-memory store.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        let store = std::sync::Arc::new(MemoryStore::default());
        Self::anonymous(tower_sessions::Session::new(None, store, None))
    }
}
