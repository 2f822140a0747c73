use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use yol_core::{Identity, UserId};

/// Signed-in state kept on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub display_name: Option<String>,
}

impl Session {
    pub fn identity(&self) -> Identity {
        let identity = Identity::authenticated(self.user_id.clone());
        match &self.display_name {
            Some(name) => identity.with_name(name.clone()),
            None => identity,
        }
    }
}

/// Secure key-value storage for the session (keychain/keystore on device).
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Option<Session>;

    async fn save(&self, session: Session);

    async fn clear(&self);
}

/// Process-local store, used by the sync daemon and tests.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: RwLock<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            inner: RwLock::new(Some(session)),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Option<Session> {
        self.inner.read().await.clone()
    }

    async fn save(&self, session: Session) {
        tracing::debug!(user_id = %session.user_id, "session stored");
        *self.inner.write().await = Some(session);
    }

    async fn clear(&self) {
        *self.inner.write().await = None;
    }
}
