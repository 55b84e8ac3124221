use async_trait::async_trait;
use kkvat_application::{PersistedSession, SessionStore};
use kkvat_core::AppResult;
use tokio::sync::RwLock;

/// Process-local session store; nothing survives a restart.
#[derive(Default)]
pub struct InMemorySessionStore {
    session: RwLock<PersistedSession>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self) -> AppResult<PersistedSession> {
        Ok(self.session.read().await.clone())
    }

    async fn save(&self, session: &PersistedSession) -> AppResult<()> {
        *self.session.write().await = session.clone();
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        *self.session.write().await = PersistedSession::default();
        Ok(())
    }
}
