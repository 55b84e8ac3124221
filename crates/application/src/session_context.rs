use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use kkvat_core::{AppResult, BearerToken, SessionUser};
use kkvat_domain::MenuItem;

use crate::gateway_ports::{PersistedSession, SessionStore};

/// Signed-in session shared by the gateway and every screen service.
///
/// Clones share state. Every change is written through to the store so a
/// restarted console resumes where it left off.
#[derive(Clone)]
pub struct SessionContext {
    store: Arc<dyn SessionStore>,
    state: Arc<RwLock<PersistedSession>>,
    menus: Arc<watch::Sender<Vec<MenuItem>>>,
}

impl SessionContext {
    /// Creates an empty session backed by `store`.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        let (menus, _) = watch::channel(Vec::new());
        Self {
            store,
            state: Arc::new(RwLock::new(PersistedSession::default())),
            menus: Arc::new(menus),
        }
    }

    /// Rehydrates the session from the store.
    pub async fn restore(&self) -> AppResult<()> {
        let persisted = self.store.load().await?;
        let menus = persisted.menus.clone();
        *self.state.write().await = persisted;
        self.menus.send_replace(menus);
        Ok(())
    }

    /// Stores a freshly issued session and publishes its menus.
    pub async fn establish(
        &self,
        access_token: BearerToken,
        user: Option<SessionUser>,
        menus: Vec<MenuItem>,
    ) -> AppResult<()> {
        let session = PersistedSession {
            access_token: Some(access_token),
            user,
            menus: menus.clone(),
        };
        self.store.save(&session).await?;
        *self.state.write().await = session;
        self.menus.send_replace(menus);
        Ok(())
    }

    /// Replaces the navigation menus and notifies subscribers.
    pub async fn replace_menus(&self, menus: Vec<MenuItem>) -> AppResult<()> {
        let session = {
            let mut state = self.state.write().await;
            state.menus = menus.clone();
            state.clone()
        };
        self.store.save(&session).await?;
        self.menus.send_replace(menus);
        Ok(())
    }

    /// Forgets the token, user, and menus.
    pub async fn clear(&self) -> AppResult<()> {
        *self.state.write().await = PersistedSession::default();
        self.menus.send_replace(Vec::new());
        self.store.clear().await
    }

    /// Returns the current access token.
    pub async fn access_token(&self) -> Option<BearerToken> {
        self.state.read().await.access_token.clone()
    }

    /// Returns the signed-in user.
    pub async fn user(&self) -> Option<SessionUser> {
        self.state.read().await.user.clone()
    }

    /// Returns the menus held in memory, falling back to the store.
    pub async fn menus(&self) -> AppResult<Vec<MenuItem>> {
        let in_memory = self.state.read().await.menus.clone();
        if !in_memory.is_empty() {
            return Ok(in_memory);
        }

        Ok(self.store.load().await?.menus)
    }

    /// Subscribes to menu changes. The receiver starts with the current list.
    #[must_use]
    pub fn subscribe_menus(&self) -> watch::Receiver<Vec<MenuItem>> {
        self.menus.subscribe()
    }
}
