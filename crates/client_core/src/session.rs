use std::sync::Arc;

use anyhow::{Context, Result};
use shared::domain::Session;
use storage::KeyValueStore;
use tracing::info;

const SESSION_KEY: &str = "session";

/// Typed session operations over the persistence collaborator.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn has_session(&self) -> Result<bool> {
        Ok(self.load_session().await?.is_some())
    }

    pub async fn load_session(&self) -> Result<Option<Session>> {
        let Some(raw) = self.store.read(SESSION_KEY).await? else {
            return Ok(None);
        };
        let session = serde_json::from_str(&raw).context("stored session is malformed")?;
        Ok(Some(session))
    }

    pub async fn token(&self) -> Result<Option<String>> {
        Ok(self.load_session().await?.map(|session| session.token))
    }

    pub async fn save_session(&self, session: &Session) -> Result<()> {
        let raw = serde_json::to_string(session)?;
        self.store.write(SESSION_KEY, &raw).await?;
        info!(user_id = session.user_id.0, "session: saved");
        Ok(())
    }

    pub async fn clear_session(&self) -> Result<()> {
        self.store.delete(SESSION_KEY).await?;
        info!("session: cleared");
        Ok(())
    }
}
