use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use super::database::Database;
use crate::models::{Message, Session};

const SESSION_KEY: &str = "current_session";
const CREDENTIAL_KEY: &str = "credential_fingerprint";

/// Owns the one session slot. Every write goes to memory and to the
/// database record under a fixed key; the last writer wins.
#[derive(Debug, Clone)]
pub struct SessionStore {
    db: Database,
    current: Arc<RwLock<Option<Session>>>,
}

impl SessionStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Restore the persisted session into memory. An unreadable record is
    /// dropped rather than failing startup.
    pub async fn load(&self) -> Result<Option<Session>> {
        let session = match self.db.get_setting(SESSION_KEY).await? {
            Some(json) => match serde_json::from_str::<Session>(&json) {
                Ok(session) => Some(session),
                Err(e) => {
                    tracing::warn!("Discarding unreadable stored session: {}", e);
                    self.db.delete_setting(SESSION_KEY).await?;
                    None
                }
            },
            None => None,
        };

        *self.current.write().await = session.clone();
        Ok(session)
    }

    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    pub async fn replace(&self, session: Session) -> Result<()> {
        let mut slot = self.current.write().await;
        self.persist(&session).await?;
        *slot = Some(session);
        Ok(())
    }

    /// Append to the current session if it still talks to `thread_id`.
    /// Returns `false` when the session was replaced or cleared meanwhile.
    /// Memory only changes once the record is written.
    pub async fn append_message(&self, thread_id: &str, message: Message) -> Result<bool> {
        let mut slot = self.current.write().await;
        let mut updated = match slot.as_ref() {
            Some(session) if session.thread_id == thread_id => session.clone(),
            _ => {
                tracing::debug!("Dropping message for inactive thread {}", thread_id);
                return Ok(false);
            }
        };

        updated.push_message(message);
        self.persist(&updated).await?;
        *slot = Some(updated);
        Ok(true)
    }

    pub async fn clear(&self) -> Result<()> {
        let mut slot = self.current.write().await;
        self.db.delete_setting(SESSION_KEY).await?;
        *slot = None;
        Ok(())
    }

    /// Remember which credential the stored session belongs to, clearing the
    /// session when a different credential shows up. Returns `true` if cleared.
    pub async fn reconcile_credential(&self, api_key: &str) -> Result<bool> {
        let fingerprint = credential_fingerprint(api_key);
        let stored = self.db.get_setting(CREDENTIAL_KEY).await?;

        if stored.as_deref() == Some(fingerprint.as_str()) {
            return Ok(false);
        }

        let had_previous = stored.is_some();
        if had_previous {
            tracing::info!("API key changed, clearing stored session");
            self.clear().await?;
        }
        self.db.set_setting(CREDENTIAL_KEY, &fingerprint).await?;
        Ok(had_previous)
    }

    async fn persist(&self, session: &Session) -> Result<()> {
        let json = serde_json::to_string(session).context("Failed to serialize session")?;
        self.db
            .set_setting(SESSION_KEY, &json)
            .await
            .context("Failed to persist session")
    }
}

fn credential_fingerprint(api_key: &str) -> String {
    format!("{:x}", Sha256::digest(api_key.trim().as_bytes()))
}
