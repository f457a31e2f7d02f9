//! Session store keyed by `(protocol, account id)`
//!
//! Sessions carry no TTL here: staleness is only discovered when a panel
//! rejects a call. Each key is written independently, so accounts may be
//! authenticated concurrently without contending on a shared blob.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{PanelError, PanelResult};
use crate::models::{Protocol, Session};

const KEY_PREFIX: &str = "session:";

/// Durable string key/value persistence
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn put(&self, key: &str, value: String) -> PanelResult<()>;
    async fn fetch(&self, key: &str) -> PanelResult<Option<String>>;
    async fn remove(&self, key: &str) -> PanelResult<()>;
    async fn contains(&self, key: &str) -> PanelResult<bool>;
    async fn keys_with_prefix(&self, prefix: &str) -> PanelResult<Vec<String>>;
}

/// Process-local store for tests
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    entries: tokio::sync::RwLock<std::collections::HashMap<String, String>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn put(&self, key: &str, value: String) -> PanelResult<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn fetch(&self, key: &str) -> PanelResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn remove(&self, key: &str) -> PanelResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn contains(&self, key: &str) -> PanelResult<bool> {
        Ok(self.entries.read().await.contains_key(key))
    }

    async fn keys_with_prefix(&self, prefix: &str) -> PanelResult<Vec<String>> {
        Ok(self
            .entries
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    fn key(protocol: Protocol, account_id: i64) -> String {
        format!("{}{}:{}", KEY_PREFIX, protocol, account_id)
    }

    /// Store (or replace) the session for its account
    pub async fn save(&self, session: &Session) -> PanelResult<()> {
        let key = Self::key(session.protocol(), session.account_id);
        let value = serde_json::to_string(session)?;
        self.backend.put(&key, value).await?;
        debug!("Session saved for {} account {}", session.protocol(), session.account_id);
        Ok(())
    }

    /// Stored session, or `NoSession` when the account never logged in
    pub async fn get(&self, protocol: Protocol, account_id: i64) -> PanelResult<Session> {
        let key = Self::key(protocol, account_id);
        match self.backend.fetch(&key).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Err(PanelError::NoSession {
                protocol,
                account_id,
            }),
        }
    }

    pub async fn exists(&self, protocol: Protocol, account_id: i64) -> PanelResult<bool> {
        self.backend.contains(&Self::key(protocol, account_id)).await
    }

    pub async fn invalidate(&self, protocol: Protocol, account_id: i64) -> PanelResult<()> {
        self.backend.remove(&Self::key(protocol, account_id)).await?;
        debug!("Session invalidated for {} account {}", protocol, account_id);
        Ok(())
    }

    /// Every stored session across protocols, ordered by protocol then account
    pub async fn list_all(&self) -> PanelResult<Vec<Session>> {
        let mut sessions = Vec::new();
        for key in self.backend.keys_with_prefix(KEY_PREFIX).await? {
            let Some(raw) = self.backend.fetch(&key).await? else {
                continue; // removed between scan and read
            };
            match serde_json::from_str::<Session>(&raw) {
                Ok(session) => sessions.push(session),
                Err(e) => warn!("Skipping unreadable session {}: {}", key, e),
            }
        }
        sessions.sort_by_key(|s| (s.protocol(), s.account_id));
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionProof;
    use chrono::Utc;

    fn scraped(account_id: i64) -> Session {
        Session {
            account_id,
            mac: format!("00:00:00:00:00:{:02}", account_id),
            proof: SessionProof::CookieScraped {
                cookie: format!("sid={}", account_id),
            },
            created_at: Utc::now(),
        }
    }

    fn bearer(account_id: i64) -> Session {
        Session {
            account_id,
            mac: "mac".to_string(),
            proof: SessionProof::BearerSigned {
                token: "t".to_string(),
                password: "p".to_string(),
            },
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_get_without_save_is_no_session() {
        let store = SessionStore::in_memory();
        let err = store.get(Protocol::CookieScraped, 1).await.unwrap_err();
        assert!(matches!(
            err,
            PanelError::NoSession { protocol: Protocol::CookieScraped, account_id: 1 }
        ));
        assert!(!store.exists(Protocol::CookieScraped, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_save_get_invalidate() {
        let store = SessionStore::in_memory();
        let session = scraped(4);
        store.save(&session).await.unwrap();

        assert_eq!(store.get(Protocol::CookieScraped, 4).await.unwrap(), session);
        assert!(store.exists(Protocol::CookieScraped, 4).await.unwrap());
        // Same account id under another protocol is a different key
        assert!(store.get(Protocol::BearerSigned, 4).await.is_err());

        store.invalidate(Protocol::CookieScraped, 4).await.unwrap();
        assert!(store.get(Protocol::CookieScraped, 4).await.is_err());
    }

    #[tokio::test]
    async fn test_save_replaces_previous_session() {
        let store = SessionStore::in_memory();
        store.save(&scraped(2)).await.unwrap();
        let mut fresh = scraped(2);
        fresh.proof = SessionProof::CookieScraped {
            cookie: "sid=new".to_string(),
        };
        store.save(&fresh).await.unwrap();

        let stored = store.get(Protocol::CookieScraped, 2).await.unwrap();
        assert_eq!(stored.proof, fresh.proof);
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_all_across_protocols() {
        let store = SessionStore::in_memory();
        store.save(&scraped(9)).await.unwrap();
        store.save(&bearer(3)).await.unwrap();
        store.save(&scraped(1)).await.unwrap();

        let listed: Vec<(Protocol, i64)> = store
            .list_all()
            .await
            .unwrap()
            .iter()
            .map(|s| (s.protocol(), s.account_id))
            .collect();
        assert_eq!(
            listed,
            vec![
                (Protocol::BearerSigned, 3),
                (Protocol::CookieScraped, 1),
                (Protocol::CookieScraped, 9),
            ]
        );
    }
}
