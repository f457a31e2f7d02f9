//! Scriptable in-memory panel for service tests

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::{PlaylistSite, SiteResolver};
use crate::error::{PanelError, PanelResult};
use crate::models::{Account, EntrySpec, PlaylistEntry, Protocol, Session, SessionProof};

#[derive(Default)]
pub struct FakeSite {
    pub entries: Mutex<HashMap<i64, Vec<PlaylistEntry>>>,
    pub failing_logins: Mutex<HashSet<i64>>,
    /// Accounts whose next listing is rejected as expired
    pub expire_once: Mutex<HashSet<i64>>,
    pub logins: Mutex<Vec<i64>>,
    pub updates: Mutex<Vec<(i64, String, EntrySpec)>>,
    pub deletes: Mutex<Vec<(i64, String, Option<String>)>>,
}

pub fn entry(id: &str, url: &str, protected: bool) -> PlaylistEntry {
    PlaylistEntry {
        id: id.to_string(),
        name: format!("list-{}", id),
        url: url.to_string(),
        protected,
        playlist_type: "general".to_string(),
    }
}

pub fn proof_for(protocol: Protocol, account_id: i64) -> SessionProof {
    match protocol {
        Protocol::CookieCaptcha => SessionProof::CookieCaptcha {
            base_url: "http://panel.test".to_string(),
            cookies: vec![format!("sid={}", account_id)],
            device_id: None,
        },
        Protocol::BearerSigned => SessionProof::BearerSigned {
            token: format!("token-{}", account_id),
            password: "pw".to_string(),
        },
        Protocol::CookieScraped => SessionProof::CookieScraped {
            cookie: format!("sid={}", account_id),
        },
    }
}

impl FakeSite {
    pub fn set_entries(&self, account_id: i64, entries: Vec<PlaylistEntry>) {
        self.entries.lock().unwrap().insert(account_id, entries);
    }

    pub fn fail_login(&self, account_id: i64) {
        self.failing_logins.lock().unwrap().insert(account_id);
    }

    pub fn login_count(&self) -> usize {
        self.logins.lock().unwrap().len()
    }

    pub fn updated_ids(&self) -> Vec<(i64, String)> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .map(|(account, id, _)| (*account, id.clone()))
            .collect()
    }
}

#[async_trait]
impl PlaylistSite for FakeSite {
    fn protocol(&self) -> Protocol {
        Protocol::CookieScraped
    }

    async fn authenticate(&self, account: &Account) -> PanelResult<Session> {
        self.logins.lock().unwrap().push(account.id);
        if self.failing_logins.lock().unwrap().contains(&account.id) {
            return Err(PanelError::Auth("invalid device key".to_string()));
        }
        Ok(Session {
            account_id: account.id,
            mac: account.mac.clone(),
            proof: proof_for(account.protocol, account.id),
            created_at: Utc::now(),
        })
    }

    async fn list_entries(&self, session: &Session) -> PanelResult<Vec<PlaylistEntry>> {
        if self.expire_once.lock().unwrap().remove(&session.account_id) {
            return Err(PanelError::SessionExpired);
        }
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(&session.account_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_entry(&self, session: &Session, spec: &EntrySpec) -> PanelResult<PlaylistEntry> {
        let mut entries = self.entries.lock().unwrap();
        let list = entries.entry(session.account_id).or_default();
        let created = PlaylistEntry {
            id: format!("new-{}", list.len() + 1),
            name: spec.name.clone(),
            url: spec.url.clone(),
            protected: spec.protect,
            playlist_type: spec.playlist_type.clone(),
        };
        list.push(created.clone());
        Ok(created)
    }

    async fn update_entry(
        &self,
        session: &Session,
        id: &str,
        spec: &EntrySpec,
    ) -> PanelResult<PlaylistEntry> {
        if spec.url.contains("reject") {
            return Err(PanelError::rejected("URL refused"));
        }
        self.updates
            .lock()
            .unwrap()
            .push((session.account_id, id.to_string(), spec.clone()));

        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .get_mut(&session.account_id)
            .and_then(|list| list.iter_mut().find(|e| e.id == id))
            .ok_or_else(|| PanelError::rejected("playlist not found"))?;
        entry.name = spec.name.clone();
        entry.url = spec.url.clone();
        entry.protected = spec.protect;
        entry.playlist_type = spec.playlist_type.clone();
        Ok(entry.clone())
    }

    async fn delete_entry(&self, session: &Session, id: &str, pin: Option<&str>) -> PanelResult<()> {
        self.deletes
            .lock()
            .unwrap()
            .push((session.account_id, id.to_string(), pin.map(str::to_string)));
        if let Some(list) = self.entries.lock().unwrap().get_mut(&session.account_id) {
            list.retain(|e| e.id != id);
        }
        Ok(())
    }
}

/// Routes every protocol to the same fake
pub struct FakeResolver(pub Arc<FakeSite>);

impl SiteResolver for FakeResolver {
    fn site_for(&self, _protocol: Protocol) -> Arc<dyn PlaylistSite> {
        self.0.clone()
    }
}
