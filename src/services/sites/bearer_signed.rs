//! Bearer-token panel with derived signing headers.
//!
//! Every request, the login included, carries six headers derived from the
//! device MAC, the device password and the current time. The password is
//! kept in the session so the headers can be regenerated per call.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{ACCEPT, AUTHORIZATION, ORIGIN, REFERER};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{
    ensure_session_accepted, entry_from_json, find_created, json_body, protocol_mismatch,
    rejection_reason, value_as_bool, written_entry, PlaylistSite,
};
use crate::error::{PanelError, PanelResult};
use crate::models::{Account, EntrySpec, PlaylistEntry, Protocol, Session, SessionProof};
use crate::services::derivation::SignedHeaders;

pub struct BearerSignedSite {
    http: Client,
    api_base: String,
    origin: String,
}

impl BearerSignedSite {
    pub fn new(http: Client, api_base: &str, origin: &str) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            origin: origin.trim_end_matches('/').to_string(),
        }
    }

    /// Request with fresh signing headers; `token` is `None` only for login
    fn signed(
        &self,
        method: Method,
        path: &str,
        mac: &str,
        password: &str,
        token: Option<&str>,
    ) -> RequestBuilder {
        let authorization = match token {
            Some(token) => format!("Bearer {}", token),
            None => "Bearer".to_string(),
        };
        let mut builder = self
            .http
            .request(method, format!("{}{}", self.api_base, path))
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, authorization)
            .header(ORIGIN, &self.origin)
            .header(REFERER, format!("{}/", self.origin));

        let headers = SignedHeaders::now(mac, password);
        for (name, value) in headers.pairs() {
            builder = builder.header(name, value);
        }
        builder
    }

    fn proof<'a>(&self, session: &'a Session) -> PanelResult<(&'a str, &'a str)> {
        match &session.proof {
            SessionProof::BearerSigned { token, password } => Ok((token.as_str(), password.as_str())),
            _ => Err(protocol_mismatch(session, Protocol::BearerSigned)),
        }
    }

    async fn call(
        &self,
        session: &Session,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> PanelResult<Value> {
        let (token, password) = self.proof(session)?;
        let mut request = self.signed(method, path, &session.mac, password, Some(token));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        ensure_session_accepted(response.status())?;

        let status = response.status();
        let reply = json_body(response).await?;
        if explicitly_failed(&reply) || status.is_client_error() || status.is_server_error() {
            return Err(PanelError::rejected(rejection_reason(
                &reply,
                &format!("HTTP {}", status.as_u16()),
            )));
        }
        Ok(reply)
    }

    fn save_payload(&self, session: &Session, id: Option<&str>, spec: &EntrySpec) -> Value {
        json!({
            "mac_address": session.mac,
            "playlist_id": id,
            "playlist_name": spec.name,
            "playlist_url": spec.url,
            "playlist_type": spec.playlist_type,
            "type": spec.playlist_type,
            "is_protected": spec.protect,
            "pin": spec.effective_pin().unwrap_or(""),
            "playlist_host": "",
            "playlist_username": "",
            "playlist_password": "",
        })
    }
}

/// Replies carry `status: false` (or 0) on business failures
fn explicitly_failed(reply: &Value) -> bool {
    match reply.get("status") {
        Some(Value::Bool(_)) | Some(Value::Number(_)) => !value_as_bool(&reply["status"]),
        _ => false,
    }
}

#[async_trait]
impl PlaylistSite for BearerSignedSite {
    fn protocol(&self) -> Protocol {
        Protocol::BearerSigned
    }

    async fn authenticate(&self, account: &Account) -> PanelResult<Session> {
        let password = account.require_password()?;
        let response = self
            .signed(Method::POST, "/auth/login", &account.mac, password, None)
            .json(&json!({ "mac": account.mac, "password": password }))
            .send()
            .await?;

        let reply = json_body(response).await?;
        let accepted = reply.get("status").map(value_as_bool).unwrap_or(false);
        let token = reply
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty());

        match (accepted, token) {
            (true, Some(token)) => {
                info!("Account {} logged in (bearer)", account.id);
                Ok(Session {
                    account_id: account.id,
                    mac: account.mac.clone(),
                    proof: SessionProof::BearerSigned {
                        token: token.to_string(),
                        password: password.to_string(),
                    },
                    created_at: Utc::now(),
                })
            }
            _ => {
                let reason = rejection_reason(&reply, "token not received");
                warn!("Login refused for account {}: {}", account.id, reason);
                Err(PanelError::Auth(reason))
            }
        }
    }

    async fn list_entries(&self, session: &Session) -> PanelResult<Vec<PlaylistEntry>> {
        let reply = self.call(session, Method::GET, "/playlistw", None).await?;
        let items = match &reply {
            Value::Array(items) => items.as_slice(),
            other => ["playlists", "data"]
                .iter()
                .find_map(|k| other.get(*k).and_then(Value::as_array))
                .map(Vec::as_slice)
                .unwrap_or(&[]),
        };
        Ok(items.iter().filter_map(entry_from_json).collect())
    }

    async fn create_entry(&self, session: &Session, spec: &EntrySpec) -> PanelResult<PlaylistEntry> {
        let payload = self.save_payload(session, None, spec);
        let reply = self.call(session, Method::POST, "/playlistw", Some(payload)).await?;
        match written_entry(&reply, None, spec) {
            Some(entry) => Ok(entry),
            None => find_created(self, session, spec).await,
        }
    }

    async fn update_entry(
        &self,
        session: &Session,
        id: &str,
        spec: &EntrySpec,
    ) -> PanelResult<PlaylistEntry> {
        let payload = self.save_payload(session, Some(id), spec);
        self.call(session, Method::POST, "/playlistw", Some(payload)).await?;
        Ok(PlaylistEntry {
            id: id.to_string(),
            name: spec.name.clone(),
            url: spec.url.clone(),
            protected: spec.protect,
            playlist_type: spec.playlist_type.clone(),
        })
    }

    async fn delete_entry(&self, session: &Session, id: &str, pin: Option<&str>) -> PanelResult<()> {
        match pin.filter(|p| !p.is_empty()) {
            Some(pin) => {
                self.call(
                    session,
                    Method::POST,
                    "/playlistw/protected",
                    Some(json!({ "playlist_id": id, "pin": pin })),
                )
                .await?
            }
            None => {
                self.call(
                    session,
                    Method::DELETE,
                    "/playlistw",
                    Some(json!({ "mac_address": session.mac, "playlist_id": id })),
                )
                .await?
            }
        };
        Ok(())
    }
}
