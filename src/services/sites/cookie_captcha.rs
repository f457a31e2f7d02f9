//! Panel behind an SVG challenge, one host per reseller.
//!
//! Login fetches a challenge, solves it, then posts the device credentials
//! with the answer. The session is the cookie jar returned by the login
//! call plus the panel origin it belongs to.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{ACCEPT, COOKIE, REFERER};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{
    ensure_session_accepted, entry_from_json, find_created, json_body, protocol_mismatch,
    rejection_reason, session_cookies, written_entry, PlaylistSite,
};
use crate::error::{PanelError, PanelResult};
use crate::models::{Account, EntrySpec, PlaylistEntry, Protocol, Session, SessionProof};
use crate::services::captcha::CaptchaPipeline;

#[derive(Debug, Deserialize)]
struct Challenge {
    svg: Option<String>,
    token: Option<String>,
}

pub struct CookieCaptchaSite {
    http: Client,
    scheme: String,
    captcha: Arc<CaptchaPipeline>,
}

impl CookieCaptchaSite {
    pub fn new(http: Client, scheme: &str, captcha: Arc<CaptchaPipeline>) -> Self {
        Self {
            http,
            scheme: scheme.to_string(),
            captcha,
        }
    }

    /// Panel origin for an account domain; a domain given with a scheme is
    /// used as-is
    fn base_url(&self, domain: &str) -> String {
        let domain = domain.trim().trim_end_matches('/');
        if domain.contains("://") {
            domain.to_string()
        } else {
            format!("{}://{}", self.scheme, domain)
        }
    }

    fn proof<'a>(&self, session: &'a Session) -> PanelResult<(&'a str, String)> {
        match &session.proof {
            SessionProof::CookieCaptcha {
                base_url, cookies, ..
            } => Ok((base_url.as_str(), cookies.join("; "))),
            _ => Err(protocol_mismatch(session, Protocol::CookieCaptcha)),
        }
    }

    fn authed(&self, builder: RequestBuilder, base_url: &str, cookie: &str) -> RequestBuilder {
        builder
            .header(ACCEPT, "application/json")
            .header(REFERER, format!("{}/", base_url))
            .header(COOKIE, cookie)
    }

    async fn save(
        &self,
        session: &Session,
        current_id: Option<&str>,
        spec: &EntrySpec,
    ) -> PanelResult<Value> {
        let (base_url, cookie) = self.proof(session)?;
        let payload = json!({
            "current_playlist_url_id": current_id.map(Value::from).unwrap_or(json!(-1)),
            "pin": spec.effective_pin().unwrap_or(""),
            "playlist_name": spec.name,
            "playlist_type": spec.playlist_type,
            "playlist_url": spec.url,
            "protect": if spec.protect { "true" } else { "false" },
            "username": "",
            "password": "",
            "xml_url": "",
        });

        let response = self
            .authed(
                self.http.post(format!("{}/frontend/device/savePlaylist", base_url)),
                base_url,
                &cookie,
            )
            .json(&payload)
            .send()
            .await?;
        ensure_session_accepted(response.status())?;

        let reply = json_body(response).await?;
        if reply.get("status").and_then(Value::as_str) != Some("success") {
            return Err(PanelError::rejected(rejection_reason(&reply, "playlist not saved")));
        }
        Ok(reply)
    }
}

#[async_trait]
impl PlaylistSite for CookieCaptchaSite {
    fn protocol(&self) -> Protocol {
        Protocol::CookieCaptcha
    }

    async fn authenticate(&self, account: &Account) -> PanelResult<Session> {
        let base_url = self.base_url(account.require_domain()?);
        let device_key = account.require_device_key()?;

        let response = self
            .http
            .get(format!("{}/frontend/captcha/generate", base_url))
            .header(ACCEPT, "application/json")
            .header(REFERER, format!("{}/", base_url))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PanelError::Challenge(format!(
                "challenge endpoint returned HTTP {}",
                response.status().as_u16()
            )));
        }
        let challenge: Challenge = response
            .json()
            .await
            .map_err(|e| PanelError::Challenge(format!("unreadable challenge: {}", e)))?;
        let (Some(svg), Some(token)) = (challenge.svg, challenge.token) else {
            return Err(PanelError::Challenge("challenge or token missing".to_string()));
        };
        debug!("Challenge fetched from {}", base_url);

        let answer = self.captcha.solve(&svg).await?;

        let response = self
            .http
            .post(format!("{}/frontend/device/login", base_url))
            .header(ACCEPT, "application/json")
            .header(REFERER, format!("{}/", base_url))
            .json(&json!({
                "mac_address": account.mac,
                "device_key": device_key,
                "captcha": answer,
                "token": token,
            }))
            .send()
            .await?;
        let cookies = session_cookies(&response);
        let reply = json_body(response).await?;

        if reply.get("status").and_then(Value::as_str) != Some("success") {
            let reason = rejection_reason(&reply, "login refused");
            warn!("Login refused for account {} on {}: {}", account.id, base_url, reason);
            return Err(PanelError::Auth(reason));
        }
        if cookies.is_empty() {
            return Err(PanelError::Auth("login accepted without a session cookie".to_string()));
        }

        info!("Account {} logged in on {}", account.id, base_url);
        Ok(Session {
            account_id: account.id,
            mac: account.mac.clone(),
            proof: SessionProof::CookieCaptcha {
                base_url,
                cookies,
                device_id: reply
                    .pointer("/device/_id")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            created_at: Utc::now(),
        })
    }

    async fn list_entries(&self, session: &Session) -> PanelResult<Vec<PlaylistEntry>> {
        let (base_url, cookie) = self.proof(session)?;
        let response = self
            .authed(
                self.http.get(format!("{}/frontend/device/playlists", base_url)),
                base_url,
                &cookie,
            )
            .send()
            .await?;
        ensure_session_accepted(response.status())?;

        let reply = json_body(response).await?;
        // The panel spells its success marker "Sucess" on this endpoint
        let status = reply.get("status").and_then(Value::as_str).unwrap_or("");
        if !status.eq_ignore_ascii_case("sucess") && !status.eq_ignore_ascii_case("success") {
            return Err(PanelError::rejected(rejection_reason(&reply, "listing refused")));
        }

        Ok(reply
            .get("playlists")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(entry_from_json).collect())
            .unwrap_or_default())
    }

    async fn create_entry(&self, session: &Session, spec: &EntrySpec) -> PanelResult<PlaylistEntry> {
        let reply = self.save(session, None, spec).await?;
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
        let reply = self.save(session, Some(id), spec).await?;
        written_entry(&reply, Some(id), spec)
            .ok_or_else(|| PanelError::Transport("update reply without playlist id".to_string()))
    }

    async fn delete_entry(&self, session: &Session, id: &str, _pin: Option<&str>) -> PanelResult<()> {
        let (base_url, cookie) = self.proof(session)?;
        let response = self
            .authed(
                self.http
                    .delete(format!("{}/frontend/device/deletePlayListUrl/{}", base_url, id)),
                base_url,
                &cookie,
            )
            .send()
            .await?;
        ensure_session_accepted(response.status())?;

        let reply = json_body(response).await?;
        if reply.get("status").and_then(Value::as_str) != Some("success") {
            return Err(PanelError::rejected(rejection_reason(&reply, "playlist not deleted")));
        }
        Ok(())
    }
}
