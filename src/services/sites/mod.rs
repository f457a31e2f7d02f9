//! Panel adapters
//!
//! Three independently-run panels, three authentication protocols, one
//! playlist contract:
//!
//! - **cookie_captcha**: SVG challenge solved through the CAPTCHA pipeline,
//!   JSON API behind a cookie session on a per-account domain
//! - **bearer_signed**: bearer token plus six derived headers regenerated
//!   on every request (see [`crate::services::derivation`])
//! - **cookie_scraped**: form login answered by a redirect, playlists read
//!   from the HTML listing (see [`crate::services::markup`])
//!
//! Callers resolve an account's protocol to an adapter through
//! [`SiteResolver`] and only ever talk to [`PlaylistSite`].

pub mod bearer_signed;
pub mod cookie_captcha;
pub mod cookie_scraped;
#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use reqwest::header::SET_COOKIE;
use reqwest::{redirect, Client, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{PanelError, PanelResult};
use crate::models::{Account, EntrySpec, PlaylistEntry, Protocol, Session, DEFAULT_PLAYLIST_TYPE};
use crate::services::captcha::CaptchaPipeline;

pub use bearer_signed::BearerSignedSite;
pub use cookie_captcha::CookieCaptchaSite;
pub use cookie_scraped::CookieScrapedSite;

/// Capability contract shared by every panel
#[async_trait]
pub trait PlaylistSite: Send + Sync {
    fn protocol(&self) -> Protocol;

    async fn authenticate(&self, account: &Account) -> PanelResult<Session>;

    /// Fails with `SessionExpired` when the panel rejects the session
    async fn list_entries(&self, session: &Session) -> PanelResult<Vec<PlaylistEntry>>;

    async fn create_entry(&self, session: &Session, spec: &EntrySpec) -> PanelResult<PlaylistEntry>;

    async fn update_entry(
        &self,
        session: &Session,
        id: &str,
        spec: &EntrySpec,
    ) -> PanelResult<PlaylistEntry>;

    async fn delete_entry(&self, session: &Session, id: &str, pin: Option<&str>) -> PanelResult<()>;
}

/// Maps an account's protocol to the adapter that speaks it
pub trait SiteResolver: Send + Sync {
    fn site_for(&self, protocol: Protocol) -> Arc<dyn PlaylistSite>;
}

/// Closed set of adapters
pub enum SiteAdapter {
    CookieCaptcha(CookieCaptchaSite),
    BearerSigned(BearerSignedSite),
    CookieScraped(CookieScrapedSite),
}

#[async_trait]
impl PlaylistSite for SiteAdapter {
    fn protocol(&self) -> Protocol {
        match self {
            SiteAdapter::CookieCaptcha(_) => Protocol::CookieCaptcha,
            SiteAdapter::BearerSigned(_) => Protocol::BearerSigned,
            SiteAdapter::CookieScraped(_) => Protocol::CookieScraped,
        }
    }

    async fn authenticate(&self, account: &Account) -> PanelResult<Session> {
        if account.protocol != self.protocol() {
            return Err(PanelError::ProtocolMismatch {
                session: account.protocol,
                adapter: self.protocol(),
            });
        }
        match self {
            SiteAdapter::CookieCaptcha(site) => site.authenticate(account).await,
            SiteAdapter::BearerSigned(site) => site.authenticate(account).await,
            SiteAdapter::CookieScraped(site) => site.authenticate(account).await,
        }
    }

    async fn list_entries(&self, session: &Session) -> PanelResult<Vec<PlaylistEntry>> {
        match self {
            SiteAdapter::CookieCaptcha(site) => site.list_entries(session).await,
            SiteAdapter::BearerSigned(site) => site.list_entries(session).await,
            SiteAdapter::CookieScraped(site) => site.list_entries(session).await,
        }
    }

    async fn create_entry(&self, session: &Session, spec: &EntrySpec) -> PanelResult<PlaylistEntry> {
        match self {
            SiteAdapter::CookieCaptcha(site) => site.create_entry(session, spec).await,
            SiteAdapter::BearerSigned(site) => site.create_entry(session, spec).await,
            SiteAdapter::CookieScraped(site) => site.create_entry(session, spec).await,
        }
    }

    async fn update_entry(
        &self,
        session: &Session,
        id: &str,
        spec: &EntrySpec,
    ) -> PanelResult<PlaylistEntry> {
        match self {
            SiteAdapter::CookieCaptcha(site) => site.update_entry(session, id, spec).await,
            SiteAdapter::BearerSigned(site) => site.update_entry(session, id, spec).await,
            SiteAdapter::CookieScraped(site) => site.update_entry(session, id, spec).await,
        }
    }

    async fn delete_entry(&self, session: &Session, id: &str, pin: Option<&str>) -> PanelResult<()> {
        match self {
            SiteAdapter::CookieCaptcha(site) => site.delete_entry(session, id, pin).await,
            SiteAdapter::BearerSigned(site) => site.delete_entry(session, id, pin).await,
            SiteAdapter::CookieScraped(site) => site.delete_entry(session, id, pin).await,
        }
    }
}

/// One adapter per protocol, built once at startup
pub struct SiteRegistry {
    cookie_captcha: Arc<SiteAdapter>,
    bearer_signed: Arc<SiteAdapter>,
    cookie_scraped: Arc<SiteAdapter>,
}

impl SiteRegistry {
    pub fn from_config(config: &Config, captcha: Arc<CaptchaPipeline>) -> PanelResult<Self> {
        let json_client = build_client(config.http_timeout(), &config.user_agent, true)?;
        let form_client = build_client(config.http_timeout(), &config.user_agent, false)?;

        Ok(Self {
            cookie_captcha: Arc::new(SiteAdapter::CookieCaptcha(CookieCaptchaSite::new(
                json_client.clone(),
                &config.captcha_panel_scheme,
                captcha,
            ))),
            bearer_signed: Arc::new(SiteAdapter::BearerSigned(BearerSignedSite::new(
                json_client,
                &config.bearer_api_base,
                &config.bearer_origin,
            ))),
            cookie_scraped: Arc::new(SiteAdapter::CookieScraped(CookieScrapedSite::new(
                form_client,
                &config.scraped_base,
            ))),
        })
    }
}

impl SiteResolver for SiteRegistry {
    fn site_for(&self, protocol: Protocol) -> Arc<dyn PlaylistSite> {
        match protocol {
            Protocol::CookieCaptcha => self.cookie_captcha.clone(),
            Protocol::BearerSigned => self.bearer_signed.clone(),
            Protocol::CookieScraped => self.cookie_scraped.clone(),
        }
    }
}

/// HTTP client for panel calls. The scraped panel answers logins with a
/// redirect that must be observed, so redirects are optional.
pub fn build_client(timeout: Duration, user_agent: &str, follow_redirects: bool) -> PanelResult<Client> {
    let policy = if follow_redirects {
        redirect::Policy::limited(5)
    } else {
        redirect::Policy::none()
    };
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .redirect(policy)
        .build()
        .map_err(|e| PanelError::Transport(format!("failed to create HTTP client: {}", e)))
}

pub(crate) fn protocol_mismatch(session: &Session, adapter: Protocol) -> PanelError {
    PanelError::ProtocolMismatch {
        session: session.protocol(),
        adapter,
    }
}

/// `name=value` part of every Set-Cookie header
pub(crate) fn session_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Panels signal a dead session with 401/403
pub(crate) fn ensure_session_accepted(status: StatusCode) -> PanelResult<()> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Err(PanelError::SessionExpired)
    } else {
        Ok(())
    }
}

/// Read a JSON body, reporting unparseable replies as transport failures
pub(crate) async fn json_body(response: Response) -> PanelResult<Value> {
    let status = response.status();
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|_| {
        PanelError::Transport(format!(
            "panel returned non-JSON reply (HTTP {}): {}",
            status.as_u16(),
            text.chars().take(200).collect::<String>()
        ))
    })
}

/// Ids arrive as strings or numbers depending on the panel
pub(crate) fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Flags arrive as booleans, 0/1 numbers or "0"/"1"/"true" strings
pub(crate) fn value_as_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().map(|i| i != 0).unwrap_or(false),
        Value::String(s) => matches!(s.as_str(), "1" | "true"),
        _ => false,
    }
}

fn first_field<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
}

/// Map a JSON playlist object to an entry, tolerating the field names of
/// both JSON panels
pub(crate) fn entry_from_json(obj: &Value) -> Option<PlaylistEntry> {
    let id = first_field(obj, &["_id", "id", "playlist_id"]).and_then(value_as_string)?;
    let text = |keys: &[&str]| {
        first_field(obj, keys)
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };
    let playlist_type = text(&["playlist_type", "type"]);

    Some(PlaylistEntry {
        id,
        name: text(&["playlist_name", "name"]),
        url: text(&["url", "playlist_url"]),
        protected: first_field(obj, &["is_protected", "protected"])
            .map(value_as_bool)
            .unwrap_or(false),
        playlist_type: if playlist_type.is_empty() {
            DEFAULT_PLAYLIST_TYPE.to_string()
        } else {
            playlist_type
        },
    })
}

/// Entry echoed back after a write. The id comes from the reply when the
/// panel reports one, otherwise from the caller (updates); creates without
/// a reported id are resolved by listing.
pub(crate) fn written_entry(reply: &Value, known_id: Option<&str>, spec: &EntrySpec) -> Option<PlaylistEntry> {
    let reported = [reply, reply.get("data").unwrap_or(&Value::Null)]
        .into_iter()
        .find_map(|v| first_field(v, &["_id", "id", "playlist_id"]).and_then(value_as_string));
    let id = reported.or_else(|| known_id.map(str::to_string))?;

    Some(PlaylistEntry {
        id,
        name: spec.name.clone(),
        url: spec.url.clone(),
        protected: spec.protect,
        playlist_type: spec.playlist_type.clone(),
    })
}

/// Locate a just-created entry when the panel did not echo its id
pub(crate) async fn find_created<S: PlaylistSite + ?Sized>(
    site: &S,
    session: &Session,
    spec: &EntrySpec,
) -> PanelResult<PlaylistEntry> {
    site.list_entries(session)
        .await?
        .into_iter()
        .rev()
        .find(|e| e.name == spec.name && (e.protected || e.url == spec.url))
        .ok_or_else(|| {
            PanelError::Transport("panel accepted the playlist but it is missing from the listing".to_string())
        })
}

/// Reason text from a rejection body
pub(crate) fn rejection_reason(reply: &Value, fallback: &str) -> String {
    first_field(reply, &["message", "msg", "error"])
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| {
            if reply.is_null() {
                fallback.to_string()
            } else {
                format!("{}: {}", fallback, reply)
            }
        })
}
