//! Form-login panel whose listing is only available as HTML.
//!
//! A successful login answers with a 302 and a session cookie; bad
//! credentials re-render the form. Redirects are never followed so both
//! cases can be told apart, and a redirect on an authenticated page means
//! the session is gone.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{ACCEPT, COOKIE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::{info, warn};

use super::{
    ensure_session_accepted, find_created, json_body, protocol_mismatch, rejection_reason,
    session_cookies, written_entry, PlaylistSite,
};
use crate::error::{PanelError, PanelResult};
use crate::models::{Account, EntrySpec, PlaylistEntry, Protocol, Session, SessionProof};
use crate::services::markup::extract_entries;

/// Shown in place of the URL of a protected playlist
pub const PROTECTED_PLACEHOLDER: &str = "This playlist is protected";

pub struct CookieScrapedSite {
    http: Client,
    base_url: String,
}

impl CookieScrapedSite {
    /// `http` must not follow redirects
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn cookie<'a>(&self, session: &'a Session) -> PanelResult<&'a str> {
        match &session.proof {
            SessionProof::CookieScraped { cookie } => Ok(cookie.as_str()),
            _ => Err(protocol_mismatch(session, Protocol::CookieScraped)),
        }
    }

    fn authed(&self, builder: RequestBuilder, cookie: &str) -> RequestBuilder {
        builder.header(COOKIE, cookie)
    }

    /// Write calls answer with a `{status, msg, data}` envelope
    async fn envelope(&self, response: Response, action: &str) -> PanelResult<Value> {
        ensure_redirect_free(&response)?;
        ensure_session_accepted(response.status())?;
        let reply = json_body(response).await?;
        if reply.get("status").and_then(Value::as_str) != Some("success") {
            return Err(PanelError::rejected(rejection_reason(
                &reply,
                &format!("{} failed", action),
            )));
        }
        Ok(reply)
    }

    async fn save(&self, session: &Session, current_id: &str, spec: &EntrySpec) -> PanelResult<Value> {
        if spec.url == PROTECTED_PLACEHOLDER {
            return Err(PanelError::Usage(
                "the panel hides the URL of protected playlists; provide the real URL".to_string(),
            ));
        }
        let cookie = self.cookie(session)?;

        let mut form = vec![
            ("current_playlist_url_id", current_id),
            ("playlist_name", spec.name.as_str()),
            ("playlist_url", spec.url.as_str()),
            ("protect", if spec.protect { "1" } else { "0" }),
            ("playlist_type", spec.playlist_type.as_str()),
            ("user_name", ""),
            ("password", ""),
        ];
        if let Some(pin) = spec.effective_pin() {
            form.push(("pin", pin));
        }

        let response = self
            .authed(self.http.post(format!("{}/savePlaylist", self.base_url)), cookie)
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await?;
        self.envelope(response, "save").await
    }
}

fn ensure_redirect_free(response: &Response) -> PanelResult<()> {
    if response.status().is_redirection() {
        Err(PanelError::SessionExpired)
    } else {
        Ok(())
    }
}

#[async_trait]
impl PlaylistSite for CookieScrapedSite {
    fn protocol(&self) -> Protocol {
        Protocol::CookieScraped
    }

    async fn authenticate(&self, account: &Account) -> PanelResult<Session> {
        let device_key = account.require_device_key()?;
        let response = self
            .http
            .post(format!("{}/login", self.base_url))
            .form(&[
                ("mac_address", account.mac.as_str()),
                ("device_key", device_key),
                ("submit", ""),
            ])
            .send()
            .await?;

        let found = response.status() == StatusCode::FOUND;
        let cookie = session_cookies(&response).into_iter().next();
        match (found, cookie) {
            (true, Some(cookie)) => {
                info!("Account {} logged in (scraped)", account.id);
                Ok(Session {
                    account_id: account.id,
                    mac: account.mac.clone(),
                    proof: SessionProof::CookieScraped { cookie },
                    created_at: Utc::now(),
                })
            }
            _ => {
                warn!(
                    "Login refused for account {} (HTTP {})",
                    account.id,
                    response.status().as_u16()
                );
                Err(PanelError::Auth(
                    "invalid MAC or device key".to_string(),
                ))
            }
        }
    }

    async fn list_entries(&self, session: &Session) -> PanelResult<Vec<PlaylistEntry>> {
        let cookie = self.cookie(session)?;
        let response = self
            .authed(self.http.get(format!("{}/mylist", self.base_url)), cookie)
            .send()
            .await?;
        ensure_redirect_free(&response)?;
        ensure_session_accepted(response.status())?;
        if !response.status().is_success() {
            return Err(PanelError::Transport(format!(
                "listing returned HTTP {}",
                response.status().as_u16()
            )));
        }
        let html = response.text().await?;
        Ok(extract_entries(&html))
    }

    async fn create_entry(&self, session: &Session, spec: &EntrySpec) -> PanelResult<PlaylistEntry> {
        let reply = self.save(session, "-1", spec).await?;
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
        let reply = self.save(session, id, spec).await?;
        written_entry(&reply, Some(id), spec)
            .ok_or_else(|| PanelError::Transport("update reply without playlist id".to_string()))
    }

    async fn delete_entry(&self, session: &Session, id: &str, _pin: Option<&str>) -> PanelResult<()> {
        let cookie = self.cookie(session)?;
        let response = self
            .authed(self.http.delete(format!("{}/deletePlayListUrl", self.base_url)), cookie)
            .header(ACCEPT, "application/json")
            .form(&[("playlist_url_id", id)])
            .send()
            .await?;
        self.envelope(response, "delete").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::sites::build_client;
    use crate::test_support::spawn_panel;
    use axum::{
        http::{header, HeaderMap, StatusCode},
        response::{Html, IntoResponse},
        routing::{delete, get, post},
        Form, Json, Router,
    };
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const LISTING: &str = r#"<table><thead><tr><th>Name</th></tr></thead><tbody>
<tr><td class="text-center">Main</td><td class="text-center">http://old.example/get.php?u=1</td><td class="text-center"><button data-current_id="41" data-protected="0" data-playlist_type="general">Edit</button></td></tr>
<tr><td class="text-center">Kids</td><td class="text-center">This playlist is protected</td><td class="text-center"><button data-current_id="42" data-protected="1" data-playlist_type="general">Edit</button></td></tr>
</tbody></table>"#;

    fn site(base: &str) -> CookieScrapedSite {
        let http = build_client(Duration::from_secs(5), "test-agent", false).unwrap();
        CookieScrapedSite::new(http, base)
    }

    fn account() -> Account {
        Account {
            id: 21,
            name: "Lobby".to_string(),
            mac: "00:1a:79:00:00:21".to_string(),
            protocol: Protocol::CookieScraped,
            device_key: Some("112233".to_string()),
            password: None,
            domain: None,
            group_id: None,
            active: true,
            last_sync: None,
        }
    }

    fn logged_in(headers: &HeaderMap) -> bool {
        headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) == Some("laravel_session=abc")
    }

    fn panel(saved: Arc<Mutex<Vec<HashMap<String, String>>>>) -> Router {
        Router::new()
            .route(
                "/login",
                post(|Form(form): Form<HashMap<String, String>>| async move {
                    if form.get("device_key").map(String::as_str) == Some("112233") {
                        (
                            StatusCode::FOUND,
                            [
                                (header::LOCATION, "/mylist"),
                                (header::SET_COOKIE, "laravel_session=abc; path=/; httponly"),
                            ],
                        )
                            .into_response()
                    } else {
                        Html("<form>Invalid credentials</form>").into_response()
                    }
                }),
            )
            .route(
                "/mylist",
                get(|headers: HeaderMap| async move {
                    if logged_in(&headers) {
                        Html(LISTING).into_response()
                    } else {
                        (StatusCode::FOUND, [(header::LOCATION, "/login")]).into_response()
                    }
                }),
            )
            .route(
                "/savePlaylist",
                post(move |Form(form): Form<HashMap<String, String>>| {
                    let saved = saved.clone();
                    async move {
                        saved.lock().unwrap().push(form.clone());
                        if form.get("playlist_url").map(String::as_str) == Some("nope") {
                            return Json(json!({ "status": "error", "msg": "Invalid URL" }));
                        }
                        Json(json!({ "status": "success", "msg": "Saved", "data": { "id": 43 } }))
                    }
                }),
            )
            .route(
                "/deletePlayListUrl",
                delete(|Form(form): Form<HashMap<String, String>>| async move {
                    assert_eq!(form.get("playlist_url_id").map(String::as_str), Some("41"));
                    Json(json!({ "status": "success", "msg": "Deleted" }))
                }),
            )
    }

    fn spec(url: &str, protect: bool) -> EntrySpec {
        EntrySpec {
            name: "Main".to_string(),
            url: url.to_string(),
            protect,
            pin: Some("9999".to_string()),
            playlist_type: "general".to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_and_scrape() {
        let base = spawn_panel(panel(Arc::default())).await;
        let site = site(&base);

        let session = site.authenticate(&account()).await.unwrap();
        assert_eq!(
            session.proof,
            SessionProof::CookieScraped {
                cookie: "laravel_session=abc".to_string()
            }
        );

        let entries = site.list_entries(&session).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "41");
        assert_eq!(entries[1].url, PROTECTED_PLACEHOLDER);
        assert!(entries[1].protected);
    }

    #[tokio::test]
    async fn test_bad_key_is_auth_error() {
        let base = spawn_panel(panel(Arc::default())).await;
        let mut account = account();
        account.device_key = Some("000000".to_string());
        assert!(matches!(
            site(&base).authenticate(&account).await,
            Err(PanelError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_login_needs_found_status() {
        let router = Router::new().route(
            "/login",
            post(|| async {
                (
                    StatusCode::SEE_OTHER,
                    [
                        (header::LOCATION, "/mylist"),
                        (header::SET_COOKIE, "laravel_session=abc; path=/"),
                    ],
                )
            }),
        );
        let base = spawn_panel(router).await;
        assert!(matches!(
            site(&base).authenticate(&account()).await,
            Err(PanelError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_listing_server_error_is_transport() {
        let router = Router::new().route(
            "/mylist",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "Server Error") }),
        );
        let base = spawn_panel(router).await;
        let session = Session {
            account_id: 21,
            mac: "m".to_string(),
            proof: SessionProof::CookieScraped {
                cookie: "laravel_session=abc".to_string(),
            },
            created_at: Utc::now(),
        };
        assert!(matches!(
            site(&base).list_entries(&session).await,
            Err(PanelError::Transport(ref m)) if m.contains("500")
        ));
    }

    #[tokio::test]
    async fn test_redirect_on_listing_is_session_expired() {
        let base = spawn_panel(panel(Arc::default())).await;
        let session = Session {
            account_id: 21,
            mac: "m".to_string(),
            proof: SessionProof::CookieScraped {
                cookie: "laravel_session=old".to_string(),
            },
            created_at: Utc::now(),
        };
        assert!(matches!(
            site(&base).list_entries(&session).await,
            Err(PanelError::SessionExpired)
        ));
    }

    #[tokio::test]
    async fn test_save_form_fields() {
        let saved = Arc::new(Mutex::new(Vec::new()));
        let base = spawn_panel(panel(saved.clone())).await;
        let site = site(&base);
        let session = site.authenticate(&account()).await.unwrap();

        let created = site
            .create_entry(&session, &spec("http://new.example/a", false))
            .await
            .unwrap();
        assert_eq!(created.id, "43");
        site.update_entry(&session, "41", &spec("http://new.example/a", true))
            .await
            .unwrap();

        let err = site
            .update_entry(&session, "41", &spec("nope", false))
            .await
            .unwrap_err();
        assert!(matches!(err, PanelError::RemoteRejected { ref reason } if reason == "Invalid URL"));

        let saved = saved.lock().unwrap();
        assert_eq!(saved[0]["current_playlist_url_id"], "-1");
        assert_eq!(saved[0]["protect"], "0");
        assert!(!saved[0].contains_key("pin"));
        assert_eq!(saved[1]["current_playlist_url_id"], "41");
        assert_eq!(saved[1]["protect"], "1");
        assert_eq!(saved[1]["pin"], "9999");
    }

    #[tokio::test]
    async fn test_unprotecting_with_placeholder_url_is_refused() {
        let saved = Arc::new(Mutex::new(Vec::new()));
        let base = spawn_panel(panel(saved.clone())).await;
        let site = site(&base);
        let session = site.authenticate(&account()).await.unwrap();

        let err = site
            .update_entry(&session, "42", &spec(PROTECTED_PLACEHOLDER, false))
            .await
            .unwrap_err();
        assert!(matches!(err, PanelError::Usage(_)));

        let err = site
            .update_entry(&session, "42", &spec(PROTECTED_PLACEHOLDER, true))
            .await
            .unwrap_err();
        assert!(matches!(err, PanelError::Usage(_)));
        assert!(saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let base = spawn_panel(panel(Arc::default())).await;
        let site = site(&base);
        let session = site.authenticate(&account()).await.unwrap();
        site.delete_entry(&session, "41", None).await.unwrap();
    }
}
