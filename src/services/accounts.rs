//! Account-level playlist operations
//!
//! Wraps the panel adapters with the bookkeeping every caller needs:
//! session persistence, one transparent re-login when a panel rejects a
//! stored session, snapshot refresh, metrics and the audit log.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{PanelError, PanelResult};
use crate::models::audit::{
    ACTION_CREATE, ACTION_DELETE, ACTION_LIST, ACTION_LOGIN, ACTION_LOGOUT, ACTION_SYNC,
    ACTION_UPDATE,
};
use crate::models::{
    Account, EntryPatch, EntrySpec, LoginOutcome, NewLog, PlaylistEntry, PlaylistSnapshot,
    Protocol, Session,
};
use crate::services::captcha::TwoCaptchaSolver;
use crate::services::directory::{AccountDirectory, CAPTCHA_KEY_SETTING};
use crate::services::metrics;
use crate::services::session_store::SessionStore;
use crate::services::sites::cookie_scraped::PROTECTED_PLACEHOLDER;
use crate::services::sites::{PlaylistSite, SiteResolver};

type SiteFuture<'a, T> = Pin<Box<dyn Future<Output = PanelResult<T>> + Send + 'a>>;

pub struct AccountService {
    sites: Arc<dyn SiteResolver>,
    sessions: SessionStore,
    directory: Arc<dyn AccountDirectory>,
    captcha_solver: Option<Arc<TwoCaptchaSolver>>,
}

impl AccountService {
    pub fn new(
        sites: Arc<dyn SiteResolver>,
        sessions: SessionStore,
        directory: Arc<dyn AccountDirectory>,
    ) -> Self {
        Self {
            sites,
            sessions,
            directory,
            captcha_solver: None,
        }
    }

    /// Solver whose API key follows the operator setting
    pub fn with_captcha_solver(mut self, solver: Arc<TwoCaptchaSolver>) -> Self {
        self.captcha_solver = Some(solver);
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn site_for(&self, protocol: Protocol) -> Arc<dyn PlaylistSite> {
        self.sites.site_for(protocol)
    }

    pub fn directory(&self) -> &Arc<dyn AccountDirectory> {
        &self.directory
    }

    /// Authenticate against the panel and persist the session
    pub async fn authenticate(&self, account: &Account) -> PanelResult<Session> {
        account.validate()?;
        if account.protocol == Protocol::CookieCaptcha {
            self.refresh_captcha_key().await;
        }

        let result = self.sites.site_for(account.protocol).authenticate(account).await;
        metrics::record_login(account.protocol, result.is_ok());
        let session = result?;

        self.sessions.save(&session).await?;
        if let Err(e) = self.directory.touch_sync(account.id).await {
            warn!("Could not stamp sync time for account {}: {}", account.id, e);
        }
        Ok(session)
    }

    async fn refresh_captcha_key(&self) {
        let Some(solver) = &self.captcha_solver else {
            return;
        };
        match self.directory.setting(CAPTCHA_KEY_SETTING).await {
            Ok(Some(key)) if !key.trim().is_empty() => solver.set_api_key(key.trim()),
            Ok(_) => {}
            Err(e) => warn!("Could not read captcha key setting: {}", e),
        }
    }

    /// Audit failures are logged, never surfaced
    async fn audit(&self, entry: NewLog) {
        let action = entry.action;
        if let Err(e) = self.directory.append_log(entry).await {
            warn!("Could not write {} audit entry: {}", action, e);
        }
    }

    /// Run `call` with the stored session, logging in again once if the
    /// panel rejects it
    async fn with_session<'a, T, F>(&self, account: &Account, call: F) -> PanelResult<T>
    where
        T: Send,
        F: Fn(Arc<dyn PlaylistSite>, Session) -> SiteFuture<'a, T> + Send + Sync,
    {
        let site = self.sites.site_for(account.protocol);
        let session = self.sessions.get(account.protocol, account.id).await?;

        match call(site.clone(), session).await {
            Err(PanelError::SessionExpired) => {
                warn!("Session of account {} rejected by panel, logging in again", account.id);
                let session = self.authenticate(account).await?;
                call(site, session).await
            }
            other => other,
        }
    }

    async fn store_snapshot(&self, account_id: i64, entries: &[PlaylistEntry]) {
        if let Err(e) = self.directory.save_snapshot(account_id, entries).await {
            warn!("Could not store snapshot for account {}: {}", account_id, e);
        }
    }

    /// Explicit login followed by a best-effort sync of the listing
    pub async fn login(&self, account_id: i64) -> PanelResult<LoginOutcome> {
        let account = self.directory.account(account_id).await?;

        let session = match self.authenticate(&account).await {
            Ok(session) => session,
            Err(e) => {
                self.audit(NewLog::error(account.id, ACTION_LOGIN, e.to_string()))
                    .await;
                return Err(e);
            }
        };
        info!("Account {} ({}) logged in", account.id, account.protocol);
        self.audit(NewLog::success(
            account.id,
            ACTION_LOGIN,
            format!("logged in on {}", account.protocol),
        ))
        .await;

        let playlists = match self
            .sites
            .site_for(account.protocol)
            .list_entries(&session)
            .await
        {
            Ok(entries) => {
                self.store_snapshot(account.id, &entries).await;
                self.audit(NewLog::success(
                    account.id,
                    ACTION_SYNC,
                    format!("{} playlists synced", entries.len()),
                ))
                .await;
                Some(entries)
            }
            Err(e) => {
                warn!("Login of account {} succeeded but listing failed: {}", account.id, e);
                self.audit(NewLog::error(account.id, ACTION_SYNC, e.to_string()))
                    .await;
                None
            }
        };

        Ok(LoginOutcome {
            session: session.summary(),
            playlists,
        })
    }

    pub async fn logout(&self, account_id: i64) -> PanelResult<()> {
        let account = self.directory.account(account_id).await?;
        self.sessions.invalidate(account.protocol, account.id).await?;
        self.audit(NewLog::success(account.id, ACTION_LOGOUT, "session removed"))
            .await;
        Ok(())
    }

    /// Live listing; refreshes the snapshot
    pub async fn list(&self, account_id: i64) -> PanelResult<Vec<PlaylistEntry>> {
        let account = self.directory.account(account_id).await?;
        let result = self.list_for(&account).await;
        match &result {
            Ok(entries) => {
                self.store_snapshot(account.id, entries).await;
                self.audit(NewLog::success(
                    account.id,
                    ACTION_LIST,
                    format!("{} playlists listed", entries.len()),
                ))
                .await;
            }
            Err(e) => {
                self.audit(NewLog::error(account.id, ACTION_LIST, e.to_string()))
                    .await
            }
        }
        result
    }

    async fn list_for(&self, account: &Account) -> PanelResult<Vec<PlaylistEntry>> {
        self.with_session(account, move |site, session| {
            Box::pin(async move { site.list_entries(&session).await })
        })
        .await
    }

    /// Cached listing, no network
    pub async fn snapshot(&self, account_id: i64) -> PanelResult<PlaylistSnapshot> {
        let account = self.directory.account(account_id).await?;
        self.directory.snapshot(account.id).await
    }

    pub async fn create(&self, account_id: i64, spec: EntrySpec) -> PanelResult<PlaylistEntry> {
        validate_spec(&spec)?;
        let account = self.directory.account(account_id).await?;
        let spec = &spec;

        let result = self
            .with_session(&account, move |site, session| {
                Box::pin(async move { site.create_entry(&session, spec).await })
            })
            .await;
        self.record_write(&account, ACTION_CREATE, &spec.name, &result).await;
        result
    }

    pub async fn update(
        &self,
        account_id: i64,
        entry_id: &str,
        spec: EntrySpec,
    ) -> PanelResult<PlaylistEntry> {
        validate_spec(&spec)?;
        let account = self.directory.account(account_id).await?;
        self.update_for(&account, entry_id, &spec).await
    }

    async fn update_for(
        &self,
        account: &Account,
        entry_id: &str,
        spec: &EntrySpec,
    ) -> PanelResult<PlaylistEntry> {
        let result = self
            .with_session(account, move |site, session| {
                Box::pin(async move { site.update_entry(&session, entry_id, spec).await })
            })
            .await;
        self.record_write(account, ACTION_UPDATE, &spec.name, &result).await;
        result
    }

    /// Partial edit: fields absent from the patch keep their remote value
    pub async fn edit(
        &self,
        account_id: i64,
        entry_id: &str,
        patch: EntryPatch,
    ) -> PanelResult<PlaylistEntry> {
        let account = self.directory.account(account_id).await?;
        let current = self
            .list_for(&account)
            .await?
            .into_iter()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| PanelError::NotFound(format!("playlist {}", entry_id)))?;

        // The listing only shows a placeholder for protected URLs
        if account.protocol == Protocol::CookieScraped && current.protected && patch.url.is_none() {
            return Err(PanelError::Usage(format!(
                "playlist {} is protected and its URL is hidden (\"{}\"); provide the URL to edit it",
                entry_id, PROTECTED_PLACEHOLDER
            )));
        }

        let spec = patch.apply_to(&current);
        validate_spec(&spec)?;
        self.update_for(&account, entry_id, &spec).await
    }

    pub async fn delete(
        &self,
        account_id: i64,
        entry_id: &str,
        pin: Option<String>,
    ) -> PanelResult<()> {
        let account = self.directory.account(account_id).await?;
        let pin = pin.as_deref();

        let result = self
            .with_session(&account, move |site, session| {
                Box::pin(async move { site.delete_entry(&session, entry_id, pin).await })
            })
            .await;
        self.record_write(&account, ACTION_DELETE, entry_id, &result).await;
        result
    }

    async fn record_write<T>(
        &self,
        account: &Account,
        action: &'static str,
        subject: &str,
        result: &PanelResult<T>,
    ) {
        metrics::record_playlist_write(result.is_ok());
        let entry = match result {
            Ok(_) => NewLog::success(account.id, action, format!("{} ok", subject)),
            Err(e) => {
                warn!("{} failed for account {}: {}", action, account.id, e);
                NewLog::error(account.id, action, format!("{}: {}", subject, e))
            }
        };
        self.audit(entry).await;
    }
}

fn validate_spec(spec: &EntrySpec) -> PanelResult<()> {
    if spec.name.trim().is_empty() {
        return Err(PanelError::Usage("playlist name is required".to_string()));
    }
    if spec.url.trim().is_empty() {
        return Err(PanelError::Usage("playlist URL is required".to_string()));
    }
    Ok(())
}
