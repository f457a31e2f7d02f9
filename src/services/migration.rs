//! Bulk domain migration
//!
//! Rewrites the host of every eligible playlist URL for every account of a
//! group. Analyze and preview never touch a panel; execute processes
//! accounts one after another and entries one after another, pausing after
//! each successful update. A failing account or entry becomes a line in the
//! report, never an error of the whole job.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{PanelError, PanelResult};
use crate::models::audit::ACTION_BULK;
use crate::models::{
    Account, AccountOutcome, AccountSessionStatus, Analysis, BulkPreview, DomainRecord, EntrySpec,
    MigrationReport, NewLog, OutcomeStatus, PlaylistEntry, Protocol, Session, UrlPreview,
};
use crate::services::accounts::AccountService;
use crate::services::metrics;
use crate::services::sites::PlaylistSite;

/// Replace scheme and host[:port] of `original` with those of `domain`,
/// keeping path, query and fragment
pub fn substitute_domain(original: &str, domain: &str) -> PanelResult<String> {
    let source = Url::parse(original.trim())
        .map_err(|e| PanelError::InvalidUrl(format!("{}: {}", original, e)))?;
    let mut target = Url::parse(domain.trim())
        .map_err(|e| PanelError::InvalidUrl(format!("{}: {}", domain, e)))?;
    if target.cannot_be_a_base() || target.host_str().is_none() {
        return Err(PanelError::InvalidUrl(format!("{}: no host", domain)));
    }

    target.set_path(source.path());
    target.set_query(source.query());
    target.set_fragment(source.fragment());
    Ok(target.to_string())
}

/// Throttle applied after each successful update
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self);
}

pub struct FixedPause(pub Duration);

#[async_trait]
impl Pacer for FixedPause {
    async fn pause(&self) {
        if !self.0.is_zero() {
            tokio::time::sleep(self.0).await;
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExecuteOptions {
    /// Log in accounts that have no stored session
    pub auto_login: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self { auto_login: true }
    }
}

pub struct MigrationOrchestrator {
    accounts: Arc<AccountService>,
    pacer: Arc<dyn Pacer>,
}

impl MigrationOrchestrator {
    pub fn new(accounts: Arc<AccountService>, pacer: Arc<dyn Pacer>) -> Self {
        Self { accounts, pacer }
    }

    /// Session presence per account of a group, no network
    pub async fn analyze(&self, group_id: i64) -> PanelResult<Analysis> {
        let members = self.accounts.directory().accounts_in_group(group_id).await?;
        let mut analysis = Analysis {
            total: members.len(),
            ..Analysis::default()
        };

        for account in members {
            let has_session = self
                .accounts
                .sessions()
                .exists(account.protocol, account.id)
                .await?;
            match account.protocol {
                Protocol::CookieCaptcha => analysis.cookie_captcha += 1,
                Protocol::BearerSigned => analysis.bearer_signed += 1,
                Protocol::CookieScraped => analysis.cookie_scraped += 1,
            }
            if has_session {
                analysis.with_session += 1;
            } else {
                analysis.without_session += 1;
            }
            analysis.accounts.push(AccountSessionStatus {
                id: account.id,
                name: account.name,
                protocol: account.protocol,
                has_session,
            });
        }
        Ok(analysis)
    }

    pub async fn preview(&self, original_url: &str, domain_id: i64) -> PanelResult<UrlPreview> {
        let domain = self.accounts.directory().domain(domain_id).await?;
        let new_url = substitute_domain(original_url, &domain.url)?;
        Ok(UrlPreview {
            original_url: original_url.to_string(),
            new_url,
            domain,
        })
    }

    pub async fn preview_bulk(&self, group_id: i64, domain_id: i64) -> PanelResult<BulkPreview> {
        let domain = self.accounts.directory().domain(domain_id).await?;
        let analysis = self.analyze(group_id).await?;
        if analysis.total == 0 {
            return Err(PanelError::Usage(format!("group {} has no accounts", group_id)));
        }
        Ok(BulkPreview {
            group_id,
            domain,
            analysis,
        })
    }

    pub async fn execute(
        &self,
        group_id: i64,
        domain_id: i64,
        options: ExecuteOptions,
    ) -> PanelResult<MigrationReport> {
        let domain = self.accounts.directory().domain(domain_id).await?;
        if !domain.active {
            return Err(PanelError::Usage(format!(
                "domain {} ({}) is inactive",
                domain.id, domain.url
            )));
        }
        // a bad target would fail every entry the same way
        substitute_domain("http://placeholder.invalid/", &domain.url)?;

        let members = self.accounts.directory().accounts_in_group(group_id).await?;
        if members.is_empty() {
            return Err(PanelError::Usage(format!("group {} has no accounts", group_id)));
        }

        let mut report = MigrationReport::new(
            Uuid::new_v4().to_string(),
            group_id,
            domain.url.clone(),
            members.len(),
        );
        info!(
            "Bulk migration {} started: group {} -> {} ({} accounts)",
            report.job_id,
            group_id,
            domain.url,
            members.len()
        );

        for account in &members {
            let outcome = self.migrate_account(account, &domain, options, &mut report).await;
            metrics::record_bulk_account(outcome.status == OutcomeStatus::Success);
            self.log_outcome(&outcome, &domain, group_id).await;
            report.record(outcome);
        }

        info!(
            "Bulk migration {} finished: {} ok, {} failed, {} auto-logins ({} failed)",
            report.job_id, report.successes, report.errors, report.auto_logins, report.auto_login_failures
        );
        Ok(report)
    }

    async fn migrate_account(
        &self,
        account: &Account,
        domain: &DomainRecord,
        options: ExecuteOptions,
        report: &mut MigrationReport,
    ) -> AccountOutcome {
        let mut outcome = AccountOutcome {
            account_id: account.id,
            account_name: account.name.clone(),
            protocol: account.protocol,
            status: OutcomeStatus::Success,
            auto_login: false,
            updated: 0,
            skipped: 0,
            entry_errors: Vec::new(),
            message: None,
        };

        let site = self.accounts.site_for(account.protocol);
        let result = self
            .process_entries(account, site.as_ref(), domain, options, report, &mut outcome)
            .await;

        match result {
            Ok(()) => {
                outcome.message = Some(format!(
                    "{} playlist(s) moved to {}{}",
                    outcome.updated,
                    domain.name,
                    if outcome.auto_login { " (auto-login)" } else { "" }
                ));
            }
            Err(e) => {
                warn!("Bulk migration of account {} failed: {}", account.id, e);
                outcome.status = OutcomeStatus::Error;
                outcome.message = Some(e.to_string());
            }
        }
        outcome
    }

    async fn auto_login(
        &self,
        account: &Account,
        report: &mut MigrationReport,
        outcome: &mut AccountOutcome,
    ) -> PanelResult<Session> {
        outcome.auto_login = true;
        match self.accounts.authenticate(account).await {
            Ok(session) => {
                report.auto_logins += 1;
                Ok(session)
            }
            Err(e) => {
                report.auto_login_failures += 1;
                Err(PanelError::Auth(format!("auto-login failed: {}", e)))
            }
        }
    }

    async fn session_for(
        &self,
        account: &Account,
        options: ExecuteOptions,
        report: &mut MigrationReport,
        outcome: &mut AccountOutcome,
    ) -> PanelResult<Session> {
        match self.accounts.sessions().get(account.protocol, account.id).await {
            Ok(session) => Ok(session),
            Err(PanelError::NoSession { .. }) if options.auto_login => {
                self.auto_login(account, report, outcome).await
            }
            Err(PanelError::NoSession { .. }) => Err(PanelError::Usage(
                "no session and auto-login disabled".to_string(),
            )),
            Err(e) => Err(e),
        }
    }

    async fn process_entries(
        &self,
        account: &Account,
        site: &dyn PlaylistSite,
        domain: &DomainRecord,
        options: ExecuteOptions,
        report: &mut MigrationReport,
        outcome: &mut AccountOutcome,
    ) -> PanelResult<()> {
        let mut session = self.session_for(account, options, report, outcome).await?;

        let entries = match site.list_entries(&session).await {
            Err(PanelError::SessionExpired) if options.auto_login => {
                session = self.auto_login(account, report, outcome).await?;
                site.list_entries(&session).await?
            }
            other => other?,
        };
        if entries.is_empty() {
            return Err(PanelError::Usage("no playlists found".to_string()));
        }

        for entry in &entries {
            self.migrate_entry(site, &session, entry, &domain.url, outcome)
                .await;
        }

        match site.list_entries(&session).await {
            Ok(fresh) => {
                if let Err(e) = self
                    .accounts
                    .directory()
                    .save_snapshot(account.id, &fresh)
                    .await
                {
                    warn!("Could not store snapshot for account {}: {}", account.id, e);
                }
            }
            Err(e) => warn!("Could not refresh listing of account {}: {}", account.id, e),
        }
        Ok(())
    }

    async fn migrate_entry(
        &self,
        site: &dyn PlaylistSite,
        session: &Session,
        entry: &PlaylistEntry,
        target: &str,
        outcome: &mut AccountOutcome,
    ) {
        if entry.url.trim().is_empty() || entry.protected {
            outcome.skipped += 1;
            return;
        }

        let new_url = match substitute_domain(&entry.url, target) {
            Ok(url) => url,
            Err(e) => {
                outcome.entry_errors.push(format!("{}: {}", entry.name, e));
                return;
            }
        };
        if new_url == entry.url {
            outcome.skipped += 1;
            return;
        }

        let spec = EntrySpec {
            name: entry.name.clone(),
            url: new_url,
            protect: false,
            pin: None,
            playlist_type: entry.playlist_type.clone(),
        };
        match site.update_entry(session, &entry.id, &spec).await {
            Ok(_) => {
                debug!("Entry {} of account {} moved", entry.id, session.account_id);
                metrics::record_playlist_write(true);
                outcome.updated += 1;
                self.pacer.pause().await;
            }
            Err(e) => {
                metrics::record_playlist_write(false);
                outcome.entry_errors.push(format!("{}: {}", entry.name, e));
            }
        }
    }

    async fn log_outcome(&self, outcome: &AccountOutcome, domain: &DomainRecord, group_id: i64) {
        let message = outcome.message.clone().unwrap_or_default();
        let entry = match outcome.status {
            OutcomeStatus::Success => NewLog::success(outcome.account_id, ACTION_BULK, message)
                .with_details(json!({
                    "updated": outcome.updated,
                    "skipped": outcome.skipped,
                    "entryErrors": outcome.entry_errors,
                    "autoLogin": outcome.auto_login,
                    "domain": domain.name,
                    "groupId": group_id,
                })),
            OutcomeStatus::Error => NewLog::error(outcome.account_id, ACTION_BULK, message)
                .with_details(json!({ "domain": domain.name, "groupId": group_id })),
        };
        if let Err(e) = self.accounts.directory().append_log(entry).await {
            warn!("Could not write bulk audit entry for account {}: {}", outcome.account_id, e);
        }
    }
}
