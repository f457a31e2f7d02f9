use serde::Serialize;

use super::{DomainRecord, Protocol};

/// Per-account session presence, no network involved
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSessionStatus {
    pub id: i64,
    pub name: String,
    pub protocol: Protocol,
    pub has_session: bool,
}

/// Result of the analyze phase
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub total: usize,
    pub cookie_captcha: usize,
    pub bearer_signed: usize,
    pub cookie_scraped: usize,
    pub with_session: usize,
    pub without_session: usize,
    pub accounts: Vec<AccountSessionStatus>,
}

impl Analysis {
    pub fn count_for(&self, protocol: Protocol) -> usize {
        match protocol {
            Protocol::CookieCaptcha => self.cookie_captcha,
            Protocol::BearerSigned => self.bearer_signed,
            Protocol::CookieScraped => self.cookie_scraped,
        }
    }
}

/// Analysis of a group together with the domain it would move to
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkPreview {
    pub group_id: i64,
    pub domain: DomainRecord,
    pub analysis: Analysis,
}

/// Single-URL preview
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlPreview {
    pub original_url: String,
    pub new_url: String,
    pub domain: DomainRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Error,
}

/// What happened to one account during execute
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountOutcome {
    pub account_id: i64,
    pub account_name: String,
    pub protocol: Protocol,
    pub status: OutcomeStatus,
    pub auto_login: bool,
    pub updated: usize,
    pub skipped: usize,
    pub entry_errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Aggregated result of one bulk domain migration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub job_id: String,
    pub group_id: i64,
    pub domain: String,
    pub total: usize,
    pub processed: usize,
    pub successes: usize,
    pub errors: usize,
    pub auto_logins: usize,
    pub auto_login_failures: usize,
    pub details: Vec<AccountOutcome>,
}

impl MigrationReport {
    pub fn new(job_id: String, group_id: i64, domain: String, total: usize) -> Self {
        Self {
            job_id,
            group_id,
            domain,
            total,
            processed: 0,
            successes: 0,
            errors: 0,
            auto_logins: 0,
            auto_login_failures: 0,
            details: Vec::with_capacity(total),
        }
    }

    pub fn record(&mut self, outcome: AccountOutcome) {
        self.processed += 1;
        match outcome.status {
            OutcomeStatus::Success => self.successes += 1,
            OutcomeStatus::Error => self.errors += 1,
        }
        self.details.push(outcome);
    }
}
