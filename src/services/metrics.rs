//! Process-wide counters exposed on `/metrics`

use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};

use crate::models::Protocol;

lazy_static! {
    static ref PANEL_LOGINS: IntCounterVec = register_int_counter_vec!(
        "panel_logins_total",
        "Panel login attempts by protocol and outcome",
        &["protocol", "outcome"]
    )
    .unwrap();
    static ref PLAYLIST_UPDATES: IntCounterVec = register_int_counter_vec!(
        "panel_playlist_updates_total",
        "Playlist writes sent to panels by outcome",
        &["outcome"]
    )
    .unwrap();
    static ref BULK_ACCOUNTS: IntCounterVec = register_int_counter_vec!(
        "panel_bulk_accounts_total",
        "Accounts processed by bulk domain migration by outcome",
        &["outcome"]
    )
    .unwrap();
}

fn outcome(ok: bool) -> &'static str {
    if ok {
        "success"
    } else {
        "error"
    }
}

pub fn record_login(protocol: Protocol, ok: bool) {
    PANEL_LOGINS
        .with_label_values(&[protocol.as_str(), outcome(ok)])
        .inc();
}

pub fn record_playlist_write(ok: bool) {
    PLAYLIST_UPDATES.with_label_values(&[outcome(ok)]).inc();
}

pub fn record_bulk_account(ok: bool) {
    BULK_ACCOUNTS.with_label_values(&[outcome(ok)]).inc();
}
