use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{PanelError, PanelResult};

/// Authentication protocol spoken by the panel an account lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Cookie session obtained by solving an image challenge
    CookieCaptcha,
    /// Bearer token plus per-request derived signing headers
    BearerSigned,
    /// Cookie session, playlists scraped from HTML
    CookieScraped,
}

impl Protocol {
    pub const ALL: [Protocol; 3] = [
        Protocol::CookieCaptcha,
        Protocol::BearerSigned,
        Protocol::CookieScraped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::CookieCaptcha => "cookie_captcha",
            Protocol::BearerSigned => "bearer_signed",
            Protocol::CookieScraped => "cookie_scraped",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cookie_captcha" => Ok(Protocol::CookieCaptcha),
            "bearer_signed" => Ok(Protocol::BearerSigned),
            "cookie_scraped" => Ok(Protocol::CookieScraped),
            other => Err(PanelError::Usage(format!(
                "unknown protocol '{}', expected cookie_captcha, bearer_signed or cookie_scraped",
                other
            ))),
        }
    }
}

/// Device identity on one remote panel
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub mac: String,
    pub protocol: Protocol,
    #[serde(skip_serializing)]
    pub device_key: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Panel host for cookie_captcha accounts (each reseller runs its own)
    pub domain: Option<String>,
    pub group_id: Option<i64>,
    pub active: bool,
    pub last_sync: Option<DateTime<Utc>>,
}

impl Account {
    /// Check that the secrets required by the account's protocol are present
    pub fn validate(&self) -> PanelResult<()> {
        if self.mac.trim().is_empty() {
            return Err(PanelError::Usage("device MAC is required".to_string()));
        }
        match self.protocol {
            Protocol::CookieCaptcha => {
                self.require_device_key()?;
                self.require_domain()?;
            }
            Protocol::BearerSigned => {
                self.require_password()?;
            }
            Protocol::CookieScraped => {
                self.require_device_key()?;
            }
        }
        Ok(())
    }

    pub fn require_device_key(&self) -> PanelResult<&str> {
        non_empty(self.device_key.as_deref()).ok_or_else(|| {
            PanelError::Usage(format!("device key is required for {} accounts", self.protocol))
        })
    }

    pub fn require_password(&self) -> PanelResult<&str> {
        non_empty(self.password.as_deref()).ok_or_else(|| {
            PanelError::Usage(format!("password is required for {} accounts", self.protocol))
        })
    }

    pub fn require_domain(&self) -> PanelResult<&str> {
        non_empty(self.domain.as_deref()).ok_or_else(|| {
            PanelError::Usage(format!("panel domain is required for {} accounts", self.protocol))
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Request body for registering or replacing an account
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub name: String,
    pub mac: String,
    pub protocol: Protocol,
    pub device_key: Option<String>,
    pub password: Option<String>,
    pub domain: Option<String>,
    pub group_id: Option<i64>,
    pub active: Option<bool>,
}

impl NewAccount {
    /// Same checks as [`Account::validate`], plus a display name
    pub fn validate(&self) -> PanelResult<()> {
        if self.name.trim().is_empty() {
            return Err(PanelError::Usage("account name is required".to_string()));
        }
        Account {
            id: 0,
            name: self.name.clone(),
            mac: self.mac.clone(),
            protocol: self.protocol,
            device_key: self.device_key.clone(),
            password: self.password.clone(),
            domain: self.domain.clone(),
            group_id: self.group_id,
            active: true,
            last_sync: None,
        }
        .validate()
    }

    /// Replacement for `current`: secrets and domain left out of the body
    /// keep their stored values, since they are never sent to clients
    pub fn over(self, current: &Account) -> NewAccount {
        NewAccount {
            device_key: self.device_key.or_else(|| current.device_key.clone()),
            password: self.password.or_else(|| current.password.clone()),
            domain: self.domain.or_else(|| current.domain.clone()),
            active: self.active.or(Some(current.active)),
            ..self
        }
    }
}

/// Named set of accounts migrated together
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub account_count: i64,
}

/// Target playlist host for domain migration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainRecord {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(protocol: Protocol) -> Account {
        Account {
            id: 1,
            name: "Living room".to_string(),
            mac: "00:1a:79:aa:bb:cc".to_string(),
            protocol,
            device_key: None,
            password: None,
            domain: None,
            group_id: None,
            active: true,
            last_sync: None,
        }
    }

    #[test]
    fn test_protocol_round_trips_through_str() {
        for protocol in Protocol::ALL {
            assert_eq!(protocol.as_str().parse::<Protocol>().unwrap(), protocol);
        }
        assert!("iboplayer".parse::<Protocol>().is_err());
    }

    #[test]
    fn test_validate_requires_protocol_secrets() {
        let mut captcha = account(Protocol::CookieCaptcha);
        captcha.device_key = Some("123456".to_string());
        assert!(matches!(captcha.validate(), Err(PanelError::Usage(_))));
        captcha.domain = Some("panel.example".to_string());
        assert!(captcha.validate().is_ok());

        let mut bearer = account(Protocol::BearerSigned);
        bearer.password = Some("   ".to_string());
        assert!(bearer.validate().is_err());
        bearer.password = Some("secret".to_string());
        assert!(bearer.validate().is_ok());

        let mut scraped = account(Protocol::CookieScraped);
        assert!(scraped.validate().is_err());
        scraped.device_key = Some("998877".to_string());
        assert!(scraped.validate().is_ok());
    }

    #[test]
    fn test_new_account_validation() {
        let body = r#"{"name":"Office","mac":"00:1a:79:00:00:09","protocol":"bearer_signed"}"#;
        let mut new: NewAccount = serde_json::from_str(body).unwrap();
        assert!(matches!(new.validate(), Err(PanelError::Usage(_))));
        new.password = Some("pw".to_string());
        assert!(new.validate().is_ok());
        new.name = "".to_string();
        assert!(new.validate().is_err());
    }

    #[test]
    fn test_replacement_keeps_stored_secrets() {
        let mut current = account(Protocol::CookieCaptcha);
        current.device_key = Some("123456".to_string());
        current.domain = Some("panel.example".to_string());
        current.active = false;

        let body = r#"{"name":"Renamed","mac":"00:1a:79:aa:bb:cc","protocol":"cookie_captcha","groupId":3}"#;
        let replacement = serde_json::from_str::<NewAccount>(body).unwrap().over(&current);
        assert!(replacement.validate().is_ok());
        assert_eq!(replacement.name, "Renamed");
        assert_eq!(replacement.device_key.as_deref(), Some("123456"));
        assert_eq!(replacement.domain.as_deref(), Some("panel.example"));
        assert_eq!(replacement.group_id, Some(3));
        assert_eq!(replacement.active, Some(false));

        let body = r#"{"name":"Renamed","mac":"m","protocol":"cookie_captcha","deviceKey":"654321","active":true}"#;
        let replacement = serde_json::from_str::<NewAccount>(body).unwrap().over(&current);
        assert_eq!(replacement.device_key.as_deref(), Some("654321"));
        assert_eq!(replacement.active, Some(true));
    }

    #[test]
    fn test_secrets_not_serialized() {
        let mut bearer = account(Protocol::BearerSigned);
        bearer.password = Some("hunter2".to_string());
        let json = serde_json::to_string(&bearer).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains("bearer_signed"));
    }
}
