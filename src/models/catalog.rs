//! Operator-managed records: groups, migration targets, panel hosts and
//! settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{PanelError, PanelResult};

fn required(value: &str, what: &str) -> PanelResult<String> {
    let value = value.trim();
    if value.is_empty() {
        Err(PanelError::Usage(format!("{} is required", what)))
    } else {
        Ok(value.to_string())
    }
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Body for creating or renaming a group
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInput {
    pub name: String,
    pub description: Option<String>,
}

impl GroupInput {
    /// Trimmed copy, rejecting a blank name
    pub fn normalized(&self) -> PanelResult<GroupInput> {
        Ok(GroupInput {
            name: required(&self.name, "group name")?,
            description: optional_text(self.description.as_deref()),
        })
    }
}

/// Body for creating or replacing a migration target
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainInput {
    pub name: String,
    pub url: String,
    pub active: Option<bool>,
}

impl DomainInput {
    /// The URL must be absolute http(s) with a host; only its origin is
    /// used during substitution, so the trailing slash is dropped
    pub fn normalized(&self) -> PanelResult<DomainInput> {
        let name = required(&self.name, "domain name")?;
        let url = required(&self.url, "domain url")?;
        let parsed = Url::parse(&url).map_err(|e| PanelError::InvalidUrl(format!("{}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(PanelError::InvalidUrl(format!(
                "{}: expected an http(s) URL with a host",
                url
            )));
        }
        Ok(DomainInput {
            name,
            url: url.trim_end_matches('/').to_string(),
            active: self.active,
        })
    }
}

/// Known cookie_captcha panel host
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelDomain {
    pub id: i64,
    pub name: String,
    pub domain: String,
    pub active: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelDomainInput {
    pub name: String,
    pub domain: String,
    pub active: Option<bool>,
}

impl PanelDomainInput {
    /// Hosts are stored bare (`panel.example.com`), lower-cased, without
    /// scheme or trailing slash
    pub fn normalized(&self) -> PanelResult<PanelDomainInput> {
        let name = required(&self.name, "panel name")?;
        let domain = required(&self.domain, "panel domain")?;
        let bare = domain
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_lowercase();
        if bare.is_empty() || bare.contains('/') || bare.contains(char::is_whitespace) {
            return Err(PanelError::Usage(format!("'{}' is not a bare host name", domain)));
        }
        Ok(PanelDomainInput {
            name,
            domain: bare,
            active: self.active,
        })
    }
}

/// Stored setting
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEntry {
    pub key: String,
    pub value: Option<String>,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Body for `POST /api/config` (key in the body) and
/// `PUT /api/config/:key` (key in the path)
#[derive(Debug, Deserialize)]
pub struct ConfigInput {
    pub key: Option<String>,
    pub value: Option<String>,
    pub description: Option<String>,
}

impl ConfigInput {
    /// Resolve the key from the path or the body
    pub fn key_or(&self, path_key: Option<&str>) -> PanelResult<String> {
        required(path_key.or(self.key.as_deref()).unwrap_or_default(), "config key")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptchaKeyInput {
    pub api_key: String,
}

impl CaptchaKeyInput {
    pub fn normalized(&self) -> PanelResult<String> {
        required(&self.api_key, "API key")
    }
}

/// Current solver key as seen by operators
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptchaKeyStatus {
    pub key: String,
    pub configured: bool,
}

impl CaptchaKeyStatus {
    pub fn new(key: Option<String>) -> Self {
        let key = key.unwrap_or_default();
        let configured = !key.trim().is_empty();
        Self { key, configured }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_name_required() {
        let input = GroupInput {
            name: "  ".to_string(),
            description: None,
        };
        assert!(matches!(input.normalized(), Err(PanelError::Usage(_))));

        let input = GroupInput {
            name: " Resellers ".to_string(),
            description: Some("  ".to_string()),
        };
        let normalized = input.normalized().unwrap();
        assert_eq!(normalized.name, "Resellers");
        assert!(normalized.description.is_none());
    }

    #[test]
    fn test_domain_url_checked() {
        let input = |url: &str| DomainInput {
            name: "New host".to_string(),
            url: url.to_string(),
            active: None,
        };
        assert_eq!(
            input(" http://new.example:8080/ ").normalized().unwrap().url,
            "http://new.example:8080"
        );
        assert!(matches!(input("new.example").normalized(), Err(PanelError::InvalidUrl(_))));
        assert!(matches!(input("ftp://new.example").normalized(), Err(PanelError::InvalidUrl(_))));
        assert!(matches!(input("").normalized(), Err(PanelError::Usage(_))));
    }

    #[test]
    fn test_panel_domain_stored_bare() {
        let input = PanelDomainInput {
            name: "Main panel".to_string(),
            domain: "https://Panel.Example.com/".to_string(),
            active: Some(false),
        };
        let normalized = input.normalized().unwrap();
        assert_eq!(normalized.domain, "panel.example.com");
        assert_eq!(normalized.active, Some(false));

        let nested = PanelDomainInput {
            name: "x".to_string(),
            domain: "panel.example.com/login".to_string(),
            active: None,
        };
        assert!(matches!(nested.normalized(), Err(PanelError::Usage(_))));
    }

    #[test]
    fn test_config_key_from_path_or_body() {
        let input: ConfigInput = serde_json::from_str(r#"{"key":"theme","value":"dark"}"#).unwrap();
        assert_eq!(input.key_or(None).unwrap(), "theme");
        assert_eq!(input.key_or(Some("captcha_api_key")).unwrap(), "captcha_api_key");

        let keyless: ConfigInput = serde_json::from_str(r#"{"value":"dark"}"#).unwrap();
        assert!(matches!(keyless.key_or(None), Err(PanelError::Usage(_))));
    }

    #[test]
    fn test_captcha_key_status() {
        assert!(!CaptchaKeyStatus::new(None).configured);
        assert!(!CaptchaKeyStatus::new(Some(" ".to_string())).configured);
        let status = CaptchaKeyStatus::new(Some("abc123".to_string()));
        assert!(status.configured);
        assert_eq!(status.key, "abc123");

        let input: CaptchaKeyInput = serde_json::from_str(r#"{"apiKey":" abc123 "}"#).unwrap();
        assert_eq!(input.normalized().unwrap(), "abc123");
    }
}
