use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PlaylistEntry, Protocol};

/// Protocol-specific proof of authentication, stored in Redis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionProof {
    CookieCaptcha {
        /// Panel origin, e.g. `https://panel.example`
        base_url: String,
        /// `name=value` pairs from the login response
        cookies: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        device_id: Option<String>,
    },
    BearerSigned {
        token: String,
        /// Needed to regenerate the signing headers on every call
        password: String,
    },
    CookieScraped {
        cookie: String,
    },
}

impl SessionProof {
    pub fn protocol(&self) -> Protocol {
        match self {
            SessionProof::CookieCaptcha { .. } => Protocol::CookieCaptcha,
            SessionProof::BearerSigned { .. } => Protocol::BearerSigned,
            SessionProof::CookieScraped { .. } => Protocol::CookieScraped,
        }
    }
}

/// Authenticated session for one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub account_id: i64,
    pub mac: String,
    pub proof: SessionProof,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn protocol(&self) -> Protocol {
        self.proof.protocol()
    }

    /// Operator-facing view without cookies, tokens or passwords
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            protocol: self.protocol(),
            account_id: self.account_id,
            mac: self.mac.clone(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub protocol: Protocol,
    pub account_id: i64,
    pub mac: String,
    pub created_at: DateTime<Utc>,
}

/// Result of an explicit login: the new session and, when the follow-up
/// listing succeeded, the playlists it found
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    pub session: SessionSummary,
    pub playlists: Option<Vec<PlaylistEntry>>,
}

/// Generic API response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proof_tag_round_trip() {
        let session = Session {
            account_id: 7,
            mac: "00:1a:79:00:00:07".to_string(),
            proof: SessionProof::BearerSigned {
                token: "jwt".to_string(),
                password: "pw".to_string(),
            },
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["proof"]["kind"], "bearer_signed");

        let back: Session = serde_json::from_value(json).unwrap();
        assert_eq!(back.protocol(), Protocol::BearerSigned);
    }

    #[test]
    fn test_summary_hides_secrets() {
        let session = Session {
            account_id: 3,
            mac: "mac".to_string(),
            proof: SessionProof::CookieScraped {
                cookie: "PHPSESSID=abc".to_string(),
            },
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&session.summary()).unwrap();
        assert!(!json.contains("PHPSESSID"));
        assert!(json.contains("cookie_scraped"));
    }
}
