//! Signing header derivation for bearer_signed panels
//!
//! The panel expects six obfuscated tokens on every request, each derived
//! from the device MAC, the account password and the current millisecond
//! timestamp. The chain is:
//!
//! ```text
//! obfuscate(s)   marker insertion at fixed positions
//! transform(s) = obfuscate(base64(obfuscate(s)))
//! derive(e, ts)= transform(hex(sha3_512(transform(e + ts))) + ts)
//! ```
//!
//! The timestamp is captured once per request and shared by all six tokens.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use sha3::{Digest, Sha3_512};

const FRONT_MARKER: &str = "iBo";
const BACK_MARKER: &str = "PrO";

/// Insert the fixed markers: after the first 3 chars and before the last 3
/// for strings of 6+ chars, after the first 3 only for 3-5 chars, appended
/// otherwise.
pub fn obfuscate(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();
    let slice = |from: usize, to: usize| chars[from..to].iter().collect::<String>();

    if len >= 6 {
        format!(
            "{}{}{}{}{}",
            slice(0, 3),
            FRONT_MARKER,
            slice(3, len - 3),
            BACK_MARKER,
            slice(len - 3, len)
        )
    } else if len >= 3 {
        format!("{}{}{}", slice(0, 3), FRONT_MARKER, slice(3, len))
    } else {
        format!("{}{}", s, BACK_MARKER)
    }
}

pub fn transform(s: &str) -> String {
    obfuscate(&STANDARD.encode(obfuscate(s)))
}

/// Timestamped token. `transform` output is base64 plus ASCII markers, so
/// Unicode normalisation before hashing is the identity.
pub fn derive(input: &str, timestamp_ms: i64) -> String {
    let ts = timestamp_ms.to_string();
    let inner = transform(&format!("{}{}", input, ts));
    let digest = Sha3_512::digest(inner.as_bytes());
    transform(&format!("{:x}{}", digest, ts))
}

/// The six per-request headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub gc_token: String,
    pub hash: String,
    pub hash_2: String,
    pub token: String,
    pub token_2: String,
    pub token_3: String,
}

impl SignedHeaders {
    /// Derive against an explicit clock reading
    pub fn at(mac: &str, password: &str, timestamp_ms: i64) -> Self {
        let ts = timestamp_ms;
        Self {
            gc_token: derive(&format!("{}{}{}", mac, ts, 2 * ts), ts),
            hash: derive(&format!("{}___{}", mac, password), ts),
            hash_2: derive(&format!("{}___{}__{}", mac, password, ts), ts),
            token: derive(&format!("{}{}", mac, ts), ts),
            token_2: derive(mac, ts),
            token_3: transform(mac),
        }
    }

    /// Derive with the current wall clock
    pub fn now(mac: &str, password: &str) -> Self {
        Self::at(mac, password, Utc::now().timestamp_millis())
    }

    pub fn pairs(&self) -> [(&'static str, &str); 6] {
        [
            ("X-Gc-Token", self.gc_token.as_str()),
            ("x-hash", self.hash.as_str()),
            ("x-hash-2", self.hash_2.as_str()),
            ("x-token", self.token.as_str()),
            ("x-token-2", self.token_2.as_str()),
            ("x-token-3", self.token_3.as_str()),
        ]
    }
}
