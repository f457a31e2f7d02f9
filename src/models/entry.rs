use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Playlist type tag used when a panel gives none
pub const DEFAULT_PLAYLIST_TYPE: &str = "general";

fn default_playlist_type() -> String {
    DEFAULT_PLAYLIST_TYPE.to_string()
}

/// One playlist record owned by an account on its remote panel.
/// The PIN is write-only and never read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub id: String,
    pub name: String,
    pub url: String,
    pub protected: bool,
    #[serde(rename = "type", default = "default_playlist_type")]
    pub playlist_type: String,
}

/// Full description of a playlist for create and update calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySpec {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub protect: bool,
    #[serde(default)]
    pub pin: Option<String>,
    #[serde(rename = "type", default = "default_playlist_type")]
    pub playlist_type: String,
}

impl EntrySpec {
    /// PIN to send to the panel; a PIN without protection is ignored
    pub fn effective_pin(&self) -> Option<&str> {
        if self.protect {
            self.pin.as_deref()
        } else {
            None
        }
    }
}

/// Partial edit; absent fields keep the current remote value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryPatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub protect: Option<bool>,
    pub pin: Option<String>,
    #[serde(rename = "type")]
    pub playlist_type: Option<String>,
}

impl EntryPatch {
    pub fn apply_to(&self, current: &PlaylistEntry) -> EntrySpec {
        EntrySpec {
            name: self.name.clone().unwrap_or_else(|| current.name.clone()),
            url: self.url.clone().unwrap_or_else(|| current.url.clone()),
            protect: self.protect.unwrap_or(current.protected),
            pin: self.pin.clone(),
            playlist_type: self
                .playlist_type
                .clone()
                .unwrap_or_else(|| current.playlist_type.clone()),
        }
    }
}

/// Cached listing for quick display without touching the panel
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSnapshot {
    pub entries: Vec<PlaylistEntry>,
    pub last_sync: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current() -> PlaylistEntry {
        PlaylistEntry {
            id: "42".to_string(),
            name: "Main".to_string(),
            url: "http://old.example/get.php".to_string(),
            protected: true,
            playlist_type: "m3u".to_string(),
        }
    }

    #[test]
    fn test_pin_ignored_without_protect() {
        let spec = EntrySpec {
            name: "Main".to_string(),
            url: "http://a.example".to_string(),
            protect: false,
            pin: Some("1234".to_string()),
            playlist_type: default_playlist_type(),
        };
        assert_eq!(spec.effective_pin(), None);

        let spec = EntrySpec { protect: true, ..spec };
        assert_eq!(spec.effective_pin(), Some("1234"));
    }

    #[test]
    fn test_patch_keeps_unspecified_fields() {
        let patch = EntryPatch {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };
        let spec = patch.apply_to(&current());
        assert_eq!(spec.name, "Renamed");
        assert_eq!(spec.url, "http://old.example/get.php");
        assert!(spec.protect);
        assert_eq!(spec.playlist_type, "m3u");
    }

    #[test]
    fn test_spec_defaults_type() {
        let spec: EntrySpec =
            serde_json::from_str(r#"{"name":"A","url":"http://a.example"}"#).unwrap();
        assert_eq!(spec.playlist_type, DEFAULT_PLAYLIST_TYPE);
        assert!(!spec.protect);
    }
}
