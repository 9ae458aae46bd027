use std::fs;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::SyncError;

/// Endpoint used when none is configured.
pub const DEFAULT_MODEL_VIEW_URL: &str = "https://sdeuc1.eu-central-1.shapediver.com";

/// Connection settings for the remote parametric-model service.
///
/// The ticket is the opaque embedding credential and the model view URL is
/// the service base endpoint; both come from the service dashboard and are
/// not interpreted by this crate.
#[derive(Debug, Clone, Serialize, Deserialize, TS, JsonSchema)]
#[ts(export)]
pub struct ViewerSettings {
    #[serde(default)]
    pub ticket: Option<String>,
    #[serde(default = "default_model_view_url")]
    pub model_view_url: String,
    /// Upper bound on session initialization, in milliseconds.
    /// `None` = unbounded.
    #[serde(default)]
    pub init_timeout_ms: Option<u64>,
}

fn default_model_view_url() -> String {
    DEFAULT_MODEL_VIEW_URL.to_string()
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            ticket: None,
            model_view_url: default_model_view_url(),
            init_timeout_ms: None,
        }
    }
}

/// Load settings from the config directory. Returns `None` if no settings
/// file exists or it cannot be parsed.
pub fn load_settings(config_dir: &Path) -> Option<ViewerSettings> {
    let path = crate::paths::settings_path(config_dir);
    if !path.exists() {
        return None;
    }
    read_json(&path).ok()
}

/// Save settings to the config directory, creating it if needed.
pub fn save_settings(config_dir: &Path, settings: &ViewerSettings) -> Result<(), SyncError> {
    fs::create_dir_all(config_dir).map_err(|e| SyncError::SettingsSave {
        message: e.to_string(),
    })?;
    write_json(&crate::paths::settings_path(config_dir), settings).map_err(|e| {
        SyncError::SettingsSave {
            message: e.to_string(),
        }
    })
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, SyncError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SyncError> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn settings_round_trip() {
        let dir = std::env::temp_dir().join("parasync_test_settings");
        let _ = std::fs::remove_dir_all(&dir);

        let settings = ViewerSettings {
            ticket: Some("abc123".into()),
            model_view_url: "https://example.com".into(),
            init_timeout_ms: Some(5000),
        };
        save_settings(&dir, &settings).unwrap();

        let loaded = load_settings(&dir).unwrap();
        assert_eq!(loaded.ticket.as_deref(), Some("abc123"));
        assert_eq!(loaded.model_view_url, "https://example.com");
        assert_eq!(loaded.init_timeout_ms, Some(5000));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_yields_none() {
        let dir = std::env::temp_dir().join("parasync_test_settings_missing");
        let _ = std::fs::remove_dir_all(&dir);
        assert!(load_settings(&dir).is_none());
    }

    #[test]
    fn defaults_point_at_public_endpoint() {
        let settings = ViewerSettings::default();
        assert_eq!(settings.model_view_url, DEFAULT_MODEL_VIEW_URL);
        assert!(settings.ticket.is_none());
    }
}
