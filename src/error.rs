use std::fmt;

use serde::Serialize;
use ts_rs::TS;

/// Structured error type for the synchronization core. Replaces stringly-typed
/// errors so a frontend can match on error codes and display appropriate UI.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(tag = "code", content = "detail")]
#[ts(export)]
pub enum SyncError {
    /// The remote handshake or schema fetch failed. Fatal to the session
    /// manager instance until it is re-initialized.
    SessionInit { message: String },
    /// One customization call failed. Local to that call; the caller may retry.
    Customization { message: String },
    Timeout { operation: String, timeout_ms: u64 },
    /// Transport-level failure talking to the remote service.
    Api { message: String },
    Validation { message: String },
    SettingsSave { message: String },
    Io { message: String },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::SessionInit { message } => {
                write!(f, "Session initialization failed: {message}")
            }
            SyncError::Customization { message } => write!(f, "Customization failed: {message}"),
            SyncError::Timeout {
                operation,
                timeout_ms,
            } => write!(f, "{operation} timed out after {timeout_ms}ms"),
            SyncError::Api { message } => write!(f, "API error: {message}"),
            SyncError::Validation { message } => write!(f, "{message}"),
            SyncError::SettingsSave { message } => {
                write!(f, "Failed to save settings: {message}")
            }
            SyncError::Io { message } => write!(f, "I/O error: {message}"),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<std::io::Error> for SyncError {
    fn from(e: std::io::Error) -> Self {
        SyncError::Io {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Validation {
            message: e.to_string(),
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::Api {
            message: e.to_string(),
        }
    }
}

/// Allow converting SyncError to String for display surfaces that only take text.
impl From<SyncError> for String {
    fn from(e: SyncError) -> String {
        e.to_string()
    }
}
