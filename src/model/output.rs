use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

/// `format` value marking a content item whose `data` tree carries
/// structured records.
pub const DATA_FORMAT: &str = "data";

/// One piece of an output's payload. Items with `format == "data"` carry a
/// loose record tree that may include a mass figure at arbitrary depth
/// under arbitrary key names.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ContentItem {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

/// One named, versioned result artifact produced by the remote computation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Output {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Opaque version token. Only ever compared for equality.
    pub version: String,
    #[serde(default)]
    pub content: Vec<ContentItem>,
    /// Id of the output defining this output's default materials, if any.
    #[serde(default)]
    pub material: Option<String>,
}
