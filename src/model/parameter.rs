use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The parameter types the remote computation accepts, matched
/// exhaustively wherever controls or values are derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, JsonSchema)]
#[ts(export)]
pub enum ParamType {
    Int,
    Float,
    /// Integer restricted to even values; controls step by 2.
    Even,
    /// Integer restricted to odd values; controls step by 2.
    Odd,
    Bool,
    String,
    Color,
    /// One choice out of a fixed list; the canonical value is the choice index.
    StringList,
}

/// Describes one remote parameter: type, bounds, and default.
/// Immutable once fetched for a session generation; uniquely keyed by `id`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, JsonSchema)]
#[ts(export)]
pub struct ParameterSchema {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    /// Stringified default, in the same canonical form the value map uses.
    pub defval: String,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default, rename = "decimalplaces")]
    pub decimal_places: Option<usize>,
    #[serde(default)]
    pub choices: Option<Vec<String>>,
    /// Hidden parameters get no control descriptor but keep their default
    /// in the value map.
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub description: Option<String>,
}

/// Current stringified value per parameter id, in server enumeration order.
pub type ParameterValues = IndexMap<String, String>;

/// The single shared value-map instance behind an active control tree.
pub type SharedValues = Arc<Mutex<ParameterValues>>;
