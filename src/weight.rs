//! Best-effort extraction of a physical weight from output payloads.
//!
//! The payload shape is not under our control: the mass figure may sit at
//! arbitrary depth under arbitrary key names, and it moves between service
//! versions. The match order below is the contract: direct field first,
//! then one level under a material group, then one level under any key,
//! then deeper records. First match wins and the search stops.

use serde_json::Value;

use crate::model::{ContentItem, DATA_FORMAT};

/// Field names accepted as a mass figure, checked in order.
const MASS_KEYS: [&str; 2] = ["mass", "Mass"];

/// Keys whose nested record is checked before the generic any-key fallback.
const MATERIAL_GROUP_KEYS: [&str; 3] = ["material", "materials", "materialdata"];

/// Round to 3 decimal places.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Scan content items in order and return the first mass figure found,
/// rounded to 3 decimal places.
///
/// Only items whose `format` marks them as structured data are searched.
/// Malformed or partial payloads are treated as "no match" for that branch,
/// never an error; shape variance from the remote side is expected.
pub fn extract_weight(content: &[ContentItem]) -> Option<f64> {
    for item in content {
        if item.format.as_deref() != Some(DATA_FORMAT) {
            continue;
        }
        if let Some(mass) = item.data.as_ref().and_then(search_record) {
            return Some(round3(mass));
        }
    }
    None
}

fn search_record(value: &Value) -> Option<f64> {
    match value {
        Value::Object(record) => {
            if let Some(mass) = direct_mass(record) {
                return Some(mass);
            }
            for key in MATERIAL_GROUP_KEYS {
                if let Some(Value::Object(group)) = record.get(key) {
                    if let Some(mass) = direct_mass(group) {
                        return Some(mass);
                    }
                }
            }
            for child in record.values() {
                if let Value::Object(group) = child {
                    if let Some(mass) = direct_mass(group) {
                        return Some(mass);
                    }
                }
            }
            record.values().find_map(search_record)
        }
        Value::Array(items) => items.iter().find_map(search_record),
        _ => None,
    }
}

fn direct_mass(record: &serde_json::Map<String, Value>) -> Option<f64> {
    MASS_KEYS
        .iter()
        .find_map(|key| record.get(*key).and_then(Value::as_f64))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data_item(data: Value) -> ContentItem {
        ContentItem {
            format: Some(DATA_FORMAT.to_string()),
            data: Some(data),
        }
    }

    #[test]
    fn direct_mass_field() {
        let content = [data_item(json!({ "mass": 4.25 }))];
        assert_eq!(extract_weight(&content), Some(4.25));
    }

    #[test]
    fn mass_under_material_group() {
        let content = [data_item(json!({ "material": { "mass": 2.5 } }))];
        assert_eq!(extract_weight(&content), Some(2.5));
    }

    #[test]
    fn material_group_wins_over_generic_key() {
        // "alpha" sorts before "material", so only the explicit group
        // priority keeps this deterministic at 2.0.
        let content = [data_item(json!({
            "alpha": { "mass": 5.0 },
            "material": { "mass": 2.0 },
        }))];
        assert_eq!(extract_weight(&content), Some(2.0));
    }

    #[test]
    fn generic_one_level_fallback() {
        let content = [data_item(json!({ "anything": { "mass": 7.0 } }))];
        assert_eq!(extract_weight(&content), Some(7.0));
    }

    #[test]
    fn rounds_to_three_decimals_at_depth() {
        let content = [data_item(json!({
            "a": { "b": { "c": { "mass": 11.260_800_155_639_647 } } },
        }))];
        assert_eq!(extract_weight(&content), Some(11.261));
    }

    #[test]
    fn finds_mass_inside_arrays() {
        let content = [data_item(json!({
            "groups": [{ "filler": 1 }, { "material": { "mass": 3.2 } }],
        }))];
        assert_eq!(extract_weight(&content), Some(3.2));
    }

    #[test]
    fn ignores_items_without_data_format() {
        let content = [ContentItem {
            format: Some("glb".to_string()),
            data: Some(json!({ "mass": 9.9 })),
        }];
        assert_eq!(extract_weight(&content), None);
    }

    #[test]
    fn first_matching_item_wins() {
        let content = [
            data_item(json!({ "mass": 1.0 })),
            data_item(json!({ "mass": 2.0 })),
        ];
        assert_eq!(extract_weight(&content), Some(1.0));
    }

    #[test]
    fn malformed_payloads_are_no_match() {
        let content = [
            data_item(json!("not a record")),
            data_item(json!({ "mass": "not a number" })),
            data_item(json!(null)),
            ContentItem {
                format: Some(DATA_FORMAT.to_string()),
                data: None,
            },
        ];
        assert_eq!(extract_weight(&content), None);
    }

    #[test]
    fn no_match_anywhere_is_none() {
        let content = [data_item(json!({ "volume": 12.0, "area": { "total": 3.0 } }))];
        assert_eq!(extract_weight(&content), None);
    }

    #[test]
    fn round3_examples() {
        assert_eq!(round3(9.4999), 9.5);
        assert_eq!(round3(11.260_800_155_639_647), 11.261);
        assert_eq!(round3(2.0), 2.0);
    }
}
