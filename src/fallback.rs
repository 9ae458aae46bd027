//! Built-in control set used when no remote session can be established.
//!
//! Mirrors the shape of a server schema so the same control tree and value
//! map machinery works offline, and estimates the piece weight locally in
//! place of the remote extraction.

use indexmap::IndexMap;

use crate::model::{ParamType, ParameterSchema, ParameterValues};
use crate::weight::round3;

/// Grams for the base ring before any modifiers.
const BASE_WEIGHT: f64 = 3.2;
/// Added grams per stone beyond the first.
const WEIGHT_PER_STONE: f64 = 0.3;
/// Added grams per size step above the default size.
const WEIGHT_PER_SIZE_STEP: f64 = 0.1;
const DEFAULT_SIZE: f64 = 18.0;

/// Added grams per metal choice, indexed like the `metal` choices list.
const METAL_WEIGHT_MODIFIERS: [f64; 4] = [0.0, 0.35, 0.4, 0.38];
/// Added grams per purity choice, indexed like the `purity` choices list.
const PURITY_WEIGHT_MODIFIERS: [f64; 2] = [0.0, 0.25];

/// The static product catalog: one schema entry per configurable aspect,
/// in display order.
pub fn catalog() -> IndexMap<String, ParameterSchema> {
    [
        choice_parameter(
            "metal",
            "Metal",
            "Metal type and color",
            &["Silver 925", "Yellow gold", "White gold", "Rose gold"],
        ),
        choice_parameter(
            "purity",
            "Purity",
            "Share of pure metal in the alloy",
            &["585", "750"],
        ),
        int_parameter("stones", "Stones", "Number of stones on the band", 1.0, 7.0, "3"),
        int_parameter("size", "Size", "Inner diameter in millimeters", 15.0, 22.0, "18"),
        choice_parameter(
            "comfort",
            "Comfort profile",
            "Inner band profile",
            &["Standard", "Comfort fit"],
        ),
    ]
    .into_iter()
    .map(|parameter| (parameter.id.clone(), parameter))
    .collect()
}

/// Estimate the piece weight from a value snapshot, mirroring what the
/// remote computation would report. Choice values are the committed choice
/// indices; unparseable values fall back to no contribution.
pub fn estimate_weight(values: &ParameterValues) -> f64 {
    let mut weight = BASE_WEIGHT;
    weight += choice_modifier(values, "metal", &METAL_WEIGHT_MODIFIERS);
    weight += choice_modifier(values, "purity", &PURITY_WEIGHT_MODIFIERS);
    if let Some(stones) = numeric(values, "stones") {
        weight += (stones - 1.0).max(0.0) * WEIGHT_PER_STONE;
    }
    if let Some(size) = numeric(values, "size") {
        weight += (size - DEFAULT_SIZE) * WEIGHT_PER_SIZE_STEP;
    }
    round3(weight)
}

fn numeric(values: &ParameterValues, id: &str) -> Option<f64> {
    values.get(id).and_then(|value| value.parse().ok())
}

fn choice_modifier(values: &ParameterValues, id: &str, modifiers: &[f64]) -> f64 {
    values
        .get(id)
        .and_then(|value| value.parse::<usize>().ok())
        .and_then(|index| modifiers.get(index).copied())
        .unwrap_or(0.0)
}

fn choice_parameter(
    id: &str,
    name: &str,
    description: &str,
    choices: &[&str],
) -> ParameterSchema {
    ParameterSchema {
        id: id.to_string(),
        name: name.to_string(),
        param_type: ParamType::StringList,
        defval: "0".to_string(),
        min: None,
        max: None,
        decimal_places: None,
        choices: Some(choices.iter().map(|choice| (*choice).to_string()).collect()),
        hidden: false,
        description: Some(description.to_string()),
    }
}

fn int_parameter(
    id: &str,
    name: &str,
    description: &str,
    min: f64,
    max: f64,
    defval: &str,
) -> ParameterSchema {
    ParameterSchema {
        id: id.to_string(),
        name: name.to_string(),
        param_type: ParamType::Int,
        defval: defval.to_string(),
        min: Some(min),
        max: Some(max),
        decimal_places: None,
        choices: None,
        hidden: false,
        description: Some(description.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn default_values() -> ParameterValues {
        catalog()
            .values()
            .map(|parameter| (parameter.id.clone(), parameter.defval.clone()))
            .collect()
    }

    #[test]
    fn catalog_covers_every_aspect_once() {
        let catalog = catalog();
        let ids: Vec<&str> = catalog.keys().map(String::as_str).collect();
        assert_eq!(ids, ["metal", "purity", "stones", "size", "comfort"]);
    }

    #[test]
    fn default_configuration_weight() {
        // Base 3.2 plus two extra stones at 0.3 each.
        assert_eq!(estimate_weight(&default_values()), 3.8);
    }

    #[test]
    fn options_and_size_shift_the_estimate() {
        let mut values = default_values();
        values.insert("metal".to_string(), "1".to_string());
        values.insert("purity".to_string(), "1".to_string());
        values.insert("size".to_string(), "20".to_string());
        // 3.2 + 0.35 + 0.25 + 0.6 (stones) + 0.2 (two size steps).
        assert_eq!(estimate_weight(&values), 4.6);
    }

    #[test]
    fn garbage_values_contribute_nothing() {
        let mut values = default_values();
        values.insert("metal".to_string(), "not-a-number".to_string());
        values.insert("stones".to_string(), "??".to_string());
        assert_eq!(estimate_weight(&values), 3.2);
    }

    #[test]
    fn out_of_range_choice_contributes_nothing() {
        let mut values = default_values();
        values.insert("purity".to_string(), "9".to_string());
        assert_eq!(estimate_weight(&values), 3.8);
    }
}
