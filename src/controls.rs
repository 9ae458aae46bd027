//! Renderer-agnostic control descriptors generated from a parameter schema.
//!
//! The tree describes what a host UI should materialize; it knows nothing
//! about any rendering toolkit. The renderer reports user interaction back
//! through [`ControlTree::handle_change`], which coerces the typed value to
//! its canonical string form and commits the entire value map.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use indexmap::IndexMap;
use parking_lot::Mutex;
use schemars::JsonSchema;
use serde::Serialize;
use tracing::warn;
use ts_rs::TS;

use crate::error::SyncError;
use crate::model::{ParamType, ParameterSchema, ParameterValues, SharedValues};

/// Full-snapshot commit callback. Always receives the entire value map;
/// the remote customization call is never a partial patch.
pub type CommitFn =
    Arc<dyn Fn(ParameterValues) -> BoxFuture<'static, Result<(), SyncError>> + Send + Sync>;

/// Side channel for commit failures, which are never surfaced to the
/// renderer's event handler.
pub type CommitErrorFn = Arc<dyn Fn(&SyncError) + Send + Sync>;

/// One selectable entry of a dropdown control.
#[derive(Debug, Clone, Serialize, TS, JsonSchema)]
#[ts(export)]
pub struct DropdownOption {
    pub label: String,
    /// Choice index; the canonical committed value.
    pub value: usize,
}

/// The widget a renderer should materialize for one parameter.
/// Closed union — adding a variant without handling it is a compiler error.
#[derive(Debug, Clone, Serialize, TS, JsonSchema)]
#[ts(export)]
pub enum ControlKind {
    Slider {
        min: Option<f64>,
        max: Option<f64>,
        step: f64,
    },
    Checkbox,
    TextInput,
    ColorPicker,
    Dropdown {
        options: Vec<DropdownOption>,
    },
}

/// Renderer-agnostic description of one interactive input bound to a
/// parameter.
#[derive(Debug, Clone, Serialize, TS, JsonSchema)]
#[ts(export)]
pub struct ControlDescriptor {
    /// Parameter id this control is bound to.
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    pub kind: ControlKind,
}

/// Typed value carried by a control change event.
#[derive(Debug, Clone)]
pub enum ControlValue {
    Number(f64),
    Toggle(bool),
    Text(String),
    /// `#`-prefixed hex color as pickers emit it.
    Color(String),
    /// Index into the dropdown's options.
    Choice(usize),
}

/// One user interaction with a control. `last` marks the final event of a
/// gesture (e.g. releasing a color-picker drag).
#[derive(Debug, Clone)]
pub struct ControlEvent {
    pub value: ControlValue,
    pub last: bool,
}

impl ControlEvent {
    pub fn new(value: ControlValue) -> Self {
        Self { value, last: true }
    }

    /// An intermediate event within a still-running gesture.
    pub fn intermediate(value: ControlValue) -> Self {
        Self { value, last: false }
    }
}

/// The control descriptors for one schema generation plus the shared value
/// map they mutate.
pub struct ControlTree {
    pub label: String,
    pub expanded: bool,
    pub controls: Vec<ControlDescriptor>,
    schema: IndexMap<String, ParameterSchema>,
    values: SharedValues,
    commit: CommitFn,
    on_commit_error: Option<CommitErrorFn>,
}

impl ControlTree {
    /// Build descriptors for every non-hidden parameter and seed the shared
    /// value map with every parameter's default (hidden ones included), so a
    /// commit snapshot always covers the full schema.
    pub fn build(parameters: &IndexMap<String, ParameterSchema>, commit: CommitFn) -> Self {
        let mut values = ParameterValues::new();
        let mut controls = Vec::new();

        for parameter in parameters.values() {
            values.insert(parameter.id.clone(), parameter.defval.clone());
            if parameter.hidden {
                continue;
            }
            controls.push(ControlDescriptor {
                id: parameter.id.clone(),
                label: parameter.name.clone(),
                tooltip: parameter.description.clone(),
                kind: control_kind(parameter),
            });
        }

        Self {
            label: "parameters".to_string(),
            expanded: true,
            controls,
            schema: parameters.clone(),
            values: Arc::new(Mutex::new(values)),
            commit,
            on_commit_error: None,
        }
    }

    /// Route commit failures to `callback` instead of only logging them.
    pub fn with_commit_error_handler(mut self, callback: CommitErrorFn) -> Self {
        self.on_commit_error = Some(callback);
        self
    }

    /// Handle to the shared value map this tree mutates.
    pub fn values_handle(&self) -> SharedValues {
        Arc::clone(&self.values)
    }

    /// Apply one user interaction: coerce the value to canonical string
    /// form, update the shared value map, and commit the full snapshot.
    ///
    /// Commit failures go to the error side channel, never to the caller;
    /// a renderer's event handler has nowhere to put them. An `Err` here
    /// means the event itself did not fit the bound parameter.
    pub async fn handle_change(&self, id: &str, event: ControlEvent) -> Result<(), SyncError> {
        let parameter = self.schema.get(id).ok_or_else(|| SyncError::Validation {
            message: format!("no control bound to parameter '{id}'"),
        })?;
        let Some(canonical) = canonical_value(parameter, &event)? else {
            // Intermediate gesture event; nothing to commit.
            return Ok(());
        };

        let snapshot = {
            let mut values = self.values.lock();
            values.insert(parameter.id.clone(), canonical);
            values.clone()
        };
        if let Err(error) = (self.commit)(snapshot).await {
            warn!(parameter = %parameter.id, %error, "commit failed");
            if let Some(callback) = &self.on_commit_error {
                callback(&error);
            }
        }
        Ok(())
    }
}

fn control_kind(parameter: &ParameterSchema) -> ControlKind {
    match parameter.param_type {
        ParamType::Int => ControlKind::Slider {
            min: parameter.min,
            max: parameter.max,
            step: 1.0,
        },
        ParamType::Even | ParamType::Odd => ControlKind::Slider {
            min: parameter.min,
            max: parameter.max,
            step: 2.0,
        },
        ParamType::Float => ControlKind::Slider {
            min: parameter.min,
            max: parameter.max,
            step: float_step(parameter.decimal_places),
        },
        ParamType::Bool => ControlKind::Checkbox,
        ParamType::String => ControlKind::TextInput,
        ParamType::Color => ControlKind::ColorPicker,
        ParamType::StringList => ControlKind::Dropdown {
            options: parameter
                .choices
                .as_deref()
                .unwrap_or_default()
                .iter()
                .enumerate()
                .map(|(value, label)| DropdownOption {
                    label: label.clone(),
                    value,
                })
                .collect(),
        },
    }
}

fn float_step(decimal_places: Option<usize>) -> f64 {
    match decimal_places {
        #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
        // decimal places are single digits in practice
        Some(places) => 10f64.powi(-(places as i32)),
        None => 1.0,
    }
}

/// Canonical stringified form of an event value for the bound parameter.
/// `Ok(None)` means the event carries nothing to commit (an intermediate
/// color-gesture event).
fn canonical_value(
    parameter: &ParameterSchema,
    event: &ControlEvent,
) -> Result<Option<String>, SyncError> {
    let canonical = match (parameter.param_type, &event.value) {
        (ParamType::Int | ParamType::Even | ParamType::Odd, ControlValue::Number(value)) => {
            #[allow(clippy::cast_possible_truncation)] // slider values are bounded integers
            let rounded = value.round() as i64;
            rounded.to_string()
        }
        (ParamType::Float, ControlValue::Number(value)) => match parameter.decimal_places {
            Some(places) => format!("{value:.places$}"),
            None => value.to_string(),
        },
        (ParamType::Bool, ControlValue::Toggle(value)) => value.to_string(),
        (ParamType::String, ControlValue::Text(value)) => value.clone(),
        (ParamType::Color, ControlValue::Color(value)) => {
            // Color pickers stream intermediate drag events; only the final
            // one of the gesture is committed.
            if !event.last {
                return Ok(None);
            }
            value.replacen('#', "0x", 1)
        }
        (ParamType::StringList, ControlValue::Choice(index)) => {
            let choice_count = parameter.choices.as_ref().map_or(0, Vec::len);
            if *index >= choice_count {
                return Err(SyncError::Validation {
                    message: format!(
                        "choice index {index} out of range for parameter '{}'",
                        parameter.id
                    ),
                });
            }
            index.to_string()
        }
        _ => {
            return Err(SyncError::Validation {
                message: format!(
                    "event value does not match the type of parameter '{}'",
                    parameter.id
                ),
            })
        }
    };
    Ok(Some(canonical))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn schema_entry(id: &str, param_type: ParamType, defval: &str) -> ParameterSchema {
        ParameterSchema {
            id: id.to_string(),
            name: id.to_uppercase(),
            param_type,
            defval: defval.to_string(),
            min: None,
            max: None,
            decimal_places: None,
            choices: None,
            hidden: false,
            description: None,
        }
    }

    fn schema_of(entries: Vec<ParameterSchema>) -> IndexMap<String, ParameterSchema> {
        entries
            .into_iter()
            .map(|entry| (entry.id.clone(), entry))
            .collect()
    }

    /// Commit that records every snapshot it receives.
    fn recording_commit() -> (CommitFn, Arc<Mutex<Vec<ParameterValues>>>) {
        let calls: Arc<Mutex<Vec<ParameterValues>>> = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&calls);
        let commit: CommitFn = Arc::new(move |values| {
            seen.lock().push(values);
            Box::pin(async { Ok(()) })
        });
        (commit, calls)
    }

    #[test]
    fn hidden_parameters_have_no_descriptor_but_keep_their_default() {
        let mut hidden = schema_entry("x", ParamType::Float, "1.5");
        hidden.hidden = true;
        let schema = schema_of(vec![hidden, schema_entry("y", ParamType::Bool, "true")]);

        let (commit, _) = recording_commit();
        let tree = ControlTree::build(&schema, commit);

        assert_eq!(tree.controls.len(), 1);
        assert_eq!(tree.controls.first().map(|c| c.id.as_str()), Some("y"));
        let values = tree.values_handle();
        assert_eq!(values.lock().get("x").map(String::as_str), Some("1.5"));
    }

    #[test]
    fn step_derivation_per_type() {
        let mut float = schema_entry("f", ParamType::Float, "0.0");
        float.decimal_places = Some(1);
        let schema = schema_of(vec![
            schema_entry("i", ParamType::Int, "0"),
            schema_entry("e", ParamType::Even, "0"),
            float,
        ]);
        let (commit, _) = recording_commit();
        let tree = ControlTree::build(&schema, commit);

        let steps: Vec<f64> = tree
            .controls
            .iter()
            .filter_map(|control| match control.kind {
                ControlKind::Slider { step, .. } => Some(step),
                _ => None,
            })
            .collect();
        assert_eq!(steps, vec![1.0, 2.0, 0.1]);
    }

    #[tokio::test]
    async fn change_commits_full_snapshot_with_canonical_float() {
        let mut a = schema_entry("a", ParamType::Float, "3.0");
        a.decimal_places = Some(1);
        let schema = schema_of(vec![a, schema_entry("b", ParamType::String, "base")]);

        let (commit, calls) = recording_commit();
        let tree = ControlTree::build(&schema, commit);
        tree.handle_change("a", ControlEvent::new(ControlValue::Number(7.3)))
            .await
            .unwrap();

        let calls = calls.lock();
        assert_eq!(calls.len(), 1);
        let snapshot = calls.first().unwrap();
        assert_eq!(snapshot.get("a").map(String::as_str), Some("7.3"));
        assert_eq!(snapshot.get("b").map(String::as_str), Some("base"));
    }

    #[tokio::test]
    async fn color_commits_only_on_the_final_gesture_event() {
        let schema = schema_of(vec![schema_entry("c", ParamType::Color, "0x000000")]);
        let (commit, calls) = recording_commit();
        let tree = ControlTree::build(&schema, commit);

        for hex in ["#110000", "#220000"] {
            tree.handle_change(
                "c",
                ControlEvent::intermediate(ControlValue::Color(hex.to_string())),
            )
            .await
            .unwrap();
        }
        tree.handle_change(
            "c",
            ControlEvent::new(ControlValue::Color("#ff0000".to_string())),
        )
        .await
        .unwrap();

        let calls = calls.lock();
        assert_eq!(calls.len(), 1);
        let snapshot = calls.first().unwrap();
        assert_eq!(snapshot.get("c").map(String::as_str), Some("0xff0000"));
    }

    #[tokio::test]
    async fn dropdown_commits_choice_index() {
        let mut list = schema_entry("metal", ParamType::StringList, "0");
        list.choices = Some(vec!["Silver".to_string(), "Gold".to_string()]);
        let schema = schema_of(vec![list]);
        let (commit, calls) = recording_commit();
        let tree = ControlTree::build(&schema, commit);

        tree.handle_change("metal", ControlEvent::new(ControlValue::Choice(1)))
            .await
            .unwrap();
        assert_eq!(
            calls.lock().first().unwrap().get("metal").map(String::as_str),
            Some("1")
        );

        let out_of_range = tree
            .handle_change("metal", ControlEvent::new(ControlValue::Choice(5)))
            .await;
        assert!(matches!(out_of_range, Err(SyncError::Validation { .. })));
    }

    #[tokio::test]
    async fn mismatched_event_is_rejected_before_any_mutation() {
        let schema = schema_of(vec![schema_entry("b", ParamType::Bool, "false")]);
        let (commit, calls) = recording_commit();
        let tree = ControlTree::build(&schema, commit);

        let result = tree
            .handle_change("b", ControlEvent::new(ControlValue::Number(1.0)))
            .await;
        assert!(matches!(result, Err(SyncError::Validation { .. })));
        assert!(calls.lock().is_empty());
        assert_eq!(
            tree.values_handle().lock().get("b").map(String::as_str),
            Some("false")
        );
    }

    #[tokio::test]
    async fn commit_failure_goes_to_the_side_channel() {
        let schema = schema_of(vec![schema_entry("s", ParamType::String, "")]);
        let commit: CommitFn = Arc::new(|_| {
            Box::pin(async {
                Err(SyncError::Customization {
                    message: "remote rejected".to_string(),
                })
            })
        });
        let reported = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&reported);
        let tree = ControlTree::build(&schema, commit)
            .with_commit_error_handler(Arc::new(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            }));

        let result = tree
            .handle_change("s", ControlEvent::new(ControlValue::Text("hi".to_string())))
            .await;
        assert!(result.is_ok());
        assert_eq!(reported.load(Ordering::SeqCst), 1);
    }
}
