//! Session lifecycle: establishes the remote session, issues customization
//! requests with last-request-wins staleness, and reconciles output versions
//! against what consumers have already applied.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::client::{SessionBackend, SessionHandle};
use crate::error::SyncError;
use crate::events::SessionEmitter;
use crate::model::{Output, ParameterSchema, ParameterValues};
use crate::weight::{extract_weight, round3};

/// Per-generation session state. Destroyed and rebuilt on re-initialization.
struct SessionState {
    session_id: String,
    handle: Arc<dyn SessionHandle>,
    parameters: IndexMap<String, ParameterSchema>,
    outputs: IndexMap<String, Output>,
    /// Version last handed to consumers, per output id.
    loaded_output_versions: HashMap<String, String>,
    current_weight: Option<f64>,
}

enum Notification {
    Weight(f64),
    Output(Output, Option<Output>),
}

/// Owns the remote session and keeps the local mirror consistent with it.
///
/// All state mutation happens behind one mutex that is never held across an
/// await point; concurrent `customize_session` calls are resolved by the
/// sequence counter: only the result of the last issued request is allowed
/// to mutate state.
pub struct SessionManager {
    backend: Arc<dyn SessionBackend>,
    emitter: Arc<dyn SessionEmitter>,
    ticket: String,
    model_view_url: String,
    init_timeout: Option<Duration>,
    /// Arbiter of "most recent intent": the number of the latest issued
    /// customization. Only ever increases.
    customization_counter: AtomicU64,
    state: Mutex<Option<SessionState>>,
}

impl SessionManager {
    pub fn new(
        backend: Arc<dyn SessionBackend>,
        emitter: Arc<dyn SessionEmitter>,
        ticket: impl Into<String>,
        model_view_url: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            emitter,
            ticket: ticket.into(),
            model_view_url: model_view_url.into(),
            init_timeout: None,
            customization_counter: AtomicU64::new(0),
            state: Mutex::new(None),
        }
    }

    /// Bound `init` by `timeout`. The caller is expected to fall back to a
    /// static control set when initialization does not complete in time.
    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = Some(timeout);
        self
    }

    /// Establish the remote session, fetch schema and initial outputs, and
    /// run a forced reconciliation pass so consumers see every output once.
    ///
    /// On failure the manager holds no session and must be re-initialized
    /// before use. Re-initializing over a live session rebuilds the state
    /// from scratch (a fresh generation).
    pub async fn init(&self) -> Result<(), SyncError> {
        // Any previous generation is gone the moment re-initialization
        // starts; a failed handshake must not leave a stale session behind.
        self.teardown();

        let handshake = self.backend.create_session(&self.ticket, &self.model_view_url);
        let result = match self.init_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, handshake).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(SyncError::Timeout {
                        operation: "create_session".to_string(),
                        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    })
                }
            },
            None => handshake.await,
        };
        let (snapshot, handle) = result.map_err(|e| SyncError::SessionInit {
            message: e.to_string(),
        })?;
        debug!(
            session_id = %snapshot.session_id,
            parameters = snapshot.parameters.len(),
            outputs = snapshot.outputs.len(),
            "session established"
        );

        {
            let mut guard = self.state.lock();
            *guard = Some(SessionState {
                session_id: snapshot.session_id,
                handle,
                parameters: snapshot.parameters,
                outputs: snapshot.outputs,
                loaded_output_versions: HashMap::new(),
                current_weight: None,
            });
        }
        self.reconcile(true);
        Ok(())
    }

    /// Submit a full parameter value snapshot to the remote session.
    ///
    /// The call gets the next sequence number at issuance. If a newer call
    /// was issued by the time the response arrives, the result is discarded
    /// without error; nothing cancels the in-flight network call, but only
    /// the last issued request may mutate state. A failed call does not
    /// block subsequent calls.
    pub async fn customize_session(&self, values: ParameterValues) -> Result<(), SyncError> {
        let sequence = self.customization_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = {
            let guard = self.state.lock();
            guard
                .as_ref()
                .map(|state| Arc::clone(&state.handle))
                .ok_or_else(|| SyncError::Customization {
                    message: "no active session".to_string(),
                })?
        };

        debug!(sequence, "issuing customization request");
        let outputs = handle
            .customize(&values)
            .await
            .map_err(|e| SyncError::Customization {
                message: e.to_string(),
            })?;

        if self.customization_counter.load(Ordering::SeqCst) != sequence {
            debug!(sequence, "customization superseded, discarding result");
            return Ok(());
        }

        {
            let mut guard = self.state.lock();
            let Some(state) = guard.as_mut() else {
                debug!(sequence, "session torn down mid-flight, discarding result");
                return Ok(());
            };
            state.outputs = outputs;
        }
        self.reconcile(false);
        Ok(())
    }

    /// Manual weight override. Rounds to 3 decimal places, overwrites the
    /// current weight, and notifies synchronously; it always wins over any
    /// in-flight extraction that has not yet resolved.
    pub fn set_weight(&self, value: f64) {
        let rounded = round3(value);
        {
            let mut guard = self.state.lock();
            let Some(state) = guard.as_mut() else {
                warn!(weight = rounded, "set_weight ignored: no active session");
                return;
            };
            state.current_weight = Some(rounded);
        }
        self.emitter.weight_changed(rounded);
    }

    /// Current parameter schema, or `None` before a successful `init`.
    pub fn parameters(&self) -> Option<IndexMap<String, ParameterSchema>> {
        self.state.lock().as_ref().map(|state| state.parameters.clone())
    }

    /// Last extracted or manually set weight. Never reverts to `None`
    /// except through `teardown`.
    pub fn weight(&self) -> Option<f64> {
        self.state.lock().as_ref().and_then(|state| state.current_weight)
    }

    pub fn session_id(&self) -> Option<String> {
        self.state.lock().as_ref().map(|state| state.session_id.clone())
    }

    /// Re-run reconciliation with the version gate bypassed: every output is
    /// handed to consumers again, state ends up unchanged.
    pub fn force_refresh(&self) {
        self.reconcile(true);
    }

    /// Drop the session state entirely. The only operation that clears the
    /// weight. A subsequent `init` starts a fresh generation.
    pub fn teardown(&self) {
        *self.state.lock() = None;
    }

    /// Compare output versions and notify consumers of changes.
    ///
    /// Weight extraction runs on every pass, decoupled from the version
    /// gate: the payload carrying the mass figure can change independently
    /// of the version token downstream consumers care about.
    fn reconcile(&self, force_update: bool) {
        let mut notifications = Vec::new();
        {
            let mut guard = self.state.lock();
            let Some(state) = guard.as_mut() else { return };

            let output_ids: Vec<String> = state.outputs.keys().cloned().collect();
            for output_id in output_ids {
                let Some(output) = state.outputs.get(&output_id).cloned() else {
                    continue;
                };

                if let Some(weight) = extract_weight(&output.content) {
                    state.current_weight = Some(weight);
                    notifications.push(Notification::Weight(weight));
                }

                let previous = state.loaded_output_versions.get(&output_id);
                if force_update || previous != Some(&output.version) {
                    state
                        .loaded_output_versions
                        .insert(output_id, output.version.clone());
                    let material_output = output
                        .material
                        .as_ref()
                        .and_then(|id| state.outputs.get(id))
                        .cloned();
                    notifications.push(Notification::Output(output, material_output));
                }
            }
        }

        // Emit outside the lock so handlers can read back into the manager.
        for notification in notifications {
            match notification {
                Notification::Weight(weight) => self.emitter.weight_changed(weight),
                Notification::Output(output, material_output) => self
                    .emitter
                    .output_updated(&output, material_output.as_ref()),
            }
        }
    }
}
