//! Remote session transport.
//!
//! The session manager talks to the service through the [`SessionBackend`]
//! and [`SessionHandle`] traits so tests and alternate transports can inject
//! their own implementations. [`HttpSessionBackend`] is the production
//! implementation over the service's REST surface.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

use crate::error::SyncError;
use crate::model::{Output, ParameterSchema, ParameterValues};

/// Everything the service reports when a session is established.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSnapshot {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(default)]
    pub parameters: IndexMap<String, ParameterSchema>,
    #[serde(default)]
    pub outputs: IndexMap<String, Output>,
}

/// Injected transport collaborator for establishing remote sessions.
pub trait SessionBackend: Send + Sync {
    /// Establish a session for the model identified by `ticket` and return
    /// the initial snapshot together with a handle for further calls.
    fn create_session<'a>(
        &'a self,
        ticket: &'a str,
        model_view_url: &'a str,
    ) -> BoxFuture<'a, Result<(SessionSnapshot, Arc<dyn SessionHandle>), SyncError>>;
}

/// One established remote session.
pub trait SessionHandle: Send + Sync {
    /// Submit a full parameter value snapshot and return the refreshed
    /// outputs. The call is never cancelled from this side; a slow response
    /// is simply subject to being superseded by the caller.
    fn customize<'a>(
        &'a self,
        values: &'a ParameterValues,
    ) -> BoxFuture<'a, Result<IndexMap<String, Output>, SyncError>>;
}

// ── HTTP implementation ──────────────────────────────────────────

/// REST implementation of the session protocol.
pub struct HttpSessionBackend {
    client: reqwest::Client,
}

struct HttpSessionHandle {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
}

#[derive(Deserialize)]
struct CustomizeResponse {
    #[serde(default)]
    outputs: IndexMap<String, Output>,
}

impl HttpSessionBackend {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpSessionBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBackend for HttpSessionBackend {
    fn create_session<'a>(
        &'a self,
        ticket: &'a str,
        model_view_url: &'a str,
    ) -> BoxFuture<'a, Result<(SessionSnapshot, Arc<dyn SessionHandle>), SyncError>> {
        Box::pin(async move {
            let base_url = model_view_url.trim_end_matches('/').to_string();
            let url = format!("{base_url}/api/v2/session");
            debug!(%url, "creating remote session");

            let response = self
                .client
                .post(&url)
                .json(&serde_json::json!({
                    "ticket": ticket,
                    "modelViewUrl": model_view_url,
                }))
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(SyncError::Api {
                    message: format!("session create failed: HTTP {}", response.status()),
                });
            }

            let snapshot: SessionSnapshot = response.json().await?;
            let handle: Arc<dyn SessionHandle> = Arc::new(HttpSessionHandle {
                client: self.client.clone(),
                base_url,
                session_id: snapshot.session_id.clone(),
            });
            Ok((snapshot, handle))
        })
    }
}

impl SessionHandle for HttpSessionHandle {
    fn customize<'a>(
        &'a self,
        values: &'a ParameterValues,
    ) -> BoxFuture<'a, Result<IndexMap<String, Output>, SyncError>> {
        Box::pin(async move {
            let url = format!("{}/api/v2/session/{}/customize", self.base_url, self.session_id);
            debug!(%url, parameters = values.len(), "submitting customization");

            let response = self
                .client
                .post(&url)
                .json(&serde_json::json!({ "parameters": values }))
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(SyncError::Api {
                    message: format!("customize failed: HTTP {}", response.status()),
                });
            }

            let body: CustomizeResponse = response.json().await?;
            Ok(body.outputs)
        })
    }
}
