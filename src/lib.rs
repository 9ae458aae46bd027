//! Client-side synchronization core for a remote parametric-model service.
//!
//! Keeps a local mirror of server-defined parameters and versioned outputs,
//! applies last-request-wins semantics to concurrent customization calls,
//! derives a physical weight from semi-structured output payloads, and
//! produces renderer-agnostic control descriptors for any host UI.

pub mod client;
pub mod controls;
pub mod error;
pub mod events;
pub mod fallback;
pub mod model;
pub mod paths;
pub mod session;
pub mod settings;
pub mod weight;

pub use controls::{ControlDescriptor, ControlEvent, ControlKind, ControlTree, ControlValue};
pub use error::SyncError;
pub use events::{NoopSessionEmitter, SessionEmitter};
pub use model::{ContentItem, Output, ParamType, ParameterSchema, ParameterValues};
pub use session::SessionManager;
pub use weight::extract_weight;
