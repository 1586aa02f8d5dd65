//! Error kinds that abort a phase or an agent.
//!
//! Structural problems in host data are not errors; they are
//! [`Violation`](crate::report::Violation)s collected in a report.

use thiserror::Error;

use crate::options::OptionsError;
use crate::sync::SyncError;
use crate::sys::jni::jint;
use crate::sys::jvmti::jvmtiError;

#[derive(Debug, Error)]
pub enum AgentError {
    /// A host call failed in a way no check accepts.
    #[error("{call}() unexpected error: {error}")]
    Host { call: &'static str, error: jvmtiError },

    /// The agent could not be set up.
    #[error("agent setup failed: {0}")]
    Setup(String),

    #[error("invalid agent options: {0}")]
    Options(#[from] OptionsError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("no watched field with index {0}")]
    UnknownField(jint),

    #[error("cannot find class {0}")]
    ClassNotFound(String),

    #[error("cannot get field ID for {class}.{name}")]
    FieldNotFound { class: String, name: String },

    #[error("access event for unwatched field {class}.{name}")]
    UnexpectedField { class: String, name: String },
}

impl AgentError {
    /// Adapter for `map_err` on wrapper results.
    pub fn host(call: &'static str) -> impl FnOnce(jvmtiError) -> AgentError {
        move |error| AgentError::Host { call, error }
    }
}
