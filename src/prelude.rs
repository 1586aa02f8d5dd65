//! Common imports for building conformance agents.

pub use crate::agents::AgentContext;
pub use crate::env::{JniEnv, Jvmti, LocalRef};
pub use crate::error::AgentError;
pub use crate::export_agent;
pub use crate::export_debuggee_sync;
pub use crate::get_default_callbacks;
pub use crate::report::{Phase, Report};
pub use crate::sys::{jni, jvmti};
pub use crate::Agent;
