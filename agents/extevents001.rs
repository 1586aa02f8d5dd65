//! `extevents001`: checks `GetExtensionEvents` in the OnLoad and live phases.
//!
//! ```bash
//! java -agentpath:libextevents001.so=waittime=5 nsk.jvmti.GetExtensionEvents.extevents001
//! ```

use jvmti_conformance::agents::ExtensionEventsAgent;
use jvmti_conformance::{export_agent, export_debuggee_sync};

export_agent!(ExtensionEventsAgent);
export_debuggee_sync!(agent_instance().map(|agent| agent.context()));
