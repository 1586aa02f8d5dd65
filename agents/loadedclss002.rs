//! `loadedclss002`: checks `GetLoadedClasses` once the debuggee is ready.
//!
//! ```bash
//! java -agentpath:libloadedclss002.so=-verbose nsk.jvmti.GetLoadedClasses.loadedclss002
//! ```

use jvmti_conformance::agents::LoadedClassesAgent;
use jvmti_conformance::{export_agent, export_debuggee_sync};

export_agent!(LoadedClassesAgent);
export_debuggee_sync!(agent_instance().map(|agent| agent.context()));
