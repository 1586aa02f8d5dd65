//! The JVMTI agent thread that runs live-phase checks.
//!
//! Started from `VMInit`: a plain `java.lang.Thread` object is created through
//! JNI and handed to `RunAgentThread`, which runs
//! [`Agent::agent_thread`](crate::Agent::agent_thread) on it.

use std::ptr;

use log::debug;

use crate::env::{JniEnv, Jvmti, LocalRef};
use crate::error::AgentError;
use crate::sys::{jni, jvmti};

pub fn start_agent_thread(jvmti_env: &Jvmti, jni_env: &JniEnv, name: &str) -> Result<(), AgentError> {
    let thread_class = jni_env.find_class("java/lang/Thread").ok_or_else(|| {
        jni_env.clear_pending_exception();
        AgentError::ClassNotFound("java/lang/Thread".to_string())
    })?;
    let thread_class = LocalRef::new(jni_env, thread_class);

    let ctor = jni_env
        .get_method_id(thread_class.get(), "<init>", "(Ljava/lang/String;)V")
        .ok_or_else(|| {
            jni_env.clear_pending_exception();
            AgentError::Setup("java.lang.Thread(String) constructor not found".to_string())
        })?;

    let thread_name = jni_env
        .new_string_utf(name)
        .ok_or_else(|| AgentError::Setup(format!("cannot create thread name {name}")))?;
    let thread_name = LocalRef::new(jni_env, thread_name);

    let args = [jni::jvalue { l: thread_name.get() }];
    let thread = jni_env
        .new_object_a(thread_class.get(), ctor, &args)
        .ok_or_else(|| {
            jni_env.clear_pending_exception();
            AgentError::Setup(format!("cannot create agent thread {name}"))
        })?;
    let thread = LocalRef::new(jni_env, thread);

    jvmti_env
        .run_agent_thread(thread.get(), crate::trampoline_agent_thread, ptr::null(), jvmti::JVMTI_THREAD_NORM_PRIORITY)
        .map_err(AgentError::host("RunAgentThread"))?;
    debug!("Started agent thread {}", name);
    Ok(())
}
