//! # jvmti-conformance
//!
//! JVMTI conformance agents written in Rust.
//!
//! Each agent is a shared library the JVM loads with `-agentlib:<name>`. It
//! calls one JVMTI function, walks what comes back, and reports every
//! structural problem it finds:
//!
//! | Agent           | Checks                                                   |
//! |-----------------|----------------------------------------------------------|
//! | `extevents001`  | `GetExtensionEvents` descriptors, OnLoad and live phase   |
//! | `loadedclss002` | `GetLoadedClasses` contains the expected classes          |
//! | `setfldw001`    | `SetFieldAccessWatch` and `FieldAccess` event attribution |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        agents/*.rs  (cdylib: export_agent!, natives)     │
//! ├─────────────────────────────────────────────────────────┤
//! │    agents::*  Agent impls sharing an AgentContext        │
//! │    sync, agent_thread, options, logging, status          │
//! ├─────────────────────────────────────────────────────────┤
//! │    checks::*  validators behind small host traits        │
//! │    snapshot, report, signature                           │
//! ├─────────────────────────────────────────────────────────┤
//! │    env::Jvmti, env::JniEnv  Result-returning wrappers    │
//! ├─────────────────────────────────────────────────────────┤
//! │    sys::jni, sys::jvmti  raw FFI tables                  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Writing an agent
//!
//! ```rust,ignore
//! use jvmti_conformance::prelude::*;
//!
//! #[derive(Default)]
//! struct MyAgent {
//!     ctx: AgentContext,
//! }
//!
//! impl Agent for MyAgent {
//!     fn on_load(&self, vm: *mut jni::JavaVM, options: &str) -> jni::jint {
//!         match self.ctx.initialize(vm, options) {
//!             Ok(_) => jni::JNI_OK,
//!             Err(_) => jni::JNI_ERR,
//!         }
//!     }
//! }
//!
//! export_agent!(MyAgent);
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`sys::jni`] | Raw JNI types and vtable (for FFI) |
//! | [`sys::jvmti`] | Raw JVMTI types, vtable, capabilities, events |
//! | [`env`] | Wrappers around the raw environment pointers |
//! | [`snapshot`] | Ownership of host-allocated buffers |
//! | [`checks`] | The three validators |
//! | [`agents`] | Agent implementations |

use std::sync::OnceLock;

pub mod sys;
pub mod env;
pub mod prelude;

// Implementation modules (use `env` module for the public API)
#[doc(hidden)]
pub mod jvmti_wrapper;
#[doc(hidden)]
pub mod jni_wrapper;

pub mod agent_thread;
pub mod agents;
pub mod checks;
pub mod error;
pub mod logging;
pub mod options;
pub mod report;
pub mod signature;
pub mod snapshot;
pub mod status;
pub mod sync;

use sys::{jni, jvmti};

/// A JVMTI agent.
///
/// Only `on_load` is required; every event hook defaults to a no-op. Hooks
/// are called from arbitrary JVM threads, so state needs interior
/// mutability.
pub trait Agent: Sync + Send {
    /// Called from `Agent_OnLoad`. Return `JNI_OK` or `JNI_ERR`.
    fn on_load(&self, vm: *mut jni::JavaVM, options: &str) -> jni::jint;

    /// Called from `Agent_OnAttach` when loaded into a running VM.
    fn on_attach(&self, vm: *mut jni::JavaVM, options: &str) -> jni::jint {
        self.on_load(vm, options)
    }

    /// Called from `Agent_OnUnload`.
    fn on_unload(&self) {}

    // =========================================================================
    // VM lifecycle
    // =========================================================================

    /// The VM finished initialization. Live-phase work starts here.
    fn vm_init(&self, _jni: *mut jni::JNIEnv, _thread: jni::jthread) {}

    fn vm_death(&self, _jni: *mut jni::JNIEnv) {}

    /// Body of the agent thread started with [`agent_thread::start_agent_thread`].
    fn agent_thread(&self, _jni: *mut jni::JNIEnv) {}

    // =========================================================================
    // Field watches
    // =========================================================================

    /// A watched field was read. Requires `can_generate_field_access_events`.
    #[allow(clippy::too_many_arguments)]
    fn field_access(&self, _jvmti: *mut jvmti::jvmtiEnv, _jni: *mut jni::JNIEnv, _thread: jni::jthread, _method: jni::jmethodID,
                    _location: jvmti::jlocation, _field_klass: jni::jclass, _object: jni::jobject, _field: jni::jfieldID) {}
}

/// The agent instance the C callbacks forward to.
pub static GLOBAL_AGENT: OnceLock<&'static dyn Agent> = OnceLock::new();

/// Registers the agent (called by [`export_agent!`]). Fails if another
/// agent is already registered in this library.
pub fn set_global_agent(agent: &'static dyn Agent) -> Result<(), ()> {
    GLOBAL_AGENT.set(agent).map_err(|_| ())
}

unsafe extern "system" fn trampoline_vm_init(_env: *mut jvmti::jvmtiEnv, jni: *mut jni::JNIEnv, thread: jni::jthread) {
    if let Some(agent) = GLOBAL_AGENT.get() { agent.vm_init(jni, thread); }
}

unsafe extern "system" fn trampoline_vm_death(_env: *mut jvmti::jvmtiEnv, jni: *mut jni::JNIEnv) {
    if let Some(agent) = GLOBAL_AGENT.get() { agent.vm_death(jni); }
}

unsafe extern "system" fn trampoline_field_access(
    env: *mut jvmti::jvmtiEnv, jni: *mut jni::JNIEnv, thread: jni::jthread, method: jni::jmethodID,
    location: jvmti::jlocation, field_klass: jni::jclass, object: jni::jobject, field: jni::jfieldID,
) {
    if let Some(agent) = GLOBAL_AGENT.get() {
        agent.field_access(env, jni, thread, method, location, field_klass, object, field);
    }
}

pub(crate) unsafe extern "system" fn trampoline_agent_thread(
    _env: *mut jvmti::jvmtiEnv, jni: *mut jni::JNIEnv, _arg: *mut std::os::raw::c_void,
) {
    if let Some(agent) = GLOBAL_AGENT.get() { agent.agent_thread(jni); }
}

/// Callback table wiring `VMInit`, `VMDeath` and `FieldAccess` to the
/// registered [`Agent`]. Events still have to be enabled one by one.
pub fn get_default_callbacks() -> jvmti::jvmtiEventCallbacks {
    let mut callbacks = jvmti::jvmtiEventCallbacks::default();
    callbacks.VMInit = Some(trampoline_vm_init);
    callbacks.VMDeath = Some(trampoline_vm_death);
    callbacks.FieldAccess = Some(trampoline_field_access);
    callbacks
}

/// Exports `Agent_OnLoad`, `Agent_OnAttach` and `Agent_OnUnload` for an
/// agent type implementing [`Agent`] and `Default`.
///
/// Also defines `agent_instance()`, which the library's own JNI natives use
/// to reach the agent.
///
/// # Return Values
///
/// `Agent_OnLoad` returns whatever `on_load` returns:
/// - [`jni::JNI_OK`] (0) on success - JVM continues loading
/// - [`jni::JNI_ERR`] (-1) on failure - JVM aborts startup with an error
#[macro_export]
macro_rules! export_agent {
    ($agent_type:ty) => {
        static AGENT_INSTANCE: std::sync::OnceLock<$agent_type> = std::sync::OnceLock::new();

        /// The agent, once the JVM has loaded this library.
        pub fn agent_instance() -> Option<&'static $agent_type> {
            AGENT_INSTANCE.get()
        }

        fn register_agent() -> &'static $agent_type {
            let agent: &'static $agent_type = AGENT_INSTANCE.get_or_init(<$agent_type>::default);
            // OnLoad followed by OnAttach in one process keeps the first registration.
            let _ = $crate::set_global_agent(agent);
            agent
        }

        #[no_mangle]
        pub unsafe extern "system" fn Agent_OnLoad(
            vm: *mut $crate::sys::jni::JavaVM,
            options: *mut std::ffi::c_char,
            _reserved: *mut std::ffi::c_void,
        ) -> $crate::sys::jni::jint {
            let options = $crate::options::options_from_raw(options);
            $crate::Agent::on_load(register_agent(), vm, &options)
        }

        #[no_mangle]
        pub unsafe extern "system" fn Agent_OnAttach(
            vm: *mut $crate::sys::jni::JavaVM,
            options: *mut std::ffi::c_char,
            _reserved: *mut std::ffi::c_void,
        ) -> $crate::sys::jni::jint {
            let options = $crate::options::options_from_raw(options);
            $crate::Agent::on_attach(register_agent(), vm, &options)
        }

        #[no_mangle]
        pub unsafe extern "system" fn Agent_OnUnload(_vm: *mut $crate::sys::jni::JavaVM) {
            if let Some(agent) = AGENT_INSTANCE.get() {
                $crate::Agent::on_unload(agent);
            }
        }
    };
}

/// Exports `nsk.share.jvmti.DebugeeClass.checkStatus(int)`, the debuggee
/// half of the sync point.
///
/// Takes an expression evaluating to `Option<&AgentContext>`.
#[macro_export]
macro_rules! export_debuggee_sync {
    ($context:expr) => {
        #[no_mangle]
        pub unsafe extern "system" fn Java_nsk_share_jvmti_DebugeeClass_checkStatus(
            _env: *mut $crate::sys::jni::JNIEnv,
            _cls: $crate::sys::jni::jclass,
            status: $crate::sys::jni::jint,
        ) -> $crate::sys::jni::jint {
            let context: Option<&$crate::agents::AgentContext> = $context;
            match context {
                Some(ctx) => ctx.check_status(status),
                None => $crate::status::STATUS_FAILED,
            }
        }
    };
}
