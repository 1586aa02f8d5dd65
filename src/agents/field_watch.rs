use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error, info, warn};

use crate::checks::field_watch::{check_field, record_field_access, set_watch, JniWatchHost, WatchOutcome, WatchedFieldTable};
use crate::env::{JniEnv, Jvmti};
use crate::error::AgentError;
use crate::sys::{jni, jvmti};
use crate::Agent;

use super::AgentContext;

/// `setfldw001`: watches set with `SetFieldAccessWatch` must produce
/// `FieldAccess` events for exactly the watched field.
///
/// The Java side drives the test through JNI natives: it registers watches,
/// touches fields, then asks for a check of each index.
#[derive(Default)]
pub struct FieldWatchAgent {
    ctx: AgentContext,
    table: WatchedFieldTable,
    access_events: AtomicBool,
}

impl FieldWatchAgent {
    pub fn context(&self) -> &AgentContext {
        &self.ctx
    }

    pub fn table(&self) -> &WatchedFieldTable {
        &self.table
    }

    /// Whether `can_generate_field_access_events` was granted.
    pub fn access_events_granted(&self) -> bool {
        self.access_events.load(Ordering::Acquire)
    }

    fn negotiate_capabilities(&self, jvmti_env: &Jvmti) -> Result<(), AgentError> {
        let potential = jvmti_env
            .get_potential_capabilities()
            .map_err(AgentError::host("GetPotentialCapabilities"))?;

        let mut wanted = jvmti::jvmtiCapabilities::default();
        wanted.set_can_generate_field_access_events(potential.can_generate_field_access_events());
        jvmti_env.add_capabilities(&wanted).map_err(AgentError::host("AddCapabilities"))?;

        let granted = jvmti_env.get_capabilities().map_err(AgentError::host("GetCapabilities"))?;
        debug!("{}", granted);

        if granted.can_generate_field_access_events() {
            self.access_events.store(true, Ordering::Release);
            self.ctx.enable_events(jvmti_env, &[jvmti::JVMTI_EVENT_FIELD_ACCESS])?;
            info!("FieldAccess events enabled");
        } else {
            warn!("FieldAccess watch is not implemented");
        }
        Ok(())
    }

    /// `setWatch(int)`: registers an access watch on field `index`.
    pub fn set_watch(&self, jni_ptr: *mut jni::JNIEnv, index: jni::jint) {
        if let Err(err) = self.install_watch(jni_ptr, index) {
            error!("(SetFieldAccessWatch#{}) {}", index, err);
            self.ctx.status().fail();
        }
    }

    fn install_watch(&self, jni_ptr: *mut jni::JNIEnv, index: jni::jint) -> Result<WatchOutcome, AgentError> {
        let jvmti_env = self.ctx.jvmti()?;
        let jni_env = unsafe { JniEnv::from_raw(jni_ptr) };
        let host = JniWatchHost { jni: &jni_env, jvmti: jvmti_env };
        set_watch(&self.table, &host, index, self.access_events_granted())
    }

    /// `touchfld0()`: watches field `index` of `object`, then reads it
    /// through JNI so the access originates from native code.
    pub fn touch_field(&self, jni_ptr: *mut jni::JNIEnv, object: jni::jobject, index: jni::jint) {
        if let Err(err) = self.install_watch(jni_ptr, index) {
            error!("(SetFieldAccessWatch#{}) {}", index, err);
            self.ctx.status().fail();
            return;
        }

        let readable = self
            .table
            .index(index)
            .ok()
            .and_then(|i| self.table.field(i).map(|f| (i, f)))
            .filter(|(_, f)| !f.is_static && f.signature == "I");
        let Some((i, field)) = readable else {
            self.ctx.fail(&AgentError::Setup(format!("field #{index} is not an instance int field")));
            return;
        };

        if let Some(handle) = self.table.resolved(i) {
            let jni_env = unsafe { JniEnv::from_raw(jni_ptr) };
            let value = jni_env.get_int_field(object, handle.as_raw());
            debug!("{}.{} = {}", field.class, field.name, value);
        }
    }

    /// `check(int, boolean)`: verifies the access recorded for `index`.
    pub fn check(&self, index: jni::jint, expect_watch: bool) {
        self.ctx.record(check_field(&self.table, index, expect_watch, self.access_events_granted()));
    }

    /// `getRes()`: final status code.
    pub fn result(&self) -> jni::jint {
        self.ctx.status().code()
    }
}

impl Agent for FieldWatchAgent {
    fn on_load(&self, vm: *mut jni::JavaVM, options: &str) -> jni::jint {
        let result = self
            .ctx
            .initialize(vm, options)
            .and_then(|jvmti_env| self.negotiate_capabilities(jvmti_env));
        match result {
            Ok(()) => jni::JNI_OK,
            Err(err) => {
                error!("{}", err);
                jni::JNI_ERR
            }
        }
    }

    fn field_access(&self, jvmti_ptr: *mut jvmti::jvmtiEnv, _jni: *mut jni::JNIEnv, _thread: jni::jthread, _method: jni::jmethodID,
                    _location: jvmti::jlocation, field_klass: jni::jclass, _object: jni::jobject, field: jni::jfieldID) {
        let jvmti_env = unsafe { Jvmti::from_raw(jvmti_ptr) };
        if let Err(err) = record_field_access(&self.table, &jvmti_env, field_klass, field) {
            self.ctx.fail(&err);
        }
    }
}
