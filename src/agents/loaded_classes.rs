use log::{error, info};

use crate::checks::loaded_classes::{check_loaded_classes, LoadedClassExpectations};
use crate::report::Phase;
use crate::sys::{jni, jvmti};
use crate::Agent;

use super::AgentContext;

/// `loadedclss002`: once the debuggee has loaded its classes,
/// `GetLoadedClasses` must report them along with the primitive array classes.
#[derive(Default)]
pub struct LoadedClassesAgent {
    ctx: AgentContext,
    expectations: LoadedClassExpectations,
}

impl LoadedClassesAgent {
    pub fn context(&self) -> &AgentContext {
        &self.ctx
    }
}

impl Agent for LoadedClassesAgent {
    fn on_load(&self, vm: *mut jni::JavaVM, options: &str) -> jni::jint {
        let result = self
            .ctx
            .initialize(vm, options)
            .and_then(|jvmti_env| self.ctx.enable_events(jvmti_env, &[jvmti::JVMTI_EVENT_VM_INIT, jvmti::JVMTI_EVENT_VM_DEATH]));
        match result {
            Ok(()) => jni::JNI_OK,
            Err(err) => {
                error!("{}", err);
                jni::JNI_ERR
            }
        }
    }

    fn vm_init(&self, jni_env: *mut jni::JNIEnv, _thread: jni::jthread) {
        self.ctx.start_live_phase(jni_env, "loadedclss002-agent");
    }

    fn vm_death(&self, _jni: *mut jni::JNIEnv) {
        self.ctx.finish();
    }

    fn agent_thread(&self, _jni: *mut jni::JNIEnv) {
        self.ctx.run_live_phase(|jvmti_env| {
            info!(">>> Testcase #1: check loaded classes");
            check_loaded_classes(jvmti_env, Phase::Live, &self.expectations)
        });
    }
}
