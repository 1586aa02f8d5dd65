use log::{error, info};

use crate::checks::extension_events::{check_extension_events, ExtensionEventRules};
use crate::report::Phase;
use crate::sys::{jni, jvmti};
use crate::Agent;

use super::AgentContext;

/// `extevents001`: `GetExtensionEvents` must return well-formed descriptors
/// both during `Agent_OnLoad` and in the live phase.
#[derive(Default)]
pub struct ExtensionEventsAgent {
    ctx: AgentContext,
    rules: ExtensionEventRules,
}

impl ExtensionEventsAgent {
    pub fn context(&self) -> &AgentContext {
        &self.ctx
    }
}

impl Agent for ExtensionEventsAgent {
    fn on_load(&self, vm: *mut jni::JavaVM, options: &str) -> jni::jint {
        let jvmti_env = match self.ctx.initialize(vm, options) {
            Ok(jvmti_env) => jvmti_env,
            Err(err) => {
                error!("{}", err);
                return jni::JNI_ERR;
            }
        };

        // OnAttach lands here too, with the VM already live.
        let phase = Phase::reported(jvmti_env.get_phase(), Phase::OnLoad);
        info!("Checking extension events in {} phase", phase);
        self.ctx.record(check_extension_events(jvmti_env, phase, &self.rules));

        if let Err(err) = self.ctx.enable_events(jvmti_env, &[jvmti::JVMTI_EVENT_VM_INIT, jvmti::JVMTI_EVENT_VM_DEATH]) {
            error!("{}", err);
            return jni::JNI_ERR;
        }
        jni::JNI_OK
    }

    fn vm_init(&self, jni_env: *mut jni::JNIEnv, _thread: jni::jthread) {
        self.ctx.start_live_phase(jni_env, "extevents001-agent");
    }

    fn vm_death(&self, _jni: *mut jni::JNIEnv) {
        self.ctx.finish();
    }

    fn agent_thread(&self, _jni: *mut jni::JNIEnv) {
        self.ctx.run_live_phase(|jvmti_env| {
            let phase = Phase::reported(jvmti_env.get_phase(), Phase::Live);
            info!("Checking extension events in {} phase", phase);
            check_extension_events(jvmti_env, phase, &self.rules)
        });
    }
}
