//! `setfldw001`: `SetFieldAccessWatch` and `FieldAccess` attribution.
//!
//! The debuggee `nsk.jvmti.SetFieldAccessWatch.setfldw001` calls the natives
//! below; every one of them reports through the agent's status.

use jvmti_conformance::agents::FieldWatchAgent;
use jvmti_conformance::export_agent;
use jvmti_conformance::status::STATUS_FAILED;
use jvmti_conformance::sys::jni;

export_agent!(FieldWatchAgent);

#[no_mangle]
pub unsafe extern "system" fn Java_nsk_jvmti_SetFieldAccessWatch_setfldw001_setWatch(
    env: *mut jni::JNIEnv,
    _cls: jni::jclass,
    fld_ind: jni::jint,
) {
    if let Some(agent) = agent_instance() {
        agent.set_watch(env, fld_ind);
    }
}

#[no_mangle]
pub unsafe extern "system" fn Java_nsk_jvmti_SetFieldAccessWatch_setfldw001_touchfld0(
    env: *mut jni::JNIEnv,
    obj: jni::jobject,
) {
    if let Some(agent) = agent_instance() {
        agent.touch_field(env, obj, 0);
    }
}

#[no_mangle]
pub unsafe extern "system" fn Java_nsk_jvmti_SetFieldAccessWatch_setfldw001_check(
    _env: *mut jni::JNIEnv,
    _cls: jni::jclass,
    fld_ind: jni::jint,
    flag: jni::jboolean,
) {
    if let Some(agent) = agent_instance() {
        agent.check(fld_ind, flag != jni::JNI_FALSE);
    }
}

#[no_mangle]
pub unsafe extern "system" fn Java_nsk_jvmti_SetFieldAccessWatch_setfldw001_getRes(
    _env: *mut jni::JNIEnv,
    _cls: jni::jclass,
) -> jni::jint {
    agent_instance().map_or(STATUS_FAILED, |agent| agent.result())
}
