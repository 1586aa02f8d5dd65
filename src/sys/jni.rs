// jvmti-conformance/src/sys/jni.rs
//
// JNI (Java Native Interface) types and function tables.
//
// Only the functions the agents call are typed. Every other slot is kept
// as an opaque pointer so that the offsets of the typed entries match
// jni.h exactly. Slot numbers are the zero-based vtable indices.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use std::ffi::c_void;
use std::os::raw::c_char;

// =============================================================================
// Primitive Types
// =============================================================================

pub type jint = i32;
pub type jlong = i64;
pub type jbyte = i8;
pub type jboolean = u8;
pub type jchar = u16;
pub type jshort = i16;
pub type jfloat = f32;
pub type jdouble = f64;
pub type jsize = jint;

// =============================================================================
// Reference Types (opaque pointers)
// =============================================================================

pub type jobject = *mut c_void;
pub type jclass = jobject;
pub type jstring = jobject;
pub type jthread = jobject;
pub type jthrowable = jobject;

pub type jfieldID = *mut c_void;
pub type jmethodID = *mut c_void;

#[repr(C)]
#[derive(Copy, Clone)]
pub union jvalue {
    pub z: jboolean,
    pub b: jbyte,
    pub c: jchar,
    pub s: jshort,
    pub i: jint,
    pub j: jlong,
    pub f: jfloat,
    pub d: jdouble,
    pub l: jobject,
}

// =============================================================================
// Constants
// =============================================================================

pub const JNI_FALSE: jboolean = 0;
pub const JNI_TRUE: jboolean = 1;

pub const JNI_OK: jint = 0;
pub const JNI_ERR: jint = -1;
pub const JNI_EDETACHED: jint = -2;
pub const JNI_EVERSION: jint = -3;

pub const JNI_VERSION_1_8: jint = 0x00010008;

// =============================================================================
// JNINativeInterface_ - The JNIEnv function table
// =============================================================================

#[repr(C)]
pub struct JNINativeInterface_ {
    // Reserved slots (0-3)
    pub reserved: [*mut c_void; 4],

    // 4: GetVersion
    pub GetVersion: unsafe extern "system" fn(env: *mut JNIEnv) -> jint,
    // 5: DefineClass
    _slot_5: *mut c_void,
    // 6: FindClass
    pub FindClass: unsafe extern "system" fn(env: *mut JNIEnv, name: *const c_char) -> jclass,
    // 7-15: reflection, Throw, ExceptionOccurred
    _slots_7_15: [*mut c_void; 9],

    // 16-17: Exception handling
    pub ExceptionDescribe: unsafe extern "system" fn(env: *mut JNIEnv),
    pub ExceptionClear: unsafe extern "system" fn(env: *mut JNIEnv),
    // 18-20: FatalError, local frames
    _slots_18_20: [*mut c_void; 3],

    // 21-23: References
    pub NewGlobalRef: unsafe extern "system" fn(env: *mut JNIEnv, obj: jobject) -> jobject,
    pub DeleteGlobalRef: unsafe extern "system" fn(env: *mut JNIEnv, gref: jobject),
    pub DeleteLocalRef: unsafe extern "system" fn(env: *mut JNIEnv, obj: jobject),
    // 24-29: IsSameObject .. NewObjectV
    _slots_24_29: [*mut c_void; 6],

    // 30: NewObjectA
    pub NewObjectA: unsafe extern "system" fn(
        env: *mut JNIEnv,
        clazz: jclass,
        methodID: jmethodID,
        args: *const jvalue,
    ) -> jobject,
    // 31-32: GetObjectClass, IsInstanceOf
    _slots_31_32: [*mut c_void; 2],

    // 33: GetMethodID
    pub GetMethodID: unsafe extern "system" fn(
        env: *mut JNIEnv,
        clazz: jclass,
        name: *const c_char,
        sig: *const c_char,
    ) -> jmethodID,
    // 34-93: Call<Type>Method family
    _slots_34_93: [*mut c_void; 60],

    // 94: GetFieldID
    pub GetFieldID: unsafe extern "system" fn(
        env: *mut JNIEnv,
        clazz: jclass,
        name: *const c_char,
        sig: *const c_char,
    ) -> jfieldID,
    // 95-99: Get{Object,Boolean,Byte,Char,Short}Field
    _slots_95_99: [*mut c_void; 5],
    // 100: GetIntField
    pub GetIntField: unsafe extern "system" fn(env: *mut JNIEnv, obj: jobject, fieldID: jfieldID) -> jint,
    // 101-143: remaining field accessors, static methods
    _slots_101_143: [*mut c_void; 43],

    // 144: GetStaticFieldID
    pub GetStaticFieldID: unsafe extern "system" fn(
        env: *mut JNIEnv,
        clazz: jclass,
        name: *const c_char,
        sig: *const c_char,
    ) -> jfieldID,
    // 145-166: static field accessors, UTF-16 strings
    _slots_145_166: [*mut c_void; 22],

    // 167: NewStringUTF
    pub NewStringUTF: unsafe extern "system" fn(env: *mut JNIEnv, utf: *const c_char) -> jstring,
    // 168-227: string and array functions, monitors, weak refs
    _slots_168_227: [*mut c_void; 60],

    // 228: ExceptionCheck
    pub ExceptionCheck: unsafe extern "system" fn(env: *mut JNIEnv) -> jboolean,
    // Slots after 228 (direct buffers, GetModule, IsVirtualThread, ...) are never read.
}

/// JNIEnv is directly the vtable pointer (C ABI definition)
pub type JNIEnv = *const JNINativeInterface_;

// =============================================================================
// JNIInvokeInterface_ - The JavaVM function table
// =============================================================================

#[repr(C)]
pub struct JNIInvokeInterface_ {
    pub reserved0: *mut c_void,
    pub reserved1: *mut c_void,
    pub reserved2: *mut c_void,

    pub DestroyJavaVM: unsafe extern "system" fn(vm: *mut JavaVM) -> jint,
    pub AttachCurrentThread:
        unsafe extern "system" fn(vm: *mut JavaVM, penv: *mut *mut c_void, args: *mut c_void) -> jint,
    pub DetachCurrentThread: unsafe extern "system" fn(vm: *mut JavaVM) -> jint,
    pub GetEnv:
        unsafe extern "system" fn(vm: *mut JavaVM, penv: *mut *mut c_void, version: jint) -> jint,
    pub AttachCurrentThreadAsDaemon:
        unsafe extern "system" fn(vm: *mut JavaVM, penv: *mut *mut c_void, args: *mut c_void) -> jint,
}

/// JavaVM is directly the vtable pointer (C ABI definition)
pub type JavaVM = *const JNIInvokeInterface_;

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    const PTR: usize = size_of::<*mut c_void>();

    #[test]
    fn typed_slots_sit_at_their_jni_h_indices() {
        assert_eq!(offset_of!(JNINativeInterface_, GetVersion), 4 * PTR);
        assert_eq!(offset_of!(JNINativeInterface_, FindClass), 6 * PTR);
        assert_eq!(offset_of!(JNINativeInterface_, ExceptionDescribe), 16 * PTR);
        assert_eq!(offset_of!(JNINativeInterface_, DeleteLocalRef), 23 * PTR);
        assert_eq!(offset_of!(JNINativeInterface_, NewObjectA), 30 * PTR);
        assert_eq!(offset_of!(JNINativeInterface_, GetMethodID), 33 * PTR);
        assert_eq!(offset_of!(JNINativeInterface_, GetFieldID), 94 * PTR);
        assert_eq!(offset_of!(JNINativeInterface_, GetIntField), 100 * PTR);
        assert_eq!(offset_of!(JNINativeInterface_, GetStaticFieldID), 144 * PTR);
        assert_eq!(offset_of!(JNINativeInterface_, NewStringUTF), 167 * PTR);
        assert_eq!(offset_of!(JNINativeInterface_, ExceptionCheck), 228 * PTR);
    }

    #[test]
    fn invoke_interface_get_env_is_slot_6() {
        assert_eq!(offset_of!(JNIInvokeInterface_, GetEnv), 6 * PTR);
    }
}
