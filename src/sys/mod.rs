//! Raw FFI definitions for JNI and JVMTI.

pub mod jni;
pub mod jvmti;
