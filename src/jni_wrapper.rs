//! Safe wrapper around the JNI environment.
//!
//! Only the operations the agents need: class and member lookup, creating
//! the agent thread object, and reading an `int` field.

use crate::sys::jni;
use std::ffi::CString;

/// Safe wrapper around a JNI environment pointer.
///
/// # Thread Safety
///
/// A `JniEnv` is tied to a specific thread and cannot be sent across threads.
/// Each JVM thread has its own JNI environment.
pub struct JniEnv {
    env: *mut jni::JNIEnv,
}

impl JniEnv {
    /// Creates a JniEnv wrapper from a raw pointer.
    ///
    /// # Safety
    ///
    /// The caller must ensure the pointer is valid and comes from the current thread.
    pub unsafe fn from_raw(env: *mut jni::JNIEnv) -> Self {
        JniEnv { env }
    }

    /// Returns the raw JNI environment pointer.
    pub fn raw(&self) -> *mut jni::JNIEnv {
        self.env
    }

    // =========================================================================
    // Classes
    // =========================================================================

    /// Finds a class by its internal name (`java/lang/String`).
    pub fn find_class(&self, name: &str) -> Option<jni::jclass> {
        let c_name = CString::new(name).ok()?;
        unsafe {
            let vtable = *self.env;
            let cls = ((*vtable).FindClass)(self.env, c_name.as_ptr());
            if cls.is_null() { None } else { Some(cls) }
        }
    }

    // =========================================================================
    // Exceptions
    // =========================================================================

    /// Returns true if an exception is pending.
    pub fn exception_check(&self) -> bool {
        unsafe {
            let vtable = *self.env;
            ((*vtable).ExceptionCheck)(self.env) != 0
        }
    }

    /// Clears any pending exception.
    pub fn exception_clear(&self) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).ExceptionClear)(self.env);
        }
    }

    /// Prints the pending exception and stack trace to stderr.
    pub fn exception_describe(&self) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).ExceptionDescribe)(self.env);
        }
    }

    /// Describes and clears a pending exception. Returns whether one was pending.
    pub fn clear_pending_exception(&self) -> bool {
        if self.exception_check() {
            self.exception_describe();
            self.exception_clear();
            true
        } else {
            false
        }
    }

    // =========================================================================
    // References
    // =========================================================================

    pub fn delete_local_ref(&self, obj: jni::jobject) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).DeleteLocalRef)(self.env, obj);
        }
    }

    // =========================================================================
    // Objects and strings
    // =========================================================================

    pub fn new_string_utf(&self, s: &str) -> Option<jni::jstring> {
        let c_str = CString::new(s).ok()?;
        unsafe {
            let vtable = *self.env;
            let jstr = ((*vtable).NewStringUTF)(self.env, c_str.as_ptr());
            if jstr.is_null() { None } else { Some(jstr) }
        }
    }

    pub fn get_method_id(&self, cls: jni::jclass, name: &str, sig: &str) -> Option<jni::jmethodID> {
        let c_name = CString::new(name).ok()?;
        let c_sig = CString::new(sig).ok()?;
        unsafe {
            let vtable = *self.env;
            let mid = ((*vtable).GetMethodID)(self.env, cls, c_name.as_ptr(), c_sig.as_ptr());
            if mid.is_null() { None } else { Some(mid) }
        }
    }

    /// Constructs an object with arguments passed as a `jvalue` array.
    pub fn new_object_a(&self, cls: jni::jclass, ctor: jni::jmethodID, args: &[jni::jvalue]) -> Option<jni::jobject> {
        unsafe {
            let vtable = *self.env;
            let obj = ((*vtable).NewObjectA)(self.env, cls, ctor, args.as_ptr());
            if obj.is_null() { None } else { Some(obj) }
        }
    }

    // =========================================================================
    // Fields
    // =========================================================================

    pub fn get_field_id(&self, cls: jni::jclass, name: &str, sig: &str) -> Option<jni::jfieldID> {
        let c_name = CString::new(name).ok()?;
        let c_sig = CString::new(sig).ok()?;
        unsafe {
            let vtable = *self.env;
            let fid = ((*vtable).GetFieldID)(self.env, cls, c_name.as_ptr(), c_sig.as_ptr());
            if fid.is_null() { None } else { Some(fid) }
        }
    }

    pub fn get_static_field_id(&self, cls: jni::jclass, name: &str, sig: &str) -> Option<jni::jfieldID> {
        let c_name = CString::new(name).ok()?;
        let c_sig = CString::new(sig).ok()?;
        unsafe {
            let vtable = *self.env;
            let fid = ((*vtable).GetStaticFieldID)(self.env, cls, c_name.as_ptr(), c_sig.as_ptr());
            if fid.is_null() { None } else { Some(fid) }
        }
    }

    pub fn get_int_field(&self, obj: jni::jobject, field: jni::jfieldID) -> jni::jint {
        unsafe {
            let vtable = *self.env;
            ((*vtable).GetIntField)(self.env, obj, field)
        }
    }
}

// =============================================================================
// RAII guard for local references
// =============================================================================

/// A guard that automatically deletes a local reference when dropped.
///
/// ```rust,ignore
/// let class = LocalRef::new(&env, env.find_class("java/lang/Thread").unwrap());
/// // class.get() is valid until the guard goes out of scope
/// ```
pub struct LocalRef<'a> {
    env: &'a JniEnv,
    obj: jni::jobject,
}

impl<'a> LocalRef<'a> {
    /// Creates a new LocalRef guard.
    pub fn new(env: &'a JniEnv, obj: jni::jobject) -> Self {
        LocalRef { env, obj }
    }

    /// Returns the underlying jobject.
    pub fn get(&self) -> jni::jobject {
        self.obj
    }
}

impl<'a> Drop for LocalRef<'a> {
    fn drop(&mut self) {
        if !self.obj.is_null() {
            self.env.delete_local_ref(self.obj);
        }
    }
}
