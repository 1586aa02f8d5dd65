// jvmti-conformance/src/jvmti_wrapper.rs
use crate::snapshot::{HostAllocator, HostArray};
use crate::sys::jni;
use crate::sys::jvmti;
use std::os::raw::{c_char, c_void};
use std::ptr;

/// Fetches a function pointer from the JVMTI vtable.
/// An empty slot is reported as `JVMTI_ERROR_NOT_AVAILABLE` instead of panicking.
macro_rules! jvmti_fn {
    ($self:expr, $func:ident) => {
        match (*(*$self.env).functions).$func {
            Some(f) => f,
            None => return Err(jvmti::jvmtiError::NOT_AVAILABLE),
        }
    };
}

/// A safe wrapper around the raw JVMTI Environment pointer.
pub struct Jvmti {
    env: *mut jvmti::jvmtiEnv,
}

// A jvmtiEnv may be used from any thread attached to the VM.
unsafe impl Send for Jvmti {}
unsafe impl Sync for Jvmti {}

impl Jvmti {
    /// Connects to the JVM and retrieves the JVMTI environment.
    pub fn new(vm: *mut jni::JavaVM) -> Result<Self, jni::jint> {
        let mut env_ptr: *mut c_void = ptr::null_mut();

        unsafe {
            // vm: *mut JavaVM = *mut *const JNIInvokeInterface_
            let get_env_fn = (**vm).GetEnv;
            let res = get_env_fn(vm, &mut env_ptr, jvmti::JVMTI_VERSION_1_1);
            if res != jni::JNI_OK {
                return Err(res);
            }
        }

        if env_ptr.is_null() {
            return Err(jni::JNI_ERR);
        }
        Ok(Jvmti { env: env_ptr as *mut jvmti::jvmtiEnv })
    }

    /// Create a Jvmti wrapper from a raw jvmtiEnv pointer
    ///
    /// # Safety
    /// The caller must ensure the pointer is valid for the duration of use.
    pub unsafe fn from_raw(env: *mut jvmti::jvmtiEnv) -> Self {
        Jvmti { env }
    }

    /// Get the raw jvmtiEnv pointer
    pub fn raw(&self) -> *mut jvmti::jvmtiEnv {
        self.env
    }

    // =========================================================================
    // Capabilities
    // =========================================================================

    pub fn get_potential_capabilities(&self) -> Result<jvmti::jvmtiCapabilities, jvmti::jvmtiError> {
        let mut caps = jvmti::jvmtiCapabilities::default();
        unsafe {
            let f = jvmti_fn!(self, GetPotentialCapabilities);
            f(self.env, &mut caps).into_result()?;
        }
        Ok(caps)
    }

    pub fn add_capabilities(&self, caps: &jvmti::jvmtiCapabilities) -> Result<(), jvmti::jvmtiError> {
        unsafe {
            let f = jvmti_fn!(self, AddCapabilities);
            f(self.env, caps).into_result()
        }
    }

    pub fn get_capabilities(&self) -> Result<jvmti::jvmtiCapabilities, jvmti::jvmtiError> {
        let mut caps = jvmti::jvmtiCapabilities::default();
        unsafe {
            let f = jvmti_fn!(self, GetCapabilities);
            f(self.env, &mut caps).into_result()?;
        }
        Ok(caps)
    }

    // =========================================================================
    // Events
    // =========================================================================

    pub fn set_event_callbacks(&self, callbacks: jvmti::jvmtiEventCallbacks) -> Result<(), jvmti::jvmtiError> {
        unsafe {
            let f = jvmti_fn!(self, SetEventCallbacks);
            let size = std::mem::size_of::<jvmti::jvmtiEventCallbacks>() as jni::jint;
            f(self.env, &callbacks, size).into_result()
        }
    }

    /// Enables or disables `event_type`; a null `thread` means all threads.
    pub fn set_event_notification_mode(&self, enable: bool, event_type: u32, thread: jni::jthread) -> Result<(), jvmti::jvmtiError> {
        unsafe {
            let f = jvmti_fn!(self, SetEventNotificationMode);
            let mode = if enable { jvmti::JVMTI_ENABLE } else { jvmti::JVMTI_DISABLE };
            f(self.env, mode, event_type, thread).into_result()
        }
    }

    pub fn get_phase(&self) -> Result<jni::jint, jvmti::jvmtiError> {
        let mut phase: jni::jint = 0;
        unsafe {
            let f = jvmti_fn!(self, GetPhase);
            f(self.env, &mut phase).into_result()?;
        }
        Ok(phase)
    }

    pub fn run_agent_thread(&self, thread: jni::jthread, proc: jvmti::jvmtiStartFunction, arg: *const c_void, priority: jni::jint) -> Result<(), jvmti::jvmtiError> {
        unsafe {
            let f = jvmti_fn!(self, RunAgentThread);
            f(self.env, thread, proc, arg, priority).into_result()
        }
    }

    // =========================================================================
    // Memory
    // =========================================================================

    /// Returns memory to the JVM. A null pointer is accepted and ignored.
    pub fn deallocate(&self, mem: *mut u8) -> Result<(), jvmti::jvmtiError> {
        if mem.is_null() {
            return Ok(());
        }
        unsafe {
            let f = jvmti_fn!(self, Deallocate);
            f(self.env, mem).into_result()
        }
    }

    /// Copies a JVMTI-allocated string and deallocates it.
    unsafe fn take_string(&self, ptr: *mut c_char) -> Result<Option<String>, jvmti::jvmtiError> {
        if ptr.is_null() {
            return Ok(None);
        }
        let value = std::ffi::CStr::from_ptr(ptr).to_string_lossy().into_owned();
        self.deallocate(ptr as *mut u8)?;
        Ok(Some(value))
    }

    // =========================================================================
    // Classes and fields
    // =========================================================================

    /// Snapshot of all loaded classes. The caller owns the returned array
    /// until it is released.
    pub fn get_loaded_classes(&self) -> Result<HostArray<'_, jni::jclass>, jvmti::jvmtiError> {
        let mut class_count: jni::jint = 0;
        let mut classes_ptr: *mut jni::jclass = ptr::null_mut();

        unsafe {
            let f = jvmti_fn!(self, GetLoadedClasses);
            f(self.env, &mut class_count, &mut classes_ptr).into_result()?;
            Ok(HostArray::from_raw(self, classes_ptr, class_count))
        }
    }

    /// Signature and generic signature of `klass`. A null signature from the
    /// host comes back as an empty string.
    pub fn get_class_signature(&self, klass: jni::jclass) -> Result<(String, Option<String>), jvmti::jvmtiError> {
        let mut sig_ptr: *mut c_char = ptr::null_mut();
        let mut gen_ptr: *mut c_char = ptr::null_mut();

        unsafe {
            let f = jvmti_fn!(self, GetClassSignature);
            f(self.env, klass, &mut sig_ptr, &mut gen_ptr).into_result()?;

            let signature = self.take_string(sig_ptr);
            let generic = self.take_string(gen_ptr);
            Ok((signature?.unwrap_or_default(), generic?))
        }
    }

    /// Name, signature and generic signature of `field`.
    pub fn get_field_name(&self, klass: jni::jclass, field: jni::jfieldID) -> Result<(String, String, Option<String>), jvmti::jvmtiError> {
        let mut name_ptr: *mut c_char = ptr::null_mut();
        let mut sig_ptr: *mut c_char = ptr::null_mut();
        let mut gen_ptr: *mut c_char = ptr::null_mut();

        unsafe {
            let f = jvmti_fn!(self, GetFieldName);
            f(self.env, klass, field, &mut name_ptr, &mut sig_ptr, &mut gen_ptr).into_result()?;

            let name = self.take_string(name_ptr);
            let sig = self.take_string(sig_ptr);
            let gen = self.take_string(gen_ptr);
            Ok((name?.unwrap_or_default(), sig?.unwrap_or_default(), gen?))
        }
    }

    pub fn set_field_access_watch(&self, klass: jni::jclass, field: jni::jfieldID) -> Result<(), jvmti::jvmtiError> {
        unsafe {
            let f = jvmti_fn!(self, SetFieldAccessWatch);
            f(self.env, klass, field).into_result()
        }
    }

    // =========================================================================
    // Extensions
    // =========================================================================

    /// The extension events this JVM offers. The list and every string and
    /// parameter array inside it are owned by the caller.
    pub fn get_extension_events(&self) -> Result<HostArray<'_, jvmti::jvmtiExtensionEventInfo>, jvmti::jvmtiError> {
        let mut count: jni::jint = 0;
        let mut events_ptr: *mut jvmti::jvmtiExtensionEventInfo = ptr::null_mut();

        unsafe {
            let f = jvmti_fn!(self, GetExtensionEvents);
            f(self.env, &mut count, &mut events_ptr).into_result()?;
            Ok(HostArray::from_raw(self, events_ptr, count))
        }
    }
}

impl HostAllocator for Jvmti {
    fn release(&self, mem: *mut u8) -> Result<(), jvmti::jvmtiError> {
        self.deallocate(mem)
    }
}
