// jvmti-conformance/src/sys/jvmti.rs
//
// JVMTI (JVM Tool Interface) types, constants and function tables.
//
// jvmtiInterface_1_ is laid out slot for slot like jvmti.h (156 entries,
// one-based numbering). Functions the agents never call are kept as
// opaque padding so the typed entries land on the right offsets.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use std::fmt;
use std::os::raw::{c_char, c_uchar, c_void};
use crate::sys::jni::{jboolean, jclass, jfieldID, jint, jlong, jmethodID, jobject, jthread, JNIEnv};

// --- Constants ---
pub const JVMTI_VERSION_1_0: jint = 0x30010000;
pub const JVMTI_VERSION_1_1: jint = 0x30010100;
pub const JVMTI_VERSION_1_2: jint = 0x30010200;

pub const JVMTI_EVENT_VM_INIT: u32 = 50;
pub const JVMTI_EVENT_VM_DEATH: u32 = 51;
pub const JVMTI_EVENT_FIELD_ACCESS: u32 = 63;
pub const JVMTI_EVENT_FIELD_MODIFICATION: u32 = 64;

pub const JVMTI_PHASE_ONLOAD: jint = 1;
pub const JVMTI_PHASE_PRIMORDIAL: jint = 2;
pub const JVMTI_PHASE_START: jint = 6;
pub const JVMTI_PHASE_LIVE: jint = 4;
pub const JVMTI_PHASE_DEAD: jint = 8;

pub const JVMTI_ENABLE: jint = 1;
pub const JVMTI_DISABLE: jint = 0;

pub const JVMTI_THREAD_MIN_PRIORITY: jint = 1;
pub const JVMTI_THREAD_NORM_PRIORITY: jint = 5;
pub const JVMTI_THREAD_MAX_PRIORITY: jint = 10;

// jvmtiParamKind
pub const JVMTI_KIND_IN: jint = 91;
pub const JVMTI_KIND_IN_PTR: jint = 92;
pub const JVMTI_KIND_IN_BUF: jint = 93;
pub const JVMTI_KIND_ALLOC_BUF: jint = 94;
pub const JVMTI_KIND_ALLOC_ALLOC_BUF: jint = 95;
pub const JVMTI_KIND_OUT: jint = 96;
pub const JVMTI_KIND_OUT_BUF: jint = 97;

// jvmtiParamTypes
pub const JVMTI_TYPE_JBYTE: jint = 101;
pub const JVMTI_TYPE_JCHAR: jint = 102;
pub const JVMTI_TYPE_JSHORT: jint = 103;
pub const JVMTI_TYPE_JINT: jint = 104;
pub const JVMTI_TYPE_JLONG: jint = 105;
pub const JVMTI_TYPE_JFLOAT: jint = 106;
pub const JVMTI_TYPE_JDOUBLE: jint = 107;
pub const JVMTI_TYPE_JBOOLEAN: jint = 108;
pub const JVMTI_TYPE_JOBJECT: jint = 109;
pub const JVMTI_TYPE_JTHREAD: jint = 110;
pub const JVMTI_TYPE_JCLASS: jint = 111;
pub const JVMTI_TYPE_JVALUE: jint = 112;
pub const JVMTI_TYPE_JFIELDID: jint = 113;
pub const JVMTI_TYPE_JMETHODID: jint = 114;
pub const JVMTI_TYPE_CCHAR: jint = 115;
pub const JVMTI_TYPE_CVOID: jint = 116;
pub const JVMTI_TYPE_JNIENV: jint = 117;

pub type jlocation = jlong;

// =============================================================================
// jvmtiError
// =============================================================================

/// A JVMTI status code.
///
/// The host may return codes this crate has no name for, so the C enum is
/// modelled as a transparent integer with named constants rather than a Rust
/// enum.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct jvmtiError(pub u32);

impl jvmtiError {
    pub const NONE: Self = Self(0);
    pub const INVALID_THREAD: Self = Self(10);
    pub const INVALID_THREAD_GROUP: Self = Self(11);
    pub const INVALID_PRIORITY: Self = Self(12);
    pub const THREAD_NOT_SUSPENDED: Self = Self(13);
    pub const THREAD_SUSPENDED: Self = Self(14);
    pub const THREAD_NOT_ALIVE: Self = Self(15);
    pub const INVALID_OBJECT: Self = Self(20);
    pub const INVALID_CLASS: Self = Self(21);
    pub const CLASS_NOT_PREPARED: Self = Self(22);
    pub const INVALID_METHODID: Self = Self(23);
    pub const INVALID_LOCATION: Self = Self(24);
    pub const INVALID_FIELDID: Self = Self(25);
    pub const DUPLICATE: Self = Self(40);
    pub const NOT_FOUND: Self = Self(41);
    pub const NOT_AVAILABLE: Self = Self(98);
    pub const MUST_POSSESS_CAPABILITY: Self = Self(99);
    pub const NULL_POINTER: Self = Self(100);
    pub const ABSENT_INFORMATION: Self = Self(101);
    pub const INVALID_EVENT_TYPE: Self = Self(102);
    pub const ILLEGAL_ARGUMENT: Self = Self(103);
    pub const OUT_OF_MEMORY: Self = Self(110);
    pub const ACCESS_DENIED: Self = Self(111);
    pub const WRONG_PHASE: Self = Self(112);
    pub const INTERNAL: Self = Self(113);
    pub const UNATTACHED_THREAD: Self = Self(115);
    pub const INVALID_ENVIRONMENT: Self = Self(116);

    /// The `JVMTI_ERROR_*` name of this code, or `"UNKNOWN"`.
    pub fn name(self) -> &'static str {
        match self.0 {
            0 => "JVMTI_ERROR_NONE",
            10 => "JVMTI_ERROR_INVALID_THREAD",
            11 => "JVMTI_ERROR_INVALID_THREAD_GROUP",
            12 => "JVMTI_ERROR_INVALID_PRIORITY",
            13 => "JVMTI_ERROR_THREAD_NOT_SUSPENDED",
            14 => "JVMTI_ERROR_THREAD_SUSPENDED",
            15 => "JVMTI_ERROR_THREAD_NOT_ALIVE",
            20 => "JVMTI_ERROR_INVALID_OBJECT",
            21 => "JVMTI_ERROR_INVALID_CLASS",
            22 => "JVMTI_ERROR_CLASS_NOT_PREPARED",
            23 => "JVMTI_ERROR_INVALID_METHODID",
            24 => "JVMTI_ERROR_INVALID_LOCATION",
            25 => "JVMTI_ERROR_INVALID_FIELDID",
            40 => "JVMTI_ERROR_DUPLICATE",
            41 => "JVMTI_ERROR_NOT_FOUND",
            98 => "JVMTI_ERROR_NOT_AVAILABLE",
            99 => "JVMTI_ERROR_MUST_POSSESS_CAPABILITY",
            100 => "JVMTI_ERROR_NULL_POINTER",
            101 => "JVMTI_ERROR_ABSENT_INFORMATION",
            102 => "JVMTI_ERROR_INVALID_EVENT_TYPE",
            103 => "JVMTI_ERROR_ILLEGAL_ARGUMENT",
            110 => "JVMTI_ERROR_OUT_OF_MEMORY",
            111 => "JVMTI_ERROR_ACCESS_DENIED",
            112 => "JVMTI_ERROR_WRONG_PHASE",
            113 => "JVMTI_ERROR_INTERNAL",
            115 => "JVMTI_ERROR_UNATTACHED_THREAD",
            116 => "JVMTI_ERROR_INVALID_ENVIRONMENT",
            _ => "UNKNOWN",
        }
    }

    /// `Ok(())` for `NONE`, `Err(self)` otherwise.
    pub fn into_result(self) -> Result<(), jvmtiError> {
        if self == Self::NONE {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for jvmtiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

impl fmt::Debug for jvmtiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

// =============================================================================
// Structures
// =============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct jvmtiExtensionParamInfo {
    pub name: *mut c_char,
    pub kind: jint,
    pub base_type: jint,
    pub null_ok: jboolean,
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct jvmtiExtensionEventInfo {
    pub extension_event_index: jint,
    pub id: *mut c_char,
    pub short_description: *mut c_char,
    pub param_count: jint,
    pub params: *mut jvmtiExtensionParamInfo,
}

pub type jvmtiStartFunction =
    unsafe extern "system" fn(jvmti_env: *mut jvmtiEnv, jni_env: *mut JNIEnv, arg: *mut c_void);

// =============================================================================
// Capabilities
// =============================================================================

/// `jvmtiCapabilities`: 128 one-bit flags packed into four words, least
/// significant bit first.
#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct jvmtiCapabilities {
    bits: [u32; 4],
}

impl Default for jvmtiCapabilities {
    fn default() -> Self { Self { bits: [0; 4] } }
}

impl jvmtiCapabilities {
    fn set_bit(&mut self, bit_offset: usize, value: bool) {
        let word_index = bit_offset / 32;
        let bit_index = bit_offset % 32;
        if value {
            self.bits[word_index] |= 1 << bit_index;
        } else {
            self.bits[word_index] &= !(1 << bit_index);
        }
    }

    fn get_bit(&self, bit_offset: usize) -> bool {
        let word_index = bit_offset / 32;
        let bit_index = bit_offset % 32;
        (self.bits[word_index] & (1 << bit_index)) != 0
    }

    // [1]
    pub fn set_can_generate_field_modification_events(&mut self, v: bool) { self.set_bit(1, v); }
    pub fn can_generate_field_modification_events(&self) -> bool { self.get_bit(1) }

    // [2]
    pub fn set_can_generate_field_access_events(&mut self, v: bool) { self.set_bit(2, v); }
    pub fn can_generate_field_access_events(&self) -> bool { self.get_bit(2) }
}

impl fmt::Display for jvmtiCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capabilities [")?;
        if self.can_generate_field_modification_events() { write!(f, "FieldModification ")?; }
        if self.can_generate_field_access_events() { write!(f, "FieldAccess ")?; }
        write!(f, "]")
    }
}

impl fmt::Debug for jvmtiCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "jvmtiCapabilities({:08x} {:08x} {:08x} {:08x})",
            self.bits[0], self.bits[1], self.bits[2], self.bits[3])
    }
}

// --- Function Typedefs ---

pub type JvmtiSetEventNotificationModeFn = unsafe extern "system" fn(env: *mut jvmtiEnv, mode: jint, event_type: u32, event_thread: jthread) -> jvmtiError;
pub type JvmtiRunAgentThreadFn = unsafe extern "system" fn(env: *mut jvmtiEnv, thread: jthread, proc: jvmtiStartFunction, arg: *const c_void, priority: jint) -> jvmtiError;
pub type JvmtiSetFieldAccessWatchFn = unsafe extern "system" fn(env: *mut jvmtiEnv, klass: jclass, field: jfieldID) -> jvmtiError;
pub type JvmtiClearFieldAccessWatchFn = unsafe extern "system" fn(env: *mut jvmtiEnv, klass: jclass, field: jfieldID) -> jvmtiError;
pub type JvmtiAllocateFn = unsafe extern "system" fn(env: *mut jvmtiEnv, size: jlong, mem_ptr: *mut *mut c_uchar) -> jvmtiError;
pub type JvmtiDeallocateFn = unsafe extern "system" fn(env: *mut jvmtiEnv, mem: *mut c_uchar) -> jvmtiError;
pub type JvmtiGetClassSignatureFn = unsafe extern "system" fn(env: *mut jvmtiEnv, klass: jclass, signature_ptr: *mut *mut c_char, generic_ptr: *mut *mut c_char) -> jvmtiError;
pub type JvmtiGetFieldNameFn = unsafe extern "system" fn(env: *mut jvmtiEnv, klass: jclass, field: jfieldID, name_ptr: *mut *mut c_char, signature_ptr: *mut *mut c_char, generic_ptr: *mut *mut c_char) -> jvmtiError;
pub type JvmtiGetLoadedClassesFn = unsafe extern "system" fn(env: *mut jvmtiEnv, class_count_ptr: *mut jint, classes_ptr: *mut *mut jclass) -> jvmtiError;
pub type JvmtiGetCapabilitiesFn = unsafe extern "system" fn(env: *mut jvmtiEnv, capabilities_ptr: *mut jvmtiCapabilities) -> jvmtiError;
pub type JvmtiSetEventCallbacksFn = unsafe extern "system" fn(env: *mut jvmtiEnv, callbacks: *const jvmtiEventCallbacks, size_of_callbacks: jint) -> jvmtiError;
pub type JvmtiGetExtensionEventsFn = unsafe extern "system" fn(env: *mut jvmtiEnv, extension_count_ptr: *mut jint, extensions_ptr: *mut *mut jvmtiExtensionEventInfo) -> jvmtiError;
pub type JvmtiDisposeEnvironmentFn = unsafe extern "system" fn(env: *mut jvmtiEnv) -> jvmtiError;
pub type JvmtiGetErrorNameFn = unsafe extern "system" fn(env: *mut jvmtiEnv, error: jvmtiError, name_ptr: *mut *mut c_char) -> jvmtiError;
pub type JvmtiGetPhaseFn = unsafe extern "system" fn(env: *mut jvmtiEnv, phase_ptr: *mut jint) -> jvmtiError;
pub type JvmtiGetPotentialCapabilitiesFn = unsafe extern "system" fn(env: *mut jvmtiEnv, capabilities_ptr: *mut jvmtiCapabilities) -> jvmtiError;
pub type JvmtiAddCapabilitiesFn = unsafe extern "system" fn(env: *mut jvmtiEnv, capabilities_ptr: *const jvmtiCapabilities) -> jvmtiError;

// --- Event Callback Typedefs ---

pub type JvmtiVMInitFn = unsafe extern "system" fn(jvmti_env: *mut jvmtiEnv, jni_env: *mut JNIEnv, thread: jthread);
pub type JvmtiVMDeathFn = unsafe extern "system" fn(jvmti_env: *mut jvmtiEnv, jni_env: *mut JNIEnv);
pub type JvmtiFieldAccessFn = unsafe extern "system" fn(
    jvmti_env: *mut jvmtiEnv,
    jni_env: *mut JNIEnv,
    thread: jthread,
    method: jmethodID,
    location: jlocation,
    field_klass: jclass,
    object: jobject,
    field: jfieldID,
);

// =============================================================================
// jvmtiInterface_1_ - The JVMTI function table
// =============================================================================

#[repr(C)]
pub struct jvmtiInterface_1_ {
    /*   1:  RESERVED */
    pub reserved1: *mut c_void,
    /*   2: Set Event Notification Mode */
    pub SetEventNotificationMode: Option<JvmtiSetEventNotificationModeFn>,
    /*   3-11: modules, thread suspension and inspection */
    _slots_3_11: [*mut c_void; 9],
    /*  12: Run Agent Thread */
    pub RunAgentThread: Option<JvmtiRunAgentThreadFn>,
    /*  13-40: thread state, frames, raw monitors, breakpoints */
    _slots_13_40: [*mut c_void; 28],
    /*  41: Set Field Access Watch */
    pub SetFieldAccessWatch: Option<JvmtiSetFieldAccessWatchFn>,
    /*  42: Clear Field Access Watch */
    pub ClearFieldAccessWatch: Option<JvmtiClearFieldAccessWatchFn>,
    /*  43-45: field modification watches, GetAllModules */
    _slots_43_45: [*mut c_void; 3],
    /*  46: Allocate */
    pub Allocate: Option<JvmtiAllocateFn>,
    /*  47: Deallocate */
    pub Deallocate: Option<JvmtiDeallocateFn>,
    /*  48: Get Class Signature */
    pub GetClassSignature: Option<JvmtiGetClassSignatureFn>,
    /*  49-59: class inspection */
    _slots_49_59: [*mut c_void; 11],
    /*  60: Get Field Name (and Signature) */
    pub GetFieldName: Option<JvmtiGetFieldNameFn>,
    /*  61-77: field and method inspection, local variables */
    _slots_61_77: [*mut c_void; 17],
    /*  78: Get Loaded Classes */
    pub GetLoadedClasses: Option<JvmtiGetLoadedClassesFn>,
    /*  79-88: class loaders, redefinition, object info */
    _slots_79_88: [*mut c_void; 10],
    /*  89: Get Capabilities */
    pub GetCapabilities: Option<JvmtiGetCapabilitiesFn>,
    /*  90-121: heap, tags, timers, JNI function table */
    _slots_90_121: [*mut c_void; 32],
    /* 122: Set Event Callbacks */
    pub SetEventCallbacks: Option<JvmtiSetEventCallbacksFn>,
    /* 123-124: GenerateEvents, GetExtensionFunctions */
    _slots_123_124: [*mut c_void; 2],
    /* 125: Get Extension Events */
    pub GetExtensionEvents: Option<JvmtiGetExtensionEventsFn>,
    /* 126: Set Extension Event Callback */
    _slot_126: *mut c_void,
    /* 127: Dispose Environment */
    pub DisposeEnvironment: Option<JvmtiDisposeEnvironmentFn>,
    /* 128: Get Error Name */
    pub GetErrorName: Option<JvmtiGetErrorNameFn>,
    /* 129-132: JLocation format, system properties */
    _slots_129_132: [*mut c_void; 4],
    /* 133: Get Phase */
    pub GetPhase: Option<JvmtiGetPhaseFn>,
    /* 134-139: timers, environment local storage */
    _slots_134_139: [*mut c_void; 6],
    /* 140: Get Potential Capabilities */
    pub GetPotentialCapabilities: Option<JvmtiGetPotentialCapabilitiesFn>,
    /* 141:  RESERVED */
    pub reserved141: *mut c_void,
    /* 142: Add Capabilities */
    pub AddCapabilities: Option<JvmtiAddCapabilitiesFn>,
    /* 143-156: RelinquishCapabilities .. SetHeapSamplingInterval */
    _slots_143_156: [*mut c_void; 14],
}

#[repr(C)]
pub struct jvmtiEnv {
    pub functions: *const jvmtiInterface_1_,
}

// =============================================================================
// jvmtiEventCallbacks
// =============================================================================

/// Event callback table passed to `SetEventCallbacks`.
///
/// Runs from `VMInit` (50) to `SampledObjectAlloc` (86). Only the callbacks
/// the agents register are typed.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct jvmtiEventCallbacks {
    /* 50 */ pub VMInit: Option<JvmtiVMInitFn>,
    /* 51 */ pub VMDeath: Option<JvmtiVMDeathFn>,
    /* 52-62: ThreadStart .. Breakpoint */
    _events_52_62: [*mut c_void; 11],
    /* 63 */ pub FieldAccess: Option<JvmtiFieldAccessFn>,
    /* 64-86: FieldModification .. SampledObjectAlloc */
    _events_64_86: [*mut c_void; 23],
}

impl Default for jvmtiEventCallbacks {
    fn default() -> Self {
        Self {
            VMInit: None,
            VMDeath: None,
            _events_52_62: [std::ptr::null_mut(); 11],
            FieldAccess: None,
            _events_64_86: [std::ptr::null_mut(); 23],
        }
    }
}
