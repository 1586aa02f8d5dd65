//! Wrappers around the raw JVMTI and JNI environment pointers.
//!
//! ```rust,ignore
//! use jvmti_conformance::env::{Jvmti, JniEnv};
//!
//! let jvmti = Jvmti::new(vm).map_err(|code| AgentError::Setup(format!("GetEnv returned {code}")))?;
//! let classes = jvmti.get_loaded_classes()?;   // HostArray, released on drop
//! for &klass in classes.as_slice()? {
//!     let (signature, _generic) = jvmti.get_class_signature(klass)?;
//! }
//! classes.release()?;
//! ```

pub use crate::jni_wrapper::{JniEnv, LocalRef};
pub use crate::jvmti_wrapper::Jvmti;
