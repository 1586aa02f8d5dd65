//! Scoped ownership of host-allocated buffers.
//!
//! JVMTI query functions hand back a `(count, pointer)` pair that the caller
//! must return with `Deallocate`. [`HostArray`] owns such a pair for the
//! duration of a check: slicing it validates the pair, and it is released
//! exactly once, either explicitly through [`HostArray::release`] (which
//! reports the host status) or from `Drop` on early exits.

use std::borrow::Cow;
use std::ffi::CStr;
use std::fmt;
use std::os::raw::c_char;

use log::error;
use thiserror::Error;

use crate::sys::jni::jint;
use crate::sys::jvmti::jvmtiError;

/// Something that can give memory back to the host.
///
/// Implemented by [`Jvmti`](crate::env::Jvmti) through `Deallocate`; tests
/// provide counting mocks.
pub trait HostAllocator {
    fn release(&self, mem: *mut u8) -> Result<(), jvmtiError>;
}

/// A `(count, pointer)` pair that cannot be viewed as a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("null buffer with a claimed count of {0}")]
    NullWithCount(jint),
    #[error("negative element count {0}")]
    NegativeCount(jint),
}

/// A host-allocated array, released exactly once.
pub struct HostArray<'a, T> {
    alloc: &'a dyn HostAllocator,
    ptr: *mut T,
    count: jint,
    released: bool,
}

impl<'a, T> HostArray<'a, T> {
    /// Takes ownership of a buffer returned by the host.
    ///
    /// # Safety
    /// If `ptr` is non-null and `count` is positive, `ptr` must point to
    /// `count` initialized elements that stay valid until the array is
    /// released. `ptr` must be something `alloc` can release.
    pub unsafe fn from_raw(alloc: &'a dyn HostAllocator, ptr: *mut T, count: jint) -> Self {
        HostArray { alloc, ptr, count, released: false }
    }

    /// The element count the host claimed.
    pub fn count(&self) -> jint {
        self.count
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// The allocator this array is returned to. Nested buffers reachable
    /// from the elements are released through the same allocator.
    pub fn allocator(&self) -> &'a dyn HostAllocator {
        self.alloc
    }

    /// Views the buffer as a slice.
    ///
    /// A zero count is an empty slice whatever the pointer; a null pointer
    /// with a positive count is rejected before any element is touched.
    pub fn as_slice(&self) -> Result<&[T], SnapshotError> {
        match self.count {
            n if n < 0 => Err(SnapshotError::NegativeCount(n)),
            0 => Ok(&[]),
            n if self.ptr.is_null() => Err(SnapshotError::NullWithCount(n)),
            // SAFETY: guaranteed by the contract of `from_raw`.
            n => Ok(unsafe { std::slice::from_raw_parts(self.ptr, n as usize) }),
        }
    }

    /// Returns the buffer to the host and reports the host status.
    pub fn release(mut self) -> Result<(), jvmtiError> {
        self.released = true;
        self.alloc.release(self.ptr as *mut u8)
    }
}

impl<T> Drop for HostArray<'_, T> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(err) = self.alloc.release(self.ptr as *mut u8) {
            error!("Deallocate of a {}-element snapshot failed: {}", self.count, err);
        }
    }
}

impl<T> fmt::Debug for HostArray<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostArray")
            .field("ptr", &self.ptr)
            .field("count", &self.count)
            .field("released", &self.released)
            .finish()
    }
}

/// Reads a host string that may be null.
///
/// # Safety
/// A non-null `ptr` must point to a NUL-terminated string that outlives `'a`.
pub unsafe fn host_str<'a>(ptr: *const c_char) -> Option<Cow<'a, str>> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        released: RefCell<Vec<usize>>,
        fail_with: Option<jvmtiError>,
    }

    impl HostAllocator for Recorder {
        fn release(&self, mem: *mut u8) -> Result<(), jvmtiError> {
            self.released.borrow_mut().push(mem as usize);
            match self.fail_with {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }

    #[test]
    fn explicit_release_happens_once() {
        let alloc = Recorder::default();
        let mut data = [1i32, 2, 3];
        let arr = unsafe { HostArray::from_raw(&alloc, data.as_mut_ptr(), 3) };
        assert_eq!(arr.as_slice().unwrap(), &[1, 2, 3]);
        arr.release().unwrap();
        assert_eq!(alloc.released.borrow().len(), 1);
    }

    #[test]
    fn drop_releases_when_not_released_explicitly() {
        let alloc = Recorder::default();
        let mut data = [7i32];
        {
            let _arr = unsafe { HostArray::from_raw(&alloc, data.as_mut_ptr(), 1) };
        }
        assert_eq!(*alloc.released.borrow(), vec![data.as_mut_ptr() as usize]);
    }

    #[test]
    fn null_with_positive_count_is_rejected() {
        let alloc = Recorder::default();
        let arr = unsafe { HostArray::<i32>::from_raw(&alloc, std::ptr::null_mut(), 3) };
        assert_eq!(arr.as_slice(), Err(SnapshotError::NullWithCount(3)));
        assert!(arr.is_null());
    }

    #[test]
    fn zero_count_is_empty_even_when_null() {
        let alloc = Recorder::default();
        let arr = unsafe { HostArray::<i32>::from_raw(&alloc, std::ptr::null_mut(), 0) };
        assert_eq!(arr.as_slice().unwrap().len(), 0);
    }

    #[test]
    fn negative_count_is_rejected() {
        let alloc = Recorder::default();
        let mut data = [0i32];
        let arr = unsafe { HostArray::from_raw(&alloc, data.as_mut_ptr(), -1) };
        assert_eq!(arr.as_slice(), Err(SnapshotError::NegativeCount(-1)));
    }

    #[test]
    fn release_failure_is_reported() {
        let alloc = Recorder { fail_with: Some(jvmtiError::INVALID_ENVIRONMENT), ..Default::default() };
        let mut data = [0u8];
        let arr = unsafe { HostArray::from_raw(&alloc, data.as_mut_ptr(), 1) };
        assert_eq!(arr.release(), Err(jvmtiError::INVALID_ENVIRONMENT));
        assert_eq!(alloc.released.borrow().len(), 1);
    }

    #[test]
    fn host_str_handles_null() {
        assert!(unsafe { host_str(std::ptr::null()) }.is_none());
        let s = std::ffi::CString::new("com.sun.hotspot.events.X").unwrap();
        assert_eq!(unsafe { host_str(s.as_ptr()) }.unwrap(), "com.sun.hotspot.events.X");
    }
}
