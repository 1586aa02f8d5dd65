//! The single pass/fail status each agent reports back to the harness.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::sys::jni::jint;

pub const STATUS_PASSED: jint = 0;
pub const STATUS_FAILED: jint = 2;

/// Sticky test status: once failed it stays failed.
#[derive(Debug, Default)]
pub struct TestStatus {
    failed: AtomicBool,
}

impl TestStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self) {
        self.failed.store(true, Ordering::SeqCst);
    }

    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// `STATUS_PASSED` or `STATUS_FAILED`.
    pub fn code(&self) -> jint {
        if self.is_failed() { STATUS_FAILED } else { STATUS_PASSED }
    }
}
