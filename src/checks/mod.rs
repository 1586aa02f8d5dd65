//! The conformance checks, one module per JVMTI function under test.
//!
//! Each check talks to the VM through a small trait so it can be driven by
//! a mock in tests.

pub mod extension_events;
pub mod field_watch;
pub mod loaded_classes;

pub use extension_events::{check_extension_events, ExtensionEventRules, ExtensionEventSource};
pub use field_watch::{check_field, record_field_access, set_watch, WatchHost, WatchOutcome, WatchedFieldTable};
pub use loaded_classes::{check_loaded_classes, ClassSnapshotSource, LoadedClassExpectations};
