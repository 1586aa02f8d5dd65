//! Field access watches and attribution of `FieldAccess` events.
//!
//! A [`WatchedFieldTable`] maps a small integer index (the one the Java side
//! passes to its natives) to a field. Registering a watch resolves and caches
//! the field handle; the `FieldAccess` trap looks the field up by declaring
//! class and name and records the handle it was given; `check_field` then
//! compares the two.

use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info};

use crate::env::{JniEnv, Jvmti};
use crate::error::AgentError;
use crate::report::{Phase, Report, Violation};
use crate::signature::internal_name;
use crate::sys::jni::{jclass, jfieldID, jint};
use crate::sys::jvmti::jvmtiError;

/// Opaque, non-null field handle (`jfieldID`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldHandle(usize);

impl FieldHandle {
    pub fn from_raw(field: jfieldID) -> Option<FieldHandle> {
        if field.is_null() { None } else { Some(FieldHandle(field as usize)) }
    }

    pub fn as_raw(self) -> jfieldID {
        self.0 as jfieldID
    }

    fn from_slot(value: usize) -> Option<FieldHandle> {
        if value == 0 { None } else { Some(FieldHandle(value)) }
    }
}

/// A field the test watches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedField {
    /// Internal name of the declaring class.
    pub class: &'static str,
    pub name: &'static str,
    pub signature: &'static str,
    pub is_static: bool,
}

const SETFLDW001: &str = "nsk/jvmti/SetFieldAccessWatch/setfldw001";
const SETFLDW001A: &str = "nsk/jvmti/SetFieldAccessWatch/setfldw001a";
const SETFLDW001B: &str = "nsk/jvmti/SetFieldAccessWatch/setfldw001b";

/// Fields of the `setfldw001` debuggee, in native index order.
pub const SETFLDW001_FIELDS: [WatchedField; 5] = [
    WatchedField { class: SETFLDW001, name: "fld0", signature: "I", is_static: false },
    WatchedField { class: SETFLDW001, name: "fld1", signature: "I", is_static: true },
    WatchedField {
        class: SETFLDW001,
        name: "fld2",
        signature: "Lnsk/jvmti/SetFieldAccessWatch/setfldw001a;",
        is_static: false,
    },
    WatchedField { class: SETFLDW001A, name: "fld3", signature: "[I", is_static: false },
    WatchedField { class: SETFLDW001B, name: "fld4", signature: "F", is_static: false },
];

#[derive(Debug, Default)]
struct Slot {
    resolved: AtomicUsize,
    observed: AtomicUsize,
}

/// Fixed table of watched fields with per-slot atomics, safe to update from
/// trap callbacks on any thread.
#[derive(Debug)]
pub struct WatchedFieldTable {
    fields: Vec<WatchedField>,
    slots: Vec<Slot>,
}

impl WatchedFieldTable {
    pub fn new(fields: Vec<WatchedField>) -> Self {
        let slots = fields.iter().map(|_| Slot::default()).collect();
        WatchedFieldTable { fields, slots }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Converts a native-side index, rejecting anything out of range.
    pub fn index(&self, index: jint) -> Result<usize, AgentError> {
        usize::try_from(index)
            .ok()
            .filter(|&i| i < self.fields.len())
            .ok_or(AgentError::UnknownField(index))
    }

    pub fn field(&self, index: usize) -> Option<&WatchedField> {
        self.fields.get(index)
    }

    /// Index of the field declared by `class` (internal name) called `name`.
    pub fn index_of(&self, class: &str, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.class == class && f.name == name)
    }

    /// Handle resolved when the watch was registered.
    pub fn resolved(&self, index: usize) -> Option<FieldHandle> {
        self.slots.get(index).and_then(|s| FieldHandle::from_slot(s.resolved.load(Ordering::Acquire)))
    }

    /// Handle reported by the last access event for this field.
    pub fn observed(&self, index: usize) -> Option<FieldHandle> {
        self.slots.get(index).and_then(|s| FieldHandle::from_slot(s.observed.load(Ordering::Acquire)))
    }

    fn cache_resolved(&self, index: usize, handle: FieldHandle) {
        if let Some(slot) = self.slots.get(index) {
            slot.resolved.store(handle.0, Ordering::Release);
        }
    }

    pub fn record_access(&self, index: usize, handle: FieldHandle) {
        if let Some(slot) = self.slots.get(index) {
            slot.observed.store(handle.0, Ordering::Release);
        }
    }
}

impl Default for WatchedFieldTable {
    fn default() -> Self {
        Self::new(SETFLDW001_FIELDS.to_vec())
    }
}

// =============================================================================
// Host seams
// =============================================================================

/// What registering a watch needs from the VM.
pub trait WatchHost {
    fn find_class(&self, internal_name: &str) -> Option<jclass>;
    fn resolve_field(&self, class: jclass, field: &WatchedField) -> Option<FieldHandle>;
    fn set_field_access_watch(&self, class: jclass, field: FieldHandle) -> Result<(), jvmtiError>;
}

/// What the access trap needs to identify a field.
pub trait FieldNameSource {
    /// Internal name of `klass` (`GetClassSignature`).
    fn class_name(&self, klass: jclass) -> Result<String, jvmtiError>;
    /// Name of `field` declared by `klass` (`GetFieldName`).
    fn field_name(&self, klass: jclass, field: jfieldID) -> Result<String, jvmtiError>;
}

/// JNI lookups plus JVMTI watch registration, used from JNI natives.
pub struct JniWatchHost<'a> {
    pub jni: &'a JniEnv,
    pub jvmti: &'a Jvmti,
}

impl WatchHost for JniWatchHost<'_> {
    fn find_class(&self, internal_name: &str) -> Option<jclass> {
        let class = self.jni.find_class(internal_name);
        if class.is_none() {
            self.jni.clear_pending_exception();
        }
        class
    }

    fn resolve_field(&self, class: jclass, field: &WatchedField) -> Option<FieldHandle> {
        let raw = if field.is_static {
            self.jni.get_static_field_id(class, field.name, field.signature)
        } else {
            self.jni.get_field_id(class, field.name, field.signature)
        };
        if raw.is_none() {
            self.jni.clear_pending_exception();
        }
        raw.and_then(FieldHandle::from_raw)
    }

    fn set_field_access_watch(&self, class: jclass, field: FieldHandle) -> Result<(), jvmtiError> {
        self.jvmti.set_field_access_watch(class, field.as_raw())
    }
}

impl FieldNameSource for Jvmti {
    fn class_name(&self, klass: jclass) -> Result<String, jvmtiError> {
        let (signature, _) = self.get_class_signature(klass)?;
        Ok(internal_name(&signature).unwrap_or(&signature).to_string())
    }

    fn field_name(&self, klass: jclass, field: jfieldID) -> Result<String, jvmtiError> {
        self.get_field_name(klass, field).map(|(name, _, _)| name)
    }
}

// =============================================================================
// Operations
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    Installed,
    /// The VM refused for lack of a capability that was never granted.
    CapabilityMissing,
}

/// Resolves field `index` and asks the VM to watch it.
///
/// `JVMTI_ERROR_MUST_POSSESS_CAPABILITY` is expected when field access events
/// were not granted; any other failure is an error.
pub fn set_watch<H>(table: &WatchedFieldTable, host: &H, index: jint, access_events_granted: bool) -> Result<WatchOutcome, AgentError>
where
    H: WatchHost + ?Sized,
{
    let i = table.index(index)?;
    let field = table.field(i).ok_or(AgentError::UnknownField(index))?;

    let class = host
        .find_class(field.class)
        .ok_or_else(|| AgentError::ClassNotFound(field.class.to_string()))?;

    let handle = match table.resolved(i) {
        Some(handle) => handle,
        None => {
            let handle = host.resolve_field(class, field).ok_or_else(|| AgentError::FieldNotFound {
                class: field.class.to_string(),
                name: field.name.to_string(),
            })?;
            table.cache_resolved(i, handle);
            handle
        }
    };

    match host.set_field_access_watch(class, handle) {
        Ok(()) => {
            debug!("Watch set on {}.{} (#{})", field.class, field.name, i);
            Ok(WatchOutcome::Installed)
        }
        Err(jvmtiError::MUST_POSSESS_CAPABILITY) if !access_events_granted => {
            debug!("SetFieldAccessWatch #{}: capability not granted, as expected", i);
            Ok(WatchOutcome::CapabilityMissing)
        }
        Err(error) => Err(AgentError::Host { call: "SetFieldAccessWatch", error }),
    }
}

/// Body of the `FieldAccess` callback: attribute the event to a table entry
/// and remember the handle the VM reported. Returns the entry's index.
pub fn record_field_access<S>(table: &WatchedFieldTable, source: &S, klass: jclass, field: jfieldID) -> Result<usize, AgentError>
where
    S: FieldNameSource + ?Sized,
{
    let class = source.class_name(klass).map_err(AgentError::host("GetClassSignature"))?;
    let name = source.field_name(klass, field).map_err(AgentError::host("GetFieldName"))?;
    let index = table
        .index_of(&class, &name)
        .ok_or(AgentError::UnexpectedField { class, name })?;

    if let Some(handle) = FieldHandle::from_raw(field) {
        table.record_access(index, handle);
    }
    debug!("FieldAccess event for #{}", index);
    Ok(index)
}

/// Compares what the trap recorded for `index` with what was resolved.
///
/// With `expect_watch` false no event may have been seen; with it true the
/// recorded handle must be the resolved one. Without the capability nothing
/// can be checked and the report is empty.
pub fn check_field(table: &WatchedFieldTable, index: jint, expect_watch: bool, access_events_granted: bool) -> Result<Report, AgentError> {
    let i = table.index(index)?;
    let mut report = Report::new("FieldAccess", Phase::Live);
    if !access_events_granted {
        return Ok(report);
    }

    let path = format!("field[{i}]");
    let observed = table.observed(i);
    if !expect_watch {
        if observed.is_some() {
            report.record(path, Violation::UnexpectedFieldAccess);
        }
    } else if observed != table.resolved(i) {
        report.record(
            path,
            Violation::FieldMismatch {
                expected: table.resolved(i).map_or(0, |h| h.0),
                observed: observed.map_or_else(|| "none".to_string(), |h| format!("{:#x}", h.0)),
            },
        );
    } else {
        info!("Field #{} access attributed correctly", i);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_lookup_by_class_and_name() {
        let table = WatchedFieldTable::default();
        assert_eq!(table.len(), 5);
        assert_eq!(table.index_of(SETFLDW001, "fld2"), Some(2));
        assert_eq!(table.index_of(SETFLDW001B, "fld4"), Some(4));
        assert_eq!(table.index_of(SETFLDW001A, "fld4"), None);
        assert_eq!(table.index_of(SETFLDW001, "fld9"), None);
    }

    #[test]
    fn index_bounds() {
        let table = WatchedFieldTable::default();
        assert_eq!(table.index(4).unwrap(), 4);
        assert!(matches!(table.index(5), Err(AgentError::UnknownField(5))));
        assert!(matches!(table.index(-1), Err(AgentError::UnknownField(-1))));
    }

    #[test]
    fn table_signatures_parse() {
        for field in SETFLDW001_FIELDS.iter() {
            crate::signature::TypeSignature::parse(field.signature).unwrap();
        }
    }

    #[test]
    fn handles_start_empty() {
        let table = WatchedFieldTable::default();
        assert_eq!(table.resolved(0), None);
        assert_eq!(table.observed(0), None);
        assert!(FieldHandle::from_raw(std::ptr::null_mut()).is_none());
    }
}
