use std::cell::{Cell, RefCell};

use jvmti_conformance::checks::field_watch::{
    check_field, record_field_access, set_watch, FieldHandle, FieldNameSource, WatchHost, WatchOutcome,
    WatchedField, WatchedFieldTable, SETFLDW001_FIELDS,
};
use jvmti_conformance::error::AgentError;
use jvmti_conformance::report::Violation;
use jvmti_conformance::sys::jni::{jclass, jfieldID};
use jvmti_conformance::sys::jvmti::jvmtiError;

const DEBUGGEE: &str = "nsk/jvmti/SetFieldAccessWatch/setfldw001";
const HELPER_A: &str = "nsk/jvmti/SetFieldAccessWatch/setfldw001a";
const HELPER_B: &str = "nsk/jvmti/SetFieldAccessWatch/setfldw001b";

/// Class handles are 0x100 * (n + 1); field handles are 0x10 * (index + 1).
fn class_handle(name: &str) -> Option<jclass> {
    [DEBUGGEE, HELPER_A, HELPER_B]
        .iter()
        .position(|c| *c == name)
        .map(|n| (0x100 * (n + 1)) as jclass)
}

fn field_handle(index: usize) -> jfieldID {
    (0x10 * (index + 1)) as jfieldID
}

/// A fake VM that knows the setfldw001 classes and fields.
struct FakeVm {
    table_fields: Vec<WatchedField>,
    watch_result: Option<jvmtiError>,
    resolve_calls: Cell<usize>,
    watches: RefCell<Vec<(usize, FieldHandle)>>,
}

impl FakeVm {
    fn new() -> Self {
        FakeVm {
            table_fields: SETFLDW001_FIELDS.to_vec(),
            watch_result: None,
            resolve_calls: Cell::new(0),
            watches: RefCell::new(Vec::new()),
        }
    }

    fn refusing(error: jvmtiError) -> Self {
        FakeVm { watch_result: Some(error), ..Self::new() }
    }
}

impl WatchHost for FakeVm {
    fn find_class(&self, internal_name: &str) -> Option<jclass> {
        class_handle(internal_name)
    }

    fn resolve_field(&self, _class: jclass, field: &WatchedField) -> Option<FieldHandle> {
        self.resolve_calls.set(self.resolve_calls.get() + 1);
        let index = self.table_fields.iter().position(|f| f == field)?;
        FieldHandle::from_raw(field_handle(index))
    }

    fn set_field_access_watch(&self, class: jclass, field: FieldHandle) -> Result<(), jvmtiError> {
        if let Some(err) = self.watch_result {
            return Err(err);
        }
        self.watches.borrow_mut().push((class as usize, field));
        Ok(())
    }
}

impl FakeVm {
    fn field_at(&self, field: jfieldID) -> Result<&WatchedField, jvmtiError> {
        (field as usize / 0x10)
            .checked_sub(1)
            .and_then(|i| self.table_fields.get(i))
            .ok_or(jvmtiError::INVALID_FIELDID)
    }
}

impl FieldNameSource for FakeVm {
    fn class_name(&self, klass: jclass) -> Result<String, jvmtiError> {
        [DEBUGGEE, HELPER_A, HELPER_B]
            .into_iter()
            .find(|name| class_handle(name) == Some(klass))
            .map(str::to_string)
            .ok_or(jvmtiError::INVALID_CLASS)
    }

    fn field_name(&self, _klass: jclass, field: jfieldID) -> Result<String, jvmtiError> {
        self.field_at(field).map(|f| f.name.to_string())
    }
}

/// Reports a field the table does not watch.
struct StrangerVm;

impl FieldNameSource for StrangerVm {
    fn class_name(&self, _klass: jclass) -> Result<String, jvmtiError> {
        Ok(DEBUGGEE.to_string())
    }

    fn field_name(&self, _klass: jclass, _field: jfieldID) -> Result<String, jvmtiError> {
        Ok("fld9".to_string())
    }
}

#[test]
fn watch_then_access_is_attributed() {
    let table = WatchedFieldTable::default();
    let vm = FakeVm::new();

    assert_eq!(set_watch(&table, &vm, 2, true).unwrap(), WatchOutcome::Installed);
    assert_eq!(vm.watches.borrow().as_slice(), &[(0x100, FieldHandle::from_raw(field_handle(2)).unwrap())]);

    let index = record_field_access(&table, &vm, class_handle(DEBUGGEE).unwrap(), field_handle(2)).unwrap();
    assert_eq!(index, 2);

    let report = check_field(&table, 2, true, true).unwrap();
    assert!(report.passed(), "{:?}", report.diagnostics());
}

#[test]
fn fields_of_helper_classes_are_watched_on_their_own_class() {
    let table = WatchedFieldTable::default();
    let vm = FakeVm::new();

    set_watch(&table, &vm, 3, true).unwrap();
    set_watch(&table, &vm, 4, true).unwrap();
    let classes: Vec<usize> = vm.watches.borrow().iter().map(|(c, _)| *c).collect();
    assert_eq!(classes, vec![0x200, 0x300]);
    assert_eq!(
        record_field_access(&table, &vm, class_handle(HELPER_B).unwrap(), field_handle(4)).unwrap(),
        4
    );
}

#[test]
fn resolved_handle_is_cached() {
    let table = WatchedFieldTable::default();
    let vm = FakeVm::new();

    set_watch(&table, &vm, 0, true).unwrap();
    set_watch(&table, &vm, 0, true).unwrap();
    assert_eq!(vm.resolve_calls.get(), 1);
    assert_eq!(table.resolved(0), FieldHandle::from_raw(field_handle(0)));
}

#[test]
fn missing_capability_is_not_fatal_when_never_granted() {
    let table = WatchedFieldTable::default();
    let vm = FakeVm::refusing(jvmtiError::MUST_POSSESS_CAPABILITY);

    assert_eq!(set_watch(&table, &vm, 1, false).unwrap(), WatchOutcome::CapabilityMissing);
    assert!(check_field(&table, 1, true, false).unwrap().passed());
}

#[test]
fn missing_capability_is_fatal_when_granted() {
    let table = WatchedFieldTable::default();
    let vm = FakeVm::refusing(jvmtiError::MUST_POSSESS_CAPABILITY);

    let err = set_watch(&table, &vm, 1, true).unwrap_err();
    assert!(matches!(
        err,
        AgentError::Host { call: "SetFieldAccessWatch", error: jvmtiError::MUST_POSSESS_CAPABILITY }
    ));
}

#[test]
fn other_watch_errors_are_fatal() {
    let table = WatchedFieldTable::default();
    let vm = FakeVm::refusing(jvmtiError::DUPLICATE);

    assert!(matches!(set_watch(&table, &vm, 0, false), Err(AgentError::Host { .. })));
}

#[test]
fn unknown_index_is_rejected() {
    let table = WatchedFieldTable::default();
    let vm = FakeVm::new();

    assert!(matches!(set_watch(&table, &vm, 7, true), Err(AgentError::UnknownField(7))));
    assert!(matches!(check_field(&table, -1, true, true), Err(AgentError::UnknownField(-1))));
}

#[test]
fn access_without_watch_is_a_violation() {
    let table = WatchedFieldTable::default();
    let vm = FakeVm::new();

    record_field_access(&table, &vm, class_handle(DEBUGGEE).unwrap(), field_handle(0)).unwrap();
    let report = check_field(&table, 0, false, true).unwrap();
    assert_eq!(report.diagnostics().len(), 1);
    assert_eq!(report.diagnostics()[0].violation, Violation::UnexpectedFieldAccess);
}

#[test]
fn no_event_after_watch_is_a_mismatch() {
    let table = WatchedFieldTable::default();
    let vm = FakeVm::new();

    set_watch(&table, &vm, 1, true).unwrap();
    let report = check_field(&table, 1, true, true).unwrap();
    assert_eq!(
        report.diagnostics()[0].violation,
        Violation::FieldMismatch { expected: 0x20, observed: "none".to_string() }
    );
}

#[test]
fn event_for_another_handle_is_a_mismatch() {
    let table = WatchedFieldTable::default();
    let vm = FakeVm::new();

    set_watch(&table, &vm, 2, true).unwrap();
    table.record_access(2, FieldHandle::from_raw(0x99 as jfieldID).unwrap());
    let report = check_field(&table, 2, true, true).unwrap();
    assert_eq!(report.diagnostics().len(), 1);
    assert_eq!(
        report.diagnostics()[0].violation,
        Violation::FieldMismatch { expected: 0x30, observed: "0x99".to_string() }
    );
}

#[test]
fn untouched_unwatched_field_passes() {
    let table = WatchedFieldTable::default();
    assert!(check_field(&table, 3, false, true).unwrap().passed());
}

#[test]
fn access_to_unlisted_field_is_an_error() {
    let table = WatchedFieldTable::default();
    let err = record_field_access(&table, &StrangerVm, class_handle(DEBUGGEE).unwrap(), field_handle(0)).unwrap_err();
    assert!(matches!(err, AgentError::UnexpectedField { ref name, .. } if name == "fld9"));
}

#[test]
fn failing_field_name_lookup_is_a_host_error() {
    let table = WatchedFieldTable::default();
    let vm = FakeVm::new();
    let err = record_field_access(&table, &vm, class_handle(DEBUGGEE).unwrap(), 0xff0 as jfieldID).unwrap_err();
    assert!(matches!(err, AgentError::Host { call: "GetFieldName", error: jvmtiError::INVALID_FIELDID }));
}

#[test]
fn failing_class_lookup_names_get_class_signature() {
    let table = WatchedFieldTable::default();
    let vm = FakeVm::new();
    let err = record_field_access(&table, &vm, 0x999 as jclass, field_handle(0)).unwrap_err();
    assert!(matches!(err, AgentError::Host { call: "GetClassSignature", error: jvmtiError::INVALID_CLASS }));
}
