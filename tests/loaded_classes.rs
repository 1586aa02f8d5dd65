use std::cell::Cell;
use std::collections::HashMap;
use std::ptr;

use jvmti_conformance::checks::loaded_classes::{
    check_loaded_classes, ClassSnapshotSource, LoadedClassExpectations,
};
use jvmti_conformance::error::AgentError;
use jvmti_conformance::report::{Phase, Violation};
use jvmti_conformance::snapshot::{HostAllocator, HostArray};
use jvmti_conformance::sys::jni::{jclass, jint};
use jvmti_conformance::sys::jvmti::jvmtiError;

/// Signatures a HotSpot VM reports once loadedclss002 has started.
const BOOTED: &[&str] = &[
    "Ljava/lang/Object;",
    "[Ljava/lang/Object;",
    "Ljava/lang/String;",
    "Ljava/lang/Class;",
    "[Ljava/lang/String;",
    "Lnsk/jvmti/GetLoadedClasses/loadedclss002;",
    "[Lnsk/jvmti/GetLoadedClasses/loadedclss002;",
    "[Z",
    "[B",
    "[C",
    "[S",
    "[I",
    "[J",
    "[F",
    "[D",
    "[[I",
    "Ljava/lang/invoke/LambdaForm$MH+0x0000000800c01000;",
];

/// A fake VM whose classes are the handles `1..=n`.
struct FakeVm {
    classes: Vec<jclass>,
    signatures: HashMap<usize, String>,
    null_snapshot_count: Option<jint>,
    failing_class: Option<usize>,
    releases: Cell<usize>,
}

impl FakeVm {
    fn with_classes(signatures: &[&str]) -> Self {
        let classes = (1..=signatures.len()).map(|h| h as jclass).collect();
        let signatures = signatures
            .iter()
            .enumerate()
            .map(|(i, s)| (i + 1, s.to_string()))
            .collect();
        FakeVm { classes, signatures, null_snapshot_count: None, failing_class: None, releases: Cell::new(0) }
    }

    fn without(excluded: &[&str]) -> Self {
        let kept: Vec<&str> = BOOTED.iter().copied().filter(|s| !excluded.contains(s)).collect();
        Self::with_classes(&kept)
    }
}

impl HostAllocator for FakeVm {
    fn release(&self, _mem: *mut u8) -> Result<(), jvmtiError> {
        self.releases.set(self.releases.get() + 1);
        Ok(())
    }
}

impl ClassSnapshotSource for FakeVm {
    fn loaded_classes(&self) -> Result<HostArray<'_, jclass>, jvmtiError> {
        let array = match self.null_snapshot_count {
            Some(count) => unsafe { HostArray::from_raw(self, ptr::null_mut(), count) },
            None => unsafe {
                HostArray::from_raw(self, self.classes.as_ptr() as *mut jclass, self.classes.len() as jint)
            },
        };
        Ok(array)
    }

    fn class_signature(&self, klass: jclass) -> Result<String, jvmtiError> {
        let handle = klass as usize;
        if self.failing_class == Some(handle) {
            return Err(jvmtiError::INVALID_CLASS);
        }
        self.signatures.get(&handle).cloned().ok_or(jvmtiError::INVALID_CLASS)
    }
}

fn missing(report: &jvmti_conformance::report::Report) -> Vec<String> {
    report
        .diagnostics()
        .iter()
        .filter_map(|d| match &d.violation {
            Violation::MissingClass { signature } => Some(signature.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn booted_vm_passes() {
    let vm = FakeVm::with_classes(BOOTED);
    let report = check_loaded_classes(&vm, Phase::Live, &LoadedClassExpectations::default()).unwrap();
    assert!(report.passed(), "{:?}", report.diagnostics());
    assert_eq!(report.subject(), "GetLoadedClasses");
    assert_eq!(vm.releases.get(), 1);
}

#[test]
fn every_missing_class_is_reported() {
    let vm = FakeVm::without(&["[Z", "Lnsk/jvmti/GetLoadedClasses/loadedclss002;"]);
    let report = check_loaded_classes(&vm, Phase::Live, &LoadedClassExpectations::default()).unwrap();
    assert!(!report.passed());
    assert_eq!(
        missing(&report),
        vec!["Lnsk/jvmti/GetLoadedClasses/loadedclss002;".to_string(), "[Z".to_string()]
    );
    assert_eq!(vm.releases.get(), 1);
}

#[test]
fn primitive_class_in_snapshot_fails() {
    let mut signatures = BOOTED.to_vec();
    signatures.push("I");
    let vm = FakeVm::with_classes(&signatures);
    let report = check_loaded_classes(&vm, Phase::Live, &LoadedClassExpectations::default()).unwrap();
    assert_eq!(report.diagnostics().len(), 1);
    assert_eq!(report.diagnostics()[0].path, format!("classes[{}]", BOOTED.len()));
    assert_eq!(report.diagnostics()[0].violation, Violation::PrimitiveClass { signature: "I".into() });
}

#[test]
fn empty_snapshot_halts_without_missing_class_noise() {
    let vm = FakeVm::with_classes(&[]);
    let report = check_loaded_classes(&vm, Phase::Live, &LoadedClassExpectations::default()).unwrap();
    assert!(report.is_halted());
    assert_eq!(report.diagnostics().len(), 1);
    assert_eq!(report.diagnostics()[0].violation, Violation::Empty);
    assert_eq!(vm.releases.get(), 1);
}

#[test]
fn null_snapshot_with_count_halts() {
    let mut vm = FakeVm::with_classes(BOOTED);
    vm.null_snapshot_count = Some(5);
    let report = check_loaded_classes(&vm, Phase::Live, &LoadedClassExpectations::default()).unwrap();
    assert!(report.is_halted());
    assert_eq!(report.diagnostics()[0].violation, Violation::NullBuffer { count: 5 });
    assert_eq!(vm.releases.get(), 1);
}

#[test]
fn failing_signature_lookup_still_releases_the_snapshot() {
    let mut vm = FakeVm::with_classes(BOOTED);
    vm.failing_class = Some(3);
    let err = check_loaded_classes(&vm, Phase::Live, &LoadedClassExpectations::default()).unwrap_err();
    assert!(matches!(err, AgentError::Host { call: "GetClassSignature", error: jvmtiError::INVALID_CLASS }));
    assert_eq!(vm.releases.get(), 1);
}

#[test]
fn expectations_follow_the_debuggee() {
    let expected = LoadedClassExpectations::for_debuggee("demo/Main");
    assert!(expected.required().contains(&"[Ldemo/Main;".to_string()));

    let mut signatures = BOOTED.to_vec();
    signatures.extend(["Ldemo/Main;", "[Ldemo/Main;"]);
    let vm = FakeVm::with_classes(&signatures);
    assert!(check_loaded_classes(&vm, Phase::Live, &expected).unwrap().passed());
}
