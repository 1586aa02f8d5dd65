//! `GetLoadedClasses` validation.
//!
//! The snapshot must contain the debuggee class, `java.lang.Object`, arrays
//! of both and the eight primitive array classes. Primitive types have no
//! `Class` loaded on their own and must never show up.

use std::collections::HashSet;

use log::{debug, info};

use crate::env::Jvmti;
use crate::error::AgentError;
use crate::report::{Phase, Report, Violation};
use crate::signature::{class_signature, Primitive, TypeSignature};
use crate::snapshot::{HostArray, SnapshotError};
use crate::sys::jni::jclass;
use crate::sys::jvmti::jvmtiError;

/// Internal name of the debuggee class of the `loadedclss002` test.
pub const LOADEDCLSS002_DEBUGGEE: &str = "nsk/jvmti/GetLoadedClasses/loadedclss002";

/// Where loaded-class snapshots and their signatures come from.
pub trait ClassSnapshotSource {
    fn loaded_classes(&self) -> Result<HostArray<'_, jclass>, jvmtiError>;
    fn class_signature(&self, klass: jclass) -> Result<String, jvmtiError>;
}

impl ClassSnapshotSource for Jvmti {
    fn loaded_classes(&self) -> Result<HostArray<'_, jclass>, jvmtiError> {
        self.get_loaded_classes()
    }

    fn class_signature(&self, klass: jclass) -> Result<String, jvmtiError> {
        self.get_class_signature(klass).map(|(signature, _generic)| signature)
    }
}

/// Signatures that must appear in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedClassExpectations {
    required: Vec<String>,
}

impl LoadedClassExpectations {
    /// The debuggee, `Object`, one-dimensional arrays of both, and every
    /// primitive array class.
    pub fn for_debuggee(internal_name: &str) -> Self {
        let debuggee = class_signature(internal_name);
        let object = class_signature("java/lang/Object");
        let mut required = vec![
            debuggee.clone(),
            format!("[{debuggee}"),
            object.clone(),
            format!("[{object}"),
        ];
        required.extend(Primitive::ALL.iter().map(|p| format!("[{}", p.descriptor())));
        LoadedClassExpectations { required }
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }
}

impl Default for LoadedClassExpectations {
    fn default() -> Self {
        Self::for_debuggee(LOADEDCLSS002_DEBUGGEE)
    }
}

/// Fetches the loaded classes, resolves each signature, and checks them.
///
/// The snapshot is released on every path. A failing `GetClassSignature`
/// aborts the check with an error.
pub fn check_loaded_classes<S>(source: &S, phase: Phase, expectations: &LoadedClassExpectations) -> Result<Report, AgentError>
where
    S: ClassSnapshotSource + ?Sized,
{
    let mut report = Report::new("GetLoadedClasses", phase);
    let snapshot = source.loaded_classes().map_err(AgentError::host("GetLoadedClasses"))?;
    info!("In {} phase, GetLoadedClasses returned {} classes", phase, snapshot.count());

    let classes = match snapshot.as_slice() {
        Ok([]) => {
            report.halt("classes", Violation::Empty);
            &[][..]
        }
        Ok(classes) => classes,
        Err(SnapshotError::NullWithCount(count)) => {
            report.halt("classes", Violation::NullBuffer { count });
            &[][..]
        }
        Err(SnapshotError::NegativeCount(count)) => {
            report.halt("classes", Violation::NegativeCount { count });
            &[][..]
        }
    };

    let mut seen = HashSet::with_capacity(classes.len());
    for (i, &klass) in classes.iter().enumerate() {
        let signature = source
            .class_signature(klass)
            .map_err(AgentError::host("GetClassSignature"))?;
        debug!("    class[{}]: {}", i, signature);
        classify(&mut report, i, &signature);
        seen.insert(signature);
    }

    if !report.is_halted() {
        for required in expectations.required() {
            if seen.contains(required) {
                debug!("Found expected class: {}", required);
            } else {
                report.record("classes", Violation::MissingClass { signature: required.clone() });
            }
        }
    }

    snapshot.release().map_err(AgentError::host("Deallocate"))?;
    Ok(report)
}

fn classify(report: &mut Report, i: usize, signature: &str) {
    match TypeSignature::parse(signature) {
        Ok(TypeSignature::Primitive(_)) => report.record(
            format!("classes[{i}]"),
            Violation::PrimitiveClass { signature: signature.to_string() },
        ),
        Ok(_) => {}
        Err(_) => report.record(
            format!("classes[{i}]"),
            Violation::MalformedSignature { signature: signature.to_string() },
        ),
    }
}
