//! `GetExtensionEvents` validation.
//!
//! Every descriptor must carry a non-empty identifier in the implementation
//! namespace and a non-empty description, and every parameter a non-empty
//! name plus kind and base type inside the JVMTI enum ranges.

use std::ops::RangeInclusive;

use log::{debug, info};

use crate::env::Jvmti;
use crate::error::AgentError;
use crate::report::{Phase, Report, Violation};
use crate::snapshot::{host_str, HostArray, SnapshotError};
use crate::sys::jni::jint;
use crate::sys::jvmti::{self, jvmtiError, jvmtiExtensionEventInfo, jvmtiExtensionParamInfo};

/// Namespace HotSpot uses for its extension events.
pub const HOTSPOT_EXTENSION_PREFIX: &str = "com.sun.hotspot";

pub const PARAM_KIND_RANGE: RangeInclusive<jint> = jvmti::JVMTI_KIND_IN..=jvmti::JVMTI_KIND_OUT_BUF;
pub const PARAM_TYPE_RANGE: RangeInclusive<jint> = jvmti::JVMTI_TYPE_JBYTE..=jvmti::JVMTI_TYPE_JNIENV;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionEventRules {
    /// Substring every identifier must contain.
    pub id_prefix: String,
    pub kinds: RangeInclusive<jint>,
    pub base_types: RangeInclusive<jint>,
}

impl Default for ExtensionEventRules {
    fn default() -> Self {
        ExtensionEventRules {
            id_prefix: HOTSPOT_EXTENSION_PREFIX.to_string(),
            kinds: PARAM_KIND_RANGE,
            base_types: PARAM_TYPE_RANGE,
        }
    }
}

/// Where extension-event snapshots come from.
pub trait ExtensionEventSource {
    fn extension_events(&self) -> Result<HostArray<'_, jvmtiExtensionEventInfo>, jvmtiError>;
}

impl ExtensionEventSource for Jvmti {
    fn extension_events(&self) -> Result<HostArray<'_, jvmtiExtensionEventInfo>, jvmtiError> {
        self.get_extension_events()
    }
}

/// Fetches, validates and releases the extension event list.
///
/// A failing `GetExtensionEvents` or `Deallocate` is an error; everything
/// wrong with the list itself ends up in the report.
pub fn check_extension_events<S>(source: &S, phase: Phase, rules: &ExtensionEventRules) -> Result<Report, AgentError>
where
    S: ExtensionEventSource + ?Sized,
{
    let events = source
        .extension_events()
        .map_err(AgentError::host("GetExtensionEvents"))?;
    info!("In {} phase, GetExtensionEvents returned {} events", phase, events.count());

    let report = validate_extension_events(&events, phase, rules);
    release_extension_events(events).map_err(AgentError::host("Deallocate"))?;
    Ok(report)
}

/// Walks every descriptor and parameter and records each violation.
pub fn validate_extension_events(
    events: &HostArray<'_, jvmtiExtensionEventInfo>,
    phase: Phase,
    rules: &ExtensionEventRules,
) -> Report {
    let mut report = Report::new("GetExtensionEvents", phase);

    let events = match events.as_slice() {
        Ok(events) => events,
        Err(SnapshotError::NullWithCount(count)) => {
            report.halt("extensions", Violation::NullBuffer { count });
            return report;
        }
        Err(SnapshotError::NegativeCount(count)) => {
            report.halt("extensions", Violation::NegativeCount { count });
            return report;
        }
    };

    for (i, event) in events.iter().enumerate() {
        validate_event(&mut report, i, event, rules);
    }
    report
}

fn validate_event(report: &mut Report, i: usize, event: &jvmtiExtensionEventInfo, rules: &ExtensionEventRules) {
    let path = format!("event[{}]", i);
    // SAFETY: the strings belong to the snapshot being validated.
    let id = unsafe { host_str(event.id) };
    let description = unsafe { host_str(event.short_description) };

    debug!("Extension event #{}:", i);
    debug!("  index: {}", event.extension_event_index);
    debug!("  id: {}", id.as_deref().unwrap_or("<null>"));
    debug!("  description: {}", description.as_deref().unwrap_or("<null>"));
    debug!("  param_count: {}", event.param_count);

    match id.as_deref() {
        None => report.record(format!("{path}.id"), Violation::NullAttribute { attribute: "id" }),
        Some("") => report.record(format!("{path}.id"), Violation::EmptyAttribute { attribute: "id" }),
        Some(id) if !id.contains(rules.id_prefix.as_str()) => report.record(
            format!("{path}.id"),
            Violation::MissingNamespace { id: id.to_string(), prefix: rules.id_prefix.clone() },
        ),
        Some(_) => {}
    }

    match description.as_deref() {
        None => report.record(
            format!("{path}.short_description"),
            Violation::NullAttribute { attribute: "short_description" },
        ),
        Some("") => report.record(
            format!("{path}.short_description"),
            Violation::EmptyAttribute { attribute: "short_description" },
        ),
        Some(_) => {}
    }

    if event.param_count < 0 {
        report.record(format!("{path}.param_count"), Violation::NegativeCount { count: event.param_count });
        return;
    }
    if event.param_count == 0 {
        return;
    }
    if event.params.is_null() {
        report.record(format!("{path}.params"), Violation::NullAttribute { attribute: "params" });
        return;
    }

    // SAFETY: non-null with a positive count, owned by the snapshot.
    let params = unsafe { std::slice::from_raw_parts(event.params, event.param_count as usize) };
    for (j, param) in params.iter().enumerate() {
        validate_param(report, &format!("{path}.params[{j}]"), param, rules);
    }
}

fn validate_param(report: &mut Report, path: &str, param: &jvmtiExtensionParamInfo, rules: &ExtensionEventRules) {
    let name = unsafe { host_str(param.name) };
    debug!(
        "    param {}: name={} kind={} base_type={} null_ok={}",
        path,
        name.as_deref().unwrap_or("<null>"),
        param.kind,
        param.base_type,
        param.null_ok
    );

    match name.as_deref() {
        None => report.record(format!("{path}.name"), Violation::NullAttribute { attribute: "name" }),
        Some("") => report.record(format!("{path}.name"), Violation::EmptyAttribute { attribute: "name" }),
        Some(_) => {}
    }

    if !rules.kinds.contains(&param.kind) {
        report.record(
            format!("{path}.kind"),
            Violation::KindOutOfRange { value: param.kind, min: *rules.kinds.start(), max: *rules.kinds.end() },
        );
    }
    if !rules.base_types.contains(&param.base_type) {
        report.record(
            format!("{path}.base_type"),
            Violation::BaseTypeOutOfRange {
                value: param.base_type,
                min: *rules.base_types.start(),
                max: *rules.base_types.end(),
            },
        );
    }
}

/// Returns the list and every nested allocation to the host.
///
/// Each descriptor's id, description, parameter names and parameter array
/// are released before the list itself. All releases are attempted; the
/// first failure is reported.
pub fn release_extension_events(events: HostArray<'_, jvmtiExtensionEventInfo>) -> Result<(), jvmtiError> {
    let alloc = events.allocator();
    let mut first_error = None;
    let mut release = |mem: *mut u8| {
        if mem.is_null() {
            return;
        }
        if let Err(err) = alloc.release(mem) {
            first_error.get_or_insert(err);
        }
    };

    if let Ok(slice) = events.as_slice() {
        for event in slice {
            release(event.id as *mut u8);
            release(event.short_description as *mut u8);
            if event.param_count > 0 && !event.params.is_null() {
                // SAFETY: same bounds as during validation.
                let params = unsafe { std::slice::from_raw_parts(event.params, event.param_count as usize) };
                for param in params {
                    release(param.name as *mut u8);
                }
            }
            release(event.params as *mut u8);
        }
    }

    let list_result = events.release();
    match first_error {
        Some(err) => Err(err),
        None => list_result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::ffi::CString;
    use std::ptr;

    use crate::snapshot::HostAllocator;

    #[derive(Default)]
    struct CountingAllocator {
        calls: Cell<usize>,
    }

    impl HostAllocator for CountingAllocator {
        fn release(&self, _mem: *mut u8) -> Result<(), jvmtiError> {
            self.calls.set(self.calls.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn null_list_with_count_halts_before_touching_elements() {
        let alloc = CountingAllocator::default();
        let events = unsafe { HostArray::<jvmtiExtensionEventInfo>::from_raw(&alloc, ptr::null_mut(), 3) };
        let report = validate_extension_events(&events, Phase::Live, &ExtensionEventRules::default());
        assert!(report.is_halted());
        assert_eq!(report.diagnostics()[0].violation, Violation::NullBuffer { count: 3 });

        release_extension_events(events).unwrap();
        assert_eq!(alloc.calls.get(), 1);
    }

    #[test]
    fn empty_list_passes() {
        let alloc = CountingAllocator::default();
        let events = unsafe { HostArray::<jvmtiExtensionEventInfo>::from_raw(&alloc, ptr::null_mut(), 0) };
        let report = validate_extension_events(&events, Phase::OnLoad, &ExtensionEventRules::default());
        assert!(report.passed());
    }

    #[test]
    fn nested_strings_are_released() {
        let alloc = CountingAllocator::default();
        let id = CString::new("com.sun.hotspot.events.VirtualThreadMount").unwrap();
        let desc = CString::new("VirtualThreadMount").unwrap();
        let name = CString::new("JNI Environment").unwrap();
        let mut params = [jvmtiExtensionParamInfo {
            name: name.as_ptr() as *mut _,
            kind: jvmti::JVMTI_KIND_IN_PTR,
            base_type: jvmti::JVMTI_TYPE_JNIENV,
            null_ok: 0,
        }];
        let mut list = [jvmtiExtensionEventInfo {
            extension_event_index: 0,
            id: id.as_ptr() as *mut _,
            short_description: desc.as_ptr() as *mut _,
            param_count: 1,
            params: params.as_mut_ptr(),
        }];
        let events = unsafe { HostArray::from_raw(&alloc, list.as_mut_ptr(), 1) };
        assert!(validate_extension_events(&events, Phase::Live, &ExtensionEventRules::default()).passed());

        release_extension_events(events).unwrap();
        // id, description, param name, param array, list
        assert_eq!(alloc.calls.get(), 5);
    }
}
