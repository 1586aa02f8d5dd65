//! Diagnostics and verdicts produced by the checks.
//!
//! A [`Report`] collects every structural problem found in one snapshot
//! instead of stopping at the first. Each record is logged as it is made, so
//! the test log shows the complete list even if the agent dies afterwards.

use std::fmt;

use log::error;
use thiserror::Error;

use crate::sys::jni::jint;
use crate::sys::jvmti;

/// JVMTI execution phase a check ran in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    OnLoad,
    Primordial,
    Start,
    Live,
    Dead,
}

impl Phase {
    pub fn from_jvmti(phase: jint) -> Option<Phase> {
        match phase {
            jvmti::JVMTI_PHASE_ONLOAD => Some(Phase::OnLoad),
            jvmti::JVMTI_PHASE_PRIMORDIAL => Some(Phase::Primordial),
            jvmti::JVMTI_PHASE_START => Some(Phase::Start),
            jvmti::JVMTI_PHASE_LIVE => Some(Phase::Live),
            jvmti::JVMTI_PHASE_DEAD => Some(Phase::Dead),
            _ => None,
        }
    }

    /// Phase a `GetPhase` call reported, or `fallback` when it failed or
    /// returned an unknown value.
    pub fn reported(phase: Result<jint, jvmti::jvmtiError>, fallback: Phase) -> Phase {
        phase.ok().and_then(Phase::from_jvmti).unwrap_or(fallback)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::OnLoad => "OnLoad",
            Phase::Primordial => "primordial",
            Phase::Start => "start",
            Phase::Live => "live",
            Phase::Dead => "dead",
        })
    }
}

/// Structurally invalid data returned by the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("expected a buffer, got null with count {count}")]
    NullBuffer { count: jint },
    #[error("expected a non-negative count, got {count}")]
    NegativeCount { count: jint },
    #[error("expected at least one element, got none")]
    Empty,
    #[error("expected non-null {attribute}, got null")]
    NullAttribute { attribute: &'static str },
    #[error("expected non-empty {attribute}, got \"\"")]
    EmptyAttribute { attribute: &'static str },
    #[error("expected an identifier containing \"{prefix}\", got \"{id}\"")]
    MissingNamespace { id: String, prefix: String },
    #[error("expected parameter kind in [{min}, {max}], got {value}")]
    KindOutOfRange { value: jint, min: jint, max: jint },
    #[error("expected parameter base type in [{min}, {max}], got {value}")]
    BaseTypeOutOfRange { value: jint, min: jint, max: jint },
    #[error("expected class {signature} to be loaded, not found")]
    MissingClass { signature: String },
    #[error("expected no primitive class, got {signature}")]
    PrimitiveClass { signature: String },
    #[error("expected a type signature, got \"{signature}\"")]
    MalformedSignature { signature: String },
    #[error("FIELD_ACCESS event without access watch set")]
    UnexpectedFieldAccess,
    #[error("expected field handle {expected:#x}, got {observed}")]
    FieldMismatch { expected: usize, observed: String },
}

/// One violation and where it was found (`event[2].params[0].kind`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub path: String,
    pub violation: Violation,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.violation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Failed,
}

/// The outcome of validating one snapshot.
#[derive(Debug)]
pub struct Report {
    subject: &'static str,
    phase: Phase,
    diagnostics: Vec<Diagnostic>,
    halted: bool,
}

impl Report {
    pub fn new(subject: &'static str, phase: Phase) -> Self {
        Report { subject, phase, diagnostics: Vec::new(), halted: false }
    }

    pub fn subject(&self) -> &'static str {
        self.subject
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Records a violation and keeps going.
    pub fn record(&mut self, path: impl Into<String>, violation: Violation) {
        let diagnostic = Diagnostic { path: path.into(), violation };
        error!("In {} phase, {} returned {}", self.phase, self.subject, diagnostic);
        self.diagnostics.push(diagnostic);
    }

    /// Records a violation that makes the rest of the snapshot unreadable.
    pub fn halt(&mut self, path: impl Into<String>, violation: Violation) {
        self.record(path, violation);
        self.halted = true;
    }

    /// True when the scan stopped before visiting every element.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn verdict(&self) -> Verdict {
        if self.diagnostics.is_empty() {
            Verdict::Passed
        } else {
            Verdict::Failed
        }
    }

    pub fn passed(&self) -> bool {
        self.verdict() == Verdict::Passed
    }
}
