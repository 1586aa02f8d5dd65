//! Agent implementations and the context they share.
//!
//! Every agent owns one [`AgentContext`]: the JVMTI environment, the parsed
//! options, the sticky test status and the debuggee rendezvous. Nothing lives
//! in free-standing globals apart from the instance registered with
//! [`export_agent!`](crate::export_agent).

use std::sync::OnceLock;
use std::time::Duration;

use log::{error, info};

use crate::agent_thread::start_agent_thread;
use crate::env::{JniEnv, Jvmti};
use crate::error::AgentError;
use crate::logging;
use crate::options::AgentOptions;
use crate::report::Report;
use crate::status::TestStatus;
use crate::sync::{self, Rendezvous};
use crate::sys::jni;

mod extension_events;
mod field_watch;
mod loaded_classes;

pub use extension_events::ExtensionEventsAgent;
pub use field_watch::FieldWatchAgent;
pub use loaded_classes::LoadedClassesAgent;

#[derive(Default)]
pub struct AgentContext {
    jvmti: OnceLock<Jvmti>,
    options: OnceLock<AgentOptions>,
    status: TestStatus,
    sync: Rendezvous,
}

impl AgentContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses options, starts logging and obtains the JVMTI environment.
    ///
    /// Calling it again (OnAttach after OnLoad) keeps the first options and
    /// environment.
    pub fn initialize(&self, vm: *mut jni::JavaVM, options: &str) -> Result<&Jvmti, AgentError> {
        let parsed = AgentOptions::parse(options)?;
        if let Err(err) = logging::init_logging(parsed.effective_log_level()) {
            eprintln!("# WARNING: agent logging unavailable: {}", err);
        }
        let options = self.options.get_or_init(|| parsed);
        info!("Agent options: waittime={} min, verbose={}", options.wait_time_minutes, options.verbose);

        if let Some(jvmti) = self.jvmti.get() {
            return Ok(jvmti);
        }
        let jvmti = Jvmti::new(vm)
            .map_err(|code| AgentError::Setup(format!("GetEnv(JVMTI_VERSION_1_1) returned {code}")))?;
        Ok(self.jvmti.get_or_init(|| jvmti))
    }

    pub fn jvmti(&self) -> Result<&Jvmti, AgentError> {
        self.jvmti
            .get()
            .ok_or_else(|| AgentError::Setup("JVMTI environment not initialized".to_string()))
    }

    pub fn options(&self) -> &AgentOptions {
        self.options.get_or_init(AgentOptions::default)
    }

    pub fn timeout(&self) -> Duration {
        self.options().timeout()
    }

    pub fn status(&self) -> &TestStatus {
        &self.status
    }

    pub fn rendezvous(&self) -> &Rendezvous {
        &self.sync
    }

    /// Logs `err` and fails the test.
    pub fn fail(&self, err: &AgentError) {
        error!("{}", err);
        self.status.fail();
    }

    /// Folds the outcome of a check into the test status.
    pub fn record(&self, outcome: Result<Report, AgentError>) {
        match outcome {
            Ok(report) if report.passed() => {
                info!("{} check passed in {} phase", report.subject(), report.phase());
            }
            Ok(report) => {
                error!(
                    "{} check failed in {} phase with {} problem(s)",
                    report.subject(),
                    report.phase(),
                    report.diagnostics().len()
                );
                self.status.fail();
            }
            Err(err) => self.fail(&err),
        }
    }

    /// Registers the default callbacks and enables `events` for all threads.
    pub fn enable_events(&self, jvmti: &Jvmti, events: &[u32]) -> Result<(), AgentError> {
        jvmti
            .set_event_callbacks(crate::get_default_callbacks())
            .map_err(AgentError::host("SetEventCallbacks"))?;
        for &event in events {
            jvmti
                .set_event_notification_mode(true, event, std::ptr::null_mut())
                .map_err(AgentError::host("SetEventNotificationMode"))?;
        }
        Ok(())
    }

    /// From `VMInit`: starts the agent thread that will run the live phase.
    pub fn start_live_phase(&self, jni_ptr: *mut jni::JNIEnv, thread_name: &str) {
        let result = self.jvmti().and_then(|jvmti| {
            let jni_env = unsafe { JniEnv::from_raw(jni_ptr) };
            start_agent_thread(jvmti, &jni_env, thread_name)
        });
        if let Err(err) = result {
            self.fail(&err);
        }
    }

    /// Agent thread body: wait for the debuggee, run `check`, resume the
    /// debuggee. The debuggee is resumed even when the check fails.
    pub fn run_live_phase<F>(&self, check: F)
    where
        F: FnOnce(&Jvmti) -> Result<Report, AgentError>,
    {
        info!("Wait for debuggee to become ready");
        if let Err(err) = self.sync.wait_for_sync(self.timeout()) {
            self.fail(&AgentError::from(err));
            return;
        }

        let outcome = self.jvmti().and_then(check);
        self.record(outcome);

        info!("Let debuggee continue");
        if let Err(err) = self.sync.resume() {
            self.fail(&AgentError::from(err));
        }
    }

    /// From `VMDeath`: logs the final verdict.
    pub fn finish(&self) {
        if self.status.is_failed() {
            error!("Test FAILED");
        } else {
            info!("Test PASSED");
        }
    }

    /// Debuggee side of the sync point; see [`sync::debuggee_check_status`].
    pub fn check_status(&self, debuggee_status: jni::jint) -> jni::jint {
        sync::debuggee_check_status(&self.sync, &self.status, debuggee_status, self.timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Phase, Violation};
    use crate::status::{STATUS_FAILED, STATUS_PASSED};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn failing_report_fails_the_status() {
        let ctx = AgentContext::new();
        ctx.record(Ok(Report::new("GetLoadedClasses", Phase::Live)));
        assert!(!ctx.status().is_failed());

        let mut report = Report::new("GetLoadedClasses", Phase::Live);
        report.record("classes", Violation::Empty);
        ctx.record(Ok(report));
        assert!(ctx.status().is_failed());
    }

    #[test]
    fn host_error_fails_the_status() {
        let ctx = AgentContext::new();
        ctx.record(Err(AgentError::Setup("no VM".into())));
        assert_eq!(ctx.status().code(), STATUS_FAILED);
    }

    #[test]
    fn live_phase_without_jvmti_still_resumes_debuggee() {
        let ctx = Arc::new(AgentContext::new());
        let debuggee = {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || ctx.check_status(STATUS_PASSED))
        };
        ctx.run_live_phase(|_| unreachable!("no JVMTI environment in this test"));
        assert_eq!(debuggee.join().unwrap(), STATUS_FAILED);
    }
}
