//! Two-phase rendezvous between the agent thread and the debuggee.
//!
//! The debuggee reaches a sync point through a JNI native and blocks. The
//! agent thread waits for that arrival, runs its check while the debuggee is
//! parked, then resumes it. Rounds are counted so a debuggee may sync more
//! than once per run.
//!
//! ```text
//! debuggee            agent thread
//!    | arrive ----------> wait_for_sync
//!    |  (blocked)          run check
//!    | <---------------- resume
//!    v returns status
//! ```

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, error};
use thiserror::Error;

use crate::status::{TestStatus, STATUS_FAILED, STATUS_PASSED};
use crate::sys::jni::jint;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("debuggee did not reach the sync point within {0:?}")]
    DebuggeeTimeout(Duration),
    #[error("agent did not resume the debuggee within {0:?}")]
    AgentTimeout(Duration),
    #[error("resume requested with no debuggee waiting")]
    NotWaiting,
}

#[derive(Debug, Default)]
struct Rounds {
    /// Times the debuggee has arrived.
    arrived: u64,
    /// Arrivals the agent has picked up.
    accepted: u64,
    /// Arrivals the agent has resumed.
    resumed: u64,
    debuggee_status: jint,
}

#[derive(Debug, Default)]
pub struct Rendezvous {
    rounds: Mutex<Rounds>,
    changed: Condvar,
}

impl Rendezvous {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Rounds> {
        self.rounds.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Agent side: block until the debuggee arrives at its next sync point.
    pub fn wait_for_sync(&self, timeout: Duration) -> Result<(), SyncError> {
        let guard = self.lock();
        let (mut rounds, result) = self
            .changed
            .wait_timeout_while(guard, timeout, |r| r.arrived <= r.accepted)
            .unwrap_or_else(PoisonError::into_inner);
        if result.timed_out() && rounds.arrived <= rounds.accepted {
            return Err(SyncError::DebuggeeTimeout(timeout));
        }
        rounds.accepted += 1;
        debug!("debuggee reached sync point {} with status {}", rounds.accepted, rounds.debuggee_status);
        Ok(())
    }

    /// Agent side: let the waiting debuggee continue.
    pub fn resume(&self) -> Result<(), SyncError> {
        let mut rounds = self.lock();
        if rounds.resumed >= rounds.accepted {
            return Err(SyncError::NotWaiting);
        }
        rounds.resumed += 1;
        self.changed.notify_all();
        Ok(())
    }

    /// Debuggee side: announce arrival with `status`, then block until the
    /// agent resumes this round.
    pub fn arrive(&self, status: jint, timeout: Duration) -> Result<(), SyncError> {
        let mut rounds = self.lock();
        rounds.arrived += 1;
        rounds.debuggee_status = status;
        let round = rounds.arrived;
        self.changed.notify_all();

        let (rounds, result) = self
            .changed
            .wait_timeout_while(rounds, timeout, |r| r.resumed < round)
            .unwrap_or_else(PoisonError::into_inner);
        if result.timed_out() && rounds.resumed < round {
            return Err(SyncError::AgentTimeout(timeout));
        }
        Ok(())
    }

    /// Status the debuggee passed at its latest arrival.
    pub fn debuggee_status(&self) -> jint {
        self.lock().debuggee_status
    }
}

/// Body of `nsk.share.jvmti.DebugeeClass.checkStatus(int)`.
///
/// A failed debuggee status fails the test. Returns the combined status
/// once the agent has resumed the debuggee, or `STATUS_FAILED` on timeout.
pub fn debuggee_check_status(
    rendezvous: &Rendezvous,
    status: &TestStatus,
    debuggee_status: jint,
    timeout: Duration,
) -> jint {
    if debuggee_status != STATUS_PASSED {
        status.fail();
    }
    match rendezvous.arrive(debuggee_status, timeout) {
        Ok(()) => status.code(),
        Err(err) => {
            error!("{}", err);
            status.fail();
            STATUS_FAILED
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const SHORT: Duration = Duration::from_millis(50);
    const LONG: Duration = Duration::from_secs(10);

    #[test]
    fn agent_times_out_without_debuggee() {
        let rv = Rendezvous::new();
        assert_eq!(rv.wait_for_sync(SHORT), Err(SyncError::DebuggeeTimeout(SHORT)));
    }

    #[test]
    fn debuggee_times_out_without_resume() {
        let rv = Rendezvous::new();
        assert_eq!(rv.arrive(STATUS_PASSED, SHORT), Err(SyncError::AgentTimeout(SHORT)));
    }

    #[test]
    fn resume_without_arrival_is_an_error() {
        let rv = Rendezvous::new();
        assert_eq!(rv.resume(), Err(SyncError::NotWaiting));
    }

    #[test]
    fn full_round_trip() {
        let rv = Arc::new(Rendezvous::new());
        let status = Arc::new(TestStatus::new());

        let debuggee = {
            let rv = Arc::clone(&rv);
            let status = Arc::clone(&status);
            thread::spawn(move || debuggee_check_status(&rv, &status, STATUS_PASSED, LONG))
        };

        rv.wait_for_sync(LONG).unwrap();
        status.fail();
        rv.resume().unwrap();

        assert_eq!(debuggee.join().unwrap(), STATUS_FAILED);
    }

    #[test]
    fn two_rounds() {
        let rv = Arc::new(Rendezvous::new());
        let debuggee = {
            let rv = Arc::clone(&rv);
            thread::spawn(move || {
                rv.arrive(STATUS_PASSED, LONG).unwrap();
                rv.arrive(STATUS_PASSED, LONG).unwrap();
            })
        };
        for _ in 0..2 {
            rv.wait_for_sync(LONG).unwrap();
            rv.resume().unwrap();
        }
        debuggee.join().unwrap();
        assert_eq!(rv.resume(), Err(SyncError::NotWaiting));
    }

    #[test]
    fn failed_debuggee_status_fails_the_test() {
        let rv = Arc::new(Rendezvous::new());
        let status = Arc::new(TestStatus::new());
        let debuggee = {
            let rv = Arc::clone(&rv);
            let status = Arc::clone(&status);
            thread::spawn(move || debuggee_check_status(&rv, &status, STATUS_FAILED, LONG))
        };
        rv.wait_for_sync(LONG).unwrap();
        assert_eq!(rv.debuggee_status(), STATUS_FAILED);
        rv.resume().unwrap();
        assert_eq!(debuggee.join().unwrap(), STATUS_FAILED);
        assert!(status.is_failed());
    }
}
