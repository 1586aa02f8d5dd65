//! Agent option parsing.
//!
//! The option string is whatever follows `=` in `-agentlib:name=...`:
//!
//! ```text
//! -agentlib:extevents001=-waittime=5,-verbose
//! -agentlib:loadedclss002=waittime=1 log=trace
//! ```
//!
//! Options are separated by commas or whitespace and may carry a leading `-`.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::time::Duration;

use thiserror::Error;

use crate::logging;

/// Minutes to wait for the debuggee when no `waittime` is given.
pub const DEFAULT_WAIT_TIME_MINUTES: u64 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("unknown option `{0}`")]
    Unknown(String),
    #[error("option `{0}` needs a value")]
    MissingValue(&'static str),
    #[error("invalid value `{value}` for option `{name}`")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOptions {
    /// Rendezvous timeout in minutes.
    pub wait_time_minutes: u64,
    /// Print detailed dumps of the inspected data.
    pub verbose: bool,
    /// Explicit log level; overrides `verbose`.
    pub log_level: Option<&'static str>,
}

impl Default for AgentOptions {
    fn default() -> Self {
        AgentOptions {
            wait_time_minutes: DEFAULT_WAIT_TIME_MINUTES,
            verbose: false,
            log_level: None,
        }
    }
}

impl AgentOptions {
    pub fn parse(options: &str) -> Result<Self, OptionsError> {
        let mut parsed = AgentOptions::default();

        for token in options.split(|c: char| c == ',' || c.is_whitespace()) {
            let token = token.trim_start_matches('-');
            if token.is_empty() {
                continue;
            }
            let (name, value) = match token.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (token, None),
            };

            match name {
                "verbose" | "printdump" => parsed.verbose = true,
                "waittime" => {
                    let value = value.ok_or(OptionsError::MissingValue("waittime"))?;
                    parsed.wait_time_minutes = value
                        .parse()
                        .ok()
                        .filter(|minutes: &u64| *minutes > 0 && minutes.checked_mul(60).is_some())
                        .ok_or_else(|| OptionsError::InvalidValue { name: "waittime", value: value.to_string() })?;
                }
                "log" => {
                    let value = value.ok_or(OptionsError::MissingValue("log"))?;
                    let level = logging::normalize_level(value)
                        .map_err(|_| OptionsError::InvalidValue { name: "log", value: value.to_string() })?;
                    parsed.log_level = Some(level);
                }
                _ => return Err(OptionsError::Unknown(token.to_string())),
            }
        }

        Ok(parsed)
    }

    /// How long either side of the rendezvous waits for the other.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.wait_time_minutes.saturating_mul(60))
    }

    pub fn effective_log_level(&self) -> &'static str {
        match self.log_level {
            Some(level) => level,
            None if self.verbose => "debug",
            None => "info",
        }
    }
}

/// Copies the raw option string the JVM passes to `Agent_OnLoad`.
///
/// # Safety
/// `options` must be null or a NUL-terminated string.
pub unsafe fn options_from_raw(options: *const c_char) -> String {
    if options.is_null() {
        String::new()
    } else {
        CStr::from_ptr(options).to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_options_use_defaults() {
        let opts = AgentOptions::parse("").unwrap();
        assert_eq!(opts, AgentOptions::default());
        assert_eq!(opts.timeout(), Duration::from_secs(120));
        assert_eq!(opts.effective_log_level(), "info");
    }

    #[test]
    fn harness_style_options() {
        let opts = AgentOptions::parse("-waittime=5,-verbose").unwrap();
        assert_eq!(opts.wait_time_minutes, 5);
        assert!(opts.verbose);
        assert_eq!(opts.effective_log_level(), "debug");
    }

    #[test]
    fn whitespace_separated_options() {
        let opts = AgentOptions::parse("waittime=1  log=TRACE").unwrap();
        assert_eq!(opts.wait_time_minutes, 1);
        assert_eq!(opts.effective_log_level(), "trace");
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(AgentOptions::parse("speed=11"), Err(OptionsError::Unknown("speed=11".into())));
        assert_eq!(AgentOptions::parse("waittime"), Err(OptionsError::MissingValue("waittime")));
        assert!(matches!(
            AgentOptions::parse("waittime=0"),
            Err(OptionsError::InvalidValue { name: "waittime", .. })
        ));
        assert!(matches!(
            AgentOptions::parse("waittime=307445734561825861"),
            Err(OptionsError::InvalidValue { name: "waittime", .. })
        ));
        assert!(matches!(
            AgentOptions::parse("log=loud"),
            Err(OptionsError::InvalidValue { name: "log", .. })
        ));
    }

    #[test]
    fn largest_wait_time_still_has_a_timeout() {
        let max = u64::MAX / 60;
        let opts = AgentOptions::parse(&format!("waittime={max}")).unwrap();
        assert_eq!(opts.timeout(), Duration::from_secs(max * 60));
    }

    #[test]
    fn null_raw_options_are_empty() {
        assert_eq!(unsafe { options_from_raw(std::ptr::null()) }, "");
        let raw = std::ffi::CString::new("verbose").unwrap();
        assert_eq!(unsafe { options_from_raw(raw.as_ptr()) }, "verbose");
    }
}
