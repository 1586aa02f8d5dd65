//! Log bootstrap for agents running inside the JVM process.
//!
//! Agents write to stderr so their output interleaves with the harness log.
//! Several agents may share a process; the first one to initialize picks
//! the level and later calls are accepted without touching the backend.

use std::sync::Mutex;

use flexi_logger::{DeferredNow, Logger, LoggerHandle, WriteMode};
use log::{debug, error, Record};

const MAX_PANIC_PAYLOAD_CHARS: usize = 200;

static LOGGING_STATE: Mutex<Option<LoggingState>> = Mutex::new(None);

struct LoggingState {
    level: &'static str,
    _logger: LoggerHandle,
}

/// Starts the stderr logger at `level` (`trace|debug|info|warn|error`).
///
/// Idempotent. Returns a human-readable error when the level is unknown or
/// another logger already owns the `log` facade.
pub fn init_logging(level: &str) -> Result<(), String> {
    let level = normalize_level(level)?;
    let mut state = LOGGING_STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(active) = state.as_ref() {
        if active.level != level {
            debug!("logging already initialized at `{}`; ignoring `{}`", active.level, level);
        }
        return Ok(());
    }

    let logger = Logger::try_with_str(level)
        .map_err(|err| format!("invalid log level `{level}`: {err}"))?
        .log_to_stderr()
        .write_mode(WriteMode::Direct)
        .format(agent_format)
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))?;

    install_panic_hook();
    *state = Some(LoggingState { level, _logger: logger });
    Ok(())
}

/// Level the logger was started with, if it was.
pub fn active_level() -> Option<&'static str> {
    LOGGING_STATE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .as_ref()
        .map(|state| state.level)
}

/// `# LEVEL [target] message`, the shape the test harness greps for.
fn agent_format(
    w: &mut dyn std::io::Write,
    _now: &mut DeferredNow,
    record: &Record,
) -> std::io::Result<()> {
    write!(w, "# {:<5} [{}] {}", record.level(), record.target(), record.args())
}

pub(crate) fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}

// A panic inside a JVM callback aborts the process; get it into the log first.
fn install_panic_hook() {
    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        error!("agent panic at {}: {}", location, panic_payload_summary(panic_info));
        previous_hook(panic_info);
    }));
}

fn panic_payload_summary(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };
    payload.replace(['\n', '\r'], " ").chars().take(MAX_PANIC_PAYLOAD_CHARS).collect()
}
