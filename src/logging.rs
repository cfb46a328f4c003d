//! File logging for the `kickoff` binary.
//!
//! Store and composer events go to a daily `kickoff.<date>` file in the
//! platform state directory, never to stdout, so command output stays
//! pipeable. Every line of one invocation shares a session id.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use directories::ProjectDirs;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;

/// Result of initializing the logging system.
pub struct LoggingContext {
    /// Guard that must be held for the application lifetime to ensure logs are flushed.
    pub _guard: WorkerGuard,
    /// The session ID for this invocation.
    pub session_id: String,
    /// The directory where logs are written.
    pub log_directory: PathBuf,
}

/// Error that occurred during logging initialization.
#[derive(Debug)]
pub struct LoggingError {
    pub message: String,
}

impl std::fmt::Display for LoggingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Generates a 6-character random hex session ID.
fn generate_session_id() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    let bytes: [u8; 3] = rng.random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Initializes the logging system.
///
/// `RUST_LOG` wins over `default_level` when set. The returned `WorkerGuard`
/// must be held for the application lifetime.
pub fn init(default_level: &str) -> Result<LoggingContext, LoggingError> {
    let session_id = generate_session_id();

    let project_dirs = ProjectDirs::from("dev", "kickoff", "kickoff").ok_or_else(|| LoggingError {
        message: "Failed to determine platform directories".to_string(),
    })?;

    // macOS: ~/Library/Logs/kickoff/
    // Linux: ~/.local/state/kickoff/
    // Windows: %LocalAppData%\kickoff\
    let log_dir = if cfg!(target_os = "macos") {
        dirs_home_log_dir()
    } else {
        project_dirs
            .state_dir()
            .map(PathBuf::from)
            .or_else(|| Some(project_dirs.data_local_dir().to_path_buf()))
    }
    .ok_or_else(|| LoggingError {
        message: "Failed to determine log directory".to_string(),
    })?;

    fs::create_dir_all(&log_dir).map_err(|e| LoggingError {
        message: format!("Failed to create log directory: {}", e),
    })?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "kickoff");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_span_events(FmtSpan::NONE)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| LoggingError {
            message: format!("Failed to install subscriber: {}", e),
        })?;

    info!(
        session_id = %session_id,
        level = %default_level,
        version = env!("CARGO_PKG_VERSION"),
        "session_start"
    );

    Ok(LoggingContext {
        _guard: guard,
        session_id,
        log_directory: log_dir,
    })
}

/// Gets the macOS ~/Library/Logs/kickoff/ directory.
fn dirs_home_log_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join("Library").join("Logs").join("kickoff"))
}

/// Rotated files are kept this long.
const RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Deletes rotated `kickoff.<date>` files older than seven days.
///
/// Failures are logged and skipped; cleanup never blocks a command.
pub fn cleanup_old_logs(log_dir: &Path) {
    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %log_dir.display(), error = %e, "log_cleanup_read_dir_failed");
            return;
        }
    };

    let now = SystemTime::now();
    let deleted = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_log_file)
        })
        .filter(|path| is_expired(path, now))
        .filter(|path| match fs::remove_file(path) {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "log_delete_failed");
                false
            }
        })
        .count();

    if deleted > 0 {
        debug!(count = deleted, "old_logs_deleted");
    }
}

fn is_expired(path: &Path, now: SystemTime) -> bool {
    match fs::metadata(path).and_then(|m| m.modified()) {
        // Future timestamps count as fresh.
        Ok(modified) => now
            .duration_since(modified)
            .is_ok_and(|age| age > RETENTION),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "log_metadata_failed");
            false
        }
    }
}

/// Rotated log files are named `kickoff.<date>`.
fn is_log_file(name: &str) -> bool {
    name.starts_with("kickoff.") && name != "kickoff"
}
