//! Process-wide diagnostic logging.
//!
//! # Responsibility
//! - Start the rolling file logger from a [`LogConfig`] at most once.
//! - Keep diagnostic events metadata-only: ids, counts and durations, never
//!   skill text or raw queries.
//!
//! # Invariants
//! - A second start with the same level and directory is a no-op.
//! - A second start with a different level or directory is rejected; the
//!   running logger is never swapped.
//! - Starting the logger never panics.

use crate::config::LogConfig;
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::PanicHookInfo;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "skillbase";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_LOG_FILES: usize = 5;
const PANIC_PAYLOAD_MAX_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

struct ActiveLogger {
    settings: LogSettings,
    _handle: LoggerHandle,
}

/// Validated logger settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: &'static str,
    pub dir: PathBuf,
}

/// Outcome of [`init_logging`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingStatus {
    /// No directory configured; the logger was left alone.
    Disabled,
    Active(LogSettings),
}

#[derive(Debug)]
pub enum LoggingError {
    InvalidLevel(String),
    InvalidDir(String),
    CreateDir {
        dir: PathBuf,
        source: std::io::Error,
    },
    Backend(flexi_logger::FlexiLoggerError),
    /// A logger with other settings is already running.
    Conflict {
        active: LogSettings,
        requested: LogSettings,
    },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::InvalidDir(message) => write!(f, "invalid log dir: {message}"),
            Self::CreateDir { dir, source } => {
                write!(f, "cannot create log dir `{}`: {source}", dir.display())
            }
            Self::Backend(err) => write!(f, "logger backend failed to start: {err}"),
            Self::Conflict { active, requested } => write!(
                f,
                "logging already runs at level `{}` in `{}`; refusing level `{}` in `{}`",
                active.level,
                active.dir.display(),
                requested.level,
                requested.dir.display()
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

/// Starts file logging when `config.dir` is set.
///
/// # Errors
/// - Unknown level, relative or blank directory.
/// - Directory creation or backend start failure.
/// - A logger with different settings is already running.
pub fn init_logging(config: &LogConfig) -> Result<LoggingStatus, LoggingError> {
    let Some(dir) = config.dir.as_deref() else {
        return Ok(LoggingStatus::Disabled);
    };
    let requested = LogSettings {
        level: normalize_level(&config.level)?,
        dir: normalize_log_dir(dir)?,
    };

    let active = ACTIVE.get_or_try_init(|| start_logger(&requested))?;
    if active.settings != requested {
        return Err(LoggingError::Conflict {
            active: active.settings.clone(),
            requested,
        });
    }
    Ok(LoggingStatus::Active(requested))
}

/// Settings of the running logger, `None` before the first successful start.
pub fn logging_status() -> Option<LogSettings> {
    ACTIVE.get().map(|active| active.settings.clone())
}

/// `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

/// Maps a level name (case-insensitive, `warning` accepted) to its canonical
/// form.
pub(crate) fn normalize_level(level: &str) -> Result<&'static str, LoggingError> {
    let lowered = level.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        _ => Err(LoggingError::InvalidLevel(lowered)),
    }
}

fn normalize_log_dir(dir: &Path) -> Result<PathBuf, LoggingError> {
    if dir.as_os_str().is_empty() {
        return Err(LoggingError::InvalidDir("directory is empty".to_string()));
    }
    if !dir.is_absolute() {
        return Err(LoggingError::InvalidDir(format!(
            "`{}` is not absolute",
            dir.display()
        )));
    }
    Ok(dir.to_path_buf())
}

fn start_logger(settings: &LogSettings) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(&settings.dir).map_err(|source| LoggingError::CreateDir {
        dir: settings.dir.clone(),
        source,
    })?;

    let handle = Logger::try_with_str(settings.level)
        .map_err(LoggingError::Backend)?
        .log_to_file(
            FileSpec::default()
                .directory(settings.dir.as_path())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(LoggingError::Backend)?;

    PANIC_HOOK.get_or_init(install_panic_hook);
    info!(
        "event=core_init module=logging status=ok level={} platform={} version={}",
        settings.level,
        std::env::consts::OS,
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveLogger {
        settings: settings.clone(),
        _handle: handle,
    })
}

fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let location = panic
            .location()
            .map_or_else(|| "unknown".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));
        error!(
            "event=panic_captured module=logging status=error location={} payload={}",
            location,
            panic_summary(panic)
        );
        previous(panic);
    }));
}

/// Single-line, length-capped panic payload. Payloads may echo skill text.
fn panic_summary(panic: &PanicHookInfo<'_>) -> String {
    let payload = panic.payload();
    let message = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload");
    single_line(message, PANIC_PAYLOAD_MAX_CHARS)
}

fn single_line(value: &str, max_chars: usize) -> String {
    let mut line = value
        .chars()
        .map(|ch| if matches!(ch, '\n' | '\r') { ' ' } else { ch })
        .take(max_chars)
        .collect::<String>();
    if value.chars().count() > max_chars {
        line.push_str("...");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::{
        init_logging, logging_status, normalize_level, single_line, LoggingError, LoggingStatus,
    };
    use crate::config::LogConfig;
    use std::path::PathBuf;

    fn config(level: &str, dir: Option<PathBuf>) -> LogConfig {
        LogConfig {
            level: level.to_string(),
            dir,
        }
    }

    #[test]
    fn levels_normalize_case_insensitively() {
        assert_eq!(normalize_level("INFO").unwrap(), "info");
        assert_eq!(normalize_level(" warning ").unwrap(), "warn");
        assert!(matches!(
            normalize_level("verbose"),
            Err(LoggingError::InvalidLevel(level)) if level == "verbose"
        ));
    }

    #[test]
    fn single_line_strips_newlines_and_caps_length() {
        assert_eq!(single_line("a\nb\rc", 10), "a b c");
        assert_eq!(single_line("abcdefgh", 3), "abc...");
    }

    #[test]
    fn missing_dir_leaves_logging_disabled() {
        let status = init_logging(&config("info", None)).unwrap();
        assert_eq!(status, LoggingStatus::Disabled);
    }

    #[test]
    fn relative_dir_is_rejected_before_start() {
        let err = init_logging(&config("info", Some(PathBuf::from("logs")))).unwrap_err();
        assert!(matches!(err, LoggingError::InvalidDir(_)));
    }

    #[test]
    fn restart_is_idempotent_and_conflicts_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let same = config("info", Some(dir.path().to_path_buf()));

        assert!(matches!(init_logging(&same).unwrap(), LoggingStatus::Active(_)));
        assert!(matches!(
            init_logging(&config("INFO", Some(dir.path().to_path_buf()))).unwrap(),
            LoggingStatus::Active(_)
        ));

        assert!(matches!(
            init_logging(&config("debug", Some(dir.path().to_path_buf()))),
            Err(LoggingError::Conflict { .. })
        ));
        assert!(matches!(
            init_logging(&config("info", Some(other.path().to_path_buf()))),
            Err(LoggingError::Conflict { .. })
        ));

        let active = logging_status().unwrap();
        assert_eq!(active.level, "info");
        assert_eq!(active.dir, dir.path());
    }
}
