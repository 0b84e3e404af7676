//! Logging initialization.
//!
//! Records own stdout, so log lines never go there:
//! - **Production**: JSON lines in daily rolling files under the session's
//!   log directory, plus compact lines on stderr
//! - **Development**: pretty lines on stderr only
//!
//! The filter comes from `RUST_LOG`, else [`LOG_LEVEL_VAR`], else the
//! session's `[logging] level`, else `info`.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use sensekit_core::LogSettings;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable consulted when `RUST_LOG` is not set.
pub const LOG_LEVEL_VAR: &str = "SENSEKIT_LOG_LEVEL";

const FILE_PREFIX: &str = "sensekit";
const FILE_SUFFIX: &str = "log";
const KEEP_FILES: usize = 14;

// Dropping a guard stops its writer thread.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static STDERR_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Initialize the global subscriber for a session.
///
/// # Errors
///
/// Returns an error if the filter cannot be parsed or, in production, the
/// log directory cannot be created.
pub fn init(is_production: bool, settings: &LogSettings) -> anyhow::Result<()> {
    let directive = directive(std::env::var(LOG_LEVEL_VAR).ok(), settings.level.as_deref());
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&directive)
            .with_context(|| format!("Invalid log filter '{directive}'"))?,
    };

    if is_production {
        let log_dir = log_directory(settings.directory.as_deref());
        init_production(env_filter, &log_dir)?;
        info!(directory = %log_dir.display(), "writing log files");
    } else {
        init_development(env_filter);
    }

    Ok(())
}

/// Filter directive when `RUST_LOG` is absent.
fn directive(from_env: Option<String>, configured: Option<&str>) -> String {
    from_env
        .filter(|level| !level.trim().is_empty())
        .or_else(|| configured.map(str::to_string))
        .unwrap_or_else(|| "info".to_string())
}

fn init_production(env_filter: EnvFilter, log_dir: &Path) -> anyhow::Result<()> {
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender(log_dir)?);
    let (non_blocking_stderr, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());

    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking_file)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(non_blocking_stderr)
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    let _ = FILE_GUARD.set(file_guard);
    let _ = STDERR_GUARD.set(stderr_guard);
    Ok(())
}

fn init_development(env_filter: EnvFilter) {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}

/// Daily `sensekit.<date>.log` files under `log_dir`, oldest pruned.
fn file_appender(log_dir: &Path) -> anyhow::Result<RollingFileAppender> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(FILE_PREFIX)
        .filename_suffix(FILE_SUFFIX)
        .max_log_files(KEEP_FILES)
        .build(log_dir)
        .with_context(|| format!("Failed to open log files in {}", log_dir.display()))
}

/// The configured directory, else the platform's place for service logs.
fn log_directory(configured: Option<&Path>) -> PathBuf {
    if let Some(dir) = configured {
        return dir.to_path_buf();
    }
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/var/log/sensekit")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "sensekit")
            .map_or_else(|| PathBuf::from("./logs"), |dirs| dirs.data_dir().join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_directory_wins() {
        let configured = Path::new("/srv/sensekit/logs");
        assert_eq!(log_directory(Some(configured)), configured);
        assert!(!log_directory(None).as_os_str().is_empty());
    }

    #[test]
    fn test_directive_precedence() {
        assert_eq!(directive(Some("warn".into()), Some("debug")), "warn");
        assert_eq!(directive(None, Some("debug")), "debug");
        assert_eq!(directive(Some("  ".into()), Some("debug")), "debug");
        assert_eq!(directive(None, None), "info");
    }

    #[test]
    fn test_file_appender_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("nested").join("logs");

        file_appender(&log_dir).unwrap();
        assert!(log_dir.is_dir());
    }
}
