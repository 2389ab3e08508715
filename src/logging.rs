use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use tracing_appender::{
    non_blocking::{NonBlocking, WorkerGuard},
    rolling::{RollingFileAppender, Rotation},
};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, filter::LevelFilter, fmt, layer::SubscriberExt,
    util::SubscriberInitExt,
};
use uuid::Uuid;

use crate::config::{LoggingConfig, LoggingRotation};

const LOG_FILE_PREFIX: &str = "ratelimit";
const LOG_FILE_SUFFIX: &str = "log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Keeps the background log writer alive; dropping it flushes and stops it.
pub struct LoggingGuard {
    _worker_guard: WorkerGuard,
    run_id: String,
}

impl LoggingGuard {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

/// Installs the process-wide subscriber: JSON lines into a rolling file under
/// `logging.dir`, plus WARN and above on stderr when enabled. Fails if a
/// global subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<LoggingGuard> {
    validate_logging_config(config)?;
    let env_filter = build_env_filter(&config.filter)?;

    let log_dir = resolve_log_dir(&config.dir)?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create logging directory {}", log_dir.display()))?;
    let appender = build_rolling_appender(&log_dir, &config.rotation, config.max_log_files)?;
    let (writer, worker_guard) = tracing_appender::non_blocking(appender);

    let mut layers = vec![json_file_layer(writer, env_filter)];
    if config.stderr_warn_enabled {
        layers.push(stderr_warn_layer());
    }
    tracing_subscriber::registry()
        .with(layers)
        .with(ErrorLayer::default())
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    let run_id = Uuid::now_v7().to_string();
    tracing::info!(
        target: "logging",
        run_id = %run_id,
        dir = %log_dir.display(),
        filter = %config.filter,
        rotation = ?config.rotation,
        max_log_files = config.max_log_files,
        stderr_warn_enabled = config.stderr_warn_enabled,
        "logging_initialized"
    );

    Ok(LoggingGuard {
        _worker_guard: worker_guard,
        run_id,
    })
}

fn validate_logging_config(config: &LoggingConfig) -> Result<()> {
    ensure!(!config.filter.trim().is_empty(), "logging.filter cannot be empty");
    ensure!(!config.dir.as_os_str().is_empty(), "logging.dir cannot be empty");
    ensure!(config.max_log_files > 0, "logging.max_log_files must be at least 1");
    Ok(())
}

fn json_file_layer(writer: NonBlocking, filter: EnvFilter) -> BoxedLayer {
    fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_current_span(true)
        .with_span_list(true)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(filter)
        .boxed()
}

fn stderr_warn_layer() -> BoxedLayer {
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(LevelFilter::WARN)
        .boxed()
}

fn build_env_filter(filter: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(filter)
        .with_context(|| format!("failed to parse logging.filter '{}'", filter))
}

fn build_rolling_appender(
    log_dir: &Path,
    rotation: &LoggingRotation,
    max_log_files: usize,
) -> Result<RollingFileAppender> {
    let rotation = match rotation {
        LoggingRotation::Daily => Rotation::DAILY,
        LoggingRotation::Hourly => Rotation::HOURLY,
    };

    RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(max_log_files)
        .build(log_dir)
        .with_context(|| format!("failed to open log appender in {}", log_dir.display()))
}

fn resolve_log_dir(dir: &Path) -> Result<PathBuf> {
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }

    Ok(std::env::current_dir()
        .context("failed to read current working directory for logging.dir resolution")?
        .join(dir))
}
