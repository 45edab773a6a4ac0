use std::path::Path;

use color_eyre::eyre::eyre;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging to stderr, or to `log_file` when one is given.
///
/// The level applies to both crates and can be overridden with `RUST_LOG`.
/// The returned guard flushes the file writer on drop and must be held
/// until the program exits.
pub fn init_logging(
    level: &str,
    log_file: Option<&Path>,
) -> color_eyre::Result<Option<WorkerGuard>> {
    // Build filter from RUST_LOG env var or use provided level
    let default_filter = format!("mcsens={level},mcsens_core={level}");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .init();
        return Ok(None);
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let file_name = path
        .file_name()
        .ok_or_else(|| eyre!("log file path {} has no file name", path.display()))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false),
        )
        .init();

    tracing::info!("mcsens logging initialized (log_path={})", path.display());
    Ok(Some(guard))
}
