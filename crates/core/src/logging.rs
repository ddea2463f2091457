use chrono::{DateTime, Local};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Overrides [`DEFAULT_DIRECTIVES`], in `EnvFilter` syntax.
pub const LOG_ENV: &str = "JARFORGE_LOG";

/// Packaging crates at `info`, everything they pull in at `warn`.
pub const DEFAULT_DIRECTIVES: &str = "warn,jarforge_core=info,jarforge_archive=info,jarforge_cli=info";

pub fn log_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".jarforge/logs")
}

/// One file per run, e.g. `package-20261018T222346.log`, so every build keeps its own trace.
pub fn build_log_name(component: &str, started: DateTime<Local>) -> String {
    format!("{}-{}.log", component, started.format("%Y%m%dT%H%M%S"))
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Installs the global subscriber. Keep the returned guard alive until exit or buffered
/// file output is lost.
///
/// The file gets the full event with targets. Stderr gets a compact, untimed line per event
/// for the person watching the build.
pub fn init_logging(component: &str, to_stderr: bool) -> WorkerGuard {
    let log_dir = log_directory();
    let _ = std::fs::create_dir_all(&log_dir);

    let file_appender =
        tracing_appender::rolling::never(&log_dir, build_log_name(component, Local::now()));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    let registry = tracing_subscriber::registry().with(filter()).with(file_layer);

    if to_stderr {
        let stderr_layer = fmt::layer()
            .compact()
            .without_time()
            .with_writer(std::io::stderr)
            .with_target(false);
        registry.with(stderr_layer).init();
    } else {
        registry.init();
    }

    guard
}
