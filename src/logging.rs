//! File logging. The terminal belongs to the UI, so nothing is written to stdout or stderr.

use color_eyre::eyre::{eyre, Result, WrapErr};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_ENV: &str = "PGMON_LOG";
const DEFAULT_FILTER: &str = "pgmon=info";

/// `<data_dir>/pgmon/logs`
pub fn log_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("pgmon").join("logs"))
}

/// `PGMON_LOG` wins, then `--log-level`, then the default.
fn filter_directive(env_value: Option<String>, cli_level: Option<&str>) -> String {
    env_value
        .filter(|v| !v.trim().is_empty())
        .or_else(|| cli_level.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Install the global subscriber. Keep the guard alive until exit or buffered lines are lost.
pub fn init(cli_level: Option<&str>) -> Result<WorkerGuard> {
    let dir = log_dir().ok_or_else(|| eyre!("could not locate a data directory for logs"))?;
    std::fs::create_dir_all(&dir)
        .wrap_err_with(|| format!("creating log directory {}", dir.display()))?;

    let directive = filter_directive(std::env::var(LOG_ENV).ok(), cli_level);
    let filter = EnvFilter::try_new(&directive)
        .wrap_err_with(|| format!("invalid log filter '{directive}'"))?;

    let appender = tracing_appender::rolling::daily(&dir, "pgmon.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .wrap_err("installing the log subscriber")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_filter_wins() {
        assert_eq!(
            filter_directive(Some("pgmon=trace".into()), Some("warn")),
            "pgmon=trace"
        );
    }

    #[test]
    fn cli_level_when_env_unset_or_blank() {
        assert_eq!(filter_directive(None, Some("debug")), "debug");
        assert_eq!(filter_directive(Some("  ".into()), Some("debug")), "debug");
    }

    #[test]
    fn default_filter() {
        assert_eq!(filter_directive(None, None), "pgmon=info");
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }
}
