use clap::Parser;
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::profiles::default_service_file;
use crate::store::default_store_path;

/// `pgmon` - interactive PostgreSQL monitor with saved query tabs
#[derive(Parser, Debug)]
#[command(name = "pgmon", version, about)]
pub struct Cli {
    /// Connection profile (a section of the service file). Omit to pick one interactively
    pub profile: Option<String>,

    /// Connection profile, same as the positional argument
    #[arg(short = 's', long, env = "PGSERVICE")]
    pub service: Option<String>,

    /// Service file to read profiles from (default: ~/.pg_service.conf)
    #[arg(long, env = "PGSERVICEFILE")]
    pub service_file: Option<PathBuf>,

    /// Query store file (default: <config dir>/pgmon/queries.json)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Import a JSON snapshot of queries into the store before starting
    #[arg(long, value_name = "PATH")]
    pub import: Option<PathBuf>,

    /// Write every stored query to a JSON snapshot and exit
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Import a directory of legacy `.sql` query files as hidden queries
    #[arg(long, value_name = "DIR")]
    pub import_sql_dir: Option<PathBuf>,

    /// Log filter used when PGMON_LOG is unset, e.g. "debug" or "pgmon=trace"
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Profile named on the command line; the positional argument wins.
    pub fn profile_name(&self) -> Option<&str> {
        self.profile
            .as_deref()
            .or(self.service.as_deref())
            .filter(|name| !name.trim().is_empty())
    }

    pub fn service_file_path(&self) -> Option<PathBuf> {
        self.service_file.clone().or_else(default_service_file)
    }

    /// `--store`, then the config file, then the default location.
    pub fn store_path(&self, config: &AppConfig) -> Option<PathBuf> {
        self.store
            .clone()
            .or_else(|| config.store_path())
            .or_else(default_store_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn cli_from_args(args: &[&str]) -> Cli {
        std::env::remove_var("PGSERVICE");
        std::env::remove_var("PGSERVICEFILE");
        let mut full_args = vec!["pgmon"];
        full_args.extend(args);
        Cli::parse_from(full_args)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Profile selection
    // ─────────────────────────────────────────────────────────────────────────────

    #[test]
    #[serial]
    fn no_profile_means_picker() {
        let cli = cli_from_args(&[]);
        assert!(cli.profile_name().is_none());
        assert!(cli.import.is_none());
        assert!(cli.export.is_none());
    }

    #[test]
    #[serial]
    fn positional_profile() {
        let cli = cli_from_args(&["prod"]);
        assert_eq!(cli.profile_name(), Some("prod"));
    }

    #[test]
    #[serial]
    fn service_flag_short_and_long() {
        assert_eq!(cli_from_args(&["-s", "staging"]).profile_name(), Some("staging"));
        assert_eq!(cli_from_args(&["--service", "staging"]).profile_name(), Some("staging"));
    }

    #[test]
    #[serial]
    fn positional_wins_over_service_flag() {
        let cli = cli_from_args(&["--service", "staging", "prod"]);
        assert_eq!(cli.profile_name(), Some("prod"));
    }

    #[test]
    #[serial]
    fn blank_profile_is_ignored() {
        let cli = cli_from_args(&["--service", "  "]);
        assert!(cli.profile_name().is_none());
    }

    #[test]
    #[serial]
    fn service_from_environment() {
        std::env::remove_var("PGSERVICEFILE");
        std::env::set_var("PGSERVICE", "from-env");
        let cli = Cli::parse_from(["pgmon"]);
        std::env::remove_var("PGSERVICE");
        assert_eq!(cli.profile_name(), Some("from-env"));
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Paths
    // ─────────────────────────────────────────────────────────────────────────────

    #[test]
    #[serial]
    fn service_file_override() {
        let cli = cli_from_args(&["--service-file", "/tmp/services.conf"]);
        assert_eq!(cli.service_file_path(), Some(PathBuf::from("/tmp/services.conf")));
    }

    #[test]
    #[serial]
    fn store_flag_beats_config() {
        let config = AppConfig {
            store_path: Some("/etc/pgmon/queries.json".into()),
            ..AppConfig::default()
        };
        let cli = cli_from_args(&["--store", "/tmp/q.json"]);
        assert_eq!(cli.store_path(&config), Some(PathBuf::from("/tmp/q.json")));

        let cli = cli_from_args(&[]);
        assert_eq!(
            cli.store_path(&config),
            Some(PathBuf::from("/etc/pgmon/queries.json"))
        );
    }

    #[test]
    #[serial]
    fn import_export_and_legacy_dir() {
        let cli = cli_from_args(&[
            "--import",
            "in.json",
            "--export",
            "out.json",
            "--import-sql-dir",
            "legacy",
            "--log-level",
            "debug",
        ]);
        assert_eq!(cli.import, Some(PathBuf::from("in.json")));
        assert_eq!(cli.export, Some(PathBuf::from("out.json")));
        assert_eq!(cli.import_sql_dir, Some(PathBuf::from("legacy")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }
}
