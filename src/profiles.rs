//! Connection profiles read from a `pg_service.conf` style file.
//!
//! The file is a list of `[name]` sections holding `key=value` lines. Only
//! `host`, `port`, `dbname`, `user`, `password` and `sslmode` are used; other
//! keys are kept but ignored. Blank lines and `#` comments are skipped.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 5432;
const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("service '{0}' not found")]
    NotFound(String),

    #[error("service '{name}' has an invalid port: {value}")]
    InvalidPort { name: String, value: String },

    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Parameters needed to open a session against one database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionProfile {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub sslmode: Option<String>,
}

impl ConnectionProfile {
    /// `host:port/database`, used in the header and in log lines.
    pub fn label(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }

    pub fn pg_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .user(&self.user)
            .application_name("pgmon")
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS));
        if !self.database.is_empty() {
            config.dbname(&self.database);
        }
        if !self.password.is_empty() {
            config.password(&self.password);
        }
        config
    }

    /// Arguments for an interactive `psql` against this profile.
    /// The password travels separately through `PGPASSWORD`.
    pub fn psql_args(&self) -> Vec<String> {
        vec![
            "-h".into(),
            self.host.clone(),
            "-p".into(),
            self.port.to_string(),
            "-d".into(),
            self.database.clone(),
            "-U".into(),
            self.user.clone(),
        ]
    }
}

/// Parsed profile file, sections kept in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ServiceFile {
    pub path: PathBuf,
    sections: Vec<(String, HashMap<String, String>)>,
}

/// `~/.pg_service.conf`
pub fn default_service_file() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".pg_service.conf"))
}

impl ServiceFile {
    /// Load and parse `path`. A missing file is an empty profile list.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        match fs::read_to_string(path) {
            Ok(content) => {
                let mut file = Self::parse(&content);
                file.path = path.to_path_buf();
                Ok(file)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self {
                path: path.to_path_buf(),
                sections: Vec::new(),
            }),
            Err(source) => Err(ProfileError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn parse(content: &str) -> Self {
        let mut sections: Vec<(String, HashMap<String, String>)> = Vec::new();
        let mut current: Option<usize> = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                let name = line[1..line.len() - 1].trim().to_string();
                // A repeated header continues the earlier section
                current = match sections.iter().position(|(n, _)| *n == name) {
                    Some(idx) => Some(idx),
                    None => {
                        sections.push((name, HashMap::new()));
                        Some(sections.len() - 1)
                    }
                };
                continue;
            }

            if let (Some(idx), Some((key, value))) = (current, line.split_once('=')) {
                sections[idx]
                    .1
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
        }

        Self {
            path: PathBuf::new(),
            sections,
        }
    }

    pub fn list_profiles(&self) -> Vec<String> {
        self.sections.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn resolve(&self, name: &str) -> Result<ConnectionProfile, ProfileError> {
        let params = self
            .sections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, params)| params)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))?;

        let get = |key: &str| params.get(key).cloned().unwrap_or_default();

        let host = get("host");
        if host.is_empty() {
            return Err(ProfileError::NotFound(name.to_string()));
        }

        let port = match params.get("port").map(String::as_str) {
            None | Some("") => DEFAULT_PORT,
            Some(value) => value.parse().map_err(|_| ProfileError::InvalidPort {
                name: name.to_string(),
                value: value.to_string(),
            })?,
        };

        Ok(ConnectionProfile {
            name: name.to_string(),
            host,
            port,
            database: get("dbname"),
            user: get("user"),
            password: get("password"),
            sslmode: params.get("sslmode").cloned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "\
# production first
[prod]
host=db1
dbname=app
user=ops

[staging]
host = db2.internal
port = 6432
dbname = app_staging
user = deploy
password = hunter2

# no host here
[broken]
dbname=nothing
";

    #[test]
    fn resolve_fills_default_port_and_empty_password() {
        let file = ServiceFile::parse("[prod]\nhost=db1\ndbname=app\nuser=ops");
        let profile = file.resolve("prod").unwrap();
        assert_eq!(profile.host, "db1");
        assert_eq!(profile.port, 5432);
        assert_eq!(profile.database, "app");
        assert_eq!(profile.user, "ops");
        assert_eq!(profile.password, "");
        assert_eq!(profile.sslmode, None);
    }

    #[test]
    fn resolve_trims_keys_and_values() {
        let file = ServiceFile::parse(SAMPLE);
        let profile = file.resolve("staging").unwrap();
        assert_eq!(profile.host, "db2.internal");
        assert_eq!(profile.port, 6432);
        assert_eq!(profile.database, "app_staging");
        assert_eq!(profile.password, "hunter2");
    }

    #[test]
    fn list_preserves_declaration_order() {
        let file = ServiceFile::parse(SAMPLE);
        assert_eq!(file.list_profiles(), vec!["prod", "staging", "broken"]);
    }

    #[test]
    fn unknown_profile_is_not_found() {
        let file = ServiceFile::parse(SAMPLE);
        let err = file.resolve("nope").unwrap_err();
        assert!(matches!(err, ProfileError::NotFound(ref n) if n == "nope"));
        assert_eq!(err.to_string(), "service 'nope' not found");
    }

    #[test]
    fn profile_without_host_is_not_found() {
        let file = ServiceFile::parse(SAMPLE);
        assert!(matches!(
            file.resolve("broken"),
            Err(ProfileError::NotFound(_))
        ));
    }

    #[test]
    fn invalid_port_is_reported() {
        let file = ServiceFile::parse("[x]\nhost=h\nport=abc\n");
        let err = file.resolve("x").unwrap_err();
        assert!(matches!(err, ProfileError::InvalidPort { ref value, .. } if value == "abc"));
    }

    #[test]
    fn keys_before_any_section_are_ignored() {
        let file = ServiceFile::parse("host=orphan\n[a]\nhost=real\n");
        assert_eq!(file.list_profiles(), vec!["a"]);
        assert_eq!(file.resolve("a").unwrap().host, "real");
    }

    #[test]
    fn repeated_section_merges_into_first() {
        let file = ServiceFile::parse("[a]\nhost=h1\n[b]\nhost=h2\n[a]\nport=7000\n");
        assert_eq!(file.list_profiles(), vec!["a", "b"]);
        let a = file.resolve("a").unwrap();
        assert_eq!(a.host, "h1");
        assert_eq!(a.port, 7000);
    }

    #[test]
    fn sslmode_is_carried() {
        let file = ServiceFile::parse("[a]\nhost=h\nsslmode=require\n");
        assert_eq!(file.resolve("a").unwrap().sslmode.as_deref(), Some("require"));
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = ServiceFile::load(&dir.path().join("absent.conf")).unwrap();
        assert!(file.is_empty());
        assert!(file.list_profiles().is_empty());
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(SAMPLE.as_bytes()).unwrap();
        let file = ServiceFile::load(tmp.path()).unwrap();
        assert_eq!(file.path, tmp.path());
        assert_eq!(file.list_profiles().len(), 3);
    }

    #[test]
    fn psql_args_carry_connection_fields() {
        let profile = ServiceFile::parse(SAMPLE).resolve("staging").unwrap();
        assert_eq!(
            profile.psql_args(),
            vec!["-h", "db2.internal", "-p", "6432", "-d", "app_staging", "-U", "deploy"]
        );
        assert_eq!(profile.label(), "db2.internal:6432/app_staging");
    }
}
