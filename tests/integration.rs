//! Integration tests for pgmon
//!
//! These tests need a reachable PostgreSQL server. Point `PGMON_TEST_DSN` at it:
//!
//! ```bash
//! export PGMON_TEST_DSN="host=localhost port=5432 user=postgres password=postgres dbname=postgres"
//! cargo test --features integration --test integration
//! ```
//!
//! Every test is skipped (with a note on stderr) when the variable is unset or
//! the server cannot be reached.

#![cfg(feature = "integration")]

use std::str::FromStr;
use std::time::Duration;

use pgmon::connection;
use pgmon::db::error::DbError;
use pgmon::db::models::NULL_MARKER;
use pgmon::db::queries;
use pgmon::profiles::ConnectionProfile;
use tokio_postgres::config::Host;
use tokio_postgres::{Client, Config, NoTls};

fn dsn() -> Option<String> {
    std::env::var("PGMON_TEST_DSN").ok().filter(|v| !v.trim().is_empty())
}

/// Connect without TLS using the test DSN.
async fn connect() -> Option<Client> {
    let dsn = dsn()?;
    match tokio_postgres::connect(&dsn, NoTls).await {
        Ok((client, conn)) => {
            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    eprintln!("Connection error: {e}");
                }
            });
            Some(client)
        }
        Err(e) => {
            eprintln!("Skipping - server not available: {e}");
            None
        }
    }
}

/// Build a profile equivalent to the test DSN.
fn profile_from_dsn(dsn: &str) -> ConnectionProfile {
    let config = Config::from_str(dsn).unwrap();
    let host = match config.get_hosts().first() {
        Some(Host::Tcp(h)) => h.clone(),
        _ => "localhost".to_string(),
    };
    ConnectionProfile {
        name: "integration".into(),
        host,
        port: config.get_ports().first().copied().unwrap_or(5432),
        database: config.get_dbname().unwrap_or_default().to_string(),
        user: config.get_user().unwrap_or_default().to_string(),
        password: config
            .get_password()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .unwrap_or_default(),
        sslmode: Some("disable".into()),
    }
}

macro_rules! client_or_skip {
    () => {
        match connect().await {
            Some(client) => client,
            None => {
                eprintln!("Skipping - PGMON_TEST_DSN not set");
                return;
            }
        }
    };
}

// ============================================================================
// Connection
// ============================================================================

#[tokio::test]
async fn test_connect_with_profile() {
    let Some(dsn) = dsn() else {
        eprintln!("Skipping - PGMON_TEST_DSN not set");
        return;
    };
    let profile = profile_from_dsn(&dsn);
    let (client, mode) = connection::connect(&profile).await.unwrap();
    assert_eq!(mode.label(), "No TLS");
    queries::ping(&client).await.unwrap();
}

#[tokio::test]
async fn test_server_info() {
    let client = client_or_skip!();
    let info = queries::fetch_server_info(&client).await.unwrap();
    let major = info.major_version().unwrap();
    assert!(major >= 10, "unexpected server version {}", info.version);
}

// ============================================================================
// Arbitrary SQL
// ============================================================================

#[tokio::test]
async fn test_execute_sql_renders_text_and_null() {
    let client = client_or_skip!();
    let rows = queries::execute_sql(&client, "SELECT 1 AS one, NULL::text AS nothing, 'a\nb' AS multi")
        .await
        .unwrap();
    assert_eq!(rows.columns, vec!["one", "nothing", "multi"]);
    assert_eq!(rows.rows, vec![vec!["1".to_string(), NULL_MARKER.to_string(), "a b".to_string()]]);
}

#[tokio::test]
async fn test_execute_sql_empty_result_keeps_columns() {
    let client = client_or_skip!();
    let rows = queries::execute_sql(&client, "SELECT 1 AS one WHERE false")
        .await
        .unwrap();
    assert_eq!(rows.columns, vec!["one"]);
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_execute_sql_syntax_error() {
    let client = client_or_skip!();
    let err = queries::execute_sql(&client, "SELEC nope").await.unwrap_err();
    assert!(err.to_string().contains("syntax error"), "got: {err}");
    // The connection stays usable after a failed statement.
    queries::ping(&client).await.unwrap();
}

// ============================================================================
// Home and Active
// ============================================================================

#[tokio::test]
async fn test_fetch_home() {
    let client = client_or_skip!();
    let home = queries::fetch_home(&client).await.unwrap();
    assert!(home.total_connections() >= 1);
    assert!(home.total_commits >= 0);
    let counts: Vec<i64> = home.states.iter().map(|s| s.count).collect();
    let mut sorted = counts.clone();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(counts, sorted, "states should be ordered by count desc");
}

#[tokio::test]
async fn test_active_processes_and_cancel() {
    let observer = client_or_skip!();
    let Some(sleeper) = connect().await else {
        return;
    };
    let pid: i32 = sleeper
        .query_one("SELECT pg_backend_pid()", &[])
        .await
        .unwrap()
        .get(0);

    let sleeping = tokio::spawn(async move { sleeper.simple_query("SELECT pg_sleep(30)").await });

    let mut found = false;
    for _ in 0..20 {
        let processes = queries::fetch_active_processes(&observer).await.unwrap();
        if processes.iter().any(|p| p.pid == pid && p.query.contains("pg_sleep")) {
            found = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(found, "sleeping backend {pid} not listed");

    queries::cancel_backend(&observer, pid).await.unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(5), sleeping)
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.is_err(), "pg_sleep should have been cancelled");
}

#[tokio::test]
async fn test_terminate_unknown_pid_is_rejected() {
    let client = client_or_skip!();
    let err = queries::terminate_backend(&client, i32::MAX).await.unwrap_err();
    assert!(
        matches!(err, DbError::BackendActionRejected { pid, .. } if pid == i32::MAX),
        "got: {err}"
    );
}
