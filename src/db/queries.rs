use chrono::Utc;
use tokio_postgres::{Client, SimpleQueryMessage};

use super::error::{DbError, Result};
use super::models::{render_cell, ActiveProcess, HomeSnapshot, ServerInfo, StateCount, TabularRows};

const ACTIVE_PROCESSES_SQL: &str = "
SELECT
    pid,
    COALESCE(usename, '') AS usename,
    COALESCE(datname, '') AS datname,
    COALESCE(client_addr::text, '') AS client_addr,
    COALESCE(state, '') AS state,
    COALESCE(query_start::text, '') AS query_start,
    COALESCE(LEFT((NOW() - query_start)::text, 15), '') AS duration,
    COALESCE(wait_event, '') AS wait_event,
    COALESCE(wait_event_type, '') AS wait_event_type,
    COALESCE(query, '') AS query,
    COALESCE(backend_type, '') AS backend_type
FROM pg_stat_activity
WHERE pid <> pg_backend_pid()
  AND state IS NOT NULL
  AND state <> 'idle'
ORDER BY query_start ASC NULLS LAST
";

const CONNECTION_STATES_SQL: &str = "
SELECT state, COUNT(*) AS count
FROM pg_stat_activity
WHERE state IS NOT NULL
GROUP BY state
ORDER BY count DESC
";

const TOTAL_COMMITS_SQL: &str = "SELECT COALESCE(SUM(xact_commit), 0)::bigint FROM pg_stat_database";

/// Run arbitrary SQL and render every cell as text.
///
/// Uses the simple query protocol so any column type arrives in its text
/// form. When the input holds several statements the last row-returning one
/// wins.
pub async fn execute_sql(client: &Client, sql: &str) -> Result<TabularRows> {
    let messages = client
        .simple_query(sql)
        .await
        .map_err(|e| DbError::query("query failed", e))?;

    let mut result = TabularRows::default();
    for message in messages {
        match message {
            SimpleQueryMessage::RowDescription(columns) => {
                result = TabularRows::new(
                    columns.iter().map(|c| c.name().to_string()).collect(),
                    Vec::new(),
                );
            }
            SimpleQueryMessage::Row(row) => {
                if result.columns.is_empty() {
                    result.columns = row.columns().iter().map(|c| c.name().to_string()).collect();
                }
                let cells = (0..row.len()).map(|i| render_cell(row.get(i))).collect();
                result.rows.push(cells);
            }
            _ => {}
        }
    }
    Ok(result)
}

pub async fn fetch_active_processes(client: &Client) -> Result<Vec<ActiveProcess>> {
    let rows = client
        .query(ACTIVE_PROCESSES_SQL, &[])
        .await
        .map_err(|e| DbError::query("active processes query failed", e))?;

    Ok(rows
        .iter()
        .map(|row| ActiveProcess {
            pid: row.get("pid"),
            username: row.get("usename"),
            database: row.get("datname"),
            client_addr: row.get("client_addr"),
            state: row.get("state"),
            query_start: row.get("query_start"),
            duration: row.get("duration"),
            wait_event: row.get("wait_event"),
            wait_event_type: row.get("wait_event_type"),
            query: row.get("query"),
            backend_type: row.get("backend_type"),
        })
        .collect())
}

pub async fn fetch_home(client: &Client) -> Result<HomeSnapshot> {
    let (states, commits) = tokio::try_join!(
        client.query(CONNECTION_STATES_SQL, &[]),
        client.query_one(TOTAL_COMMITS_SQL, &[]),
    )
    .map_err(|e| DbError::query("home summary query failed", e))?;

    Ok(HomeSnapshot {
        timestamp: Utc::now(),
        states: states
            .iter()
            .map(|row| StateCount {
                state: row.get("state"),
                count: row.get("count"),
            })
            .collect(),
        total_commits: commits.get(0),
    })
}

pub async fn fetch_server_info(client: &Client) -> Result<ServerInfo> {
    let row = client
        .query_one("SHOW server_version", &[])
        .await
        .map_err(|e| DbError::query("server version query failed", e))?;
    Ok(ServerInfo {
        version: row.get(0),
    })
}

/// Interrupt the backend's current query. A `false` from the server is an error.
pub async fn cancel_backend(client: &Client, pid: i32) -> Result<()> {
    let row = client
        .query_one("SELECT pg_cancel_backend($1)", &[&pid])
        .await
        .map_err(|e| DbError::query("pg_cancel_backend failed", e))?;
    if row.get::<_, bool>(0) {
        Ok(())
    } else {
        Err(DbError::BackendActionRejected {
            function: "pg_cancel_backend",
            pid,
        })
    }
}

/// End the backend's connection. A `false` from the server is an error.
pub async fn terminate_backend(client: &Client, pid: i32) -> Result<()> {
    let row = client
        .query_one("SELECT pg_terminate_backend($1)", &[&pid])
        .await
        .map_err(|e| DbError::query("pg_terminate_backend failed", e))?;
    if row.get::<_, bool>(0) {
        Ok(())
    } else {
        Err(DbError::BackendActionRejected {
            function: "pg_terminate_backend",
            pid,
        })
    }
}

/// Round trip used to check a held connection before reuse.
pub async fn ping(client: &Client) -> Result<()> {
    client.simple_query("SELECT 1").await?;
    Ok(())
}
