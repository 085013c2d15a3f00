//! Saved query storage.
//!
//! Records are keyed by name. A record without an `order_position` is hidden
//! from the tab strip but still listed when hidden entries are requested.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("query name cannot be empty")]
    EmptyName,

    #[error("could not access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid query file {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid SQL file {file}: {reason}")]
    SqlFile { file: String, reason: &'static str },
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedQuery {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub sql: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_position: Option<i64>,
}

impl SavedQuery {
    pub fn new(name: &str, description: &str, sql: &str, order: Option<i64>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            sql: sql.to_string(),
            order_position: order,
        }
    }

    pub const fn is_visible(&self) -> bool {
        self.order_position.is_some()
    }
}

/// Keyed record store consumed by the session.
pub trait QueryStore: Send {
    /// With `visible_only`, records lacking an order are dropped and the rest
    /// come back by order then name. Otherwise hidden records sort last.
    fn list(&self, visible_only: bool) -> Result<Vec<SavedQuery>>;

    fn get(&self, name: &str) -> Result<Option<SavedQuery>>;

    /// Upsert by name. An existing record is fully replaced.
    fn save(&mut self, query: SavedQuery) -> Result<()>;

    /// Deleting an unknown name is not an error.
    fn delete(&mut self, name: &str) -> Result<()>;

    /// Write every record, hidden ones included, to a JSON snapshot.
    fn export_all(&self, path: &Path) -> Result<usize> {
        let records = self.list(false)?;
        write_json(path, &records)?;
        info!(path = %path.display(), count = records.len(), "exported queries");
        Ok(records.len())
    }

    /// Upsert every record found in a JSON snapshot.
    fn import_all(&mut self, path: &Path) -> Result<usize> {
        let records = read_json(path)?;
        let count = records.len();
        for record in records {
            self.save(record)?;
        }
        info!(path = %path.display(), count, "imported queries");
        Ok(count)
    }
}

fn compare_records(a: &SavedQuery, b: &SavedQuery) -> Ordering {
    match (a.order_position, b.order_position) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.name.cmp(&b.name)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    }
}

fn sorted_view(records: &[SavedQuery], visible_only: bool) -> Vec<SavedQuery> {
    let mut out: Vec<SavedQuery> = records
        .iter()
        .filter(|q| !visible_only || q.is_visible())
        .cloned()
        .collect();
    out.sort_by(compare_records);
    out
}

fn upsert(records: &mut Vec<SavedQuery>, query: SavedQuery) {
    match records.iter_mut().find(|q| q.name == query.name) {
        Some(existing) => *existing = query,
        None => records.push(query),
    }
}

fn read_json(path: &Path) -> Result<Vec<SavedQuery>> {
    let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| StoreError::Format {
        path: path.to_path_buf(),
        source,
    })
}

/// Write through a sibling temp file so a crash never leaves half a document.
fn write_json(path: &Path, records: &[SavedQuery]) -> Result<()> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    let body = serde_json::to_string_pretty(records).map_err(|source| StoreError::Format {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory store
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: Vec<SavedQuery>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<SavedQuery>) -> Self {
        let mut store = Self::new();
        for record in records {
            upsert(&mut store.records, record);
        }
        store
    }
}

impl QueryStore for MemoryStore {
    fn list(&self, visible_only: bool) -> Result<Vec<SavedQuery>> {
        Ok(sorted_view(&self.records, visible_only))
    }

    fn get(&self, name: &str) -> Result<Option<SavedQuery>> {
        Ok(self.records.iter().find(|q| q.name == name).cloned())
    }

    fn save(&mut self, query: SavedQuery) -> Result<()> {
        if query.name.trim().is_empty() {
            return Err(StoreError::EmptyName);
        }
        upsert(&mut self.records, query);
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        self.records.retain(|q| q.name != name);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// JSON file store
// ─────────────────────────────────────────────────────────────────────────────

/// Store persisted as one JSON array, rewritten on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    records: Vec<SavedQuery>,
}

/// `<config_dir>/pgmon/queries.json`
pub fn default_store_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pgmon").join("queries.json"))
}

impl FileStore {
    /// Open `path`, seeding the default records when the file does not exist.
    pub fn open(path: &Path) -> Result<Self> {
        if path.exists() {
            let records = read_json(path)?;
            debug!(path = %path.display(), count = records.len(), "opened query store");
            return Ok(Self {
                path: path.to_path_buf(),
                records,
            });
        }

        let records = default_queries();
        write_json(path, &records)?;
        info!(path = %path.display(), "seeded query store with defaults");
        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy and persist it; memory is only updated on success.
    fn commit(&mut self, change: impl FnOnce(&mut Vec<SavedQuery>)) -> Result<()> {
        let mut next = self.records.clone();
        change(&mut next);
        write_json(&self.path, &next)?;
        self.records = next;
        Ok(())
    }
}

impl QueryStore for FileStore {
    fn list(&self, visible_only: bool) -> Result<Vec<SavedQuery>> {
        Ok(sorted_view(&self.records, visible_only))
    }

    fn get(&self, name: &str) -> Result<Option<SavedQuery>> {
        Ok(self.records.iter().find(|q| q.name == name).cloned())
    }

    fn save(&mut self, query: SavedQuery) -> Result<()> {
        if query.name.trim().is_empty() {
            return Err(StoreError::EmptyName);
        }
        debug!(name = %query.name, order = ?query.order_position, "saving query");
        self.commit(|records| upsert(records, query))
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        debug!(name, "deleting query");
        self.commit(|records| records.retain(|q| q.name != name))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Legacy .sql files
// ─────────────────────────────────────────────────────────────────────────────

/// Parse a legacy query file: `-- Title`, `-- Description`, then SQL lines.
/// Blank and comment lines in the body are dropped; the rest join with spaces.
pub fn parse_sql_file(file: &str, content: &str) -> Result<SavedQuery> {
    let reject = |reason| StoreError::SqlFile {
        file: file.to_string(),
        reason,
    };

    let lines: Vec<&str> = content.split('\n').collect();
    if lines.len() < 3 {
        return Err(reject("expected a title line, a description line and SQL"));
    }

    let title = lines[0].trim_start().trim_start_matches("--").trim();
    if title.is_empty() {
        return Err(reject("missing title in first line"));
    }
    let description = lines[1].trim_start().trim_start_matches("--").trim();
    if description.is_empty() {
        return Err(reject("missing description in second line"));
    }

    let sql = lines[2..]
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !l.starts_with("--"))
        .collect::<Vec<_>>()
        .join(" ");

    Ok(SavedQuery::new(title, description, &sql, None))
}

/// Import every `*.sql` file in `dir` (by file name order) as a hidden query.
pub fn import_sql_dir(store: &mut dyn QueryStore, dir: &Path) -> Result<usize> {
    let io_err = |source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(io_err)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "sql"))
        .collect();
    files.sort();

    let mut parsed = Vec::with_capacity(files.len());
    for path in &files {
        let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        parsed.push(parse_sql_file(&name, &content)?);
    }

    let count = parsed.len();
    for query in parsed {
        store.save(query)?;
    }
    info!(dir = %dir.display(), count, "imported legacy sql files");
    Ok(count)
}

/// Records written on first run.
pub fn default_queries() -> Vec<SavedQuery> {
    vec![
        SavedQuery::new(
            "Lock Information",
            "Show current locks",
            "SELECT l.pid, l.mode, l.granted, a.usename, a.query FROM pg_locks l JOIN pg_stat_activity a ON l.pid = a.pid WHERE NOT l.granted ORDER BY l.pid;",
            Some(1),
        ),
        SavedQuery::new(
            "Replication Lag",
            "Show replication lag information",
            "SELECT application_name, pg_wal_lsn_diff(sent_lsn, replay_lsn) AS lag_bytes, client_addr, state, sent_lsn, write_lsn, flush_lsn, replay_lsn FROM pg_stat_replication;",
            Some(2),
        ),
        SavedQuery::new(
            "Top Queries",
            "Requires pg_stat_statements; identifies heavy hitters",
            "SELECT LEFT(query, 40) AS query, calls, total_exec_time, mean_exec_time, rows, shared_blks_hit, shared_blks_read, temp_blks_written FROM pg_stat_statements ORDER BY total_exec_time DESC LIMIT 25;",
            Some(3),
        ),
        SavedQuery::new(
            "Index Creation",
            "Show progress of index creation operations",
            "SELECT p.pid, c.relname AS table_name, ic.relname AS index_name, p.phase, p.lockers_done || '/' || p.lockers_total AS locks, p.blocks_done || '/' || p.blocks_total AS blocks, p.tuples_done || '/' || p.tuples_total AS tuples, p.partitions_done || '/' || p.partitions_total AS parts FROM pg_stat_progress_create_index p JOIN pg_class c ON p.relid = c.oid JOIN pg_class ic ON p.index_relid = ic.oid;",
            Some(4),
        ),
        SavedQuery::new(
            "Table Replication State",
            "The state of logical replication for each table in the public schema",
            "SELECT s.subname AS subscription, r.srsubstate AS table_state, ARRAY_AGG(c.relname ORDER BY c.relname) AS tables FROM pg_class c JOIN pg_namespace n ON n.oid = c.relnamespace LEFT JOIN pg_subscription_rel r ON r.srrelid = c.oid LEFT JOIN pg_subscription s ON s.oid = r.srsubid WHERE n.nspname = 'public' AND c.relkind IN ('r','p','f') GROUP BY s.subname, r.srsubstate ORDER BY s.subname, r.srsubstate;",
            Some(5),
        ),
        SavedQuery::new(
            "Configuration Settings",
            "All current PostgreSQL configuration settings",
            "SELECT name, setting, unit, category, short_desc FROM pg_settings ORDER BY category, name;",
            Some(6),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(records: &[SavedQuery]) -> Vec<&str> {
        records.iter().map(|q| q.name.as_str()).collect()
    }

    fn sample_store() -> MemoryStore {
        MemoryStore::with_records(vec![
            SavedQuery::new("Stats", "table stats", "SELECT 2", None),
            SavedQuery::new("Locks", "lock waits", "SELECT 1", Some(2)),
        ])
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Listing
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn visible_list_drops_hidden_records() {
        let store = sample_store();
        assert_eq!(names(&store.list(true).unwrap()), vec!["Locks"]);
    }

    #[test]
    fn full_list_sorts_hidden_last() {
        let store = sample_store();
        assert_eq!(names(&store.list(false).unwrap()), vec!["Locks", "Stats"]);
    }

    #[test]
    fn order_ties_break_on_name() {
        let store = MemoryStore::with_records(vec![
            SavedQuery::new("b", "", "SELECT 1", Some(1)),
            SavedQuery::new("a", "", "SELECT 1", Some(1)),
            SavedQuery::new("c", "", "SELECT 1", Some(0)),
            SavedQuery::new("z", "", "SELECT 1", None),
            SavedQuery::new("y", "", "SELECT 1", None),
        ]);
        assert_eq!(names(&store.list(false).unwrap()), vec!["c", "a", "b", "y", "z"]);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Upsert / delete
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn save_replaces_existing_record_entirely() {
        let mut store = sample_store();
        store
            .save(SavedQuery::new("Locks", "new desc", "SELECT 42", None))
            .unwrap();
        let locks = store.get("Locks").unwrap().unwrap();
        assert_eq!(locks.description, "new desc");
        assert_eq!(locks.sql, "SELECT 42");
        assert_eq!(locks.order_position, None);
        assert_eq!(store.list(false).unwrap().len(), 2);
    }

    #[test]
    fn clearing_order_hides_without_deleting() {
        let mut store = sample_store();
        let mut locks = store.get("Locks").unwrap().unwrap();
        locks.order_position = None;
        store.save(locks).unwrap();
        assert!(store.list(true).unwrap().is_empty());
        assert!(store.get("Locks").unwrap().is_some());
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut store = MemoryStore::new();
        let err = store.save(SavedQuery::new("  ", "", "SELECT 1", None));
        assert!(matches!(err, Err(StoreError::EmptyName)));
    }

    #[test]
    fn delete_unknown_name_is_ok() {
        let mut store = sample_store();
        store.delete("missing").unwrap();
        store.delete("Locks").unwrap();
        assert_eq!(names(&store.list(false).unwrap()), vec!["Stats"]);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // File store
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn open_missing_file_seeds_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("queries.json");
        let store = FileStore::open(&path).unwrap();
        assert!(path.exists());
        let visible = store.list(true).unwrap();
        assert_eq!(visible.len(), default_queries().len());
        assert_eq!(visible[0].name, "Lock Information");
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queries.json");
        {
            let mut store = FileStore::open(&path).unwrap();
            store
                .save(SavedQuery::new("Mine", "custom", "SELECT now()", None))
                .unwrap();
            store.delete("Top Queries").unwrap();
        }
        let store = FileStore::open(&path).unwrap();
        assert!(store.get("Mine").unwrap().is_some());
        assert!(store.get("Top Queries").unwrap().is_none());
    }

    #[test]
    fn corrupt_file_is_format_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queries.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(FileStore::open(&path), Err(StoreError::Format { .. })));
    }

    #[test]
    fn export_then_import_keeps_hidden_records() {
        let dir = TempDir::new().unwrap();
        let snapshot = dir.path().join("dump.json");
        let source = sample_store();
        assert_eq!(source.export_all(&snapshot).unwrap(), 2);

        let mut target = MemoryStore::new();
        assert_eq!(target.import_all(&snapshot).unwrap(), 2);
        assert_eq!(target.list(false).unwrap(), source.list(false).unwrap());
    }

    #[test]
    fn import_missing_snapshot_is_io_error() {
        let dir = TempDir::new().unwrap();
        let mut store = MemoryStore::new();
        let err = store.import_all(&dir.path().join("none.json"));
        assert!(matches!(err, Err(StoreError::Io { .. })));
    }

    #[test]
    fn hidden_records_omit_order_in_json() {
        let json = serde_json::to_string(&SavedQuery::new("a", "", "SELECT 1", None)).unwrap();
        assert!(!json.contains("order_position"));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Legacy .sql files
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn parse_sql_file_reads_header_and_body() {
        let q = parse_sql_file(
            "locks.sql",
            "-- Locks\n-- Blocked lock requests\nSELECT *\n  -- inner comment\n\nFROM pg_locks\n",
        )
        .unwrap();
        assert_eq!(q.name, "Locks");
        assert_eq!(q.description, "Blocked lock requests");
        assert_eq!(q.sql, "SELECT * FROM pg_locks");
        assert_eq!(q.order_position, None);
    }

    #[test]
    fn parse_sql_file_rejects_short_or_untitled_files() {
        assert!(parse_sql_file("a.sql", "-- Only\n").is_err());
        assert!(parse_sql_file("b.sql", "--\n-- desc\nSELECT 1").is_err());
        let err = parse_sql_file("c.sql", "-- Title\n--\nSELECT 1").unwrap_err();
        assert!(err.to_string().contains("c.sql"));
    }

    #[test]
    fn import_sql_dir_loads_only_sql_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.sql"), "-- Beta\n-- second\nSELECT 2").unwrap();
        fs::write(dir.path().join("a.sql"), "-- Alpha\n-- first\nSELECT 1").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut store = MemoryStore::new();
        assert_eq!(import_sql_dir(&mut store, dir.path()).unwrap(), 2);
        assert_eq!(names(&store.list(false).unwrap()), vec!["Alpha", "Beta"]);
        assert!(store.list(true).unwrap().is_empty());
    }
}
