//! Observation data sources.
//!
//! The analysis only ever reads observations through [`ObservationSource`].
//! [`SqliteSource`] reads the `nodes` table of a node history database;
//! [`InMemorySource`] serves rows the caller already holds.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags, Row};

use crate::analysis::types::{Observation, Window};
use crate::error::DataSourceError;

/// Default table holding peer observations.
pub const DEFAULT_TABLE: &str = "nodes";

/// Columns the analysis reads.
pub const REQUIRED_COLUMNS: [&str; 5] = ["address", "port", "timestamp", "user_agent", "success"];

/// Which observations to fetch. Rows without a user agent are never returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObservationQuery {
    pub window: Option<Window>,
    pub successful_only: bool,
}

impl ObservationQuery {
    /// Every successful observation, regardless of time.
    pub fn successful() -> Self {
        Self {
            window: None,
            successful_only: true,
        }
    }

    /// Every observation inside a window, successful or not.
    pub fn in_window(window: Window) -> Self {
        Self {
            window: Some(window),
            successful_only: false,
        }
    }

    pub fn matches(&self, obs: &Observation) -> bool {
        obs.user_agent.is_some()
            && (!self.successful_only || obs.success)
            && self.window.map_or(true, |w| w.contains(obs.timestamp))
    }
}

/// Read-only access to recorded observations.
pub trait ObservationSource {
    fn observations(&self, query: &ObservationQuery) -> Result<Vec<Observation>, DataSourceError>;
}

/// Observations held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    rows: Vec<Observation>,
}

impl InMemorySource {
    pub fn new(rows: Vec<Observation>) -> Self {
        Self { rows }
    }
}

impl ObservationSource for InMemorySource {
    fn observations(&self, query: &ObservationQuery) -> Result<Vec<Observation>, DataSourceError> {
        Ok(self
            .rows
            .iter()
            .filter(|obs| query.matches(obs))
            .cloned()
            .collect())
    }
}

/// A node history SQLite database, opened read-only.
pub struct SqliteSource {
    conn: Connection,
    path: PathBuf,
    table: String,
}

/// Row as stored, before range checks.
struct RawRow {
    address: String,
    port: i64,
    timestamp: i64,
    user_agent: Option<String>,
    success: Option<bool>,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        address: row.get(0)?,
        port: row.get(1)?,
        timestamp: row.get(2)?,
        user_agent: row.get(3)?,
        success: row.get(4)?,
    })
}

impl RawRow {
    /// `None` when the stored port is not a valid TCP port.
    fn into_observation(self) -> Option<Observation> {
        let Ok(port) = u16::try_from(self.port) else {
            log::debug!("Skipping {} with out-of-range port {}", self.address, self.port);
            return None;
        };

        Some(Observation {
            address: self.address,
            port,
            timestamp: self.timestamp,
            user_agent: self.user_agent,
            success: self.success.unwrap_or(false),
        })
    }
}

/// Quote an SQL identifier. Identifiers cannot be bound as parameters.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl SqliteSource {
    /// Open `path` read-only and check that `table` has the expected columns.
    pub fn open(path: &Path, table: &str) -> Result<Self, DataSourceError> {
        log::info!("Opening node history database {}", path.display());

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| DataSourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        check_schema(&conn, table)?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
            table: table.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Release the connection, surfacing any close error.
    pub fn close(self) -> Result<(), DataSourceError> {
        self.conn.close().map_err(|(_, err)| DataSourceError::Query(err))
    }

    fn select_sql(&self, query: &ObservationQuery) -> String {
        let mut sql = format!(
            "SELECT address, port, timestamp, user_agent, success FROM {} WHERE user_agent IS NOT NULL",
            quote_identifier(&self.table)
        );
        match query.window {
            Some(Window::Before(_)) => sql.push_str(" AND timestamp < ?1"),
            Some(Window::AtOrAfter(_)) => sql.push_str(" AND timestamp >= ?1"),
            None => {}
        }
        if query.successful_only {
            // Any non-zero flag counts, as when the column is read as a bool
            sql.push_str(" AND success != 0");
        }
        sql.push_str(" ORDER BY timestamp, address, port");
        sql
    }
}

impl ObservationSource for SqliteSource {
    fn observations(&self, query: &ObservationQuery) -> Result<Vec<Observation>, DataSourceError> {
        let sql = self.select_sql(query);
        log::debug!("Query: {}", sql);

        let mut stmt = self.conn.prepare(&sql)?;
        let raw_rows = match query.window {
            Some(window) => stmt
                .query_map(params![window.cutoff().secs()], read_row)?
                .collect::<rusqlite::Result<Vec<RawRow>>>()?,
            None => stmt
                .query_map([], read_row)?
                .collect::<rusqlite::Result<Vec<RawRow>>>()?,
        };

        let fetched = raw_rows.len();
        let observations: Vec<Observation> = raw_rows
            .into_iter()
            .filter_map(RawRow::into_observation)
            .collect();

        let skipped = fetched - observations.len();
        if skipped > 0 {
            log::warn!(
                "Skipped {} rows of {} with an out-of-range port",
                skipped,
                self.table
            );
        }

        log::info!(
            "Read {} observations from {} ({:?})",
            observations.len(),
            self.table,
            query
        );
        Ok(observations)
    }
}

fn check_schema(conn: &Connection, table: &str) -> Result<(), DataSourceError> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let columns = stmt
        .query_map(params![table], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;

    if columns.is_empty() {
        return Err(DataSourceError::MissingTable(table.to_string()));
    }

    for required in REQUIRED_COLUMNS {
        if !columns.iter().any(|c| c.eq_ignore_ascii_case(required)) {
            return Err(DataSourceError::MissingColumn {
                table: table.to_string(),
                column: required.to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::Cutoff;
    use tempfile::TempDir;

    fn create_db(dir: &TempDir, rows: &[(&str, i64, i64, Option<&str>, i64)]) -> PathBuf {
        let path = dir.path().join("nodes_history.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE nodes (
                address TEXT NOT NULL,
                port INTEGER NOT NULL,
                timestamp INTEGER NOT NULL,
                user_agent TEXT,
                success INTEGER NOT NULL
            );",
        )
        .unwrap();
        for (address, port, timestamp, ua, success) in rows {
            conn.execute(
                "INSERT INTO nodes (address, port, timestamp, user_agent, success) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![address, port, timestamp, ua, success],
            )
            .unwrap();
        }
        path
    }

    #[test]
    fn test_window_and_success_filters() {
        let dir = TempDir::new().unwrap();
        let path = create_db(
            &dir,
            &[
                ("1.1.1.1", 8333, 10, Some("/a/"), 1),
                ("1.1.1.1", 8333, 20, None, 1),
                ("2.2.2.2", 8333, 30, Some("/b/"), 0),
                ("3.3.3.3", 8333, 40, Some("/c/"), 1),
            ],
        );
        let source = SqliteSource::open(&path, DEFAULT_TABLE).unwrap();

        let all = source.observations(&ObservationQuery::successful()).unwrap();
        assert_eq!(all.len(), 2);

        let before = source
            .observations(&ObservationQuery::in_window(Window::Before(Cutoff::new(30))))
            .unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].user_agent.as_deref(), Some("/a/"));

        let after = source
            .observations(&ObservationQuery::in_window(Window::AtOrAfter(Cutoff::new(30))))
            .unwrap();
        assert_eq!(after.len(), 2);
        assert!(after.iter().any(|o| !o.success));

        source.close().unwrap();
    }

    #[test]
    fn test_sqlite_and_memory_sources_agree() {
        let dir = TempDir::new().unwrap();
        let path = create_db(
            &dir,
            &[
                ("1.1.1.1", 8333, 10, Some("/a/"), 1),
                ("2.2.2.2", 8333, 30, Some("/b/"), 0),
                ("3.3.3.3", 8333, 40, None, 1),
            ],
        );
        let sqlite = SqliteSource::open(&path, DEFAULT_TABLE).unwrap();
        let memory = InMemorySource::new(vec![
            Observation::new("1.1.1.1", 8333, 10, Some("/a/"), true),
            Observation::new("2.2.2.2", 8333, 30, Some("/b/"), false),
            Observation::new("3.3.3.3", 8333, 40, None, true),
        ]);

        for query in [
            ObservationQuery::successful(),
            ObservationQuery::in_window(Window::Before(Cutoff::new(30))),
            ObservationQuery::in_window(Window::AtOrAfter(Cutoff::new(30))),
        ] {
            assert_eq!(
                sqlite.observations(&query).unwrap(),
                memory.observations(&query).unwrap(),
                "{:?}",
                query
            );
        }
    }

    #[test]
    fn test_missing_table() {
        let dir = TempDir::new().unwrap();
        let path = create_db(&dir, &[]);
        let err = SqliteSource::open(&path, "peers").err().unwrap();
        assert!(matches!(err, DataSourceError::MissingTable(ref t) if t == "peers"));
    }

    #[test]
    fn test_missing_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE nodes (address TEXT, port INTEGER, timestamp INTEGER);")
            .unwrap();
        drop(conn);

        let err = SqliteSource::open(&path, DEFAULT_TABLE).err().unwrap();
        assert!(matches!(
            err,
            DataSourceError::MissingColumn { ref column, .. } if column == "user_agent"
        ));
    }

    #[test]
    fn test_missing_file_is_open_error() {
        let dir = TempDir::new().unwrap();
        let err = SqliteSource::open(&dir.path().join("absent.sqlite"), DEFAULT_TABLE)
            .err()
            .unwrap();
        assert!(matches!(err, DataSourceError::Open { .. }));
    }

    #[test]
    fn test_out_of_range_port_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = create_db(
            &dir,
            &[
                ("1.1.1.1", 70000, 10, Some("/a/"), 1),
                ("2.2.2.2", -1, 20, Some("/a/"), 1),
                ("3.3.3.3", 8333, 30, Some("/b/"), 1),
            ],
        );
        let source = SqliteSource::open(&path, DEFAULT_TABLE).unwrap();
        let rows = source.observations(&ObservationQuery::successful()).unwrap();
        assert_eq!(rows, vec![Observation::new("3.3.3.3", 8333, 30, Some("/b/"), true)]);
    }

    #[test]
    fn test_bad_port_after_cutoff_does_not_break_before_window() {
        let dir = TempDir::new().unwrap();
        let path = create_db(
            &dir,
            &[
                ("a", 8333, 10, Some("/Satoshi:29.0.0/"), 1),
                ("b", 70000, 200, Some("/Satoshi:30.0.0/"), 1),
            ],
        );
        let source = SqliteSource::open(&path, DEFAULT_TABLE).unwrap();
        let cutoff = Cutoff::new(100);

        let before = source
            .observations(&ObservationQuery::in_window(Window::Before(cutoff)))
            .unwrap();
        assert_eq!(before.len(), 1);
        let after = source
            .observations(&ObservationQuery::in_window(Window::AtOrAfter(cutoff)))
            .unwrap();
        assert!(after.is_empty());

        let boards = crate::analysis::windowed_user_agents(&source, cutoff, 20).unwrap();
        assert_eq!(boards.before.entries.len(), 1);
        assert!(boards.after.entries.is_empty());
    }

    #[test]
    fn test_any_nonzero_success_flag_counts() {
        let dir = TempDir::new().unwrap();
        let path = create_db(
            &dir,
            &[
                ("1.1.1.1", 8333, 10, Some("/a/"), 2),
                ("2.2.2.2", 8333, 20, Some("/b/"), 0),
                ("3.3.3.3", 8333, 30, Some("/c/"), -1),
            ],
        );
        let sqlite = SqliteSource::open(&path, DEFAULT_TABLE).unwrap();
        let memory = InMemorySource::new(
            sqlite
                .observations(&ObservationQuery::in_window(Window::AtOrAfter(Cutoff::new(0))))
                .unwrap(),
        );

        let query = ObservationQuery::successful();
        let from_sqlite = sqlite.observations(&query).unwrap();
        assert_eq!(from_sqlite.len(), 2);
        assert_eq!(from_sqlite, memory.observations(&query).unwrap());
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("nodes"), "\"nodes\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }
}
