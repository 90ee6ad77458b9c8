//! Ad-hoc SQL against a caller-owned connection, and saving the result as
//! the dashboard's flat file.

use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use crate::data::loader::DataSource;
use crate::data::model::{Dataset, Value};
use crate::error::{DashboardError, Result};
use crate::export::export_spreadsheet;

/// Rows shown in the result preview.
pub const PREVIEW_ROWS: usize = 10;

/// A read-only query capability. The connection is established and owned by
/// the caller; this crate never opens one on its own initiative.
pub trait QueryConnection {
    /// Short description for status lines (never includes credentials).
    fn describe(&self) -> String;

    /// Run `sql` and return its row-set with the driver's column names.
    fn query(&self, sql: &str) -> Result<Dataset>;
}

/// SQLite-backed connection.
pub struct SqliteConnection {
    conn: Connection,
    label: String,
}

impl SqliteConnection {
    /// Open an existing database file read-only.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| DashboardError::SourceUnavailable(format!("{}: {e}", path.display())))?;
        Ok(SqliteConnection {
            conn,
            label: format!("SQLite {}", path.display()),
        })
    }

    /// Wrap an already-open connection.
    pub fn from_connection(conn: Connection, label: impl Into<String>) -> Self {
        SqliteConnection {
            conn,
            label: label.into(),
        }
    }
}

impl QueryConnection for SqliteConnection {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn query(&self, sql: &str) -> Result<Dataset> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();

        let mut rows = Vec::new();
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(match row.get_ref(i)? {
                    ValueRef::Null => Value::Null,
                    ValueRef::Integer(n) => Value::Integer(n),
                    ValueRef::Real(f) => Value::Float(f),
                    ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
                    ValueRef::Blob(b) => Value::String(format!("<{} bytes>", b.len())),
                });
            }
            rows.push(values);
        }
        Ok(Dataset::new(columns, rows))
    }
}

/// A query over a connection, usable wherever a file source is.
pub struct QuerySource<'a> {
    pub connection: &'a dyn QueryConnection,
    pub sql: String,
}

impl DataSource for QuerySource<'_> {
    fn describe(&self) -> String {
        format!("query on {}", self.connection.describe())
    }

    fn load(&self) -> anyhow::Result<Dataset> {
        Ok(self.connection.query(&self.sql)?)
    }
}

/// What running a query produced.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Ran fine but returned no rows; nothing was written.
    NoData,
    /// Rows were saved to `path` for the dashboard to pick up.
    Saved {
        path: PathBuf,
        rows: usize,
        columns: Vec<String>,
        preview: Dataset,
    },
}

/// Run `sql` and, when it returns rows, save them as the dashboard's flat
/// file at `data_path`.
///
/// Blank SQL is rejected up front; driver errors come back as
/// [`DashboardError::Query`] text and are not retried.
pub fn execute_query(conn: &dyn QueryConnection, sql: &str, data_path: &Path) -> Result<QueryOutcome> {
    if sql.trim().is_empty() {
        return Err(DashboardError::InvalidArgument(
            "Please enter a SQL query to execute".to_string(),
        ));
    }

    let dataset = conn.query(sql).inspect_err(|e| {
        log::warn!("Query on {} failed: {e}", conn.describe());
    })?;

    if dataset.is_empty() {
        log::info!("Query returned no rows");
        return Ok(QueryOutcome::NoData);
    }

    if let Some(dir) = data_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(data_path, export_spreadsheet(&dataset)?)?;
    log::info!(
        "Saved {} rows x {} columns to {}",
        dataset.len(),
        dataset.columns.len(),
        data_path.display()
    );

    Ok(QueryOutcome::Saved {
        path: data_path.to_path_buf(),
        rows: dataset.len(),
        columns: dataset.columns.clone(),
        preview: dataset.head(PREVIEW_ROWS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> SqliteConnection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE sales (state_name TEXT, item_name TEXT, invoice_value REAL, qty INTEGER);
             INSERT INTO sales VALUES ('Goa', 'A', 10.5, 2), ('Kerala', 'B', NULL, 1);",
        )
        .unwrap();
        SqliteConnection::from_connection(conn, "memory")
    }

    #[test]
    fn query_maps_driver_types() {
        let ds = connection()
            .query("SELECT state_name, invoice_value, qty FROM sales ORDER BY state_name")
            .unwrap();
        assert_eq!(ds.columns, vec!["state_name", "invoice_value", "qty"]);
        assert_eq!(
            ds.rows[0],
            vec![Value::String("Goa".into()), Value::Float(10.5), Value::Integer(2)]
        );
        assert_eq!(ds.rows[1][1], Value::Null);
    }

    #[test]
    fn blank_sql_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = execute_query(&connection(), "   ", &dir.path().join("out.csv")).unwrap_err();
        assert!(matches!(err, DashboardError::InvalidArgument(_)));
    }

    #[test]
    fn malformed_sql_is_reported_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let err = execute_query(&connection(), "SELEC nonsense", &dir.path().join("out.csv")).unwrap_err();
        match err {
            DashboardError::Query(msg) => assert!(!msg.is_empty()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_result_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("out.csv");
        let outcome = execute_query(&connection(), "SELECT * FROM sales WHERE 0", &path).unwrap();
        assert_eq!(outcome, QueryOutcome::NoData);
        assert!(!path.exists());
    }

    #[test]
    fn rows_are_saved_for_the_dashboard() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("erp_sales_data.csv");
        let outcome = execute_query(&connection(), "SELECT * FROM sales", &path).unwrap();
        let QueryOutcome::Saved { rows, columns, preview, .. } = outcome else {
            panic!("expected saved outcome");
        };
        assert_eq!(rows, 2);
        assert_eq!(columns.len(), 4);
        assert_eq!(preview.len(), 2);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("state_name,item_name,invoice_value,qty\n"));
    }

    #[test]
    fn query_source_feeds_the_loader() {
        let conn = connection();
        let source = QuerySource {
            connection: &conn,
            sql: "SELECT * FROM sales".into(),
        };
        assert_eq!(crate::data::loader::load_or_empty(&source).len(), 2);

        let broken = QuerySource {
            connection: &conn,
            sql: "SELECT * FROM missing_table".into(),
        };
        assert!(crate::data::loader::load_or_empty(&broken).is_empty());
    }
}
