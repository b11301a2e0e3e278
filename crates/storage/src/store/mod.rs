#![forbid(unsafe_code)]

mod error;

pub use error::StoreError;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, Transaction};
use rw_core::{ParsedStatement, RowKey, StatementKind};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Relational store the statement log is applied to.
#[derive(Debug)]
pub struct SqliteStore {
    path: Option<PathBuf>,
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        debug!(path = %path.display(), "opened sqlite store");
        Ok(Self {
            path: Some(path),
            conn,
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            path: None,
            conn: Connection::open_in_memory()?,
        })
    }

    /// Database file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Executes `text` and hands the affected row to `on_executed`.
    ///
    /// Everything runs in one transaction that is committed only when
    /// `on_executed` succeeds, so a statement the caller refuses to record
    /// leaves no trace in the database. An INSERT must write exactly one row.
    pub fn execute_recorded<T, F>(
        &mut self,
        statement: &ParsedStatement,
        text: &str,
        on_executed: F,
    ) -> Result<T, StoreError>
    where
        F: FnOnce(Option<RowKey>) -> Result<T, StoreError>,
    {
        let tx = self.conn.transaction()?;
        let row = match statement.kind {
            StatementKind::Create | StatementKind::Drop => {
                tx.execute(text, [])?;
                None
            }
            StatementKind::Insert => {
                // `last_insert_rowid` only names the row when exactly one was written.
                let changed = tx.execute(text, [])?;
                if changed != 1 {
                    return Err(StoreError::UnexpectedRowCount {
                        kind: statement.kind,
                        changed,
                    });
                }
                Some(RowKey::new(tx.last_insert_rowid()))
            }
            StatementKind::Update | StatementKind::Delete => {
                let row = resolve_row(&tx, statement)?;
                tx.execute(text, [])?;
                Some(row)
            }
        };
        let out = on_executed(row)?;
        tx.commit()?;
        debug!(
            kind = %statement.kind,
            table = %statement.table,
            row = ?row.map(RowKey::get),
            "executed statement"
        );
        Ok(out)
    }

    /// Executes `statements` in order inside one transaction.
    pub fn execute_batch(&mut self, statements: &[String]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        for statement in statements {
            tx.execute_batch(statement)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Runs a query and renders every value as text (`NULL` for nulls).
    pub fn query_rows(&self, sql: &str) -> Result<Vec<Vec<String>>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let width = stmt.column_count();
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(render_value(row.get_ref(i)?));
            }
            out.push(values);
        }
        Ok(out)
    }
}

fn resolve_row(tx: &Transaction<'_>, statement: &ParsedStatement) -> Result<RowKey, StoreError> {
    let Some(selector) = statement.selector.as_deref() else {
        return Err(StoreError::MissingSelector {
            kind: statement.kind,
        });
    };
    let sql = format!(
        "SELECT rowid FROM {} WHERE {selector} ORDER BY rowid LIMIT 2",
        statement.table
    );
    let mut stmt = tx.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    let Some(first) = rows.first().copied() else {
        return Err(StoreError::NoMatchingRow {
            table: statement.table.clone(),
            selector: selector.to_string(),
        });
    };
    if rows.len() > 1 {
        warn!(
            table = %statement.table,
            selector,
            rowid = first,
            "selector matches several rows; recording the first"
        );
    }
    Ok(RowKey::new(first))
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(v) => v.to_string(),
        ValueRef::Real(v) => v.to_string(),
        ValueRef::Text(v) => String::from_utf8_lossy(v).into_owned(),
        ValueRef::Blob(v) => format!("<blob {} bytes>", v.len()),
    }
}
