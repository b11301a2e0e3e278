#![forbid(unsafe_code)]

use crate::parser::ParseError;
use rw_core::{LineageError, StatementKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("parse: {0}")]
    Parse(#[from] ParseError),
    #[error("lineage: {0}")]
    Lineage(#[from] LineageError),
    #[error("snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
    #[error("unsupported snapshot format {found} (expected {expected})")]
    UnsupportedSnapshotFormat { found: u32, expected: u32 },
    #[error("no row of {table} matches `{selector}`")]
    NoMatchingRow { table: String, selector: String },
    #[error("{kind} statement changed {changed} rows (expected exactly one)")]
    UnexpectedRowCount { kind: StatementKind, changed: usize },
    #[error("{kind} statement has no WHERE clause to resolve its row")]
    MissingSelector { kind: StatementKind },
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
}
