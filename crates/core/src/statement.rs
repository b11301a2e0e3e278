#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Create,
    Insert,
    Update,
    Drop,
    Delete,
}

impl StatementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StatementKind::Create => "create",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Drop => "drop",
            StatementKind::Delete => "delete",
        }
    }

    /// Whether the store reports an affected row for this kind.
    pub fn targets_row(self) -> bool {
        matches!(
            self,
            StatementKind::Insert | StatementKind::Update | StatementKind::Delete
        )
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured record extracted from one raw statement by the parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedStatement {
    pub kind: StatementKind,
    pub table: String,
    /// Column modified by an UPDATE.
    pub column: Option<String>,
    /// Rendered WHERE expression of an UPDATE or DELETE, without the keyword.
    pub selector: Option<String>,
}

impl ParsedStatement {
    pub fn new(kind: StatementKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            column: None,
            selector: None,
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }
}
