#![forbid(unsafe_code)]

use crate::error::LineageError;
use crate::ids::{NodeHandle, RowKey, Sequence};
use crate::node::{NodePayload, StatementNode};
use crate::statement::StatementKind;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Lookup key into the kind-specific tables. Table and column names are
/// folded to ASCII lowercase on construction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IndexKey {
    Table(String),
    Row {
        table: String,
        row: RowKey,
    },
    Column {
        table: String,
        row: RowKey,
        column: String,
    },
}

impl IndexKey {
    pub fn table(table: &str) -> Self {
        Self::Table(fold(table))
    }

    pub fn row(table: &str, row: RowKey) -> Self {
        Self::Row {
            table: fold(table),
            row,
        }
    }

    pub fn column(table: &str, row: RowKey, column: &str) -> Self {
        Self::Column {
            table: fold(table),
            row,
            column: fold(column),
        }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(table) => write!(f, "{table}"),
            Self::Row { table, row } => write!(f, "{table}-{row}"),
            Self::Column { table, row, column } => write!(f, "{table}-{row}-{column}"),
        }
    }
}

fn fold(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Derived acceleration structure over the graph arena. Owns no nodes.
#[derive(Clone, Debug, Default)]
pub struct LineageIndex {
    creates: HashMap<IndexKey, NodeHandle>,
    inserts: HashMap<IndexKey, NodeHandle>,
    updates: HashMap<IndexKey, Vec<NodeHandle>>,
    drops: HashMap<IndexKey, NodeHandle>,
    deletes: HashMap<IndexKey, NodeHandle>,
    by_sequence: BTreeMap<Sequence, NodeHandle>,
}

/// Key a node occupies in its kind-specific table.
pub(crate) fn key_of(node: &StatementNode) -> IndexKey {
    match node.payload() {
        NodePayload::Create { .. } | NodePayload::Drop => IndexKey::table(node.table()),
        NodePayload::Insert { row, .. } | NodePayload::Delete { row } => {
            IndexKey::row(node.table(), *row)
        }
        NodePayload::Update { row, column } => IndexKey::column(node.table(), *row, column),
    }
}

impl LineageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_sequence.is_empty()
    }

    /// Fails when registering `node` would overwrite an existing entry.
    pub(crate) fn ensure_vacant(&self, node: &StatementNode) -> Result<(), LineageError> {
        if self.by_sequence.contains_key(&node.sequence()) {
            return Err(LineageError::violation(
                node.sequence(),
                "sequence is already recorded",
            ));
        }
        let key = key_of(node);
        let occupied = match node.kind() {
            StatementKind::Create => self.creates.contains_key(&key),
            StatementKind::Insert => self.inserts.contains_key(&key),
            StatementKind::Update => false,
            StatementKind::Drop => self.drops.contains_key(&key),
            StatementKind::Delete => self.deletes.contains_key(&key),
        };
        if occupied {
            return Err(LineageError::violation(
                node.sequence(),
                format!("{} node with key [{key}] already exists", node.kind()),
            ));
        }
        Ok(())
    }

    pub(crate) fn register(&mut self, handle: NodeHandle, node: &StatementNode) {
        let key = key_of(node);
        let previous = match node.kind() {
            StatementKind::Create => self.creates.insert(key, handle),
            StatementKind::Insert => self.inserts.insert(key, handle),
            StatementKind::Update => {
                self.updates.entry(key).or_default().push(handle);
                None
            }
            StatementKind::Drop => self.drops.insert(key, handle),
            StatementKind::Delete => self.deletes.insert(key, handle),
        };
        debug_assert!(previous.is_none(), "index entry overwritten");
        let previous = self.by_sequence.insert(node.sequence(), handle);
        debug_assert!(previous.is_none(), "sequence entry overwritten");
    }

    /// Looks up the node of `kind` stored under `key`. For Update this is the
    /// latest version of the column.
    pub fn find(&self, kind: StatementKind, key: &IndexKey) -> Result<NodeHandle, LineageError> {
        let found = match kind {
            StatementKind::Create => self.creates.get(key).copied(),
            StatementKind::Insert => self.inserts.get(key).copied(),
            StatementKind::Update => self.updates.get(key).and_then(|list| list.last().copied()),
            StatementKind::Drop => self.drops.get(key).copied(),
            StatementKind::Delete => self.deletes.get(key).copied(),
        };
        found.ok_or_else(|| LineageError::NotFound {
            kind,
            key: key.clone(),
        })
    }

    pub fn find_by_sequence(&self, sequence: Sequence) -> Result<NodeHandle, LineageError> {
        self.by_sequence
            .get(&sequence)
            .copied()
            .ok_or(LineageError::SequenceNotFound { sequence })
    }

    pub fn latest_update(&self, table: &str, row: RowKey, column: &str) -> Option<NodeHandle> {
        self.updates
            .get(&IndexKey::column(table, row, column))
            .and_then(|list| list.last().copied())
    }

    /// Version chain of one column, oldest first.
    pub fn update_versions(&self, table: &str, row: RowKey, column: &str) -> &[NodeHandle] {
        self.updates
            .get(&IndexKey::column(table, row, column))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn last_sequence(&self) -> Option<Sequence> {
        self.by_sequence.keys().next_back().copied()
    }
}
