#![forbid(unsafe_code)]

use crate::error::LineageError;
use crate::ids::{NodeHandle, NodeId, RowKey, Sequence};
use crate::statement::StatementKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind-specific targeting fields and tombstone flags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodePayload {
    Create { dropped: bool },
    Insert { row: RowKey, deleted: bool },
    Update { row: RowKey, column: String },
    Drop,
    Delete { row: RowKey },
}

impl NodePayload {
    pub fn kind(&self) -> StatementKind {
        match self {
            NodePayload::Create { .. } => StatementKind::Create,
            NodePayload::Insert { .. } => StatementKind::Insert,
            NodePayload::Update { .. } => StatementKind::Update,
            NodePayload::Drop => StatementKind::Drop,
            NodePayload::Delete { .. } => StatementKind::Delete,
        }
    }
}

/// One executed statement. Parent and children are handles into the arena of
/// the owning [`crate::LineageGraph`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementNode {
    id: NodeId,
    sequence: Sequence,
    text: String,
    table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<NodeHandle>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<NodeHandle>,
    payload: NodePayload,
}

impl StatementNode {
    fn new(
        id: NodeId,
        sequence: Sequence,
        text: &str,
        table: impl Into<String>,
        payload: NodePayload,
    ) -> Self {
        Self {
            id,
            sequence,
            text: text.trim().to_string(),
            table: table.into(),
            parent: None,
            children: Vec::new(),
            payload,
        }
    }

    pub fn create(id: NodeId, sequence: Sequence, text: &str, table: impl Into<String>) -> Self {
        Self::new(id, sequence, text, table, NodePayload::Create { dropped: false })
    }

    pub fn insert(
        id: NodeId,
        sequence: Sequence,
        text: &str,
        table: impl Into<String>,
        row: RowKey,
    ) -> Self {
        Self::new(
            id,
            sequence,
            text,
            table,
            NodePayload::Insert {
                row,
                deleted: false,
            },
        )
    }

    pub fn update(
        id: NodeId,
        sequence: Sequence,
        text: &str,
        table: impl Into<String>,
        row: RowKey,
        column: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            sequence,
            text,
            table,
            NodePayload::Update {
                row,
                column: column.into(),
            },
        )
    }

    pub fn drop_table(
        id: NodeId,
        sequence: Sequence,
        text: &str,
        table: impl Into<String>,
    ) -> Self {
        Self::new(id, sequence, text, table, NodePayload::Drop)
    }

    pub fn delete(
        id: NodeId,
        sequence: Sequence,
        text: &str,
        table: impl Into<String>,
        row: RowKey,
    ) -> Self {
        Self::new(id, sequence, text, table, NodePayload::Delete { row })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn sequence(&self) -> Sequence {
        self.sequence
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn kind(&self) -> StatementKind {
        self.payload.kind()
    }

    pub fn payload(&self) -> &NodePayload {
        &self.payload
    }

    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    pub fn row_key(&self) -> Option<RowKey> {
        match &self.payload {
            NodePayload::Insert { row, .. }
            | NodePayload::Update { row, .. }
            | NodePayload::Delete { row } => Some(*row),
            NodePayload::Create { .. } | NodePayload::Drop => None,
        }
    }

    pub fn column(&self) -> Option<&str> {
        match &self.payload {
            NodePayload::Update { column, .. } => Some(column),
            _ => None,
        }
    }

    /// Set on a Create once a later DROP removed its table.
    pub fn is_dropped(&self) -> bool {
        matches!(self.payload, NodePayload::Create { dropped: true })
    }

    /// Set on an Insert once a later DELETE removed its row.
    pub fn is_deleted(&self) -> bool {
        matches!(self.payload, NodePayload::Insert { deleted: true, .. })
    }

    /// Checks that a node of `child` kind may be appended below this node.
    pub(crate) fn check_child(&self, child: StatementKind) -> Result<(), String> {
        if matches!(self.payload, NodePayload::Drop | NodePayload::Delete { .. }) {
            return Err(format!(
                "{} node {} cannot have children",
                self.kind(),
                self.sequence
            ));
        }
        if !child_allowed(self.kind(), child) {
            return Err(format!(
                "{child} node cannot be a child of {} node {}",
                self.kind(),
                self.sequence
            ));
        }
        if self.kind() == StatementKind::Update && !self.children.is_empty() {
            return Err(format!(
                "update node {} already has a successor",
                self.sequence
            ));
        }
        Ok(())
    }

    /// Checks that this unlinked node may take a parent of `parent` kind.
    pub(crate) fn check_parent(&self, parent: StatementKind) -> Result<(), String> {
        if self.parent.is_some() {
            return Err(format!("{} node already has a parent", self.kind()));
        }
        if !child_allowed(parent, self.kind()) {
            return Err(format!(
                "{parent} node cannot be a parent of {} node",
                self.kind()
            ));
        }
        Ok(())
    }

    pub(crate) fn set_parent(&mut self, parent: NodeHandle) {
        debug_assert!(self.parent.is_none());
        self.parent = Some(parent);
    }

    pub(crate) fn push_child(&mut self, child: NodeHandle) {
        self.children.push(child);
    }

    /// Marks the subject of this node as removed. Idempotent; a no-op on kinds
    /// without a tombstone flag.
    pub(crate) fn mark_tombstone(&mut self) {
        match &mut self.payload {
            NodePayload::Create { dropped } => *dropped = true,
            NodePayload::Insert { deleted, .. } => *deleted = true,
            NodePayload::Update { .. } | NodePayload::Drop | NodePayload::Delete { .. } => {}
        }
    }
}

impl fmt::Display for StatementNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind() {
            StatementKind::Create => "CreateNode",
            StatementKind::Insert => "InsertNode",
            StatementKind::Update => "UpdateNode",
            StatementKind::Drop => "DropNode",
            StatementKind::Delete => "DeleteNode",
        };
        write!(
            f,
            "{label}(node_id={}, sequence={})",
            self.id, self.sequence
        )
    }
}

/// Parent/child kinds the lineage allows.
pub(crate) fn child_allowed(parent: StatementKind, child: StatementKind) -> bool {
    use StatementKind::*;
    matches!(
        (parent, child),
        (Create, Insert) | (Create, Drop) | (Insert, Update) | (Insert, Delete) | (Update, Update)
    )
}

pub(crate) fn violation(node: &StatementNode, reason: String) -> LineageError {
    LineageError::violation(node.sequence, reason)
}
