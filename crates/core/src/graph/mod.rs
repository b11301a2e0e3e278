#![forbid(unsafe_code)]

use crate::error::LineageError;
use crate::ids::{NodeHandle, NodeId, RowKey, Sequence};
use crate::index::{IndexKey, LineageIndex};
use crate::node::{self, StatementNode};
use crate::statement::{ParsedStatement, StatementKind};
use std::collections::BTreeMap;
use tracing::debug;

/// Arena of statement nodes plus the index over it.
///
/// `link` is the only way nodes enter the graph. It either threads a node in
/// completely (parent, child list, tombstone, index) or leaves the graph as it
/// was. Reads are safe from many threads once linking has stopped.
///
/// The graph also owns the input-stream cursor: every position handed to
/// [`LineageGraph::claim_sequence`] is spent, whether or not a node is ever
/// linked at it.
#[derive(Clone, Debug)]
pub struct LineageGraph {
    nodes: Vec<StatementNode>,
    index: LineageIndex,
    next_id: u64,
    next_sequence: Sequence,
}

impl Default for LineageGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl LineageGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: LineageIndex::new(),
            next_id: 1,
            next_sequence: Sequence::FIRST,
        }
    }

    pub fn allocate_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Id the next allocated node will receive.
    pub fn next_node_id(&self) -> u64 {
        self.next_id
    }

    /// First stream position not yet spent by a claim or a link.
    pub fn next_sequence(&self) -> Sequence {
        self.next_sequence
    }

    /// Spends `sequence` and every position before it.
    ///
    /// Fails if the position was already spent, so a number reported once
    /// (linked, skipped or failed) never names a second statement.
    pub fn claim_sequence(&mut self, sequence: Sequence) -> Result<(), LineageError> {
        if sequence < self.next_sequence {
            return Err(LineageError::violation(
                sequence,
                format!(
                    "sequence already consumed (next free is {})",
                    self.next_sequence
                ),
            ));
        }
        self.next_sequence = sequence.next();
        Ok(())
    }

    /// Builds the node variant matching `parsed`, with a fresh id.
    pub fn node_for(
        &mut self,
        sequence: Sequence,
        text: &str,
        parsed: &ParsedStatement,
        row: Option<RowKey>,
    ) -> Result<StatementNode, LineageError> {
        let table = parsed.table.as_str();
        let node = match (parsed.kind, row) {
            (StatementKind::Create, _) => {
                StatementNode::create(self.allocate_id(), sequence, text, table)
            }
            (StatementKind::Drop, _) => {
                StatementNode::drop_table(self.allocate_id(), sequence, text, table)
            }
            (StatementKind::Insert, Some(row)) => {
                StatementNode::insert(self.allocate_id(), sequence, text, table, row)
            }
            (StatementKind::Delete, Some(row)) => {
                StatementNode::delete(self.allocate_id(), sequence, text, table, row)
            }
            (StatementKind::Update, Some(row)) => {
                let Some(column) = parsed.column.as_deref() else {
                    return Err(LineageError::violation(
                        sequence,
                        "update statement has no column",
                    ));
                };
                StatementNode::update(self.allocate_id(), sequence, text, table, row, column)
            }
            (kind, None) => {
                return Err(LineageError::violation(
                    sequence,
                    format!("{kind} statement has no row key"),
                ));
            }
        };
        Ok(node)
    }

    /// Threads `node` into the graph according to its kind.
    pub fn link(&mut self, mut node: StatementNode) -> Result<NodeHandle, LineageError> {
        if node.parent().is_some() || !node.children().is_empty() {
            return Err(node::violation(&node, "node is already linked".to_string()));
        }
        let parent = self.resolve_parent(&node)?;
        self.index.ensure_vacant(&node)?;
        if let Some(parent) = parent {
            let parent_node = &self.nodes[parent.slot()];
            parent_node
                .check_child(node.kind())
                .map_err(|reason| node::violation(&node, reason))?;
            node.check_parent(parent_node.kind())
                .map_err(|reason| node::violation(&node, reason))?;
        }

        let handle = NodeHandle::new(self.nodes.len());
        if let Some(parent) = parent {
            node.set_parent(parent);
            let parent_node = &mut self.nodes[parent.slot()];
            parent_node.push_child(handle);
            if matches!(node.kind(), StatementKind::Drop | StatementKind::Delete) {
                parent_node.mark_tombstone();
            }
        }
        self.index.register(handle, &node);
        debug!(
            sequence = %node.sequence(),
            kind = %node.kind(),
            table = node.table(),
            parent = ?parent.map(|p| self.nodes[p.slot()].sequence()),
            "linked statement"
        );
        self.next_sequence = self.next_sequence.max(node.sequence().next());
        self.nodes.push(node);
        Ok(handle)
    }

    fn resolve_parent(&self, node: &StatementNode) -> Result<Option<NodeHandle>, LineageError> {
        let table = node.table();
        let parent = match node.kind() {
            StatementKind::Create => return Ok(None),
            StatementKind::Insert | StatementKind::Drop => self
                .index
                .find(StatementKind::Create, &IndexKey::table(table))?,
            StatementKind::Delete => {
                let row = self.require_row(node)?;
                self.index
                    .find(StatementKind::Insert, &IndexKey::row(table, row))?
            }
            StatementKind::Update => {
                let row = self.require_row(node)?;
                let insert = self
                    .index
                    .find(StatementKind::Insert, &IndexKey::row(table, row))?;
                let column = node.column().unwrap_or_default();
                self.index
                    .latest_update(table, row, column)
                    .unwrap_or(insert)
            }
        };
        Ok(Some(parent))
    }

    fn require_row(&self, node: &StatementNode) -> Result<RowKey, LineageError> {
        node.row_key()
            .ok_or_else(|| node::violation(node, format!("{} node has no row key", node.kind())))
    }

    pub fn node(&self, handle: NodeHandle) -> &StatementNode {
        &self.nodes[handle.slot()]
    }

    pub fn get(&self, handle: NodeHandle) -> Option<&StatementNode> {
        self.nodes.get(handle.slot())
    }

    pub fn parent_of(&self, node: &StatementNode) -> Option<&StatementNode> {
        node.parent().map(|handle| self.node(handle))
    }

    pub fn children_of<'a>(
        &'a self,
        node: &'a StatementNode,
    ) -> impl Iterator<Item = &'a StatementNode> + 'a {
        node.children().iter().map(|handle| self.node(*handle))
    }

    pub fn find(
        &self,
        kind: StatementKind,
        key: &IndexKey,
    ) -> Result<&StatementNode, LineageError> {
        self.index.find(kind, key).map(|handle| self.node(handle))
    }

    pub fn find_by_sequence(&self, sequence: Sequence) -> Result<&StatementNode, LineageError> {
        self.index
            .find_by_sequence(sequence)
            .map(|handle| self.node(handle))
    }

    pub fn latest_update(&self, table: &str, row: RowKey, column: &str) -> Option<&StatementNode> {
        self.index
            .latest_update(table, row, column)
            .map(|handle| self.node(handle))
    }

    /// Columns touched by the direct Update children of an Insert, deduplicated
    /// case-insensitively and ordered by name.
    pub fn updated_columns(&self, insert: &StatementNode) -> Vec<String> {
        let mut columns = BTreeMap::new();
        for child in self.children_of(insert) {
            if let Some(column) = child.column() {
                columns
                    .entry(column.to_ascii_lowercase())
                    .or_insert_with(|| column.to_string());
            }
        }
        columns.into_values().collect()
    }

    /// Nodes in link order.
    pub fn nodes(&self) -> impl Iterator<Item = &StatementNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn index(&self) -> &LineageIndex {
        &self.index
    }

    pub fn last_sequence(&self) -> Option<Sequence> {
        self.index.last_sequence()
    }

    /// Rebuilds a graph from an arena produced by an earlier graph, checking
    /// every link and re-registering the index in arena order. The cursors are
    /// never moved behind what the restored nodes already use.
    pub fn from_parts(
        nodes: Vec<StatementNode>,
        next_node_id: u64,
        next_sequence: Sequence,
    ) -> Result<Self, LineageError> {
        let mut index = LineageIndex::new();
        for (slot, node) in nodes.iter().enumerate() {
            check_restored_links(&nodes, slot, node)?;
            index.ensure_vacant(node)?;
            index.register(NodeHandle::new(slot), node);
        }
        let max_id = nodes.iter().map(|node| node.id().get()).max().unwrap_or(0);
        let next_sequence = index
            .last_sequence()
            .map_or(next_sequence, |last| next_sequence.max(last.next()));
        Ok(Self {
            nodes,
            index,
            next_id: next_node_id.max(max_id + 1),
            next_sequence,
        })
    }
}

fn check_restored_links(
    nodes: &[StatementNode],
    slot: usize,
    node: &StatementNode,
) -> Result<(), LineageError> {
    match (node.kind(), node.parent()) {
        (StatementKind::Create, Some(_)) => {
            return Err(node::violation(node, "create node has a parent".to_string()));
        }
        (StatementKind::Create, None) => {}
        (kind, None) => {
            return Err(node::violation(node, format!("{kind} node has no parent")));
        }
        (kind, Some(parent)) => {
            let Some(parent_node) = nodes.get(parent.slot()).filter(|_| parent.slot() < slot)
            else {
                return Err(node::violation(node, "parent handle out of range".to_string()));
            };
            if !node::child_allowed(parent_node.kind(), kind) {
                return Err(node::violation(
                    node,
                    format!("{} node cannot be a parent of {kind} node", parent_node.kind()),
                ));
            }
            if !parent_node.children().contains(&NodeHandle::new(slot)) {
                return Err(node::violation(
                    node,
                    "parent does not list node as a child".to_string(),
                ));
            }
        }
    }
    if node.kind() == StatementKind::Update && node.children().len() > 1 {
        return Err(node::violation(
            node,
            "update node has more than one successor".to_string(),
        ));
    }
    for child in node.children() {
        let points_back = nodes
            .get(child.slot())
            .is_some_and(|child_node| child_node.parent() == Some(NodeHandle::new(slot)));
        if !points_back {
            return Err(node::violation(
                node,
                "child does not point back to node".to_string(),
            ));
        }
    }
    Ok(())
}
