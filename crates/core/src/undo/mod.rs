#![forbid(unsafe_code)]

//! Undo synthesis over a frozen [`LineageGraph`].

use crate::error::LineageError;
use crate::graph::LineageGraph;
use crate::ids::Sequence;
use crate::node::{NodePayload, StatementNode};
use crate::statement::StatementKind;
use tracing::trace;

/// Produces the ordered statements that, run against the current store,
/// restore the state from just before the statement at `sequence`.
pub fn synthesize_undo(
    graph: &LineageGraph,
    sequence: Sequence,
) -> Result<Vec<String>, LineageError> {
    let target = graph.find_by_sequence(sequence)?;
    let statements = match target.payload() {
        NodePayload::Create { .. } => undo_create(target),
        NodePayload::Insert { .. } => undo_insert(target)?,
        NodePayload::Update { .. } => undo_update(graph, target)?,
        NodePayload::Drop => undo_drop(graph, target)?,
        NodePayload::Delete { .. } => undo_delete(graph, target)?,
    };
    trace!(
        sequence = %sequence,
        kind = %target.kind(),
        statements = statements.len(),
        "synthesized undo"
    );
    Ok(statements)
}

fn undo_create(create: &StatementNode) -> Vec<String> {
    if create.is_dropped() {
        return Vec::new();
    }
    vec![drop_table_statement(create.table())]
}

fn undo_insert(insert: &StatementNode) -> Result<Vec<String>, LineageError> {
    if insert.is_deleted() {
        return Ok(Vec::new());
    }
    Ok(vec![delete_row_statement(insert)?])
}

fn undo_update(graph: &LineageGraph, update: &StatementNode) -> Result<Vec<String>, LineageError> {
    let insert = owning_insert(graph, update)?;
    if insert.is_deleted() {
        return Ok(Vec::new());
    }
    let parent = require_parent(graph, update)?;
    match parent.kind() {
        StatementKind::Update => Ok(vec![parent.text().to_string()]),
        StatementKind::Insert => Ok(vec![
            delete_row_statement(parent)?,
            parent.text().to_string(),
        ]),
        other => Err(LineageError::invalid_lineage(
            update.sequence(),
            format!("update node has a {other} parent"),
        )),
    }
}

fn undo_drop(graph: &LineageGraph, drop: &StatementNode) -> Result<Vec<String>, LineageError> {
    let create = require_parent(graph, drop)?;
    if create.kind() != StatementKind::Create {
        return Err(LineageError::invalid_lineage(
            drop.sequence(),
            format!("drop node has a {} parent", create.kind()),
        ));
    }

    let mut surviving = graph
        .children_of(create)
        .filter(|child| child.kind() == StatementKind::Insert && !child.is_deleted())
        .collect::<Vec<_>>();
    surviving.sort_by_key(|insert| insert.sequence());

    let mut updates = Vec::new();
    for insert in &surviving {
        updates.extend(latest_updates(graph, insert)?);
    }
    updates.sort_by_key(|update| update.sequence());

    let mut statements = Vec::with_capacity(1 + surviving.len() + updates.len());
    statements.push(create.text().to_string());
    statements.extend(surviving.iter().map(|insert| insert.text().to_string()));
    statements.extend(updates.iter().map(|update| update.text().to_string()));
    Ok(statements)
}

fn undo_delete(graph: &LineageGraph, delete: &StatementNode) -> Result<Vec<String>, LineageError> {
    let insert = require_parent(graph, delete)?;
    if insert.kind() != StatementKind::Insert {
        return Err(LineageError::invalid_lineage(
            delete.sequence(),
            format!("delete node has a {} parent", insert.kind()),
        ));
    }
    let mut updates = latest_updates(graph, insert)?;
    updates.sort_by_key(|update| update.sequence());

    let mut statements = Vec::with_capacity(1 + updates.len());
    statements.push(insert.text().to_string());
    statements.extend(updates.iter().map(|update| update.text().to_string()));
    Ok(statements)
}

/// Latest version of every column ever updated on the row of `insert`.
fn latest_updates<'a>(
    graph: &'a LineageGraph,
    insert: &StatementNode,
) -> Result<Vec<&'a StatementNode>, LineageError> {
    let Some(row) = insert.row_key() else {
        return Err(LineageError::invalid_lineage(
            insert.sequence(),
            "insert node has no row key",
        ));
    };
    let mut updates = Vec::new();
    for column in graph.updated_columns(insert) {
        let Some(latest) = graph.latest_update(insert.table(), row, &column) else {
            return Err(LineageError::invalid_lineage(
                insert.sequence(),
                format!("column {column} has an update child but no version chain"),
            ));
        };
        updates.push(latest);
    }
    Ok(updates)
}

/// Walks up the version chain of an Update to the Insert that created the row.
fn owning_insert<'a>(
    graph: &'a LineageGraph,
    update: &'a StatementNode,
) -> Result<&'a StatementNode, LineageError> {
    let mut current = update;
    loop {
        let parent = require_parent(graph, current)?;
        match parent.kind() {
            StatementKind::Insert => return Ok(parent),
            StatementKind::Update => current = parent,
            other => {
                return Err(LineageError::invalid_lineage(
                    update.sequence(),
                    format!("version chain reaches a {other} node"),
                ));
            }
        }
    }
}

fn require_parent<'a>(
    graph: &'a LineageGraph,
    node: &StatementNode,
) -> Result<&'a StatementNode, LineageError> {
    graph.parent_of(node).ok_or_else(|| {
        let reason = format!("{} node has no parent", node.kind());
        LineageError::invalid_lineage(node.sequence(), reason)
    })
}

fn drop_table_statement(table: &str) -> String {
    format!("DROP TABLE {table};")
}

fn delete_row_statement(insert: &StatementNode) -> Result<String, LineageError> {
    let Some(row) = insert.row_key() else {
        return Err(LineageError::invalid_lineage(
            insert.sequence(),
            format!("{} node has no row key to delete", insert.kind()),
        ));
    };
    Ok(format!("DELETE FROM {} WHERE rowid={row};", insert.table()))
}

#[cfg(test)]
mod tests;
