use super::*;
use crate::ids::{RowKey, Sequence};
use crate::statement::ParsedStatement;

/// Feeds `(sequence, text, parsed, row)` tuples into a fresh graph.
fn build(stream: &[(u64, &str, ParsedStatement, Option<i64>)]) -> LineageGraph {
    let mut graph = LineageGraph::new();
    for (sequence, text, parsed, row) in stream {
        let node = graph
            .node_for(Sequence::new(*sequence), text, parsed, row.map(RowKey::new))
            .expect("node");
        graph.link(node).expect("link");
    }
    graph
}

fn create(table: &str) -> ParsedStatement {
    ParsedStatement::new(StatementKind::Create, table)
}

fn insert(table: &str) -> ParsedStatement {
    ParsedStatement::new(StatementKind::Insert, table)
}

fn update(table: &str, column: &str) -> ParsedStatement {
    ParsedStatement::new(StatementKind::Update, table).with_column(column)
}

fn delete(table: &str) -> ParsedStatement {
    ParsedStatement::new(StatementKind::Delete, table)
}

fn drop_table(table: &str) -> ParsedStatement {
    ParsedStatement::new(StatementKind::Drop, table)
}

fn undo(graph: &LineageGraph, sequence: u64) -> Vec<String> {
    synthesize_undo(graph, Sequence::new(sequence)).expect("undo")
}

fn alice_history() -> LineageGraph {
    build(&[
        (1, "CREATE TABLE X(id PK, name)", create("X"), None),
        (2, "INSERT INTO X(id,name) VALUES(1,'Alice')", insert("X"), Some(1)),
        (4, "UPDATE X SET name='April' WHERE id=1", update("X", "name"), Some(1)),
        (5, "UPDATE X SET name='Aaron' WHERE id=1", update("X", "name"), Some(1)),
        (6, "DELETE FROM X WHERE id=1", delete("X"), Some(1)),
    ])
}

#[test]
fn undo_delete_replays_insert_and_latest_update() {
    let graph = alice_history();
    assert_eq!(
        undo(&graph, 6),
        vec![
            "INSERT INTO X(id,name) VALUES(1,'Alice')".to_string(),
            "UPDATE X SET name='Aaron' WHERE id=1".to_string(),
        ]
    );
}

#[test]
fn undo_of_anything_on_a_deleted_row_is_empty() {
    let graph = alice_history();
    assert!(undo(&graph, 2).is_empty());
    assert!(undo(&graph, 4).is_empty());
    assert!(undo(&graph, 5).is_empty());
}

#[test]
fn undo_create_drops_table_unless_already_dropped() {
    let graph = build(&[(1, "CREATE TABLE X (id INTEGER PRIMARY KEY);", create("X"), None)]);
    assert_eq!(undo(&graph, 1), vec!["DROP TABLE X;".to_string()]);

    let graph = build(&[
        (1, "CREATE TABLE X (id INTEGER PRIMARY KEY);", create("X"), None),
        (2, "DROP TABLE X;", drop_table("X"), None),
    ]);
    assert!(undo(&graph, 1).is_empty());
}

#[test]
fn undo_insert_deletes_by_rowid() {
    let graph = build(&[
        (1, "CREATE TABLE X (id INTEGER PRIMARY KEY, name VARCHAR(255));", create("X"), None),
        (2, "INSERT INTO X(id, name) VALUES(1, 'Alice');", insert("X"), Some(1)),
        (3, "INSERT INTO X(id, name) VALUES(2, 'Bob');", insert("X"), Some(2)),
        (4, "INSERT INTO X(id, name) VALUES(3, 'Charles');", insert("X"), Some(3)),
    ]);
    assert_eq!(undo(&graph, 4), vec!["DELETE FROM X WHERE rowid=3;".to_string()]);
}

#[test]
fn first_update_undo_is_delete_then_insert() {
    let graph = build(&[
        (1, "CREATE TABLE X (id INTEGER PRIMARY KEY, name VARCHAR(255));", create("X"), None),
        (2, "INSERT INTO X(id, name) VALUES(2, 'Bob');", insert("X"), Some(2)),
        (3, "UPDATE X SET name='Brendan' WHERE id=2;", update("X", "name"), Some(2)),
    ]);
    assert_eq!(
        undo(&graph, 3),
        vec![
            "DELETE FROM X WHERE rowid=2;".to_string(),
            "INSERT INTO X(id, name) VALUES(2, 'Bob');".to_string(),
        ]
    );
}

#[test]
fn later_update_undo_replays_previous_version() {
    let graph = build(&[
        (1, "CREATE TABLE X (id, name, age);", create("X"), None),
        (2, "INSERT INTO X VALUES(1, 'Alice', 30);", insert("X"), Some(1)),
        (3, "UPDATE X SET name='April' WHERE id=1;", update("X", "name"), Some(1)),
        (4, "UPDATE X SET age=31 WHERE id=1;", update("X", "age"), Some(1)),
        (5, "UPDATE X SET name='Aaron' WHERE id=1;", update("X", "name"), Some(1)),
    ]);
    assert_eq!(
        undo(&graph, 5),
        vec!["UPDATE X SET name='April' WHERE id=1;".to_string()]
    );
    // First version of `age` falls back to the original insert.
    assert_eq!(
        undo(&graph, 4),
        vec![
            "DELETE FROM X WHERE rowid=1;".to_string(),
            "INSERT INTO X VALUES(1, 'Alice', 30);".to_string(),
        ]
    );
}

#[test]
fn undo_delete_orders_latest_updates_by_sequence() {
    let graph = build(&[
        (1, "CREATE TABLE X (id, name, age);", create("X"), None),
        (2, "INSERT INTO X VALUES(1, 'Alice', 30);", insert("X"), Some(1)),
        (3, "UPDATE X SET name='April' WHERE id=1;", update("X", "name"), Some(1)),
        (4, "UPDATE X SET age=31 WHERE id=1;", update("X", "age"), Some(1)),
        (5, "UPDATE X SET name='Aaron' WHERE id=1;", update("X", "name"), Some(1)),
        (6, "DELETE FROM X WHERE id=1;", delete("X"), Some(1)),
    ]);
    assert_eq!(
        undo(&graph, 6),
        vec![
            "INSERT INTO X VALUES(1, 'Alice', 30);".to_string(),
            "UPDATE X SET age=31 WHERE id=1;".to_string(),
            "UPDATE X SET name='Aaron' WHERE id=1;".to_string(),
        ]
    );
}

#[test]
fn undo_drop_rebuilds_surviving_rows() {
    let graph = build(&[
        (1, "CREATE TABLE X (id INTEGER PRIMARY KEY, NAME VARCHAR(255));", create("X"), None),
        (2, "INSERT INTO X(id, name) VALUES(1, 'Alice');", insert("X"), Some(1)),
        (3, "INSERT INTO X(id, name) VALUES(2, 'Bob');", insert("X"), Some(2)),
        (4, "INSERT INTO X(id, name) VALUES(3, 'Charles');", insert("X"), Some(3)),
        (5, "INSERT INTO X(id, name) VALUES(4, 'Dave');", insert("X"), Some(4)),
        (6, "UPDATE X SET name='Dan' WHERE id=4;", update("X", "name"), Some(4)),
        (7, "UPDATE X SET name='Brian' WHERE id=2;", update("X", "name"), Some(2)),
        (8, "UPDATE X SET name='Ann' WHERE id=1;", update("X", "name"), Some(1)),
        (9, "UPDATE X SET name='Brendan' WHERE ID=2;", update("X", "name"), Some(2)),
        (10, "UPDATE X SET name='Chuck' WHERE id=3;", update("X", "name"), Some(3)),
        (11, "DELETE FROM X WHERE id=1;", delete("X"), Some(1)),
        (12, "DELETE FROM X WHERE id=4;", delete("X"), Some(4)),
        (14, "DROP TABLE X;", drop_table("X"), None),
    ]);
    assert_eq!(
        undo(&graph, 14),
        vec![
            "CREATE TABLE X (id INTEGER PRIMARY KEY, NAME VARCHAR(255));".to_string(),
            "INSERT INTO X(id, name) VALUES(2, 'Bob');".to_string(),
            "INSERT INTO X(id, name) VALUES(3, 'Charles');".to_string(),
            "UPDATE X SET name='Brendan' WHERE ID=2;".to_string(),
            "UPDATE X SET name='Chuck' WHERE id=3;".to_string(),
        ]
    );
}

#[test]
fn unknown_sequence_is_reported() {
    let graph = alice_history();
    assert_eq!(
        synthesize_undo(&graph, Sequence::new(3)),
        Err(LineageError::SequenceNotFound {
            sequence: Sequence::new(3)
        })
    );
}

#[test]
fn restored_graph_synthesizes_identical_undo() {
    let graph = alice_history();
    let nodes = graph.nodes().cloned().collect::<Vec<_>>();
    let json = serde_json::to_string(&nodes).expect("serialize");
    let nodes: Vec<StatementNode> = serde_json::from_str(&json).expect("deserialize");
    let restored = LineageGraph::from_parts(nodes, graph.next_node_id(), graph.next_sequence())
        .expect("restore");
    for node in graph.nodes() {
        assert_eq!(
            synthesize_undo(&graph, node.sequence()),
            synthesize_undo(&restored, node.sequence())
        );
    }
}

#[test]
fn row_delete_requires_a_row_key() {
    let graph = build(&[(1, "CREATE TABLE X (id);", create("X"), None)]);
    let create = graph.find_by_sequence(Sequence::new(1)).expect("create");
    assert!(matches!(
        delete_row_statement(create),
        Err(LineageError::InvalidLineage { .. })
    ));
}
