#![forbid(unsafe_code)]

mod support;

use rw_core::{LineageError, Sequence, StatementKind, synthesize_undo};
use rw_storage::{ReplaySession, SqliteStore, StoreError, snapshot};
use support::{PEOPLE_SCRIPT, temp_dir};

#[test]
fn loaded_snapshot_synthesizes_identical_undo_sets() {
    let store = SqliteStore::open_in_memory().expect("open store");
    let mut session = ReplaySession::new(store);
    session.replay_script(PEOPLE_SCRIPT).expect("replay");
    let graph = session.graph();

    let restored = snapshot::load(&snapshot::save(graph).expect("save")).expect("load");
    assert_eq!(restored.len(), graph.len());
    assert_eq!(restored.next_node_id(), graph.next_node_id());
    for sequence in 1..=16 {
        let sequence = Sequence::new(sequence);
        assert_eq!(
            synthesize_undo(graph, sequence),
            synthesize_undo(&restored, sequence),
            "sequence {sequence}"
        );
    }
    for (original, loaded) in graph.nodes().zip(restored.nodes()) {
        assert_eq!(original, loaded);
    }
}

#[test]
fn snapshot_file_lets_a_later_session_continue() {
    let dir = temp_dir("snapshot_resume");
    let db_path = dir.join("resume.db");
    let snapshot_path = dir.join("nested").join("resume.sqg");

    let first = "\
CREATE TABLE X (id INTEGER PRIMARY KEY, name VARCHAR(255));
INSERT INTO X(id, name) VALUES(1, 'Alice');
";
    let mut session = ReplaySession::new(SqliteStore::open(&db_path).expect("open store"));
    session.replay_script(first).expect("replay first");
    snapshot::save_to_file(session.graph(), &snapshot_path).expect("save snapshot");
    drop(session);

    let graph = snapshot::load_from_file(&snapshot_path).expect("load snapshot");
    let store = SqliteStore::open(&db_path).expect("reopen store");
    let mut session = ReplaySession::resume(store, graph);
    assert_eq!(session.next_sequence(), Sequence::new(3));

    let report = session
        .replay_script("UPDATE X SET name='Aaron' WHERE id=1;\nDELETE FROM X WHERE id=1;\n")
        .expect("replay second");
    assert_eq!(report.linked, 2);
    assert_eq!(
        session.undo(Sequence::new(4)).expect("undo"),
        vec![
            "INSERT INTO X(id, name) VALUES(1, 'Alice');".to_string(),
            "UPDATE X SET name='Aaron' WHERE id=1;".to_string(),
        ]
    );
}

#[test]
fn resumed_session_skips_positions_spent_by_trailing_lines() {
    let dir = temp_dir("snapshot_trailing");
    let db_path = dir.join("trailing.db");
    let snapshot_path = dir.join("trailing.sqg");

    let first = "\
CREATE TABLE X (id INTEGER PRIMARY KEY, name VARCHAR(255));
INSERT INTO X(id, name) VALUES(1, 'Alice');
UPDATE X SET name='Nobody' WHERE id=99;
-- end of batch
";
    let mut session = ReplaySession::new(SqliteStore::open(&db_path).expect("open store"));
    let report = session.replay_script(first).expect("replay first");
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].sequence, Sequence::new(3));
    snapshot::save_to_file(session.graph(), &snapshot_path).expect("save snapshot");
    drop(session);

    let graph = snapshot::load_from_file(&snapshot_path).expect("load snapshot");
    assert_eq!(graph.next_sequence(), Sequence::new(5));
    let store = SqliteStore::open(&db_path).expect("reopen store");
    let mut session = ReplaySession::resume(store, graph);

    let report = session
        .replay_script("DELETE FROM X WHERE id=1;\n")
        .expect("replay second");
    assert_eq!(report.linked, 1);
    let delete = session
        .graph()
        .find_by_sequence(Sequence::new(5))
        .expect("delete");
    assert_eq!(delete.kind(), StatementKind::Delete);
    assert!(session.graph().find_by_sequence(Sequence::new(3)).is_err());
    assert_eq!(session.next_sequence(), Sequence::new(6));
}

#[test]
fn unknown_format_is_rejected() {
    let err = snapshot::load(br#"{"format":99,"next_node_id":1,"nodes":[]}"#).unwrap_err();
    assert!(matches!(
        err,
        StoreError::UnsupportedSnapshotFormat {
            found: 99,
            expected: 2
        }
    ));
}

#[test]
fn inconsistent_links_are_rejected() {
    let store = SqliteStore::open_in_memory().expect("open store");
    let mut session = ReplaySession::new(store);
    session
        .replay_script("CREATE TABLE X (id INTEGER PRIMARY KEY);\nINSERT INTO X(id) VALUES(1);\n")
        .expect("replay");
    let bytes = snapshot::save(session.graph()).expect("save");

    let mut value: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
    value["nodes"][0]["children"] = serde_json::json!([]);
    let tampered = serde_json::to_vec(&value).expect("json");

    let err = snapshot::load(&tampered).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Lineage(LineageError::StructuralViolation { .. })
    ));
}
