#![allow(dead_code)]

use std::path::PathBuf;

pub fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let dir = base.join(format!("rw_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

pub const CREATE_X: &str = "CREATE TABLE X (id INTEGER PRIMARY KEY, name VARCHAR(255));";

/// Fifteen lines: seven rows, two updates, two deletes, a comment, a blank
/// line and a final DROP.
pub const PEOPLE_SCRIPT: &str = "\
CREATE TABLE X (id INTEGER PRIMARY KEY, name VARCHAR(255));
INSERT INTO X(id, name) VALUES(1, 'Alice');
INSERT INTO X(id, name) VALUES(2, 'Bob');
INSERT INTO X(id, name) VALUES(3, 'Charles');
INSERT INTO X(id, name) VALUES(4, 'Dave');
INSERT INTO X(id, name) VALUES(5, 'Eve');
INSERT INTO X(id, name) VALUES(6, 'Francis');
INSERT INTO X(id, name) VALUES(7, 'Gerrard');
UPDATE X SET name='Brendan' WHERE id=2;
UPDATE X SET name='Aaron' WHERE id=1;
-- remove Aaron and Dave
DELETE FROM X WHERE name='Aaron';
DELETE FROM X WHERE id=4;

DROP TABLE X;
";

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
