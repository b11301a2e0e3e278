#![forbid(unsafe_code)]

//! Graph snapshots. The JSON envelope is internal and versioned by `format`.

use crate::store::StoreError;
use rw_core::{LineageGraph, Sequence, StatementNode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub const SNAPSHOT_FORMAT: u32 = 2;

#[derive(Serialize)]
struct SnapshotOut<'a> {
    format: u32,
    next_node_id: u64,
    next_sequence: Sequence,
    nodes: Vec<&'a StatementNode>,
}

#[derive(Deserialize)]
struct SnapshotHeader {
    format: u32,
}

#[derive(Deserialize)]
struct SnapshotIn {
    next_node_id: u64,
    next_sequence: Sequence,
    nodes: Vec<StatementNode>,
}

pub fn save(graph: &LineageGraph) -> Result<Vec<u8>, StoreError> {
    let snapshot = SnapshotOut {
        format: SNAPSHOT_FORMAT,
        next_node_id: graph.next_node_id(),
        next_sequence: graph.next_sequence(),
        nodes: graph.nodes().collect(),
    };
    Ok(serde_json::to_vec(&snapshot)?)
}

pub fn load(bytes: &[u8]) -> Result<LineageGraph, StoreError> {
    let header: SnapshotHeader = serde_json::from_slice(bytes)?;
    if header.format != SNAPSHOT_FORMAT {
        return Err(StoreError::UnsupportedSnapshotFormat {
            found: header.format,
            expected: SNAPSHOT_FORMAT,
        });
    }
    let snapshot: SnapshotIn = serde_json::from_slice(bytes)?;
    Ok(LineageGraph::from_parts(
        snapshot.nodes,
        snapshot.next_node_id,
        snapshot.next_sequence,
    )?)
}

/// Writes the snapshot next to its final location and renames it into place.
pub fn save_to_file(graph: &LineageGraph, path: impl AsRef<Path>) -> Result<(), StoreError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let bytes = save(graph)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, &bytes)?;
    std::fs::rename(&tmp, path)?;
    debug!(path = %path.display(), nodes = graph.len(), "saved snapshot");
    Ok(())
}

pub fn load_from_file(path: impl AsRef<Path>) -> Result<LineageGraph, StoreError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let graph = load(&bytes)?;
    debug!(path = %path.display(), nodes = graph.len(), "loaded snapshot");
    Ok(graph)
}
