#![forbid(unsafe_code)]

use crate::parser::{ParseError, parse_statement};
use crate::store::{SqliteStore, StoreError};
use rw_core::{LineageGraph, NodeHandle, Sequence, synthesize_undo};
use std::path::Path;
use tracing::{info, trace, warn};

/// What happens to the rest of a script when one statement cannot be
/// executed or linked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log the failure and continue with the next line.
    #[default]
    SkipAndWarn,
    /// Return the first failure to the caller.
    Stop,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineOutcome {
    Linked(NodeHandle),
    /// Blank line, comment or statement kind the lineage does not track.
    Skipped,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailedStatement {
    pub sequence: Sequence,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub linked: usize,
    pub skipped: usize,
    pub failed: Vec<FailedStatement>,
}

/// Feeds a statement stream through the parser, the store and the graph, one
/// statement at a time.
#[derive(Debug)]
pub struct ReplaySession {
    store: SqliteStore,
    graph: LineageGraph,
    policy: FailurePolicy,
}

impl ReplaySession {
    pub fn new(store: SqliteStore) -> Self {
        Self::resume(store, LineageGraph::new())
    }

    /// Continues a session whose graph was loaded from a snapshot.
    pub fn resume(store: SqliteStore, graph: LineageGraph) -> Self {
        Self {
            store,
            graph,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn graph(&self) -> &LineageGraph {
        &self.graph
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn into_parts(self) -> (SqliteStore, LineageGraph) {
        (self.store, self.graph)
    }

    /// Sequence number the next script line receives.
    pub fn next_sequence(&self) -> Sequence {
        self.graph.next_sequence()
    }

    /// Executes one statement and links it. Unrecognised lines are skipped
    /// without touching the store.
    ///
    /// `sequence` is spent whatever the outcome; a position that was already
    /// spent is rejected before anything runs.
    pub fn apply_statement(
        &mut self,
        sequence: Sequence,
        text: &str,
    ) -> Result<LineOutcome, StoreError> {
        self.graph.claim_sequence(sequence)?;
        let parsed = match parse_statement(text) {
            Ok(parsed) => parsed,
            Err(ParseError::UnrecognizedInstruction { instruction }) => {
                trace!(sequence = %sequence, instruction, "skipping line");
                return Ok(LineOutcome::Skipped);
            }
            Err(err) => return Err(err.into()),
        };
        let graph = &mut self.graph;
        let handle = self.store.execute_recorded(&parsed, text, |row| {
            let node = graph.node_for(sequence, text, &parsed, row)?;
            Ok(graph.link(node)?)
        })?;
        Ok(LineOutcome::Linked(handle))
    }

    /// Replays a script, one statement per line. Line numbers continue from
    /// the last spent sequence, including skipped and failed lines.
    pub fn replay_script(&mut self, script: &str) -> Result<ReplayReport, StoreError> {
        let mut report = ReplayReport::default();
        let mut sequence = self.next_sequence();
        for line in script.lines() {
            match self.apply_statement(sequence, line) {
                Ok(LineOutcome::Linked(_)) => report.linked += 1,
                Ok(LineOutcome::Skipped) => report.skipped += 1,
                Err(err) => match self.policy {
                    FailurePolicy::Stop => return Err(err),
                    FailurePolicy::SkipAndWarn => {
                        warn!(sequence = %sequence, error = %err, "statement not recorded");
                        report.failed.push(FailedStatement {
                            sequence,
                            message: err.to_string(),
                        });
                    }
                },
            }
            sequence = sequence.next();
        }
        info!(
            linked = report.linked,
            skipped = report.skipped,
            failed = report.failed.len(),
            "replayed script"
        );
        Ok(report)
    }

    pub fn replay_file(&mut self, path: impl AsRef<Path>) -> Result<ReplayReport, StoreError> {
        let script = std::fs::read_to_string(path)?;
        self.replay_script(&script)
    }

    pub fn undo(&self, sequence: Sequence) -> Result<Vec<String>, StoreError> {
        Ok(synthesize_undo(&self.graph, sequence)?)
    }

    /// Synthesizes the undo set for `sequence` and executes it against the
    /// store. The graph is left as it is.
    pub fn apply_undo(&mut self, sequence: Sequence) -> Result<Vec<String>, StoreError> {
        let statements = self.undo(sequence)?;
        self.store.execute_batch(&statements)?;
        info!(sequence = %sequence, statements = statements.len(), "applied undo");
        Ok(statements)
    }
}
