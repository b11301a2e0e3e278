#![forbid(unsafe_code)]

use crate::cli::{Cli, Command, OutputFormat, ReplayArgs, ShowArgs, UndoArgs};
use crate::config::{ResolvedPaths, resolve_paths};
use crate::error::CliError;
use rw_core::{LineageGraph, NodePayload, Sequence, StatementNode, synthesize_undo};
use rw_storage::{FailurePolicy, ReplaySession, SqliteStore, snapshot};
use serde::Serialize;
use std::io::Write;
use tracing::info;

pub(crate) fn run(cli: Cli) -> Result<(), CliError> {
    let storage_dir = cli.storage_dir.as_deref();
    match cli.command {
        Command::Replay(args) => {
            let paths = resolve_paths(storage_dir, &args.paths)?;
            replay(&args, &paths)
        }
        Command::Undo(args) => {
            let paths = resolve_paths(storage_dir, &args.paths)?;
            undo(&args, &paths)
        }
        Command::Show(args) => {
            let paths = resolve_paths(storage_dir, &args.paths)?;
            show(&args, &paths)
        }
    }
}

fn replay(args: &ReplayArgs, paths: &ResolvedPaths) -> Result<(), CliError> {
    let graph = if paths.snapshot.exists() {
        snapshot::load_from_file(&paths.snapshot)?
    } else {
        LineageGraph::new()
    };
    let policy = if args.strict {
        FailurePolicy::Stop
    } else {
        FailurePolicy::SkipAndWarn
    };
    let store = SqliteStore::open(&paths.db)?;
    let mut session = ReplaySession::resume(store, graph).with_policy(policy);
    let first = session.next_sequence();
    let result = session.replay_file(&args.script);
    // Statements linked before a strict-mode failure are already committed.
    snapshot::save_to_file(session.graph(), &paths.snapshot)?;
    let report = result?;
    info!(
        script = %args.script.display(),
        snapshot = %paths.snapshot.display(),
        first_sequence = %first,
        "replay finished"
    );

    let mut out = std::io::stdout().lock();
    writeln!(
        out,
        "linked {}, skipped {}, failed {}",
        report.linked,
        report.skipped,
        report.failed.len()
    )
    .map_err(|e| CliError::io("write output", e))?;
    for failed in &report.failed {
        writeln!(out, "  sequence {}: {}", failed.sequence, failed.message)
            .map_err(|e| CliError::io("write output", e))?;
    }
    Ok(())
}

fn undo(args: &UndoArgs, paths: &ResolvedPaths) -> Result<(), CliError> {
    let graph = load_snapshot(paths)?;
    let sequence = Sequence::new(args.sequence);
    let statements = if args.apply {
        let store = SqliteStore::open(&paths.db)?;
        ReplaySession::resume(store, graph).apply_undo(sequence)?
    } else {
        synthesize_undo(&graph, sequence).map_err(rw_storage::StoreError::from)?
    };

    let mut out = std::io::stdout().lock();
    match args.format {
        OutputFormat::Text => {
            for statement in &statements {
                writeln!(out, "{statement}").map_err(|e| CliError::io("write output", e))?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &statements)?;
            writeln!(out).map_err(|e| CliError::io("write output", e))?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct NodeView<'a> {
    id: String,
    sequence: u64,
    kind: &'static str,
    table: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    row: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    column: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<u64>,
    tombstoned: bool,
    text: &'a str,
}

fn node_view<'a>(graph: &'a LineageGraph, node: &'a StatementNode) -> NodeView<'a> {
    let tombstoned = match node.payload() {
        NodePayload::Create { dropped } => *dropped,
        NodePayload::Insert { deleted, .. } => *deleted,
        NodePayload::Update { .. } | NodePayload::Drop | NodePayload::Delete { .. } => false,
    };
    NodeView {
        id: node.id().to_string(),
        sequence: node.sequence().get(),
        kind: node.kind().as_str(),
        table: node.table(),
        row: node.row_key().map(|row| row.get()),
        column: node.column(),
        parent: graph.parent_of(node).map(|parent| parent.sequence().get()),
        tombstoned,
        text: node.text(),
    }
}

fn show(args: &ShowArgs, paths: &ResolvedPaths) -> Result<(), CliError> {
    let graph = load_snapshot(paths)?;
    let mut out = std::io::stdout().lock();
    match args.format {
        OutputFormat::Text => {
            for node in graph.nodes() {
                let view = node_view(&graph, node);
                let mut line = format!("{node} table={}", view.table);
                if let Some(row) = view.row {
                    line.push_str(&format!(" row={row}"));
                }
                if let Some(column) = view.column {
                    line.push_str(&format!(" column={column}"));
                }
                if let Some(parent) = view.parent {
                    line.push_str(&format!(" parent={parent}"));
                }
                if view.tombstoned {
                    line.push_str(" tombstoned");
                }
                writeln!(out, "{line}").map_err(|e| CliError::io("write output", e))?;
            }
        }
        OutputFormat::Json => {
            let views = graph
                .nodes()
                .map(|node| node_view(&graph, node))
                .collect::<Vec<_>>();
            serde_json::to_writer_pretty(&mut out, &views)?;
            writeln!(out).map_err(|e| CliError::io("write output", e))?;
        }
    }
    Ok(())
}

fn load_snapshot(paths: &ResolvedPaths) -> Result<LineageGraph, CliError> {
    if !paths.snapshot.exists() {
        return Err(CliError::InvalidArgs(
            "no snapshot found; run `rewind replay` first or pass --snapshot",
        ));
    }
    Ok(snapshot::load_from_file(&paths.snapshot)?)
}
