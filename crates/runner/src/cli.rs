#![forbid(unsafe_code)]

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "rewind")]
#[command(about = "Record a SQL statement log and synthesize the statements that undo one of them")]
pub(crate) struct Cli {
    /// Directory holding the default database and snapshot.
    #[arg(long, global = true, env = "REWIND_STORAGE_DIR", value_hint = ValueHint::DirPath)]
    pub storage_dir: Option<PathBuf>,

    /// Log filter in tracing `EnvFilter` syntax.
    #[arg(long, global = true, env = "REWIND_LOG", default_value = "warn")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Execute a statement script and record its lineage.
    Replay(ReplayArgs),
    /// Print (and optionally apply) the undo set of one statement.
    Undo(UndoArgs),
    /// List every recorded statement node.
    Show(ShowArgs),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Default, Args)]
pub(crate) struct PathArgs {
    /// SQLite database the statements run against.
    #[arg(long, env = "REWIND_DB", value_hint = ValueHint::FilePath)]
    pub db: Option<PathBuf>,

    /// Lineage snapshot file.
    #[arg(long, env = "REWIND_SNAPSHOT", value_hint = ValueHint::FilePath)]
    pub snapshot: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub(crate) struct ReplayArgs {
    /// Script with one statement per line.
    #[arg(value_hint = ValueHint::FilePath)]
    pub script: PathBuf,

    #[command(flatten)]
    pub paths: PathArgs,

    /// Stop at the first statement that cannot be executed or recorded.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Args)]
pub(crate) struct UndoArgs {
    /// 1-based line number of the statement to undo.
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub sequence: u64,

    #[command(flatten)]
    pub paths: PathArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Also execute the undo set against the database.
    #[arg(long)]
    pub apply: bool,
}

#[derive(Debug, Args)]
pub(crate) struct ShowArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}
