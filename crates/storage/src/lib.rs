#![forbid(unsafe_code)]

//! SQLite-backed collaborators of the lineage core: statement parsing,
//! execution with row resolution, replay of statement scripts and snapshot
//! persistence.

pub mod parser;
pub mod session;
pub mod snapshot;
mod store;

pub use parser::{ParseError, parse_statement};
pub use session::{FailedStatement, FailurePolicy, LineOutcome, ReplayReport, ReplaySession};
pub use store::{SqliteStore, StoreError};
