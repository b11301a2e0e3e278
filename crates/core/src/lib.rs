#![forbid(unsafe_code)]

//! Statement lineage graph and undo synthesis.
//!
//! Every data-modifying statement of a linear log becomes a [`StatementNode`]
//! threaded into a [`LineageGraph`] next to the statement it logically
//! continues. [`synthesize_undo`] walks that graph to produce the statements
//! that restore the state from just before a given sequence number.

mod error;
pub mod graph;
pub mod ids;
pub mod index;
pub mod node;
pub mod statement;
pub mod undo;

pub use error::LineageError;
pub use graph::LineageGraph;
pub use ids::{NodeHandle, NodeId, RowKey, Sequence};
pub use index::{IndexKey, LineageIndex};
pub use node::{NodePayload, StatementNode};
pub use statement::{ParsedStatement, StatementKind};
pub use undo::synthesize_undo;
