#![forbid(unsafe_code)]

use crate::ids::Sequence;
use crate::index::IndexKey;
use crate::statement::StatementKind;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LineageError {
    #[error("{kind} node with key [{key}] doesn't exist")]
    NotFound { kind: StatementKind, key: IndexKey },
    #[error("no statement recorded at sequence {sequence}")]
    SequenceNotFound { sequence: Sequence },
    #[error("structural violation at sequence {sequence}: {reason}")]
    StructuralViolation { sequence: Sequence, reason: String },
    #[error("invalid lineage at sequence {sequence}: {reason}")]
    InvalidLineage { sequence: Sequence, reason: String },
}

impl LineageError {
    pub(crate) fn violation(sequence: Sequence, reason: impl Into<String>) -> Self {
        Self::StructuralViolation {
            sequence,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_lineage(sequence: Sequence, reason: impl Into<String>) -> Self {
        Self::InvalidLineage {
            sequence,
            reason: reason.into(),
        }
    }
}
