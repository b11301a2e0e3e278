#![forbid(unsafe_code)]

use rw_storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum CliError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        source: std::io::Error,
    },
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidArgs(_) => 2,
            _ => 1,
        }
    }
}
