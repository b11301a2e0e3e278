#![forbid(unsafe_code)]

use crate::cli::PathArgs;
use crate::defaults::{
    DEFAULT_DB_FILENAME, DEFAULT_SNAPSHOT_FILENAME, default_storage_dir_from_start,
};
use crate::error::CliError;
use std::path::{Path, PathBuf};

/// Database and snapshot locations after applying flags, environment and
/// defaults, in that order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ResolvedPaths {
    pub db: PathBuf,
    pub snapshot: PathBuf,
}

pub(crate) fn resolve_paths(
    storage_dir: Option<&Path>,
    paths: &PathArgs,
) -> Result<ResolvedPaths, CliError> {
    let storage_dir = match storage_dir {
        Some(dir) => dir.to_path_buf(),
        None => {
            let cwd = std::env::current_dir().map_err(|e| CliError::io("current dir", e))?;
            default_storage_dir_from_start(&cwd)
        }
    };
    Ok(resolve_in(&storage_dir, paths))
}

fn resolve_in(storage_dir: &Path, paths: &PathArgs) -> ResolvedPaths {
    ResolvedPaths {
        db: paths
            .db
            .clone()
            .unwrap_or_else(|| storage_dir.join(DEFAULT_DB_FILENAME)),
        snapshot: paths
            .snapshot
            .clone()
            .unwrap_or_else(|| storage_dir.join(DEFAULT_SNAPSHOT_FILENAME)),
    }
}
