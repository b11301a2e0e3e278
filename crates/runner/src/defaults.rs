#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

pub(crate) const DEFAULT_STORE_DIRNAME: &str = ".rewind";
pub(crate) const DEFAULT_DB_FILENAME: &str = "rewind.db";
pub(crate) const DEFAULT_SNAPSHOT_FILENAME: &str = "rewind.sqg";

/// Nearest directory at or above `start` holding a `.git` entry.
fn enclosing_repo(start: &Path) -> Option<&Path> {
    start.ancestors().find(|dir| dir.join(".git").exists())
}

/// Store directory for runs started in `start`: `.rewind` at the repo root,
/// or under `start` itself outside a repository.
pub(crate) fn default_storage_dir_from_start(start: &Path) -> PathBuf {
    enclosing_repo(start)
        .unwrap_or(start)
        .join(DEFAULT_STORE_DIRNAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_tree(test_name: &str) -> PathBuf {
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();
        let root = std::env::temp_dir().join(format!(
            "rw_runner_{test_name}_{}_{stamp}",
            std::process::id()
        ));
        std::fs::create_dir_all(&root).expect("create scratch root");
        root
    }

    #[test]
    fn store_lands_at_repo_root_from_a_subdirectory() {
        let repo = scratch_tree("repo_root");
        std::fs::create_dir_all(repo.join(".git")).expect("mark repo");
        let nested = repo.join("migrations").join("2024");
        std::fs::create_dir_all(&nested).expect("create nested dir");

        assert_eq!(
            default_storage_dir_from_start(&nested),
            repo.join(".rewind")
        );
    }

    #[test]
    fn nearest_repo_wins_over_an_outer_one() {
        let outer = scratch_tree("nested_repo");
        std::fs::create_dir_all(outer.join(".git")).expect("mark outer repo");
        let inner = outer.join("vendor").join("inner");
        std::fs::create_dir_all(inner.join(".git")).expect("mark inner repo");

        assert_eq!(
            default_storage_dir_from_start(&inner.join("scripts")),
            inner.join(DEFAULT_STORE_DIRNAME)
        );
    }
}
