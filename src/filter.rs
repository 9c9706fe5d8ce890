//! Narrowing a repository list. Every filter is stable: relative order is kept.

use anyhow::Result;
use std::path::Path;

use crate::config::{self, RepoConfig};
use crate::exec::{self, Executor};

/// Whether `path` holds git metadata (a `.git` directory or worktree file).
pub fn is_git_repo(path: &Path) -> bool {
    path.join(".git").exists()
}

/// Entries whose path is an existing directory. Repositories configured for
/// another machine are dropped silently.
pub fn exists(cfg: &[RepoConfig]) -> Result<Vec<RepoConfig>> {
    config::validate_list(cfg)?;
    Ok(cfg
        .iter()
        .filter(|el| {
            let present = el.path().is_dir();
            if !present {
                log::debug!("Skipping {}: not present on this machine", el.path().display());
            }
            present
        })
        .cloned()
        .collect())
}

/// Present git repositories with uncommitted changes.
///
/// A directory without git metadata is excluded, not reported.
pub fn unclean(cfg: &[RepoConfig], executor: &dyn Executor) -> Result<Vec<RepoConfig>> {
    Ok(exists(cfg)?
        .into_iter()
        .filter(|el| is_git_repo(el.path()) && exec::is_unclean(executor, el.path()))
        .collect())
}

/// Present repositories that have not opted out of pulling.
pub fn to_pull(cfg: &[RepoConfig]) -> Result<Vec<RepoConfig>> {
    Ok(exists(cfg)?.into_iter().filter(|el| !el.skip_pull()).collect())
}
