//! Per-repository status overview.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use crate::actions::Action;
use crate::config::{self, RepoConfig};
use crate::exec::{self, Executor};
use crate::filter;

const PORCELAIN_CMD: &str = "git status --porcelain 2>/dev/null";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoStatus {
    pub path: String,
    pub present: bool,
    pub git_repo: bool,
    /// Same notion of dirty as the action queue uses.
    pub dirty: bool,
    pub modified_count: usize,
    pub untracked_count: usize,
    pub unclean_action: Action,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stash_on_pull: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub skip_pull: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modified_files: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub repositories: Vec<RepoStatus>,
}

/// Split `git status --porcelain` output into tracked changes and an
/// untracked count. Renames report the new name. Lines that are not
/// porcelain entries (`XY path`) are ignored.
pub fn parse_porcelain(text: &str) -> (Vec<String>, usize) {
    let mut modified = Vec::new();
    let mut untracked = 0;
    for line in text.lines() {
        if line.len() < 4 || line.as_bytes()[2] != b' ' {
            continue;
        }
        let (code, file) = (&line[..2], &line[3..]);
        if code == "??" {
            untracked += 1;
        } else {
            let name = file.rsplit(" -> ").next().unwrap_or(file);
            modified.push(name.to_string());
        }
    }
    (modified, untracked)
}

/// Status of one configured repository. Never fails: a missing or
/// non-git directory is reported as such.
pub fn repo_status(el: &RepoConfig, executor: &dyn Executor) -> RepoStatus {
    let path: &Path = el.path();
    let present = path.is_dir();
    let git_repo = present && filter::is_git_repo(path);

    let (modified_files, untracked_count) = if git_repo {
        let result = exec::run_captured(executor, path, PORCELAIN_CMD);
        if result.success() {
            parse_porcelain(&result.combined_output)
        } else {
            log::debug!("status failed in {}: {}", path.display(), result.combined_output.trim());
            (Vec::new(), 0)
        }
    } else {
        (Vec::new(), 0)
    };

    RepoStatus {
        path: path.display().to_string(),
        present,
        git_repo,
        dirty: git_repo && exec::is_unclean(executor, path),
        modified_count: modified_files.len(),
        untracked_count,
        unclean_action: el.unclean_action(),
        stash_on_pull: el.stash_on_pull(),
        skip_pull: el.skip_pull(),
        modified_files,
    }
}

/// Status of every configured repository, in configuration order.
pub fn collect_status(cfg: &[RepoConfig], executor: &dyn Executor) -> Result<Vec<RepoStatus>> {
    config::validate_list(cfg)?;
    Ok(cfg.iter().map(|el| repo_status(el, executor)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::tests::init_git_repo;
    use crate::exec::SystemShell;

    #[test]
    fn parse_porcelain_splits_tracked_and_untracked() {
        let text = " M src/lib.rs\nA  new.rs\nR  old.rs -> renamed.rs\n?? scratch.txt\n?? notes/\n";
        let (modified, untracked) = parse_porcelain(text);
        assert_eq!(modified, vec!["src/lib.rs", "new.rs", "renamed.rs"]);
        assert_eq!(untracked, 2);
    }

    #[test]
    fn parse_porcelain_ignores_stray_warnings() {
        let text = "warning: unable to access '/etc/gitconfig'\n M src/lib.rs\n";
        let (modified, untracked) = parse_porcelain(text);
        assert_eq!(modified, vec!["src/lib.rs"]);
        assert_eq!(untracked, 0);
    }

    #[test]
    fn parse_porcelain_empty() {
        assert_eq!(parse_porcelain(""), (Vec::new(), 0));
    }

    #[test]
    fn status_of_dirty_repo() {
        let tmp = init_git_repo();
        std::fs::write(tmp.path().join("README.md"), "changed\n").unwrap();
        std::fs::write(tmp.path().join("scratch.txt"), "u").unwrap();

        let status = repo_status(&RepoConfig::new(tmp.path()), &SystemShell);
        assert!(status.present && status.git_repo && status.dirty);
        assert_eq!(status.modified_files, vec!["README.md"]);
        assert_eq!(status.untracked_count, 1);
    }

    #[test]
    fn status_of_missing_and_plain_dirs() {
        let plain = tempfile::tempdir().unwrap();
        let cfg = vec![
            RepoConfig::new("/nonexistent/git-batch"),
            RepoConfig::new(plain.path()),
        ];
        let statuses = collect_status(&cfg, &SystemShell).unwrap();
        assert!(!statuses[0].present);
        assert!(statuses[1].present && !statuses[1].git_repo && !statuses[1].dirty);
    }

    #[test]
    fn json_omits_default_flags() {
        let status = repo_status(&RepoConfig::new("/nonexistent/git-batch"), &SystemShell);
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["unclean_action"], "noop");
        assert!(json.get("stash_on_pull").is_none());
        assert!(json.get("modified_files").is_none());
    }
}
