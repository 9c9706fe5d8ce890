//! Pulling every eligible repository, stashing local changes where configured.

use anyhow::Result;
use std::collections::HashSet;
use std::path::PathBuf;

use crate::batch::{BatchExecutor, BatchSummary, CommandSource, HookPhase};
use crate::config::{Defaults, Property, RepoConfig};
use crate::exec;
use crate::exec_log::LogSink;
use crate::filter;

pub const STASH_CMD: &str = "git stash";
pub const STASH_POP_CMD: &str = "git stash pop";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullReport {
    pub summary: BatchSummary,
    /// Repositories whose changes were stashed before the pull, in order.
    pub stashed: Vec<PathBuf>,
    /// Repositories whose stash was popped after the pull, in order.
    pub restored: Vec<PathBuf>,
    /// Repositories where `git stash` itself failed. They are pulled as-is.
    pub stash_failed: Vec<PathBuf>,
}

impl PullReport {
    /// Whether any pull, stash or pop failed.
    pub fn has_failures(&self) -> bool {
        !self.summary.failed.is_empty()
            || !self.stash_failed.is_empty()
            || self.stashed.len() != self.restored.len()
    }
}

/// Pull every present repository not marked `skip_pull`.
///
/// A dirty repository with `stash_on_pull` is stashed before its pull and
/// popped right after it. Both show up in the same log entry as the pull.
/// A stash that fails is not recorded, so no pop is attempted for it.
pub fn pull_all(
    batch: &BatchExecutor<'_>,
    log: &mut dyn LogSink,
    cfg: &[RepoConfig],
    defaults: &Defaults,
) -> Result<PullReport> {
    let eligible = filter::to_pull(cfg)?;
    let executor = batch.executor();

    let mut pending_pop: HashSet<PathBuf> = HashSet::new();
    let mut stashed = Vec::new();
    let mut restored = Vec::new();
    let mut stash_failed = Vec::new();

    let mut around = |phase: HookPhase, el: &RepoConfig, log: &mut dyn LogSink| -> Result<()> {
        let nested = BatchExecutor::new(executor);
        let single = std::slice::from_ref(el);
        match phase {
            HookPhase::Pre => {
                if el.stash_on_pull() && exec::is_unclean(executor, el.path()) {
                    let result =
                        nested.execute(log, single, &CommandSource::Fixed(STASH_CMD), true, None)?;
                    if result.failed.is_empty() {
                        pending_pop.insert(el.path().to_path_buf());
                        stashed.push(el.path().to_path_buf());
                    } else {
                        stash_failed.push(el.path().to_path_buf());
                    }
                }
            }
            HookPhase::Post => {
                if pending_pop.remove(el.path()) {
                    let result = nested.execute(
                        log,
                        single,
                        &CommandSource::Fixed(STASH_POP_CMD),
                        true,
                        None,
                    )?;
                    if result.failed.is_empty() {
                        restored.push(el.path().to_path_buf());
                    } else {
                        log::warn!(
                            "Stashed changes in {} could not be restored; see `git stash list`",
                            el.path().display()
                        );
                    }
                }
            }
        }
        Ok(())
    };

    let resolve = |el: &RepoConfig| Some(el.get(Property::GitPullCmd, defaults).to_string());
    let summary = batch.execute(
        log,
        &eligible,
        &CommandSource::PerRepo {
            name: "pull",
            resolve: &resolve,
        },
        false,
        Some(&mut around),
    )?;

    Ok(PullReport {
        summary,
        stashed,
        restored,
        stash_failed,
    })
}
