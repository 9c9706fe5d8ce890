//! Action queue over repositories with uncommitted changes.
//!
//! `start` fills the queue, `step` dispatches actions head-first. Non-interactive
//! actions drain without intervention; an interactive one suspends the queue
//! until `resume` is called. `abandon` drops whatever is left.

use anyhow::Result;
use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::actions::ActionContext;
use crate::config::RepoConfig;
use crate::error::GitBatchError;
use crate::exec::Executor;
use crate::filter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchedulerState {
    #[default]
    Idle,
    Running,
    Suspended,
    Done,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Running => "running",
            SchedulerState::Suspended => "suspended",
            SchedulerState::Done => "done",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// An interactive action was handed to a human for this repository.
    Suspended(PathBuf),
    /// Nothing left.
    Done,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    state: SchedulerState,
    queue: VecDeque<RepoConfig>,
    awaiting: Option<PathBuf>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn pending(&self) -> impl Iterator<Item = &Path> {
        self.queue.iter().map(|el| el.path())
    }

    /// Repository currently under interactive review.
    pub fn awaiting(&self) -> Option<&Path> {
        self.awaiting.as_deref()
    }

    fn is_live(&self) -> bool {
        matches!(
            self.state,
            SchedulerState::Running | SchedulerState::Suspended
        )
    }

    /// Queue every repository of `cfg` that has uncommitted changes.
    /// Returns the queue length. Fails while another queue is live.
    pub fn start(&mut self, cfg: &[RepoConfig], executor: &dyn Executor) -> Result<usize> {
        if self.is_live() {
            return Err(GitBatchError::SchedulerBusy {
                state: self.state.to_string(),
            }
            .into());
        }
        let queue = filter::unclean(cfg, executor)?;
        log::debug!("Queued {} unclean repositories", queue.len());
        self.queue = queue.into();
        self.awaiting = None;
        self.state = SchedulerState::Running;
        Ok(self.queue.len())
    }

    /// Dispatch actions from the head of the queue until it is exhausted or
    /// an interactive action suspends it.
    ///
    /// A failing action is consumed; the scheduler is left suspended so the
    /// next `resume` continues with the following repository.
    pub fn step(&mut self, ctx: &mut ActionContext<'_>) -> Result<StepOutcome> {
        self.awaiting = None;
        self.state = SchedulerState::Running;

        while let Some(repo) = self.queue.pop_front() {
            let action = repo.unclean_action();
            log::info!("{}: {action}", repo.path().display());

            if let Err(e) = action.run(&repo, ctx) {
                self.state = SchedulerState::Suspended;
                return Err(e.context(format!(
                    "{action} failed in {}",
                    repo.path().display()
                )));
            }

            if action.requires_interaction() {
                let path = repo.path().to_path_buf();
                self.state = SchedulerState::Suspended;
                self.awaiting = Some(path.clone());
                return Ok(StepOutcome::Suspended(path));
            }
        }

        self.state = SchedulerState::Done;
        log::info!("All unclean repositories handled");
        Ok(StepOutcome::Done)
    }

    /// Continue after a human finished with the suspended repository.
    pub fn resume(&mut self, ctx: &mut ActionContext<'_>) -> Result<StepOutcome> {
        match self.state {
            SchedulerState::Suspended | SchedulerState::Running => self.step(ctx),
            SchedulerState::Idle | SchedulerState::Done => Ok(StepOutcome::Done),
        }
    }

    /// Drop the remaining queue. Returns how many repositories were dropped.
    pub fn abandon(&mut self) -> usize {
        let dropped = self.queue.len();
        if dropped > 0 {
            log::info!("Abandoned action queue with {dropped} repositories left");
        }
        self.queue.clear();
        self.awaiting = None;
        self.state = SchedulerState::Idle;
        dropped
    }
}
