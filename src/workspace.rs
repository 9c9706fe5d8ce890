//! The entry points the CLI calls, bound to one loaded configuration.

use anyhow::Result;
use indicatif::ProgressBar;

use crate::actions::{ActionContext, Interaction};
use crate::batch::BatchExecutor;
use crate::config::{Config, RepoConfig};
use crate::exec::{Executor, SystemShell};
use crate::exec_log::LogSink;
use crate::filter;
use crate::pull::{self, PullReport};
use crate::scheduler::{Scheduler, StepOutcome};
use crate::status::{self, RepoStatus};

/// True iff any present repository has uncommitted changes.
pub fn is_dirty_any(cfg: &[RepoConfig], executor: &dyn Executor) -> Result<bool> {
    Ok(!filter::unclean(cfg, executor)?.is_empty())
}

/// One active configuration with its executor and action queue.
pub struct Workspace {
    config: Config,
    executor: Box<dyn Executor>,
    scheduler: Scheduler,
}

impl Workspace {
    pub fn new(config: Config) -> Self {
        Self::with_executor(config, Box::new(SystemShell))
    }

    pub fn with_executor(config: Config, executor: Box<dyn Executor>) -> Self {
        Self {
            config,
            executor,
            scheduler: Scheduler::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Queue every unclean repository and run actions until the queue is
    /// exhausted or suspends on an interactive one.
    pub fn check_unclean(&mut self, ui: &mut dyn Interaction) -> Result<StepOutcome> {
        let queued = self
            .scheduler
            .start(&self.config.repositories, self.executor.as_ref())?;
        log::info!("{queued} repositories need attention");
        let mut ctx = ActionContext {
            executor: self.executor.as_ref(),
            defaults: &self.config.defaults,
            ui,
        };
        self.scheduler.step(&mut ctx)
    }

    /// Continue a suspended queue.
    pub fn resume(&mut self, ui: &mut dyn Interaction) -> Result<StepOutcome> {
        let mut ctx = ActionContext {
            executor: self.executor.as_ref(),
            defaults: &self.config.defaults,
            ui,
        };
        self.scheduler.resume(&mut ctx)
    }

    pub fn abandon(&mut self) -> usize {
        self.scheduler.abandon()
    }

    pub fn pull_all(
        &self,
        log: &mut dyn LogSink,
        progress: Option<ProgressBar>,
    ) -> Result<PullReport> {
        let mut batch = BatchExecutor::new(self.executor.as_ref());
        if let Some(pb) = progress {
            batch = batch.with_progress(pb);
        }
        pull::pull_all(&batch, log, &self.config.repositories, &self.config.defaults)
    }

    pub fn is_dirty_any(&self) -> Result<bool> {
        is_dirty_any(&self.config.repositories, self.executor.as_ref())
    }

    pub fn unclean(&self) -> Result<Vec<RepoConfig>> {
        filter::unclean(&self.config.repositories, self.executor.as_ref())
    }

    pub fn status(&self) -> Result<Vec<RepoStatus>> {
        status::collect_status(&self.config.repositories, self.executor.as_ref())
    }
}
