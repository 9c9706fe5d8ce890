//! Running one command across an ordered list of repositories.

use anyhow::Result;
use chrono::Local;
use indicatif::ProgressBar;
use std::path::PathBuf;

use crate::config::{self, RepoConfig};
use crate::exec::{self, Executor};
use crate::exec_log::{LogSink, COMMAND_LEVEL};

/// Where the command for each repository comes from.
pub enum CommandSource<'a> {
    /// The same command line everywhere.
    Fixed(&'a str),
    /// Resolved per repository; `None` skips the entry.
    PerRepo {
        name: &'a str,
        resolve: &'a dyn Fn(&RepoConfig) -> Option<String>,
    },
}

impl CommandSource<'_> {
    fn resolve(&self, el: &RepoConfig) -> Option<String> {
        match self {
            CommandSource::Fixed(cmd) => Some(cmd.to_string()),
            CommandSource::PerRepo { resolve, .. } => resolve(el),
        }
    }

    fn name(&self) -> &str {
        match self {
            CommandSource::Fixed(cmd) => cmd,
            CommandSource::PerRepo { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Pre,
    Post,
}

/// Called around each invocation. Errors abort the remaining batch.
pub type AroundHook<'h> = dyn FnMut(HookPhase, &RepoConfig, &mut dyn LogSink) -> Result<()> + 'h;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
    pub skipped: usize,
}

impl BatchSummary {
    pub fn processed(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

pub struct BatchExecutor<'a> {
    executor: &'a dyn Executor,
    progress: Option<ProgressBar>,
}

impl<'a> BatchExecutor<'a> {
    pub fn new(executor: &'a dyn Executor) -> Self {
        Self {
            executor,
            progress: None,
        }
    }

    pub fn with_progress(mut self, pb: ProgressBar) -> Self {
        self.progress = Some(pb);
        self
    }

    pub fn executor(&self) -> &'a dyn Executor {
        self.executor
    }

    /// Run the command for every entry of `cfg`, in order.
    ///
    /// Without `append` the log is reset under a fresh run header first.
    /// A failing command is annotated in the log and does not stop the batch.
    pub fn execute(
        &self,
        log: &mut dyn LogSink,
        cfg: &[RepoConfig],
        source: &CommandSource<'_>,
        append: bool,
        mut around: Option<&mut AroundHook<'_>>,
    ) -> Result<BatchSummary> {
        config::validate_list(cfg)?;

        if !append {
            let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
            log.reset(&format!("{} @ {stamp}", source.name()));
        }

        let mut summary = BatchSummary::default();
        for el in cfg {
            let Some(command) = source.resolve(el) else {
                summary.skipped += 1;
                continue;
            };
            let path = el.path().display().to_string();
            if let Some(pb) = &self.progress {
                pb.set_message(path.clone());
            }

            log.label(&path, append);
            if let Some(hook) = around.as_mut() {
                hook(HookPhase::Pre, el, &mut *log)?;
            }

            let result = exec::run_captured(self.executor, el.path(), &command);
            let status = if result.success() {
                "ok".to_string()
            } else {
                format!("exit {}", result.exit_code)
            };
            log.heading(COMMAND_LEVEL, &format!("$ {command} ({status})"));
            log.body(&format!("in {path}\n"));
            log.body(&result.combined_output);

            if result.success() {
                summary.succeeded.push(el.path().to_path_buf());
            } else {
                log::warn!("'{command}' exited {} in {path}", result.exit_code);
                log.mark_failed();
                summary.failed.push(el.path().to_path_buf());
            }

            if let Some(hook) = around.as_mut() {
                hook(HookPhase::Post, el, &mut *log)?;
            }
            if let Some(pb) = &self.progress {
                pb.inc(1);
            }
        }

        Ok(summary)
    }
}
