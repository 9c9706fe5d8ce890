//! Remediation actions for repositories with uncommitted changes.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::config::{Defaults, Property, RepoConfig};
use crate::exec::{self, Executor};

/// The human side of interactive actions.
pub trait Interaction {
    /// Ask for a human to review the repository. Returns once the request
    /// has been handed over; the scheduler stays suspended until resumed.
    fn review(&mut self, path: &Path) -> Result<()>;

    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// Everything an action may touch.
pub struct ActionContext<'a> {
    pub executor: &'a dyn Executor,
    pub defaults: &'a Defaults,
    pub ui: &'a mut dyn Interaction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ManualReview,
    AutoCommit,
    AutoCommitConfirm,
    AutoPush,
    AutoPushConfirm,
    Noop,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::ManualReview,
        Action::AutoCommit,
        Action::AutoCommitConfirm,
        Action::AutoPush,
        Action::AutoPushConfirm,
        Action::Noop,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Action::ManualReview => "manual_review",
            Action::AutoCommit => "auto_commit",
            Action::AutoCommitConfirm => "auto_commit_confirm",
            Action::AutoPush => "auto_push",
            Action::AutoPushConfirm => "auto_push_confirm",
            Action::Noop => "noop",
        }
    }

    /// Whether the scheduler must suspend after running this action.
    ///
    /// The confirm-gated variants prompt synchronously and finish before
    /// returning, so they do not suspend.
    pub fn requires_interaction(self) -> bool {
        matches!(self, Action::ManualReview)
    }

    pub fn run(self, repo: &RepoConfig, ctx: &mut ActionContext<'_>) -> Result<()> {
        match self {
            Action::ManualReview => ctx.ui.review(repo.path()),
            Action::AutoCommit => auto_commit(repo, ctx),
            Action::AutoCommitConfirm => {
                let prompt = format!("Commit all changes in {}?", repo.path().display());
                if ctx.ui.confirm(&prompt)? {
                    auto_commit(repo, ctx)
                } else {
                    log::info!("Skipped commit in {}", repo.path().display());
                    Ok(())
                }
            }
            Action::AutoPush => auto_push(repo, ctx),
            Action::AutoPushConfirm => {
                let prompt = format!("Commit and push all changes in {}?", repo.path().display());
                if ctx.ui.confirm(&prompt)? {
                    auto_push(repo, ctx)
                } else {
                    log::info!("Skipped push in {}", repo.path().display());
                    Ok(())
                }
            }
            Action::Noop => Ok(()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Action::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Action::ALL.iter().map(|a| a.name()).collect();
                anyhow::anyhow!("Unknown action '{s}'. Valid actions: {}", valid.join(", "))
            })
    }
}

fn auto_commit(repo: &RepoConfig, ctx: &ActionContext<'_>) -> Result<()> {
    let command = repo.get(Property::GitCommitCmd, ctx.defaults);
    exec::run_checked(ctx.executor, repo.path(), command)?;
    log::info!("Committed changes in {}", repo.path().display());
    Ok(())
}

fn auto_push(repo: &RepoConfig, ctx: &ActionContext<'_>) -> Result<()> {
    auto_commit(repo, ctx)?;
    let command = repo.get(Property::GitPushCmd, ctx.defaults);
    exec::run_checked(ctx.executor, repo.path(), command)?;
    log::info!("Pushed {}", repo.path().display());
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{DEFAULT_COMMIT_CMD, DEFAULT_PUSH_CMD};
    use crate::error::GitBatchError;
    use crate::exec::tests::FakeExecutor;
    use std::collections::VecDeque;
    use std::path::PathBuf;

    /// Records review requests and answers confirmations from a queue.
    #[derive(Default)]
    pub(crate) struct ScriptedInteraction {
        pub answers: VecDeque<bool>,
        pub reviews: Vec<PathBuf>,
        pub prompts: Vec<String>,
    }

    impl ScriptedInteraction {
        pub fn answering(answers: &[bool]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                ..Self::default()
            }
        }
    }

    impl Interaction for ScriptedInteraction {
        fn review(&mut self, path: &Path) -> Result<()> {
            self.reviews.push(path.to_path_buf());
            Ok(())
        }

        fn confirm(&mut self, prompt: &str) -> Result<bool> {
            self.prompts.push(prompt.to_string());
            Ok(self.answers.pop_front().unwrap_or(false))
        }
    }

    fn run_action(action: Action, fake: &FakeExecutor, ui: &mut ScriptedInteraction) -> Result<()> {
        let defaults = Defaults::default();
        let mut ctx = ActionContext {
            executor: fake,
            defaults: &defaults,
            ui,
        };
        action.run(&RepoConfig::new("/r1"), &mut ctx)
    }

    fn commands(fake: &FakeExecutor) -> Vec<String> {
        fake.commands().into_iter().map(|(_, c)| c).collect()
    }

    #[test]
    fn only_manual_review_is_interactive() {
        let interactive: Vec<Action> = Action::ALL
            .into_iter()
            .filter(|a| a.requires_interaction())
            .collect();
        assert_eq!(interactive, vec![Action::ManualReview]);
    }

    #[test]
    fn names_parse_back() {
        for action in Action::ALL {
            assert_eq!(action.name().parse::<Action>().unwrap(), action);
        }
        assert!("explode".parse::<Action>().is_err());
    }

    #[test]
    fn manual_review_requests_review() {
        let fake = FakeExecutor::default();
        let mut ui = ScriptedInteraction::default();
        run_action(Action::ManualReview, &fake, &mut ui).unwrap();
        assert_eq!(ui.reviews, vec![PathBuf::from("/r1")]);
        assert!(commands(&fake).is_empty());
    }

    #[test]
    fn auto_commit_runs_commit_command() {
        let fake = FakeExecutor::default();
        let mut ui = ScriptedInteraction::default();
        run_action(Action::AutoCommit, &fake, &mut ui).unwrap();
        assert_eq!(commands(&fake), vec![DEFAULT_COMMIT_CMD]);
    }

    #[test]
    fn auto_commit_failure_is_command_failed() {
        let fake = FakeExecutor::default().failing(DEFAULT_COMMIT_CMD, 1);
        let mut ui = ScriptedInteraction::default();
        let err = run_action(Action::AutoCommit, &fake, &mut ui).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GitBatchError>(),
            Some(GitBatchError::CommandFailed { .. })
        ));
    }

    #[test]
    fn auto_push_commits_then_pushes() {
        let fake = FakeExecutor::default();
        let mut ui = ScriptedInteraction::default();
        run_action(Action::AutoPush, &fake, &mut ui).unwrap();
        assert_eq!(commands(&fake), vec![DEFAULT_COMMIT_CMD, DEFAULT_PUSH_CMD]);
    }

    #[test]
    fn auto_push_stops_when_commit_fails() {
        let fake = FakeExecutor::default().failing(DEFAULT_COMMIT_CMD, 1);
        let mut ui = ScriptedInteraction::default();
        assert!(run_action(Action::AutoPush, &fake, &mut ui).is_err());
        assert_eq!(commands(&fake), vec![DEFAULT_COMMIT_CMD]);
    }

    #[test]
    fn confirm_variants_respect_the_answer() {
        let fake = FakeExecutor::default();
        let mut ui = ScriptedInteraction::answering(&[false, true]);
        run_action(Action::AutoPushConfirm, &fake, &mut ui).unwrap();
        assert!(commands(&fake).is_empty());

        run_action(Action::AutoCommitConfirm, &fake, &mut ui).unwrap();
        assert_eq!(commands(&fake), vec![DEFAULT_COMMIT_CMD]);
        assert_eq!(ui.prompts.len(), 2);
    }

    #[test]
    fn noop_does_nothing() {
        let fake = FakeExecutor::default();
        let mut ui = ScriptedInteraction::default();
        run_action(Action::Noop, &fake, &mut ui).unwrap();
        assert!(fake.calls.borrow().is_empty());
        assert!(ui.prompts.is_empty());
    }
}
