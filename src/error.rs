//! Error kinds raised by the batch engine.
//!
//! Public functions return `anyhow::Result`; these variants travel inside the
//! `anyhow::Error` so callers can `downcast_ref::<GitBatchError>()` when they
//! need to tell a bad configuration apart from a failed command.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GitBatchError {
    /// A single repository entry is not a path-keyed mapping.
    #[error("invalid repository entry #{index}: {reason}")]
    InvalidConfigElement { index: usize, reason: String },

    /// The repository list itself is malformed.
    #[error("invalid repository list: {reason}")]
    InvalidConfigList { reason: String },

    /// A non-verbose command exited with a nonzero status.
    #[error("command '{command}' failed in {}", path.display())]
    CommandFailed { command: String, path: PathBuf },

    /// `start` was called while a queue is still live.
    #[error("an action queue is already {state}; abandon it before starting another")]
    SchedulerBusy { state: String },

    #[error("no configuration file found (searched: {})", searched.join(", "))]
    ConfigNotFound { searched: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failed_message_names_command_and_path() {
        let err = GitBatchError::CommandFailed {
            command: "git status --porcelain".to_string(),
            path: PathBuf::from("/tmp/nogit"),
        };
        assert_eq!(
            err.to_string(),
            "command 'git status --porcelain' failed in /tmp/nogit"
        );
    }

    #[test]
    fn downcast_through_anyhow() {
        let err: anyhow::Error = GitBatchError::InvalidConfigList {
            reason: "not a sequence".to_string(),
        }
        .into();
        assert!(matches!(
            err.downcast_ref::<GitBatchError>(),
            Some(GitBatchError::InvalidConfigList { .. })
        ));
    }
}
