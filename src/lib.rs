//! Batch operations over a fixed set of local git working copies.
//!
//! Finds repositories with uncommitted changes and runs each one's configured
//! remediation action, and pulls every repository with optional
//! stash-and-restore of local changes.

pub mod actions;
pub mod batch;
pub mod config;
pub mod error;
pub mod exec;
pub mod exec_log;
pub mod filter;
pub mod missing;
pub mod pull;
pub mod scheduler;
pub mod status;
pub mod workspace;

pub use actions::{Action, ActionContext, Interaction};
pub use config::{load_config, Config, Defaults, Property, RepoConfig};
pub use error::GitBatchError;
pub use exec::{ExecutionResult, Executor, SystemShell};
pub use exec_log::{LogSink, OutlineLog, PlainLog};
pub use missing::print_missing_repo;
pub use scheduler::{Scheduler, SchedulerState, StepOutcome};
pub use workspace::{is_dirty_any, Workspace};
