//! Running one shell command in one working copy.

use anyhow::Result;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::GitBatchError;

/// Returned by a non-verbose run that exited 0.
pub const SUCCESS_MESSAGE: &str = "Command completed successfully";

/// Exits 0 only when `git status` reports a modified, added, deleted,
/// renamed, copied or unmerged entry. Untracked files do not count.
pub const DIRTY_CHECK_CMD: &str = "git status --porcelain | grep -qE '^([MADRCU].|.[MADRCU])'";

/// Outcome of one subprocess invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    /// Standard output and standard error, merged in write order.
    pub combined_output: String,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// The subprocess boundary: `(directory, command_line) -> (exit_code, output)`.
///
/// Implementations never fail; spawn errors are reported as a nonzero exit
/// code with the error text as output.
pub trait Executor {
    fn execute(&self, dir: &Path, command: &str) -> ExecutionResult;
}

/// Runs command lines through `sh -c` with stderr folded into stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShell;

impl Executor for SystemShell {
    fn execute(&self, dir: &Path, command: &str) -> ExecutionResult {
        let script = format!("exec 2>&1\n{command}");
        let output = Command::new("sh")
            .arg("-c")
            .arg(&script)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();

        match output {
            Ok(out) => {
                let mut combined_output = String::from_utf8_lossy(&out.stdout).into_owned();
                combined_output.push_str(&String::from_utf8_lossy(&out.stderr));
                ExecutionResult {
                    // Killed by a signal: no code.
                    exit_code: out.status.code().unwrap_or(-1),
                    combined_output,
                }
            }
            Err(e) => {
                log::debug!("Failed to spawn '{command}' in {}: {e}", dir.display());
                ExecutionResult {
                    exit_code: -1,
                    combined_output: format!("failed to run in {}: {e}", dir.display()),
                }
            }
        }
    }
}

/// Result of [`run`], shaped by the `verbose` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutput {
    Success(&'static str),
    Captured(ExecutionResult),
}

/// Run `command` in `repo_path`.
///
/// Verbose runs always succeed and hand back the captured result. Non-verbose
/// runs discard the output and fail with `CommandFailed` on a nonzero exit.
pub fn run(
    executor: &dyn Executor,
    repo_path: &Path,
    command: &str,
    verbose: bool,
) -> Result<RunOutput> {
    if verbose {
        Ok(RunOutput::Captured(run_captured(executor, repo_path, command)))
    } else {
        run_checked(executor, repo_path, command).map(RunOutput::Success)
    }
}

/// Non-verbose run.
pub fn run_checked(executor: &dyn Executor, repo_path: &Path, command: &str) -> Result<&'static str> {
    let result = executor.execute(repo_path, command);
    if result.success() {
        Ok(SUCCESS_MESSAGE)
    } else {
        log::debug!(
            "'{command}' exited {} in {}",
            result.exit_code,
            repo_path.display()
        );
        Err(GitBatchError::CommandFailed {
            command: command.to_string(),
            path: repo_path.to_path_buf(),
        }
        .into())
    }
}

/// Verbose run.
pub fn run_captured(executor: &dyn Executor, repo_path: &Path, command: &str) -> ExecutionResult {
    executor.execute(repo_path, command)
}

/// Whether the working copy at `path` has uncommitted changes.
///
/// Any failure of the check (not a repository, git missing, spawn error)
/// reads as `false`.
pub fn is_unclean(executor: &dyn Executor, path: &Path) -> bool {
    match run_checked(executor, path, DIRTY_CHECK_CMD) {
        Ok(_) => true,
        Err(e) => {
            log::debug!("{} treated as clean: {e}", path.display());
            false
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};
    use std::path::PathBuf;

    /// Create a git repo with one commit in a fresh tempdir.
    pub(crate) fn init_git_repo() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        let setup: [&[&str]; 3] = [
            &["init", "-q"],
            &["config", "user.email", "test@test.com"],
            &["config", "user.name", "Test"],
        ];
        for args in setup {
            Command::new("git")
                .args(args)
                .current_dir(tmp.path())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .unwrap();
        }
        std::fs::write(tmp.path().join("README.md"), "init\n").unwrap();
        Command::new("git")
            .args(["add", "README.md"])
            .current_dir(tmp.path())
            .status()
            .unwrap();
        Command::new("git")
            .args(["commit", "-q", "-m", "initial"])
            .current_dir(tmp.path())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .unwrap();
        tmp
    }

    /// Records every invocation and answers from a script.
    ///
    /// The dirty check is answered from `dirty`; every other command exits
    /// with the code in `exit_codes` (default 0) and echoes itself.
    #[derive(Default)]
    pub(crate) struct FakeExecutor {
        pub dirty: HashSet<PathBuf>,
        pub exit_codes: HashMap<String, i32>,
        pub calls: RefCell<Vec<(PathBuf, String)>>,
    }

    impl FakeExecutor {
        pub fn with_dirty(paths: &[&Path]) -> Self {
            Self {
                dirty: paths.iter().map(|p| p.to_path_buf()).collect(),
                ..Self::default()
            }
        }

        pub fn failing(mut self, command: &str, code: i32) -> Self {
            self.exit_codes.insert(command.to_string(), code);
            self
        }

        /// Non-dirty-check commands, in call order.
        pub fn commands(&self) -> Vec<(PathBuf, String)> {
            self.calls
                .borrow()
                .iter()
                .filter(|(_, c)| c != DIRTY_CHECK_CMD)
                .cloned()
                .collect()
        }
    }

    impl Executor for FakeExecutor {
        fn execute(&self, dir: &Path, command: &str) -> ExecutionResult {
            self.calls
                .borrow_mut()
                .push((dir.to_path_buf(), command.to_string()));
            if command == DIRTY_CHECK_CMD {
                let dirty = self.dirty.contains(dir);
                return ExecutionResult {
                    exit_code: if dirty { 0 } else { 1 },
                    combined_output: String::new(),
                };
            }
            ExecutionResult {
                exit_code: self.exit_codes.get(command).copied().unwrap_or(0),
                combined_output: format!("ran {command}\n"),
            }
        }
    }

    // ── SystemShell ─────────────────────────────────────────

    #[test]
    fn captures_merged_output_and_exit_code() {
        let tmp = tempfile::tempdir().unwrap();
        let result = run_captured(&SystemShell, tmp.path(), "echo out; echo err >&2; exit 3");
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.combined_output, "out\nerr\n");
    }

    #[test]
    fn runs_in_the_given_directory() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("marker"), "").unwrap();
        let result = run_captured(&SystemShell, tmp.path(), "ls");
        assert!(result.success());
        assert!(result.combined_output.contains("marker"));
    }

    #[test]
    fn supports_shell_pipelines() {
        let tmp = tempfile::tempdir().unwrap();
        let result = run_captured(&SystemShell, tmp.path(), "printf 'a\\nb\\n' | grep b");
        assert_eq!(result.combined_output, "b\n");
    }

    #[test]
    fn missing_directory_is_captured_not_raised() {
        let result = run_captured(&SystemShell, Path::new("/nonexistent/git-batch"), "true");
        assert!(!result.success());
        assert!(!result.combined_output.is_empty());
    }

    // ── run ─────────────────────────────────────────────────

    #[test]
    fn verbose_run_never_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let out = run(&SystemShell, tmp.path(), "exit 1", true).unwrap();
        assert!(matches!(out, RunOutput::Captured(r) if r.exit_code == 1));
    }

    #[test]
    fn non_verbose_run_returns_success_message() {
        let tmp = tempfile::tempdir().unwrap();
        let out = run(&SystemShell, tmp.path(), "true", false).unwrap();
        assert_eq!(out, RunOutput::Success(SUCCESS_MESSAGE));
    }

    #[test]
    fn non_verbose_status_outside_repo_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let err = run(&SystemShell, tmp.path(), "git status --porcelain", false).unwrap_err();
        match err.downcast_ref::<GitBatchError>() {
            Some(GitBatchError::CommandFailed { command, path }) => {
                assert_eq!(command, "git status --porcelain");
                assert_eq!(path, tmp.path());
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    // ── is_unclean ──────────────────────────────────────────

    #[test]
    fn clean_repo_is_not_unclean() {
        let tmp = init_git_repo();
        assert!(!is_unclean(&SystemShell, tmp.path()));
    }

    #[test]
    fn modified_file_is_unclean() {
        let tmp = init_git_repo();
        std::fs::write(tmp.path().join("README.md"), "changed\n").unwrap();
        assert!(is_unclean(&SystemShell, tmp.path()));
    }

    #[test]
    fn staged_new_file_is_unclean() {
        let tmp = init_git_repo();
        std::fs::write(tmp.path().join("new.txt"), "new\n").unwrap();
        Command::new("git")
            .args(["add", "new.txt"])
            .current_dir(tmp.path())
            .status()
            .unwrap();
        assert!(is_unclean(&SystemShell, tmp.path()));
    }

    #[test]
    fn untracked_only_is_not_unclean() {
        let tmp = init_git_repo();
        std::fs::write(tmp.path().join("scratch.txt"), "u").unwrap();
        assert!(!is_unclean(&SystemShell, tmp.path()));
    }

    #[test]
    fn non_repo_reads_as_clean() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(!is_unclean(&SystemShell, tmp.path()));
        assert!(!is_unclean(&SystemShell, Path::new("/nonexistent/git-batch")));
    }
}
