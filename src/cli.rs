//! CLI argument parsing and command dispatch.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use git_batch::status::StatusOutput;
use git_batch::{
    load_config, print_missing_repo, Interaction, OutlineLog, PlainLog, SchedulerState,
    StepOutcome, Workspace,
};

use crate::terminal::TerminalInteraction;

/// Batch operations over your local git working copies
#[derive(Parser, Debug)]
#[command(name = "git-batch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to $GIT_BATCH_CONFIG, then the user config dir)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run each unclean repository's configured action
    Check,
    /// Pull every repository, stashing local changes where configured
    Pull(PullArgs),
    /// Show the state of every configured repository
    Status(StatusArgs),
    /// Exit nonzero if any repository has uncommitted changes
    Guard,
}

#[derive(Args, Debug)]
struct PullArgs {
    /// Print log entries as they happen instead of an outline at the end
    #[arg(long, conflicts_with = "log_file")]
    stream: bool,

    /// Also write the execution log to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct StatusArgs {
    /// Emit JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn execute(self) -> Result<ExitCode> {
        let config = load_config(self.config.as_deref())?;
        let mut ws = Workspace::new(config);

        match self.command {
            Commands::Check => check(&mut ws),
            Commands::Pull(args) => pull(&ws, &args),
            Commands::Status(args) => status(&ws, &args),
            Commands::Guard => guard(&ws),
        }
    }
}

fn check(ws: &mut Workspace) -> Result<ExitCode> {
    let mut ui = TerminalInteraction::new();
    let mut failed = false;
    let mut outcome = ws.check_unclean(&mut ui);

    loop {
        match outcome {
            Ok(StepOutcome::Done) => break,
            Ok(StepOutcome::Suspended(path)) => {
                log::debug!("Queue suspended on {}", path.display());
            }
            Err(e) => {
                // Errors before the queue went live are not resumable.
                if ws.scheduler().state() != SchedulerState::Suspended {
                    return Err(e);
                }
                failed = true;
                eprintln!("{} {e:#}", style("error:").red().bold());
            }
        }

        let left = ws.scheduler().queue_len();
        if left > 0 && !ui.confirm(&format!("Continue with the next repository? ({left} left)"))? {
            let dropped = ws.abandon();
            println!("{} {dropped} repositories left unhandled", style("Abandoned:").yellow());
            return Ok(exit_code(failed));
        }
        outcome = ws.resume(&mut ui);
    }

    println!("{}", check_summary(failed));
    Ok(exit_code(failed))
}

fn check_summary(failed: bool) -> String {
    if failed {
        format!("{} Queue finished; some actions failed", style("✗").red())
    } else {
        format!("{} All unclean repositories handled", style("✓").green())
    }
}

fn pull(ws: &Workspace, args: &PullArgs) -> Result<ExitCode> {
    let report = if args.stream {
        let mut log = PlainLog::new(io::stdout());
        ws.pull_all(&mut log, None)?
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::with_template("{spinner} [{pos}] {msg}")?);
        pb.enable_steady_tick(Duration::from_millis(100));

        let mut log = OutlineLog::new();
        let result = ws.pull_all(&mut log, Some(pb.clone()));
        pb.finish_and_clear();
        print!("{}", log.render(true));
        if let Some(path) = &args.log_file {
            log.save(path)?;
        }
        result?
    };

    let mut line = format!(
        "{} pulled, {} failed, {} stashed and {} restored",
        report.summary.succeeded.len(),
        report.summary.failed.len(),
        report.stashed.len(),
        report.restored.len()
    );
    if !report.stash_failed.is_empty() {
        line.push_str(&format!(", {} could not be stashed", report.stash_failed.len()));
    }
    if report.has_failures() {
        println!("{}", style(line).red());
    } else {
        println!("{}", style(line).green());
    }
    Ok(exit_code(report.has_failures()))
}

fn status(ws: &Workspace, args: &StatusArgs) -> Result<ExitCode> {
    let repositories = ws.status()?;

    if args.json {
        let output = StatusOutput { repositories };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(ExitCode::SUCCESS);
    }

    for repo in &repositories {
        if !repo.present {
            print_missing_repo(Path::new(&repo.path));
            continue;
        }
        let mark = if !repo.git_repo {
            style("?").yellow()
        } else if repo.dirty {
            style("●").red()
        } else {
            style("✓").green()
        };
        let mut detail = format!("[{}]", repo.unclean_action);
        if repo.git_repo {
            detail.push_str(&format!(
                " {} modified, {} untracked",
                repo.modified_count, repo.untracked_count
            ));
        } else {
            detail.push_str(" not a git repository");
        }
        if repo.skip_pull {
            detail.push_str(", skip pull");
        } else if repo.stash_on_pull {
            detail.push_str(", stash on pull");
        }
        println!("{mark} {} {}", repo.path, style(detail).dim());
    }
    Ok(ExitCode::SUCCESS)
}

fn guard(ws: &Workspace) -> Result<ExitCode> {
    if !ws.is_dirty_any()? {
        return Ok(ExitCode::SUCCESS);
    }
    eprintln!("{}", style("Uncommitted changes in:").yellow().bold());
    for repo in ws.unclean()? {
        eprintln!("  {}", repo.path().display());
    }
    Ok(ExitCode::FAILURE)
}

fn exit_code(failed: bool) -> ExitCode {
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git_batch::GitBatchError;

    #[test]
    fn parses_pull_flags() {
        let cli = Cli::try_parse_from(["git-batch", "--config", "/c.yaml", "pull", "--log-file", "/l.org"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some(Path::new("/c.yaml")));
        match cli.command {
            Commands::Pull(args) => {
                assert!(!args.stream);
                assert_eq!(args.log_file.as_deref(), Some(Path::new("/l.org")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn stream_conflicts_with_log_file() {
        assert!(Cli::try_parse_from(["git-batch", "pull", "--stream", "--log-file", "x"]).is_err());
    }

    #[test]
    fn default_log_level_is_warn() {
        let cli = Cli::try_parse_from(["git-batch", "guard"]).unwrap();
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn check_summary_reports_failed_actions() {
        let failed = console::strip_ansi_codes(&check_summary(true)).into_owned();
        assert!(failed.contains("some actions failed"));
        assert!(!failed.contains("All unclean repositories handled"));

        let clean = console::strip_ansi_codes(&check_summary(false)).into_owned();
        assert!(clean.contains("All unclean repositories handled"));
    }

    #[test]
    fn config_errors_surface_as_typed_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "repositories: {path: /r1}\n").unwrap();
        let cli = Cli::try_parse_from(["git-batch", "--config", path.to_str().unwrap(), "status"]).unwrap();

        let err = cli.execute().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GitBatchError>(),
            Some(GitBatchError::InvalidConfigList { .. })
        ));
    }
}
