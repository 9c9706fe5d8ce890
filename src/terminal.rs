//! Terminal implementation of the human side of interactive actions.

use anyhow::{Context, Result};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::path::Path;
use std::process::Command;

use git_batch::Interaction;

pub struct TerminalInteraction {
    theme: ColorfulTheme,
}

impl TerminalInteraction {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Interaction for TerminalInteraction {
    /// Show the short status and hand the user a shell inside the repository.
    fn review(&mut self, path: &Path) -> Result<()> {
        println!();
        println!("{} {}", style("Review").bold().cyan(), path.display());

        let status = Command::new("git")
            .args(["status", "--short", "--branch"])
            .current_dir(path)
            .status();
        if let Err(e) = status {
            log::warn!("Could not show status for {}: {e}", path.display());
        }

        let shell = std::env::var("SHELL").unwrap_or_else(|_| "sh".to_string());
        println!(
            "{}",
            style(format!("Opening {shell} here; exit it when you are done.")).dim()
        );
        let exit = Command::new(&shell)
            .current_dir(path)
            .status()
            .with_context(|| format!("Failed to start {shell} in {}", path.display()))?;
        if !exit.success() {
            log::warn!("{shell} exited with {exit}");
        }
        Ok(())
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        Ok(Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(false)
            .interact()?)
    }
}
